use async_trait::async_trait;
use image::RgbImage;

use crate::error::{PipelineError, Result};

#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain GET with no timeout; a slow server holds the request open.
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Fetch(e.to_string()))?;
        tracing::debug!(url, len = bytes.len(), "fetched image");
        Ok(bytes.to_vec())
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).map_err(|e| PipelineError::Decode(e.to_string()))?;
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    #[test]
    fn test_decode_png() {
        let mut original = RgbImage::new(4, 3);
        original.put_pixel(1, 1, Rgb([200, 10, 30]));
        let mut bytes = Vec::new();
        original.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(1, 1), &Rgb([200, 10, 30]));
    }

    #[test]
    fn test_decode_rejects_html() {
        let err = decode_image(b"<html><body>not found</body></html>").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let source = HttpImageSource::new();
        let err = source.fetch("http://127.0.0.1:1/image.jpg").await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_bad_url() {
        let source = HttpImageSource::new();
        let err = source.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, PipelineError::Fetch(_)));
    }
}
