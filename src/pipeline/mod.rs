mod detect;
pub use detect::BoundingBox;
pub use detect::Detection;
pub use detect::Detections;
pub use detect::Detector;
pub use detect::ObjectModel;

#[cfg(feature = "tflite")]
mod tflite;
#[cfg(feature = "tflite")]
pub use self::tflite::TFLiteModel;

#[cfg_attr(not(feature = "tflite"), allow(dead_code))]
mod ssd;

mod summarize;
pub use summarize::summarize_detections;
pub use summarize::total_count;
pub use summarize::DetectionSummary;
pub use summarize::LabelSummary;

mod fetch;
pub use fetch::decode_image;
pub use fetch::HttpImageSource;
pub use fetch::ImageSource;

mod render;
pub use render::ImageRenderer;
pub use render::RenderedImage;
pub use render::Renderer;

mod run;
pub use run::Outcome;
pub use run::Pipeline;
