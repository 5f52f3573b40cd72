use std::fs::read_to_string;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tflite::ops::builtin::BuiltinOpResolver;
use tflite::{FlatBufferModel, Interpreter, InterpreterBuilder};

use crate::app::config::ModelConfig;
use crate::error::{PipelineError, Result, StartupError};
use crate::pipeline::ssd::{check_output_dims, LabelParser, SsdOutputs};
use crate::pipeline::{Detections, ObjectModel};

struct Stage {
    interpreter: Interpreter<'static, BuiltinOpResolver>,
    width: u32,
    height: u32,
}

/// SSD-style TFLite detector (boxes, classes, scores, count outputs).
///
/// The interpreter keeps mutable tensor state, so calls are serialised.
pub struct TFLiteModel {
    stage: Mutex<Stage>,
    labels: LabelParser,
}

fn model_err(e: impl std::fmt::Display) -> StartupError {
    StartupError::Model(e.to_string())
}

fn infer_err(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Inference(e.to_string())
}

impl TFLiteModel {
    pub fn load(config: &ModelConfig) -> std::result::Result<Self, StartupError> {
        let model = FlatBufferModel::build_from_file(&config.model_filename).map_err(model_err)?;
        let resolver = BuiltinOpResolver::default();
        let builder = InterpreterBuilder::new(model, resolver).map_err(model_err)?;
        let mut interpreter = builder.build().map_err(model_err)?;
        interpreter.allocate_tensors().map_err(model_err)?;

        if interpreter.inputs().len() != 1 {
            return Err(StartupError::Model(format!(
                "expected 1 input tensor, found {}",
                interpreter.inputs().len()
            )));
        }
        let output_dims: Vec<Vec<usize>> = interpreter
            .get_output_details()
            .map_err(model_err)?
            .into_iter()
            .map(|info| info.dims)
            .collect();
        check_output_dims(&output_dims).map_err(StartupError::Model)?;
        let tinfos = interpreter.get_input_details().map_err(model_err)?;
        let dims = &tinfos[0].dims;
        if dims.len() != 4 || dims[3] != 3 {
            return Err(StartupError::Model(format!("unsupported input shape {dims:?}")));
        }
        let height = dims[1] as u32;
        let width = dims[2] as u32;

        interpreter.set_num_threads(config.num_threads as i32);

        let text = read_to_string(&config.label_filename)?;
        let labels = LabelParser::parse(&text).map_err(StartupError::Model)?;
        tracing::info!(%config, width, height, labels = labels.len(), "loaded tflite model");

        Ok(Self {
            stage: Mutex::new(Stage {
                interpreter,
                width,
                height,
            }),
            labels,
        })
    }
}

impl ObjectModel for TFLiteModel {
    fn infer(&self, image: &RgbImage) -> Result<Detections> {
        let mut stage = self
            .stage
            .lock()
            .map_err(|_| PipelineError::Inference("interpreter lock poisoned".to_string()))?;
        let resized = imageops::resize(image, stage.width, stage.height, FilterType::Triangle);
        let rgb_bytes = resized.as_raw();

        let input_index = stage.interpreter.inputs()[0];
        let input: &mut [u8] =
            stage.interpreter.tensor_data_mut(input_index).map_err(infer_err)?;
        if input.len() != rgb_bytes.len() {
            return Err(PipelineError::Inference(format!(
                "input tensor holds {} bytes, frame has {}",
                input.len(),
                rgb_bytes.len()
            )));
        }
        input.copy_from_slice(rgb_bytes);
        stage.interpreter.invoke().map_err(infer_err)?;

        let outputs = stage.interpreter.outputs().to_vec();
        let interpreter = &stage.interpreter;
        let ssd = SsdOutputs {
            locations: interpreter.tensor_data(outputs[0]).map_err(infer_err)?,
            classes: interpreter.tensor_data(outputs[1]).map_err(infer_err)?,
            scores: interpreter.tensor_data(outputs[2]).map_err(infer_err)?,
            count: interpreter.tensor_data(outputs[3]).map_err(infer_err)?,
        };
        let (width, height) = (image.width() as f32, image.height() as f32);
        Ok(ssd.decode(&self.labels, width, height))
    }
}
