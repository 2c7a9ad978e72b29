//! Detector boundary: trait over the learned object detector plus the
//! ONNX-backed production implementation.
//!
//! The fusion logic only ever sees `Vec<Detection>` through [`detect`], so
//! tests can drive the whole analysis path with a stub detector.

use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage};
use tract_onnx::prelude::*;

use crate::model::Detection;

/// Minimum confidence for a candidate to count as a detection
pub const CONFIDENCE_THRESHOLD: f64 = 0.25;

/// Detector input resolution (square)
const INPUT_SIZE: u32 = 640;

/// Class labels of the NEU-DET surface defect dataset, used when no
/// sidecar labels file is present.
const DEFAULT_LABELS: [&str; 6] = [
    "crazing",
    "inclusion",
    "patches",
    "pitted_surface",
    "rolled-in_scale",
    "scratches",
];

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("failed to load detector model from {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("detector inference failed: {0}")]
    Inference(String),
}

/// One unfiltered candidate from the underlying model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f64,
}

/// Opaque classifier boundary
///
/// Implementations return every candidate above their own internal floor;
/// the service-level confidence threshold is applied by [`detect`].
pub trait DefectDetector: Send + Sync {
    /// Class labels, indexed by the class id the model emits
    fn labels(&self) -> &[String];

    /// Raw candidates for one image
    fn classify(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, DetectorError>;
}

/// Run the detector and normalize its output: confidence filter plus
/// class-id to label mapping. Overlapping boxes may yield duplicate
/// (label, confidence) pairs; fusion deduplicates by formatted string.
pub fn detect(
    detector: &dyn DefectDetector,
    image: &DynamicImage,
) -> Result<Vec<Detection>, DetectorError> {
    let labels = detector.labels();
    let mut detections = Vec::new();

    for raw in detector.classify(image)? {
        if raw.confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }
        let label = labels.get(raw.class_id).ok_or_else(|| {
            DetectorError::Inference(format!(
                "class id {} outside label table of size {}",
                raw.class_id,
                labels.len()
            ))
        })?;
        detections.push(Detection::new(label.clone(), raw.confidence));
    }

    Ok(detections)
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// YOLOv8-style detector running on tract-onnx
pub struct YoloDetector {
    model: OnnxPlan,
    labels: Vec<String>,
}

impl YoloDetector {
    /// Load an ONNX weight artifact and its label table
    ///
    /// Fails if the model cannot be loaded or optimized; label-table
    /// problems fall back to the built-in NEU-DET labels.
    pub fn load(model_path: &Path, labels_path: &Path) -> Result<Self, DetectorError> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|m| {
                m.with_input_fact(
                    0,
                    InferenceFact::dt_shape(
                        f32::datum_type(),
                        tvec!(1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
                    ),
                )
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| DetectorError::Load {
                path: model_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let labels = load_labels(labels_path);
        tracing::info!(
            model = %model_path.display(),
            classes = labels.len(),
            "Detector model loaded"
        );

        Ok(Self { model, labels })
    }
}

impl DefectDetector for YoloDetector {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn classify(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, DetectorError> {
        let resized = image.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let rgb = resized.to_rgb8();

        let input: Tensor = tract_ndarray::Array4::from_shape_fn(
            (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
            |(_, c, y, x)| rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
        )
        .into();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let view = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        // YOLOv8 head layout: [1, 4 + num_classes, num_anchors], rows 0..4
        // are box coordinates. No NMS: overlapping candidates are passed
        // through and collapse later in observation dedup.
        let shape = view.shape();
        if shape.len() != 3 || shape[1] <= 4 {
            return Err(DetectorError::Inference(format!(
                "unexpected output shape {shape:?}"
            )));
        }
        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut raw = Vec::new();
        for anchor in 0..num_anchors {
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for class in 0..num_classes {
                let score = view[[0, class + 4, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if f64::from(best_score) > CONFIDENCE_THRESHOLD {
                raw.push(RawDetection {
                    class_id: best_class,
                    confidence: f64::from(best_score),
                });
            }
        }

        Ok(raw)
    }
}

/// Read one label per line from a sidecar file, falling back to the
/// built-in table when the file is absent or empty.
fn load_labels(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let labels: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            if labels.is_empty() {
                tracing::warn!(path = %path.display(), "Labels file is empty, using built-in labels");
                default_labels()
            } else {
                labels
            }
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No labels file, using built-in labels");
            default_labels()
        }
    }
}

fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
}
