//! Image analysis orchestration
//!
//! The join point between the learned detector and the corrosion
//! heuristic: both run as independent blocking tasks over the same image
//! file, then fusion produces the verdict.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::model::{AnalysisResult, CorrosionThresholds, Detection};
use crate::service::corrosion::corrosion_percentage;
use crate::service::detector::{self, DefectDetector, DetectorError};
use crate::service::fusion::fuse;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("could not decode image: {0}")]
    ImageDecode(String),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("detector inference timed out")]
    Timeout,

    #[error("analysis task failed: {0}")]
    TaskFailed(String),
}

/// Per-image defect analysis over a shared detector
pub struct AnalysisService {
    detector: Arc<dyn DefectDetector>,
    corrosion: CorrosionThresholds,
    inference_timeout: Duration,
}

impl AnalysisService {
    pub fn new(
        detector: Arc<dyn DefectDetector>,
        corrosion: CorrosionThresholds,
        inference_timeout: Duration,
    ) -> Self {
        Self {
            detector,
            corrosion,
            inference_timeout,
        }
    }

    /// Analyze one image file and produce a fused verdict
    ///
    /// Detector inference and the corrosion heuristic each decode the file
    /// independently and run in parallel. A decode failure is fatal for the
    /// detector path but counts as zero corrosion for the heuristic, which
    /// is an auxiliary signal.
    pub async fn analyze(&self, image_path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let detect_task = self.spawn_detection(image_path.to_path_buf());
        let corrosion_task = self.spawn_corrosion(image_path.to_path_buf());

        let (detect_result, corrosion_result) = tokio::join!(
            tokio::time::timeout(self.inference_timeout, detect_task),
            corrosion_task,
        );

        let detections = detect_result
            .map_err(|_| AnalysisError::Timeout)?
            .map_err(|e| AnalysisError::TaskFailed(e.to_string()))??;
        let corrosion_pct =
            corrosion_result.map_err(|e| AnalysisError::TaskFailed(e.to_string()))?;

        Ok(fuse(&detections, corrosion_pct))
    }

    fn spawn_detection(
        &self,
        path: PathBuf,
    ) -> tokio::task::JoinHandle<Result<Vec<Detection>, AnalysisError>> {
        let detector = Arc::clone(&self.detector);
        tokio::task::spawn_blocking(move || {
            let image =
                image::open(&path).map_err(|e| AnalysisError::ImageDecode(e.to_string()))?;
            detector::detect(detector.as_ref(), &image).map_err(AnalysisError::from)
        })
    }

    fn spawn_corrosion(&self, path: PathBuf) -> tokio::task::JoinHandle<f64> {
        let thresholds = self.corrosion.clone();
        tokio::task::spawn_blocking(move || match image::open(&path) {
            Ok(image) => corrosion_percentage(&image, &thresholds),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrosion heuristic could not decode image, treating as zero"
                );
                0.0
            }
        })
    }
}
