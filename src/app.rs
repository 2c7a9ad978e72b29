//! Application state and service initialization
//!
//! Centralizes startup: detector loading (fail-fast, with generic-weights
//! fallback), knowledge-base loading (degraded on failure), and service
//! construction, so handlers receive explicit immutable context instead of
//! ambient globals.

use std::sync::Arc;

use crate::model::Config;
use crate::service::{AnalysisService, DefectDetector, KnowledgeRetriever, YoloDetector};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Neither the custom nor the fallback detector model could be loaded.
    /// A missing detector is a deployment error; the process must not start.
    #[error("failed to initialize detector: {0}")]
    DetectorInit(String),
}

/// Application state containing all services and shared resources
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub knowledge: Arc<KnowledgeRetriever>,
    pub config: Config,
}

impl AppState {
    /// Initialize all services and build application state
    ///
    /// 1. Detector load: custom weights first, generic pretrained weights
    ///    as a degraded-but-running fallback, fatal if both fail.
    /// 2. Knowledge corpus load (never fatal).
    /// 3. Service construction.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let detector = Self::load_detector(&config)?;

        let knowledge = Arc::new(KnowledgeRetriever::load(&config.knowledge_base_path));
        if knowledge.is_degraded() {
            tracing::warn!("Knowledge base unavailable, chat will answer with the load-error sentinel");
        }

        let analysis = Arc::new(AnalysisService::new(
            detector,
            config.corrosion.clone(),
            config.inference_timeout,
        ));

        Ok(Self {
            analysis,
            knowledge,
            config,
        })
    }

    fn load_detector(config: &Config) -> Result<Arc<dyn DefectDetector>, AppError> {
        match YoloDetector::load(&config.model_path, &config.labels_path) {
            Ok(detector) => {
                tracing::info!(path = %config.model_path.display(), "Loaded custom detector model");
                Ok(Arc::new(detector))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fallback = %config.fallback_model_path.display(),
                    "Custom model unavailable, loading generic pretrained weights"
                );
                let detector =
                    YoloDetector::load(&config.fallback_model_path, &config.labels_path)
                        .map_err(|e| AppError::DetectorInit(e.to_string()))?;
                Ok(Arc::new(detector))
            }
        }
    }
}
