pub mod analysis;
pub mod config;

pub use analysis::{AnalysisResult, Detection, Severity};
pub use config::{Config, CorrosionThresholds};
