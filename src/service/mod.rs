pub mod analysis;
pub mod corrosion;
pub mod detector;
pub mod fusion;
pub mod knowledge;

pub use analysis::AnalysisService;
pub use detector::{DefectDetector, YoloDetector};
pub use knowledge::KnowledgeRetriever;
