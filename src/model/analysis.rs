//! Core value types for defect analysis

use serde::Serialize;
use utoipa::ToSchema;

/// One candidate defect instance reported by the detector
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Semantic class label (e.g. "crazing", "scratches")
    pub label: String,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Ordinal defect-impact classification
///
/// Ordering is PASS < MINOR < MAJOR < CRITICAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Pass,
    Minor,
    Major,
    Critical,
}

/// Final verdict for one analyzed image
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisResult {
    /// Whether any defect evidence was recorded
    pub is_defect: bool,
    /// Severity tier suggested to the inspector
    pub suggested_severity: Severity,
    /// Human-readable observation summary
    pub ai_observation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Pass < Severity::Minor);
        assert!(Severity::Minor < Severity::Major);
        assert!(Severity::Major < Severity::Critical);
    }

    #[test]
    fn severity_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&Severity::Pass).unwrap(),
            "\"PASS\""
        );
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }
}
