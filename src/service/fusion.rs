//! Severity fusion: combines detector evidence and the corrosion heuristic
//! into one verdict.
//!
//! Deterministic and side-effect free. Two passes over the evidence:
//! detector candidates first, then the corrosion percentage, which may only
//! raise the severity, never lower it.

use std::collections::HashSet;

use crate::model::{AnalysisResult, Detection, Severity};

/// Corrosion coverage above which the image is flagged as defective
const CORROSION_DEFECT_PCT: f64 = 5.0;
/// Coverage above which corrosion alone upgrades to CRITICAL
const CORROSION_CRITICAL_PCT: f64 = 20.0;
/// Coverage above which corrosion upgrades a clean image to MAJOR
const CORROSION_MAJOR_PCT: f64 = 10.0;

const NO_DEFECT_OBSERVATION: &str = "No significant defects detected.";

/// Fuse detector output and corrosion coverage into an `AnalysisResult`
///
/// `detections` must already be confidence-filtered by the adapter;
/// every entry counts as defect evidence here.
pub fn fuse(detections: &[Detection], corrosion_pct: f64) -> AnalysisResult {
    let mut defect_found = false;
    let mut severity = Severity::Pass;
    let mut observations: Vec<String> = Vec::new();

    for detection in detections {
        defect_found = true;
        observations.push(format!(
            "{} ({}%)",
            detection.label,
            (detection.confidence * 100.0).round() as i64
        ));

        // Each detection overwrites the running severity rather than folding
        // into a maximum, so the last detection's tier wins when tiers
        // differ. TODO: decide whether this should be a running max; that
        // changes observable output for mixed-tier detection lists.
        severity = match detection.label.as_str() {
            "crazing" | "pitted_surface" => Severity::Critical,
            "inclusion" | "patches" => Severity::Major,
            _ => Severity::Minor,
        };
    }

    if corrosion_pct > CORROSION_DEFECT_PCT {
        defect_found = true;
        observations.push(format!("Surface Corrosion ({}%)", format_pct(corrosion_pct)));

        // Upgrade-only: corrosion never lowers a tier set by the detector.
        if corrosion_pct > CORROSION_CRITICAL_PCT && severity != Severity::Critical {
            severity = Severity::Critical;
        } else if corrosion_pct > CORROSION_MAJOR_PCT && severity == Severity::Pass {
            severity = Severity::Major;
        } else if severity == Severity::Pass {
            severity = Severity::Minor;
        }
    }

    let ai_observation = if observations.is_empty() {
        NO_DEFECT_OBSERVATION.to_string()
    } else {
        let mut seen = HashSet::new();
        let unique: Vec<String> = observations
            .into_iter()
            .filter(|o| seen.insert(o.clone()))
            .collect();
        format!("Detected: {}", unique.join(", "))
    };

    AnalysisResult {
        is_defect: defect_found,
        suggested_severity: severity,
        ai_observation,
    }
}

/// Format a percentage rounded to 2 decimals, keeping at least one decimal
/// digit: 25.0 -> "25.0", 12.3 -> "12.3", 12.34 -> "12.34".
fn format_pct(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0');
    match trimmed.strip_suffix('.') {
        Some(whole) => format!("{whole}.0"),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f64) -> Detection {
        Detection::new(label, confidence)
    }

    #[test]
    fn test_clean_image_passes() {
        let result = fuse(&[], 0.0);
        assert!(!result.is_defect);
        assert_eq!(result.suggested_severity, Severity::Pass);
        assert_eq!(result.ai_observation, "No significant defects detected.");
    }

    #[test]
    fn test_low_corrosion_is_not_evidence() {
        let result = fuse(&[], 5.0);
        assert!(!result.is_defect);
        assert_eq!(result.suggested_severity, Severity::Pass);
    }

    #[test]
    fn test_crazing_is_critical() {
        let result = fuse(&[det("crazing", 0.9)], 0.0);
        assert!(result.is_defect);
        assert_eq!(result.suggested_severity, Severity::Critical);
        assert_eq!(result.ai_observation, "Detected: crazing (90%)");
    }

    #[test]
    fn test_inclusion_is_major() {
        let result = fuse(&[det("inclusion", 0.6)], 0.0);
        assert_eq!(result.suggested_severity, Severity::Major);
        assert_eq!(result.ai_observation, "Detected: inclusion (60%)");
    }

    #[test]
    fn test_unlisted_label_is_minor() {
        let result = fuse(&[det("scratches", 0.31)], 0.0);
        assert_eq!(result.suggested_severity, Severity::Minor);
        assert_eq!(result.ai_observation, "Detected: scratches (31%)");
    }

    #[test]
    fn test_last_detection_tier_wins() {
        // Overwrite semantics: a later MINOR detection demotes an earlier
        // CRITICAL one within the detector pass.
        let result = fuse(&[det("crazing", 0.9), det("scratches", 0.5)], 0.0);
        assert_eq!(result.suggested_severity, Severity::Minor);
        assert_eq!(
            result.ai_observation,
            "Detected: crazing (90%), scratches (50%)"
        );
    }

    #[test]
    fn test_heavy_corrosion_alone_is_critical() {
        let result = fuse(&[], 25.0);
        assert!(result.is_defect);
        assert_eq!(result.suggested_severity, Severity::Critical);
        assert_eq!(
            result.ai_observation,
            "Detected: Surface Corrosion (25.0%)"
        );
    }

    #[test]
    fn test_moderate_corrosion_alone_is_major() {
        let result = fuse(&[], 12.5);
        assert_eq!(result.suggested_severity, Severity::Major);
        assert_eq!(
            result.ai_observation,
            "Detected: Surface Corrosion (12.5%)"
        );
    }

    #[test]
    fn test_light_corrosion_alone_is_minor() {
        let result = fuse(&[], 6.0);
        assert!(result.is_defect);
        assert_eq!(result.suggested_severity, Severity::Minor);
    }

    #[test]
    fn test_moderate_corrosion_does_not_touch_minor() {
        // corrosion at 12% only upgrades from PASS, so MINOR stays MINOR
        let result = fuse(&[det("scratches", 0.4)], 12.0);
        assert_eq!(result.suggested_severity, Severity::Minor);
        assert_eq!(
            result.ai_observation,
            "Detected: scratches (40%), Surface Corrosion (12.0%)"
        );
    }

    #[test]
    fn test_heavy_corrosion_upgrades_major_to_critical() {
        let result = fuse(&[det("patches", 0.7)], 22.0);
        assert_eq!(result.suggested_severity, Severity::Critical);
    }

    #[test]
    fn test_corrosion_never_downgrades() {
        let result = fuse(&[det("pitted_surface", 0.8)], 6.0);
        assert_eq!(result.suggested_severity, Severity::Critical);
    }

    #[test]
    fn test_duplicate_detections_deduplicated() {
        // Overlapping boxes produce identical formatted strings; the
        // observation keeps one.
        let result = fuse(&[det("patches", 0.701), det("patches", 0.699)], 0.0);
        assert_eq!(result.ai_observation, "Detected: patches (70%)");
        assert!(result.is_defect);
    }

    #[test]
    fn test_format_pct_python_float_style() {
        assert_eq!(format_pct(25.0), "25.0");
        assert_eq!(format_pct(12.3), "12.3");
        assert_eq!(format_pct(12.34), "12.34");
        assert_eq!(format_pct(5.01), "5.01");
    }
}
