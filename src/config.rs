// Scoring configuration
// Every threshold and weight the relationship engine and collapser use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{ReelMapError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    pub name_threshold: f64,
    pub red_name_threshold: f64,
    pub path_threshold: f64,
    pub duration_threshold: f64,
    pub size_threshold: f64,
    pub temporal_window_hours: f64,
    pub min_evidence: usize,
    pub red_min_evidence: usize,
    pub min_confidence: f64,
    pub red_min_confidence: f64,
    pub jaccard_weight: f64,
    pub edit_distance_weight: f64,
    pub suffix_pair_score: f64,
    pub collapse_edge_threshold: f64,
    pub proxy_ratios: Vec<f64>,
    pub min_shared_path_parts: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            name_threshold: NAME_SIMILARITY_THRESHOLD,
            red_name_threshold: RED_NAME_SIMILARITY_THRESHOLD,
            path_threshold: PATH_PROXIMITY_THRESHOLD,
            duration_threshold: DURATION_MATCH_THRESHOLD,
            size_threshold: SIZE_RATIO_THRESHOLD,
            temporal_window_hours: TEMPORAL_WINDOW_HOURS,
            min_evidence: MIN_EVIDENCE,
            red_min_evidence: RED_MIN_EVIDENCE,
            min_confidence: MIN_CONFIDENCE,
            red_min_confidence: RED_MIN_CONFIDENCE,
            jaccard_weight: JACCARD_WEIGHT,
            edit_distance_weight: EDIT_DISTANCE_WEIGHT,
            suffix_pair_score: SUFFIX_PAIR_SCORE,
            collapse_edge_threshold: COLLAPSE_EDGE_THRESHOLD,
            proxy_ratios: PROXY_RATIOS.to_vec(),
            min_shared_path_parts: MIN_SHARED_PATH_PARTS,
        }
    }
}

impl ScoringConfig {
    /// Load from a JSON file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: ScoringConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No scoring config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `<config dir>/reelmap/scoring.json`
    pub fn default_path() -> Result<PathBuf> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
            .ok_or_else(|| ReelMapError::Config("Could not determine config directory".to_string()))
    }

    fn validate(&self) -> Result<()> {
        let unit = [
            ("nameThreshold", self.name_threshold),
            ("redNameThreshold", self.red_name_threshold),
            ("pathThreshold", self.path_threshold),
            ("durationThreshold", self.duration_threshold),
            ("sizeThreshold", self.size_threshold),
            ("minConfidence", self.min_confidence),
            ("redMinConfidence", self.red_min_confidence),
            ("suffixPairScore", self.suffix_pair_score),
            ("collapseEdgeThreshold", self.collapse_edge_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReelMapError::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        if self.proxy_ratios.is_empty() || self.proxy_ratios.iter().any(|r| *r <= 0.0) {
            return Err(ReelMapError::Config("proxyRatios must be a non-empty list of positive ratios".to_string()));
        }
        if self.temporal_window_hours <= 0.0 {
            return Err(ReelMapError::Config("temporalWindowHours must be positive".to_string()));
        }
        Ok(())
    }
}

/// Default location of the tag/rule store database.
pub fn default_store_path() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(STORE_FILENAME))
        .ok_or_else(|| ReelMapError::Config("Could not determine data directory".to_string()))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_constants() {
        let config = ScoringConfig::default();
        assert_eq!(config.red_min_evidence, 3);
        assert_eq!(config.proxy_ratios, vec![0.1, 0.2, 0.25, 0.3, 0.5]);
        assert!((config.jaccard_weight + config.edit_distance_weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scoring.json");
        std::fs::write(&path, r#"{"minConfidence": 0.6}"#).unwrap();

        let config = ScoringConfig::load(&path).unwrap();
        assert_eq!(config.min_confidence, 0.6);
        assert_eq!(config.red_min_confidence, 0.8);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scoring.json");
        std::fs::write(&path, r#"{"pathThreshold": 1.5}"#).unwrap();

        assert!(matches!(ScoringConfig::load(&path), Err(ReelMapError::Config(_))));
    }

    #[test]
    fn test_save_and_load_or_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("scoring.json");

        assert_eq!(ScoringConfig::load_or_default(&path).unwrap(), ScoringConfig::default());

        let mut config = ScoringConfig::default();
        config.min_evidence = 2;
        config.save(&path).unwrap();
        assert_eq!(ScoringConfig::load_or_default(&path).unwrap().min_evidence, 2);
    }
}
