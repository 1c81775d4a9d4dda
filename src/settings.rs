use crate::map::ClusterMode;
use crate::palette::{ColorBy, ColorOverrides};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Active view transform, derived from settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewTransform {
    Scatter,
    Cluster(ClusterMode),
}

/// Persisted display settings (read at startup, written on change)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Spread co-located taxa apart
    pub scatter: bool,
    pub cluster_mode: ClusterMode,
    pub color_by: ColorBy,
    pub custom_colors: ColorOverrides,
}

impl ViewSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))
    }

    /// Scatter takes priority over cluster aggregation
    pub fn transform(&self) -> ViewTransform {
        if self.scatter {
            ViewTransform::Scatter
        } else {
            ViewTransform::Cluster(self.cluster_mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let s: ViewSettings = serde_json::from_str(r#"{"cluster_mode": "species"}"#).unwrap();
        assert_eq!(s.cluster_mode, ClusterMode::Species);
        assert!(!s.scatter);
        assert_eq!(s.color_by, ColorBy::ScientificName);
    }

    #[test]
    fn test_scatter_wins_over_cluster() {
        let s = ViewSettings {
            scatter: true,
            cluster_mode: ClusterMode::Species,
            ..Default::default()
        };
        assert_eq!(s.transform(), ViewTransform::Scatter);
        let s = ViewSettings { scatter: false, ..s };
        assert_eq!(s.transform(), ViewTransform::Cluster(ClusterMode::Species));
    }

    #[test]
    fn test_custom_colors_round_trip_through_file() {
        let mut s = ViewSettings {
            color_by: ColorBy::MimicryRing,
            ..Default::default()
        };
        s.custom_colors.set(ColorBy::MimicryRing, "Tiger", "#ff8800");

        let file = tempfile::NamedTempFile::new().unwrap();
        s.save(file.path()).unwrap();
        let loaded = ViewSettings::load(file.path()).unwrap();
        assert_eq!(loaded, s);
        assert_eq!(loaded.custom_colors.get(ColorBy::MimicryRing, "Tiger"), Some("#ff8800"));
    }
}
