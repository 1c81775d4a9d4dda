use super::spatial::{CoordinateGroups, TaxonUnit};
use super::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Counting unit for cluster aggregation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterMode {
    #[default]
    Individuals,
    Subspecies,
    Species,
}

impl ClusterMode {
    pub fn unit(&self) -> Option<TaxonUnit> {
        match self {
            ClusterMode::Individuals => None,
            ClusterMode::Subspecies => Some(TaxonUnit::Subspecies),
            ClusterMode::Species => Some(TaxonUnit::Species),
        }
    }
}

impl FromStr for ClusterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individuals" => Ok(ClusterMode::Individuals),
            "subspecies" => Ok(ClusterMode::Subspecies),
            "species" => Ok(ClusterMode::Species),
            other => Err(format!("unknown cluster mode: {other}")),
        }
    }
}

impl fmt::Display for ClusterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClusterMode::Individuals => "individuals",
            ClusterMode::Subspecies => "subspecies",
            ClusterMode::Species => "species",
        })
    }
}

/// Collapse co-located records to one representative per taxon.
///
/// Each representative is emitted where its taxon first appears and carries
/// the taxon's size in `aggregated_count`. Single-record locations pass
/// through unchanged.
pub fn aggregate(fc: &FeatureCollection, groups: &CoordinateGroups, mode: ClusterMode) -> FeatureCollection {
    let Some(unit) = mode.unit() else {
        return fc.clone();
    };

    // first member index -> (representative index, taxon size)
    let mut emit_at: HashMap<usize, (usize, usize)> = HashMap::new();
    let mut grouped: HashSet<usize> = HashSet::new();

    for (_, members) in groups.iter() {
        grouped.extend(members.iter().copied());
        for part in CoordinateGroups::partition(fc, members, unit) {
            emit_at.insert(part.members[0], (part.representative, part.members.len()));
        }
    }

    let mut features = Vec::with_capacity(fc.len() - grouped.len() + emit_at.len());
    for (idx, feature) in fc.features.iter().enumerate() {
        if let Some(&(rep, count)) = emit_at.get(&idx) {
            let mut out: Feature = fc.features[rep].clone();
            out.derived.aggregated_count = Some(count);
            out.derived.aggregation_type = Some(unit);
            features.push(out);
        } else if !grouped.contains(&idx) {
            features.push(feature.clone());
        }
    }

    FeatureCollection::new(features)
}
