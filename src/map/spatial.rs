use super::{Feature, FeatureCollection};
use crate::data::valid;
use crate::geo::CoordKey;
use std::collections::HashMap;

/// Counting unit used to split co-located records
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaxonUnit {
    /// `(species, subspecies)` pair
    Subspecies,
    /// Species alone
    Species,
}

impl TaxonUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonUnit::Subspecies => "subspecies",
            TaxonUnit::Species => "species",
        }
    }
}

/// Partition key: invalid names fall into the `None` bucket
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaxonKey {
    pub species: Option<String>,
    pub subspecies: Option<String>,
}

impl TaxonKey {
    fn of(feature: &Feature, unit: TaxonUnit) -> Self {
        let r = &feature.record;
        Self {
            species: valid(&r.scientific_name).map(str::to_string),
            subspecies: match unit {
                TaxonUnit::Subspecies => valid(&r.subspecies).map(str::to_string),
                TaxonUnit::Species => None,
            },
        }
    }
}

/// One taxon within a coordinate group.
/// Indices point into the feature collection the groups were built from.
#[derive(Clone, Debug, PartialEq)]
pub struct TaxonGroup {
    pub key: TaxonKey,
    /// First photographed member, else the first member
    pub representative: usize,
    /// Members in collection order
    pub members: Vec<usize>,
}

/// Features bucketed by rounded coordinate.
/// Only locations holding at least two features are kept.
#[derive(Clone, Debug, Default)]
pub struct CoordinateGroups {
    /// Group keys in order of first appearance
    order: Vec<CoordKey>,
    groups: HashMap<CoordKey, Vec<usize>>,
}

impl CoordinateGroups {
    pub fn build(fc: &FeatureCollection) -> Self {
        let mut order = Vec::new();
        let mut cells: HashMap<CoordKey, Vec<usize>> = HashMap::new();

        for (idx, feature) in fc.features.iter().enumerate() {
            let key = feature.coord_key();
            let members = cells.entry(key).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            members.push(idx);
        }

        cells.retain(|_, members| members.len() >= 2);
        order.retain(|key| cells.contains_key(key));

        Self { order, groups: cells }
    }

    /// Members at a rounded coordinate (only multi-record locations)
    pub fn get(&self, key: &CoordKey) -> Option<&[usize]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// `(key, members)` in order of first appearance
    pub fn iter(&self) -> impl Iterator<Item = (CoordKey, &[usize])> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.groups.get(key).map(|members| (*key, members.as_slice())))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Split one location's members by taxon, in order of first appearance
    pub fn partition(fc: &FeatureCollection, members: &[usize], unit: TaxonUnit) -> Vec<TaxonGroup> {
        let mut partitions: Vec<TaxonGroup> = Vec::new();
        let mut index: HashMap<TaxonKey, usize> = HashMap::new();

        for &idx in members {
            let key = TaxonKey::of(&fc.features[idx], unit);
            match index.get(&key) {
                Some(&p) => partitions[p].members.push(idx),
                None => {
                    index.insert(key.clone(), partitions.len());
                    partitions.push(TaxonGroup {
                        key,
                        representative: idx,
                        members: vec![idx],
                    });
                }
            }
        }

        for group in &mut partitions {
            if let Some(&photo) = group
                .members
                .iter()
                .find(|&&idx| fc.features[idx].record.has_photo())
            {
                group.representative = photo;
            }
        }

        partitions
    }
}
