use super::spatial::{CoordinateGroups, TaxonUnit};
use super::{Derived, Feature, FeatureCollection};
use crate::geo::offset_position;
use log::debug;
use std::collections::HashMap;

/// π(3 − √5) radians, ~137.5°
pub const GOLDEN_ANGLE: f64 = 2.399963229728653;

/// Outer radius of a scattered location
pub const SCATTER_RADIUS_KM: f64 = 2.0;

/// Sunflower layout: slot `i` of `n` sits at angle `i·φ` and distance
/// `radius·√(i/n)`. Returns (east_km, north_km) per slot. Slot 0 stays on
/// the true coordinate and radii strictly increase, so no two slots coincide.
pub fn scatter_offsets(n: usize, radius_km: f64) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| {
            let angle = i as f64 * GOLDEN_ANGLE;
            let dist = radius_km * (i as f64 / n as f64).sqrt();
            (dist * angle.cos(), dist * angle.sin())
        })
        .collect()
}

/// Displayed features after scatter, plus the members folded into each
/// scattered representative
#[derive(Clone, Debug, Default)]
pub struct ScatterLayout {
    pub features: FeatureCollection,
    /// Index of a representative in `features` -> members hidden behind it
    hidden: HashMap<usize, Vec<Feature>>,
}

impl ScatterLayout {
    /// Members collapsed onto the scattered representative at `features[index]`
    pub fn hidden_members(&self, index: usize) -> &[Feature] {
        self.hidden.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.values().map(Vec::len).sum()
    }
}

/// Spread taxonomically distinct records sharing a location.
///
/// Locations whose members all belong to one `(species, subspecies)` pair
/// are left untouched. Elsewhere each pair is one sunflower slot, ordered by
/// first appearance in `fc`; its representative moves to the slot and every
/// other member is hidden behind it.
pub fn scatter_groups(fc: &FeatureCollection, groups: &CoordinateGroups) -> ScatterLayout {
    let mut placed: HashMap<usize, (f64, f64, Derived)> = HashMap::new();
    let mut hidden_under: HashMap<usize, usize> = HashMap::new();

    for (_, members) in groups.iter() {
        let partitions = CoordinateGroups::partition(fc, members, TaxonUnit::Subspecies);
        if partitions.len() < 2 {
            continue;
        }

        // Every slot radiates from the location's first record
        let anchor = &fc.features[members[0]].record;
        let offsets = scatter_offsets(partitions.len(), SCATTER_RADIUS_KM);

        for (part, (east_km, north_km)) in partitions.iter().zip(offsets) {
            let rep = &fc.features[part.representative];
            let (lat, lng) = offset_position(anchor.lat, anchor.lng, east_km, north_km);
            let derived = Derived {
                original: Some((rep.record.lat, rep.record.lng)),
                is_scattered: true,
                scattered_species: part.key.species.clone(),
                scattered_subspecies: part.key.subspecies.clone(),
                aggregated_count: Some(part.members.len()),
                aggregation_type: Some(TaxonUnit::Subspecies),
            };
            placed.insert(part.representative, (lat, lng, derived));

            for &idx in part.members.iter().filter(|&&idx| idx != part.representative) {
                hidden_under.insert(idx, part.representative);
            }
        }
    }

    let mut layout = ScatterLayout::default();
    let mut shown_at: HashMap<usize, usize> = HashMap::new();
    for (idx, feature) in fc.features.iter().enumerate() {
        if hidden_under.contains_key(&idx) {
            continue;
        }
        if let Some((lat, lng, derived)) = placed.remove(&idx) {
            shown_at.insert(idx, layout.features.len());
            layout.features.features.push(Feature {
                record: feature.record.clone(),
                lat,
                lng,
                derived,
            });
        } else {
            layout.features.features.push(feature.clone());
        }
    }

    // A representative may come after its members in `fc`
    for (idx, feature) in fc.features.iter().enumerate() {
        if let Some(slot) = hidden_under.get(&idx).and_then(|rep| shown_at.get(rep)) {
            layout.hidden.entry(*slot).or_default().push(feature.clone());
        }
    }

    debug!(
        "Scattered {} groups: {} displayed, {} hidden",
        groups.len(),
        layout.features.len(),
        hidden_under.len()
    );

    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, Sex};
    use crate::geo::{is_valid_position, offset_km};
    use std::sync::Arc;

    fn feature(id: &str, lat: f64, lng: f64, subspecies: &str) -> Feature {
        Feature::from_record(Arc::new(Record {
            id: id.into(),
            lat,
            lng,
            family: None,
            tribe: None,
            genus: None,
            scientific_name: Some("Mechanitis polymnia".into()),
            subspecies: Some(subspecies.into()),
            mimicry_ring: None,
            sequencing_status: None,
            source: None,
            country: None,
            sex: Sex::Unknown,
            image_url: None,
            observation_date: None,
            date: None,
            extra: Default::default(),
        }))
    }

    fn layout(fc: &FeatureCollection) -> ScatterLayout {
        scatter_groups(fc, &CoordinateGroups::build(fc))
    }

    #[test]
    fn test_two_subspecies_scatter() {
        let fc = FeatureCollection::new(vec![
            feature("A1", -5.0, -60.0, "casabranca"),
            feature("A2", -5.0, -60.0, "lima"),
        ]);
        let out = layout(&fc);

        assert_eq!(out.features.len(), 2);
        let a = &out.features.features[0];
        let b = &out.features.features[1];
        assert!(a.derived.is_scattered && b.derived.is_scattered);
        assert_ne!((a.lat, a.lng), (b.lat, b.lng));
        for f in [a, b] {
            assert!(offset_km(-5.0, -60.0, f.lat, f.lng) <= SCATTER_RADIUS_KM + 1e-9);
            assert_eq!(f.derived.original, Some((-5.0, -60.0)));
        }
        assert_eq!(b.derived.scattered_subspecies.as_deref(), Some("lima"));
    }

    #[test]
    fn test_offsets_deterministic_distinct_and_bounded() {
        for n in 2..40 {
            let first = scatter_offsets(n, SCATTER_RADIUS_KM);
            let second = scatter_offsets(n, SCATTER_RADIUS_KM);
            assert_eq!(first, second);

            for (i, &(x, y)) in first.iter().enumerate() {
                assert!((x * x + y * y).sqrt() <= SCATTER_RADIUS_KM + 1e-12);
                for &(ox, oy) in &first[i + 1..] {
                    assert!(x != ox || y != oy);
                }
            }
        }
    }

    #[test]
    fn test_duplicates_hide_behind_representative() {
        let fc = FeatureCollection::new(vec![
            feature("A1", -5.0, -60.0, "casabranca"),
            feature("A2", -5.0, -60.0, "lima"),
            feature("A3", -5.0, -60.0, "casabranca"),
        ]);
        let out = layout(&fc);

        assert_eq!(out.features.len(), 2);
        assert_eq!(out.hidden_count(), 1);
        assert_eq!(out.hidden_members(0)[0].id(), "A3");
        assert!(out.hidden_members(1).is_empty());
        assert_eq!(out.features.features[0].derived.aggregated_count, Some(2));
    }

    #[test]
    fn test_single_taxon_location_untouched() {
        let fc = FeatureCollection::new(vec![
            feature("A1", -5.0, -60.0, "lima"),
            feature("A2", -5.0, -60.0, "lima"),
            feature("B1", 1.0, 1.0, "lima"),
        ]);
        let out = layout(&fc);
        assert_eq!(out.features, fc);
        assert_eq!(out.hidden_count(), 0);
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let fc = FeatureCollection::new(
            ["a", "b", "c", "d", "e"]
                .iter()
                .enumerate()
                .map(|(i, ssp)| feature(&format!("X{i}"), 10.0, 20.0, ssp))
                .collect(),
        );
        let first = layout(&fc);
        let second = layout(&fc);
        assert_eq!(first.features, second.features);
    }

    #[test]
    fn test_hidden_members_keyed_by_slot_not_id() {
        let fc = FeatureCollection::new(vec![
            feature("", -5.0, -60.0, "casabranca"),
            feature("", -5.0, -60.0, "lima"),
            feature("H1", -5.0, -60.0, "casabranca"),
            feature("", 3.0, 30.0, "casabranca"),
            feature("", 3.0, 30.0, "lima"),
            feature("H2", 3.0, 30.0, "casabranca"),
        ]);
        let out = layout(&fc);

        assert_eq!(out.features.len(), 4);
        let ids = |i: usize| out.hidden_members(i).iter().map(|f| f.id()).collect::<Vec<_>>();
        assert_eq!(ids(0), ["H1"]);
        assert_eq!(ids(2), ["H2"]);
        assert!(ids(1).is_empty() && ids(3).is_empty());
    }

    #[test]
    fn test_positions_valid_near_pole_and_antimeridian() {
        let fc = FeatureCollection::new(
            ["a", "b", "c", "d", "e"]
                .iter()
                .enumerate()
                .map(|(i, ssp)| feature(&format!("P{i}"), 89.9999, 179.9999, ssp))
                .collect(),
        );
        let out = layout(&fc);
        assert_eq!(out.features.len(), 5);
        for f in out.features.iter() {
            assert!(is_valid_position(f.lat, f.lng), "{} at {},{}", f.id(), f.lat, f.lng);
        }
    }

    #[test]
    fn test_radius_bound_at_high_latitude() {
        let fc = FeatureCollection::new(
            ["a", "b", "c", "d", "e", "f", "g"]
                .iter()
                .enumerate()
                .map(|(i, ssp)| feature(&format!("N{i}"), 64.1466, -21.9426, ssp))
                .collect(),
        );
        let out = layout(&fc);
        assert_eq!(out.features.len(), 7);
        for f in out.features.iter() {
            assert!(offset_km(64.1466, -21.9426, f.lat, f.lng) <= SCATTER_RADIUS_KM + 1e-9);
        }
    }
}
