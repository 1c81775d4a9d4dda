use super::criteria::{Criteria, Rank};
use super::FilterState;
use crate::data::{valid, Record, RecordStore};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Dropdown option lists for every filter.
///
/// Each cascade level only sees records passing the source filter and the
/// levels above it, so picking a child never narrows its own siblings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub families: Vec<String>,
    pub tribes: Vec<String>,
    pub genera: Vec<String>,
    pub species: Vec<String>,
    pub subspecies: Vec<String>,
    /// Every mimicry ring in the store
    pub mimicry: Vec<String>,
    /// Rings present under the current taxonomy selection
    pub mimicry_available: Vec<String>,
    /// Rings that would currently return nothing
    pub mimicry_unavailable: Vec<String>,
    pub statuses: Vec<String>,
    pub sources: Vec<String>,
    pub countries: Vec<String>,
}

/// Sorted distinct valid values of one field
pub fn unique_values<'a, I, F>(records: I, field: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a Arc<Record>>,
    F: Fn(&Record) -> &Option<String>,
{
    records
        .into_iter()
        .filter_map(|r| valid(field(r.as_ref())))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl FilterOptions {
    pub fn compute(store: &RecordStore, state: &FilterState) -> Self {
        let records = store.records();
        let criteria = &Criteria::new(state);

        // Source plus every rank above `rank`
        let cascade = move |rank: Option<Rank>| {
            records.iter().filter(move |r| {
                criteria.matches_source(r) && rank.map_or(true, |rank| criteria.matches_taxonomy(r, rank))
            })
        };

        let mimicry = unique_values(records, |r| &r.mimicry_ring);
        let mimicry_available = unique_values(
            records.iter().filter(|r| criteria.matches_taxonomy(r, Rank::Subspecies)),
            |r| &r.mimicry_ring,
        );
        let mimicry_unavailable = mimicry
            .iter()
            .filter(|ring| mimicry_available.binary_search(ring).is_err())
            .cloned()
            .collect();

        Self {
            families: unique_values(cascade(None), |r| &r.family),
            tribes: unique_values(cascade(Some(Rank::Family)), |r| &r.tribe),
            genera: unique_values(cascade(Some(Rank::Tribe)), |r| &r.genus),
            species: unique_values(cascade(Some(Rank::Genus)), |r| &r.scientific_name),
            subspecies: unique_values(cascade(Some(Rank::Species)), |r| &r.subspecies),
            mimicry,
            mimicry_available,
            mimicry_unavailable,
            statuses: unique_values(records, |r| &r.sequencing_status),
            sources: unique_values(records, |r| &r.source),
            countries: unique_values(records, |r| &r.country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sex;

    fn record(family: &str, genus: &str, species: &str, ring: &str, source: &str) -> Record {
        Record {
            id: format!("{genus}-{ring}"),
            lat: 0.0,
            lng: 0.0,
            family: Some(family.into()),
            tribe: Some("Ithomiini".into()),
            genus: Some(genus.into()),
            scientific_name: Some(species.into()),
            subspecies: None,
            mimicry_ring: Some(ring.into()),
            sequencing_status: Some("Sequenced".into()),
            source: Some(source.into()),
            country: Some("Unknown".into()),
            sex: Sex::Unknown,
            image_url: None,
            observation_date: None,
            date: None,
            extra: Default::default(),
        }
    }

    fn store() -> RecordStore {
        RecordStore::from_records([
            record("Nymphalidae", "Mechanitis", "Mechanitis polymnia", "Tiger", "Sanger Institute"),
            record("Nymphalidae", "Melinaea", "Melinaea menophilus", "Mamercus", "Sanger Institute"),
            record("Nymphalidae", "Ithomia", "Ithomia salapia", "Hermias", "GBIF"),
            record("Pieridae", "Dismorphia", "Dismorphia amphione", "Tiger", "Sanger Institute"),
        ])
    }

    #[test]
    fn test_cascade_levels_follow_parents_and_source() {
        let mut state = FilterState::default();
        state.family = "Nymphalidae".into();
        state.genus = "Mechanitis".into();
        let opts = FilterOptions::compute(&store(), &state);

        assert_eq!(opts.families, ["Nymphalidae", "Pieridae"]);
        // Ithomia is GBIF only and filtered out by the default source
        assert_eq!(opts.genera, ["Mechanitis", "Melinaea"]);
        assert_eq!(opts.species, ["Mechanitis polymnia"]);
    }

    #[test]
    fn test_child_selection_does_not_narrow_siblings() {
        let mut state = FilterState::default();
        state.species = vec!["Mechanitis polymnia".into()];
        let opts = FilterOptions::compute(&store(), &state);
        assert_eq!(opts.species.len(), 3);
    }

    #[test]
    fn test_mimicry_availability_ignores_source() {
        let mut state = FilterState::default();
        state.genus = "Ithomia".into();
        state.mimicry = vec!["Tiger".into()];
        let opts = FilterOptions::compute(&store(), &state);

        assert_eq!(opts.mimicry, ["Hermias", "Mamercus", "Tiger"]);
        assert_eq!(opts.mimicry_available, ["Hermias"]);
        assert_eq!(opts.mimicry_unavailable, ["Mamercus", "Tiger"]);
    }

    #[test]
    fn test_invalid_values_excluded() {
        let opts = FilterOptions::compute(&store(), &FilterState::default());
        assert!(opts.countries.is_empty());
        assert!(opts.subspecies.is_empty());
        assert_eq!(opts.sources, ["GBIF", "Sanger Institute"]);
    }

    #[test]
    fn test_unloaded_store_has_no_options() {
        let opts = FilterOptions::compute(&RecordStore::empty(), &FilterState::default());
        assert_eq!(opts, FilterOptions::default());
    }
}
