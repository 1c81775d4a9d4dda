mod criteria;
mod options;

pub use criteria::{apply_filters, search_terms, Criteria, Rank};
pub use options::{unique_values, FilterOptions};

use crate::data::Sex;
use chrono::NaiveDate;

/// Value of an unset single-select taxonomy or country filter
pub const ALL: &str = "All";

/// Source selected on startup
pub const DEFAULT_SOURCE: &str = "Sanger Institute";

/// Sex filter selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SexFilter {
    #[default]
    All,
    Male,
    Female,
    Unknown,
}

impl SexFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(SexFilter::All),
            "male" => Some(SexFilter::Male),
            "female" => Some(SexFilter::Female),
            "unknown" => Some(SexFilter::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SexFilter::All => "all",
            SexFilter::Male => "male",
            SexFilter::Female => "female",
            SexFilter::Unknown => "unknown",
        }
    }

    #[inline]
    pub fn matches(&self, sex: Sex) -> bool {
        match self {
            SexFilter::All => true,
            SexFilter::Male => sex == Sex::Male,
            SexFilter::Female => sex == Sex::Female,
            SexFilter::Unknown => sex == Sex::Unknown,
        }
    }
}

/// Current filter selection.
///
/// Taxonomy setters cascade: changing a rank resets every rank below it
/// within the same call, so a lower selection never refers to a value
/// outside its parent. Fields are public for batch restores (see
/// `query::decode`), which assign every value at once without cascading.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterState {
    pub family: String,
    pub tribe: String,
    pub genus: String,
    pub species: Vec<String>,
    pub subspecies: Vec<String>,
    pub mimicry: Vec<String>,
    pub status: Vec<String>,
    pub source: Vec<String>,
    pub country: String,
    pub sex: SexFilter,
    pub camid_search: String,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            family: ALL.to_string(),
            tribe: ALL.to_string(),
            genus: ALL.to_string(),
            species: Vec::new(),
            subspecies: Vec::new(),
            mimicry: Vec::new(),
            status: Vec::new(),
            source: default_source(),
            country: ALL.to_string(),
            sex: SexFilter::All,
            camid_search: String::new(),
            date_start: None,
            date_end: None,
        }
    }
}

pub fn default_source() -> Vec<String> {
    vec![DEFAULT_SOURCE.to_string()]
}

/// `"All"` (or blank) means no selection
#[inline]
pub fn is_all(value: &str) -> bool {
    value.is_empty() || value == ALL
}

impl FilterState {
    pub fn set_family(&mut self, family: impl Into<String>) {
        self.family = family.into();
        self.tribe = ALL.to_string();
        self.reset_below_tribe();
    }

    pub fn set_tribe(&mut self, tribe: impl Into<String>) {
        self.tribe = tribe.into();
        self.reset_below_tribe();
    }

    pub fn set_genus(&mut self, genus: impl Into<String>) {
        self.genus = genus.into();
        self.reset_below_genus();
    }

    pub fn set_species(&mut self, species: Vec<String>) {
        self.species = species;
        self.subspecies.clear();
    }

    pub fn set_subspecies(&mut self, subspecies: Vec<String>) {
        self.subspecies = subspecies;
    }

    fn reset_below_tribe(&mut self) {
        self.genus = ALL.to_string();
        self.reset_below_genus();
    }

    fn reset_below_genus(&mut self) {
        self.species.clear();
        self.subspecies.clear();
    }

    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.date_start = start;
        self.date_end = end;
    }

    pub fn has_date_filter(&self) -> bool {
        self.date_start.is_some() || self.date_end.is_some()
    }

    /// Number of filters that differ from their defaults
    pub fn active_count(&self) -> usize {
        let defaults = Self::default();
        [
            !is_all(&self.family),
            !is_all(&self.tribe),
            !is_all(&self.genus),
            !self.species.is_empty(),
            !self.subspecies.is_empty(),
            !self.mimicry.is_empty(),
            !self.status.is_empty(),
            self.source != defaults.source,
            !is_all(&self.country),
            self.sex != SexFilter::All,
            !self.camid_search.trim().is_empty(),
            self.has_date_filter(),
        ]
        .iter()
        .filter(|active| **active)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrowed() -> FilterState {
        let mut s = FilterState::default();
        s.family = "Nymphalidae".into();
        s.tribe = "Ithomiini".into();
        s.genus = "Mechanitis".into();
        s.species = vec!["Mechanitis polymnia".into()];
        s.subspecies = vec!["casabranca".into()];
        s
    }

    #[test]
    fn test_family_resets_everything_below() {
        let mut s = narrowed();
        s.set_family("Nymphalidae");
        assert_eq!(s.tribe, ALL);
        assert_eq!(s.genus, ALL);
        assert!(s.species.is_empty());
        assert!(s.subspecies.is_empty());
    }

    #[test]
    fn test_tribe_keeps_family() {
        let mut s = narrowed();
        s.set_tribe("Dircennini");
        assert_eq!(s.family, "Nymphalidae");
        assert_eq!(s.genus, ALL);
        assert!(s.species.is_empty() && s.subspecies.is_empty());
    }

    #[test]
    fn test_genus_and_species_resets() {
        let mut s = narrowed();
        s.set_genus("Melinaea");
        assert_eq!(s.tribe, "Ithomiini");
        assert!(s.species.is_empty() && s.subspecies.is_empty());

        let mut s = narrowed();
        s.set_species(vec!["Mechanitis lysimnia".into()]);
        assert_eq!(s.genus, "Mechanitis");
        assert!(s.subspecies.is_empty());
    }

    #[test]
    fn test_family_tribe_family_sequence() {
        let mut s = FilterState::default();
        s.set_family("Nymphalidae");
        s.set_tribe("Ithomiini");
        s.set_family("Pieridae");
        assert_eq!(s.tribe, ALL);
    }

    #[test]
    fn test_active_count() {
        let mut s = FilterState::default();
        assert_eq!(s.active_count(), 0);
        s.sex = SexFilter::Female;
        s.source.clear();
        assert_eq!(s.active_count(), 2);
    }

    #[test]
    fn test_sex_filter_parse() {
        assert_eq!(SexFilter::parse("Female"), Some(SexFilter::Female));
        assert_eq!(SexFilter::parse("both"), None);
        assert!(SexFilter::Unknown.matches(Sex::Unknown));
        assert!(!SexFilter::Male.matches(Sex::Female));
    }
}
