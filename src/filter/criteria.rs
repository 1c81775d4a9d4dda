use super::{is_all, FilterState, SexFilter};
use crate::data::{valid, Record, RecordStore};
use crate::map::{Feature, FeatureCollection};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashSet;

/// Taxonomic ranks in cascade order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Family,
    Tribe,
    Genus,
    Species,
    Subspecies,
}

/// A `FilterState` compiled for fast per-record evaluation
pub struct Criteria<'a> {
    family: Option<&'a str>,
    tribe: Option<&'a str>,
    genus: Option<&'a str>,
    species: HashSet<&'a str>,
    subspecies: HashSet<&'a str>,
    mimicry: HashSet<&'a str>,
    status: HashSet<&'a str>,
    source: HashSet<&'a str>,
    country: Option<&'a str>,
    sex: SexFilter,
    terms: Vec<String>,
    date_start: Option<NaiveDate>,
    date_end: Option<NaiveDate>,
}

impl<'a> Criteria<'a> {
    pub fn new(state: &'a FilterState) -> Self {
        fn scalar(value: &str) -> Option<&str> {
            (!is_all(value)).then_some(value)
        }
        fn set(values: &[String]) -> HashSet<&str> {
            values.iter().map(String::as_str).collect()
        }

        Self {
            family: scalar(&state.family),
            tribe: scalar(&state.tribe),
            genus: scalar(&state.genus),
            species: set(&state.species),
            subspecies: set(&state.subspecies),
            mimicry: set(&state.mimicry),
            status: set(&state.status),
            source: set(&state.source),
            country: scalar(&state.country),
            sex: state.sex,
            terms: search_terms(&state.camid_search),
            date_start: state.date_start,
            date_end: state.date_end,
        }
    }

    /// Every active filter, short-circuiting on the first failure
    #[inline]
    pub fn matches(&self, r: &Record) -> bool {
        self.matches_search(r)
            && self.matches_taxonomy(r, Rank::Subspecies)
            && matches_any(&self.mimicry, &r.mimicry_ring)
            && matches_any(&self.status, &r.sequencing_status)
            && self.matches_source(r)
            && matches_scalar(self.country, &r.country)
            && self.sex.matches(r.sex)
            && self.matches_date(r)
    }

    /// Taxonomy filters from family down to and including `through`
    #[inline]
    pub fn matches_taxonomy(&self, r: &Record, through: Rank) -> bool {
        matches_scalar(self.family, &r.family)
            && (through < Rank::Tribe || matches_scalar(self.tribe, &r.tribe))
            && (through < Rank::Genus || matches_scalar(self.genus, &r.genus))
            && (through < Rank::Species || matches_any(&self.species, &r.scientific_name))
            && (through < Rank::Subspecies || matches_any(&self.subspecies, &r.subspecies))
    }

    #[inline]
    pub fn matches_source(&self, r: &Record) -> bool {
        matches_any(&self.source, &r.source)
    }

    /// Identifier contains any search term (case-insensitive)
    #[inline]
    pub fn matches_search(&self, r: &Record) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let id = r.id.to_uppercase();
        self.terms.iter().any(|term| id.contains(term.as_str()))
    }

    /// Inclusive range; undated records fail whenever a bound is set
    #[inline]
    pub fn matches_date(&self, r: &Record) -> bool {
        if self.date_start.is_none() && self.date_end.is_none() {
            return true;
        }
        let Some(date) = r.date else {
            return false;
        };
        self.date_start.map_or(true, |start| date >= start) && self.date_end.map_or(true, |end| date <= end)
    }
}

#[inline]
fn matches_scalar(wanted: Option<&str>, value: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(w) => valid(value) == Some(w),
    }
}

#[inline]
fn matches_any(wanted: &HashSet<&str>, value: &Option<String>) -> bool {
    wanted.is_empty() || valid(value).is_some_and(|v| wanted.contains(v))
}

/// Split a free-text query on runs of commas and whitespace into uppercase terms
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|term| !term.is_empty())
        .map(str::to_uppercase)
        .collect()
}

/// Apply every active filter. Output keeps store order.
pub fn apply_filters(store: &RecordStore, state: &FilterState) -> FeatureCollection {
    let criteria = Criteria::new(state);
    let features: Vec<Feature> = store
        .records()
        .par_iter()
        .filter(|r| criteria.matches(r))
        .map(|r| Feature::from_record(r.clone()))
        .collect();
    FeatureCollection::new(features)
}
