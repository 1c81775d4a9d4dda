//! Shareable URL query parameters for a filter selection.
//!
//! Only values that differ from the defaults are written. Restoring builds
//! the whole `FilterState` in one pass, so the taxonomy cascade never resets
//! a lower rank that arrives in the same query.

use crate::filter::{default_source, is_all, FilterState, SexFilter, ALL};
use chrono::NaiveDate;
use log::warn;
use std::borrow::Borrow;
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub const FAMILY: &str = "family";
pub const TRIBE: &str = "tribe";
pub const GENUS: &str = "genus";
pub const SPECIES: &str = "sp";
pub const SUBSPECIES: &str = "ssp";
pub const MIMICRY: &str = "mim";
pub const STATUS: &str = "status";
pub const SOURCE: &str = "source";
pub const COUNTRY: &str = "country";
pub const SEX: &str = "sex";
pub const SEARCH: &str = "cam";
pub const FROM: &str = "from";
pub const TO: &str = "to";

/// Non-default filters as ordered `(name, value)` pairs
pub fn encode(state: &FilterState) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    for (name, value) in [(FAMILY, &state.family), (TRIBE, &state.tribe), (GENUS, &state.genus)] {
        if !is_all(value) {
            params.push((name, value.clone()));
        }
    }

    for (name, values) in [
        (SPECIES, &state.species),
        (SUBSPECIES, &state.subspecies),
        (MIMICRY, &state.mimicry),
        (STATUS, &state.status),
    ] {
        if !values.is_empty() {
            params.push((name, values.join(",")));
        }
    }

    // An empty source list ("every source") still differs from the default
    if state.source != default_source() {
        params.push((SOURCE, state.source.join(",")));
    }

    if !is_all(&state.country) {
        params.push((COUNTRY, state.country.clone()));
    }
    if state.sex != SexFilter::All {
        params.push((SEX, state.sex.as_str().to_string()));
    }
    if !state.camid_search.is_empty() {
        params.push((SEARCH, state.camid_search.clone()));
    }
    if let Some(start) = state.date_start {
        params.push((FROM, start.format(DATE_FORMAT).to_string()));
    }
    if let Some(end) = state.date_end {
        params.push((TO, end.format(DATE_FORMAT).to_string()));
    }

    params
}

/// Percent-encoded query string (no leading `?`)
pub fn to_query_string(state: &FilterState) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(encode(state))
        .finish()
}

/// Build a filter state from query pairs. Unknown names are ignored and
/// unparseable values fall back to their defaults.
pub fn decode<I, K, V>(pairs: I) -> FilterState
where
    I: IntoIterator<Item = (K, V)>,
    K: Borrow<str>,
    V: Borrow<str>,
{
    let params: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.borrow().to_string(), v.borrow().to_string()))
        .collect();
    let get = |name: &str| params.get(name).map(String::as_str);

    let mut state = FilterState::default();

    // Hierarchy order, assigned directly: no cascade resets during restore
    state.family = scalar(get(FAMILY));
    state.tribe = scalar(get(TRIBE));
    state.genus = scalar(get(GENUS));
    state.species = list(get(SPECIES));
    state.subspecies = list(get(SUBSPECIES));

    state.mimicry = list(get(MIMICRY));
    state.status = list(get(STATUS));
    if let Some(source) = get(SOURCE) {
        state.source = list(Some(source));
    }
    state.country = scalar(get(COUNTRY));

    if let Some(raw) = get(SEX) {
        match SexFilter::parse(raw) {
            Some(sex) => state.sex = sex,
            None => warn!("Ignoring unknown sex filter {:?}", raw),
        }
    }
    if let Some(search) = get(SEARCH) {
        state.camid_search = search.to_string();
    }
    state.date_start = date(FROM, get(FROM));
    state.date_end = date(TO, get(TO));

    state
}

/// Parse a query string, with or without the leading `?`
pub fn from_query_string(query: &str) -> FilterState {
    let query = query.strip_prefix('?').unwrap_or(query);
    decode(form_urlencoded::parse(query.as_bytes()))
}

fn scalar(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => ALL.to_string(),
    }
}

fn list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn date(name: &str, value: Option<&str>) -> Option<NaiveDate> {
    let raw = value?;
    match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!("Ignoring {} date {:?}: {}", name, raw, e);
            None
        }
    }
}
