use crate::data::{valid, RecordStore};
use crate::filter::{apply_filters, FilterOptions, FilterState, SexFilter};
use crate::geo::CoordKey;
use crate::map::{aggregate, scatter_groups, ClusterMode, CoordinateGroups, Feature, FeatureCollection, ScatterLayout};
use crate::palette::{self, ColorBy, ColorMap};
use crate::query;
use crate::settings::{ViewSettings, ViewTransform};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Derivation stages in dependency order. Invalidating a stage recomputes
/// it and everything after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Options,
    Filtered,
    Display,
    Colors,
}

/// Owns the record store, the filter selection and view settings, and keeps
/// every derived structure consistent with them.
///
/// Mutators recompute eagerly before returning, leaves first, so readers
/// never see a stale derivation. A mutation that leaves its input unchanged
/// recomputes nothing.
pub struct Engine {
    store: RecordStore,
    filters: FilterState,
    settings: ViewSettings,
    options: FilterOptions,
    filtered: FeatureCollection,
    groups: CoordinateGroups,
    scatter: Option<ScatterLayout>,
    displayed: FeatureCollection,
    colors: ColorMap,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(RecordStore::empty(), ViewSettings::default())
    }
}

impl Engine {
    pub fn new(store: RecordStore, settings: ViewSettings) -> Self {
        let mut engine = Self {
            store,
            filters: FilterState::default(),
            settings,
            options: FilterOptions::default(),
            filtered: FeatureCollection::default(),
            groups: CoordinateGroups::default(),
            scatter: None,
            displayed: FeatureCollection::default(),
            colors: ColorMap::new(),
        };
        engine.recompute(Stage::Options);
        engine
    }

    fn recompute(&mut self, from: Stage) {
        if from <= Stage::Options {
            self.options = FilterOptions::compute(&self.store, &self.filters);
        }
        if from <= Stage::Filtered {
            self.filtered = apply_filters(&self.store, &self.filters);
            self.groups = CoordinateGroups::build(&self.filtered);
            debug!(
                "Filtered {} of {} records ({} shared locations)",
                self.filtered.len(),
                self.store.len(),
                self.groups.len()
            );
        }
        if from <= Stage::Display {
            match self.settings.transform() {
                ViewTransform::Scatter => {
                    let layout = scatter_groups(&self.filtered, &self.groups);
                    self.displayed = layout.features.clone();
                    self.scatter = Some(layout);
                }
                ViewTransform::Cluster(mode) => {
                    self.displayed = aggregate(&self.filtered, &self.groups, mode);
                    self.scatter = None;
                }
            }
            debug!("Displaying {} features ({:?})", self.displayed.len(), self.settings.transform());
        }
        if from <= Stage::Colors {
            self.colors = palette::generate(&self.displayed, self.settings.color_by, &self.settings.custom_colors);
        }
    }

    /// Apply a change to the filter state; recompute only if it changed
    fn update_filters(&mut self, change: impl FnOnce(&mut FilterState)) {
        let before = self.filters.clone();
        change(&mut self.filters);
        if self.filters != before {
            self.recompute(Stage::Options);
        }
    }

    fn update_settings(&mut self, from: Stage, change: impl FnOnce(&mut ViewSettings)) {
        let before = self.settings.clone();
        change(&mut self.settings);
        if self.settings != before {
            self.recompute(from);
        }
    }

    /// Replace the record store (a reload)
    pub fn load(&mut self, store: RecordStore) {
        self.store = store;
        self.recompute(Stage::Options);
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Records passing every filter, before any view transform
    pub fn filtered(&self) -> &FeatureCollection {
        &self.filtered
    }

    pub fn groups(&self) -> &CoordinateGroups {
        &self.groups
    }

    /// Features to draw
    pub fn displayed(&self) -> &FeatureCollection {
        &self.displayed
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.colors
    }

    // Filter mutations

    pub fn set_family(&mut self, family: &str) {
        self.update_filters(|f| f.set_family(family));
    }

    pub fn set_tribe(&mut self, tribe: &str) {
        self.update_filters(|f| f.set_tribe(tribe));
    }

    pub fn set_genus(&mut self, genus: &str) {
        self.update_filters(|f| f.set_genus(genus));
    }

    pub fn set_species(&mut self, species: Vec<String>) {
        self.update_filters(|f| f.set_species(species));
    }

    pub fn set_subspecies(&mut self, subspecies: Vec<String>) {
        self.update_filters(|f| f.set_subspecies(subspecies));
    }

    pub fn set_mimicry(&mut self, mimicry: Vec<String>) {
        self.update_filters(|f| f.mimicry = mimicry);
    }

    pub fn set_status(&mut self, status: Vec<String>) {
        self.update_filters(|f| f.status = status);
    }

    pub fn set_source(&mut self, source: Vec<String>) {
        self.update_filters(|f| f.source = source);
    }

    pub fn set_country(&mut self, country: &str) {
        self.update_filters(|f| f.country = country.to_string());
    }

    pub fn set_sex(&mut self, sex: SexFilter) {
        self.update_filters(|f| f.sex = sex);
    }

    pub fn set_search(&mut self, query: &str) {
        self.update_filters(|f| f.camid_search = query.to_string());
    }

    pub fn set_date_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.update_filters(|f| f.set_date_range(start, end));
    }

    pub fn reset_filters(&mut self) {
        self.update_filters(|f| *f = FilterState::default());
    }

    /// Replace the whole selection at once (no cascade resets)
    pub fn restore_filters(&mut self, state: FilterState) {
        self.update_filters(|f| *f = state);
    }

    pub fn restore_query(&mut self, query: &str) {
        self.restore_filters(query::from_query_string(query));
    }

    /// Shareable query string for the current selection
    pub fn query_string(&self) -> String {
        query::to_query_string(&self.filters)
    }

    // View settings

    pub fn apply_settings(&mut self, settings: ViewSettings) {
        self.update_settings(Stage::Display, |s| *s = settings);
    }

    pub fn set_scatter(&mut self, enabled: bool) {
        self.update_settings(Stage::Display, |s| s.scatter = enabled);
    }

    pub fn set_cluster_mode(&mut self, mode: ClusterMode) {
        self.update_settings(Stage::Display, |s| s.cluster_mode = mode);
    }

    pub fn set_color_by(&mut self, attr: ColorBy) {
        self.update_settings(Stage::Colors, |s| s.color_by = attr);
    }

    pub fn set_color_override(&mut self, attr: ColorBy, value: &str, color: &str) {
        self.update_settings(Stage::Colors, |s| s.custom_colors.set(attr, value, color));
    }

    /// Drop an override; the value reverts to its generated color
    pub fn clear_color_override(&mut self, attr: ColorBy, value: &str) {
        self.update_settings(Stage::Colors, |s| {
            s.custom_colors.remove(attr, value);
        });
    }

    // Queries

    /// Every filtered record at a location, including ones hidden by scatter
    pub fn records_at(&self, lat: f64, lng: f64) -> Vec<&Feature> {
        let key = CoordKey::new(lat, lng);
        self.filtered.iter().filter(|f| f.coord_key() == key).collect()
    }

    /// Members folded into the scattered representative at `displayed()[index]`
    pub fn hidden_members(&self, index: usize) -> &[Feature] {
        self.scatter
            .as_ref()
            .map(|layout| layout.hidden_members(index))
            .unwrap_or(&[])
    }

    /// Records per color value among displayed features
    pub fn legend_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for feature in self.displayed.iter() {
            if let Some(value) = valid(self.settings.color_by.field(&feature.record)) {
                *counts.entry(value.to_string()).or_insert(0) += feature.count();
            }
        }
        counts
    }
}
