mod cluster;
mod scatter;
mod spatial;

pub use cluster::{aggregate, ClusterMode};
pub use scatter::{scatter_groups, scatter_offsets, ScatterLayout, GOLDEN_ANGLE, SCATTER_RADIUS_KM};
pub use spatial::{CoordinateGroups, TaxonGroup, TaxonKey, TaxonUnit};

use crate::data::Record;
use crate::geo::CoordKey;
use geojson::{GeoJson, Geometry, JsonObject, Value};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Fields added by view transforms
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Derived {
    /// True position before scatter displacement (lat, lng)
    pub original: Option<(f64, f64)>,
    pub is_scattered: bool,
    pub scattered_species: Option<String>,
    pub scattered_subspecies: Option<String>,
    pub aggregated_count: Option<usize>,
    pub aggregation_type: Option<TaxonUnit>,
}

/// One record placed on the map
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub record: Arc<Record>,
    pub lat: f64,
    pub lng: f64,
    pub derived: Derived,
}

impl Feature {
    pub fn from_record(record: Arc<Record>) -> Self {
        Self {
            lat: record.lat,
            lng: record.lng,
            record,
            derived: Derived::default(),
        }
    }

    /// Grouping key of the record's true position
    #[inline]
    pub fn coord_key(&self) -> CoordKey {
        CoordKey::new(self.record.lat, self.record.lng)
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Records this feature stands for
    pub fn count(&self) -> usize {
        self.derived.aggregated_count.unwrap_or(1)
    }

    /// Record fields plus derived fields
    pub fn properties(&self) -> JsonObject {
        let mut props = self.record.to_properties();
        let d = &self.derived;
        if let Some((lat, lng)) = d.original {
            props.insert("_originalLat".into(), lat.into());
            props.insert("_originalLng".into(), lng.into());
        }
        if d.is_scattered {
            props.insert("_isScattered".into(), JsonValue::Bool(true));
            props.insert("_scatteredSpecies".into(), optional(&d.scattered_species));
            props.insert("_scatteredSubspecies".into(), optional(&d.scattered_subspecies));
        }
        if let Some(count) = d.aggregated_count {
            props.insert("_aggregatedCount".into(), count.into());
        }
        if let Some(unit) = d.aggregation_type {
            props.insert("_aggregationType".into(), JsonValue::String(unit.as_str().into()));
        }
        props
    }

    pub fn to_geojson(&self) -> geojson::Feature {
        geojson::Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![self.lng, self.lat]))),
            id: Some(geojson::feature::Id::String(self.record.id.clone())),
            properties: Some(self.properties()),
            foreign_members: None,
        }
    }
}

fn optional(value: &Option<String>) -> JsonValue {
    value.clone().map(JsonValue::String).unwrap_or(JsonValue::Null)
}

/// Ordered set of features to draw
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Total records represented, counting aggregates by their size
    pub fn record_count(&self) -> usize {
        self.features.iter().map(Feature::count).sum()
    }

    pub fn to_geojson(&self) -> GeoJson {
        GeoJson::FeatureCollection(geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(Feature::to_geojson).collect(),
            foreign_members: None,
        })
    }
}
