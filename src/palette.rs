use crate::data::{valid, Record};
use crate::map::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Value -> color, sorted by value
pub type ColorMap = BTreeMap<String, String>;

/// Colors for sequencing status values
pub const STATUS_COLORS: &[(&str, &str)] = &[
    ("Sequenced", "#10b981"),
    ("Tissue Available", "#3b82f6"),
    ("Preserved Specimen", "#f59e0b"),
    ("Published", "#a855f7"),
    ("GBIF Record", "#6b7280"),
];

/// Colors for data sources
pub const SOURCE_COLORS: &[(&str, &str)] = &[
    ("Sanger Institute", "#3b82f6"),
    ("Dore et al. (2025)", "#10b981"),
    ("GBIF", "#f97316"),
];

/// Rotation for attributes without a curated palette
pub const DYNAMIC_PALETTE: [&str; 20] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4",
    "#42d4f4", "#f032e6", "#bfef45", "#fabed4", "#469990",
    "#dcbeff", "#9a6324", "#fffac8", "#800000", "#aaffc3",
    "#808000", "#ffd8b1", "#000075", "#a9a9a9", "#ffe119",
];

/// Attribute driving marker color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBy {
    Family,
    Tribe,
    Genus,
    #[default]
    ScientificName,
    Subspecies,
    MimicryRing,
    SequencingStatus,
    Source,
}

impl ColorBy {
    pub fn field<'a>(&self, r: &'a Record) -> &'a Option<String> {
        match self {
            ColorBy::Family => &r.family,
            ColorBy::Tribe => &r.tribe,
            ColorBy::Genus => &r.genus,
            ColorBy::ScientificName => &r.scientific_name,
            ColorBy::Subspecies => &r.subspecies,
            ColorBy::MimicryRing => &r.mimicry_ring,
            ColorBy::SequencingStatus => &r.sequencing_status,
            ColorBy::Source => &r.source,
        }
    }

    /// Curated palette, if this attribute has one
    pub fn fixed_palette(&self) -> Option<&'static [(&'static str, &'static str)]> {
        match self {
            ColorBy::SequencingStatus => Some(STATUS_COLORS),
            ColorBy::Source => Some(SOURCE_COLORS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorBy::Family => "family",
            ColorBy::Tribe => "tribe",
            ColorBy::Genus => "genus",
            ColorBy::ScientificName => "scientific_name",
            ColorBy::Subspecies => "subspecies",
            ColorBy::MimicryRing => "mimicry_ring",
            ColorBy::SequencingStatus => "sequencing_status",
            ColorBy::Source => "source",
        }
    }
}

impl FromStr for ColorBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "family" => Ok(ColorBy::Family),
            "tribe" => Ok(ColorBy::Tribe),
            "genus" => Ok(ColorBy::Genus),
            "scientific_name" | "species" => Ok(ColorBy::ScientificName),
            "subspecies" => Ok(ColorBy::Subspecies),
            "mimicry_ring" | "mimicry" => Ok(ColorBy::MimicryRing),
            "sequencing_status" | "status" => Ok(ColorBy::SequencingStatus),
            "source" => Ok(ColorBy::Source),
            other => Err(format!("unknown color attribute: {other}")),
        }
    }
}

impl fmt::Display for ColorBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-picked colors per attribute value.
/// Removing an override reverts the value to its generated color.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorOverrides {
    by_attribute: HashMap<ColorBy, BTreeMap<String, String>>,
}

impl ColorOverrides {
    pub fn get(&self, attr: ColorBy, value: &str) -> Option<&str> {
        self.by_attribute.get(&attr)?.get(value).map(String::as_str)
    }

    pub fn set(&mut self, attr: ColorBy, value: impl Into<String>, color: impl Into<String>) {
        self.by_attribute.entry(attr).or_default().insert(value.into(), color.into());
    }

    pub fn remove(&mut self, attr: ColorBy, value: &str) -> Option<String> {
        let values = self.by_attribute.get_mut(&attr)?;
        let removed = values.remove(value);
        if values.is_empty() {
            self.by_attribute.remove(&attr);
        }
        removed
    }

    pub fn clear(&mut self, attr: ColorBy) {
        self.by_attribute.remove(&attr);
    }

    pub fn is_empty(&self) -> bool {
        self.by_attribute.is_empty()
    }
}

/// Distinct valid values of `attr` among displayed features
pub fn displayed_values(fc: &FeatureCollection, attr: ColorBy) -> BTreeSet<&str> {
    fc.iter().filter_map(|f| valid(attr.field(&f.record))).collect()
}

/// Build the color map for the displayed collection.
///
/// Curated attributes keep only the palette entries present on the map
/// (the whole palette when none match). Other attributes take colors from
/// `DYNAMIC_PALETTE` by sorted index, so the same value set always yields
/// the same colors. Overrides win in both cases.
pub fn generate(fc: &FeatureCollection, attr: ColorBy, overrides: &ColorOverrides) -> ColorMap {
    let values = displayed_values(fc, attr);

    let mut colors: ColorMap = match attr.fixed_palette() {
        Some(palette) => {
            let present: ColorMap = palette
                .iter()
                .filter(|(value, _)| values.contains(value))
                .map(|(value, color)| (value.to_string(), color.to_string()))
                .collect();
            if present.is_empty() {
                palette
                    .iter()
                    .map(|(value, color)| (value.to_string(), color.to_string()))
                    .collect()
            } else {
                present
            }
        }
        None => values
            .iter()
            .enumerate()
            .map(|(i, value)| (value.to_string(), DYNAMIC_PALETTE[i % DYNAMIC_PALETTE.len()].to_string()))
            .collect(),
    };

    for (value, color) in colors.iter_mut() {
        if let Some(custom) = overrides.get(attr, value) {
            *color = custom.to_string();
        }
    }

    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sex;
    use crate::map::Feature;
    use std::sync::Arc;

    fn feature(ring: &str, status: &str) -> Feature {
        Feature::from_record(Arc::new(Record {
            id: format!("{ring}-{status}"),
            lat: 0.0,
            lng: 0.0,
            family: None,
            tribe: None,
            genus: None,
            scientific_name: None,
            subspecies: None,
            mimicry_ring: Some(ring.into()),
            sequencing_status: Some(status.into()),
            source: None,
            country: None,
            sex: Sex::Unknown,
            image_url: None,
            observation_date: None,
            date: None,
            extra: Default::default(),
        }))
    }

    fn collection(rings: &[&str]) -> FeatureCollection {
        FeatureCollection::new(rings.iter().map(|r| feature(r, "Sequenced")).collect())
    }

    #[test]
    fn test_dynamic_colors_independent_of_order() {
        let overrides = ColorOverrides::default();
        let a = generate(&collection(&["Tiger", "Hermias", "Mamercus"]), ColorBy::MimicryRing, &overrides);
        let b = generate(&collection(&["Mamercus", "Tiger", "Hermias", "Tiger"]), ColorBy::MimicryRing, &overrides);
        assert_eq!(a, b);
        assert_eq!(a["Hermias"], DYNAMIC_PALETTE[0]);
        assert_eq!(a["Tiger"], DYNAMIC_PALETTE[2]);
    }

    #[test]
    fn test_dynamic_palette_wraps() {
        let names: Vec<String> = (0..25).map(|i| format!("ring{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let map = generate(&collection(&refs), ColorBy::MimicryRing, &ColorOverrides::default());
        assert_eq!(map["ring20"], DYNAMIC_PALETTE[0]);
    }

    #[test]
    fn test_fixed_palette_filtered_to_present() {
        let fc = FeatureCollection::new(vec![feature("Tiger", "Published"), feature("Tiger", "Sequenced")]);
        let map = generate(&fc, ColorBy::SequencingStatus, &ColorOverrides::default());
        assert_eq!(map.len(), 2);
        assert_eq!(map["Published"], "#a855f7");
    }

    #[test]
    fn test_fixed_palette_falls_back_to_full() {
        let fc = FeatureCollection::new(vec![feature("Tiger", "Mystery")]);
        let map = generate(&fc, ColorBy::SequencingStatus, &ColorOverrides::default());
        assert_eq!(map.len(), STATUS_COLORS.len());
    }

    #[test]
    fn test_override_survives_regeneration() {
        let mut overrides = ColorOverrides::default();
        overrides.set(ColorBy::MimicryRing, "Tiger", "#123456");

        let first = generate(&collection(&["Tiger", "Hermias"]), ColorBy::MimicryRing, &overrides);
        let second = generate(&collection(&["Tiger", "Mamercus", "Eresimus"]), ColorBy::MimicryRing, &overrides);
        assert_eq!(first["Tiger"], "#123456");
        assert_eq!(second["Tiger"], "#123456");

        overrides.remove(ColorBy::MimicryRing, "Tiger");
        let third = generate(&collection(&["Tiger", "Hermias"]), ColorBy::MimicryRing, &overrides);
        assert_eq!(third["Tiger"], DYNAMIC_PALETTE[1]);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_invalid_values_get_no_color() {
        let map = generate(&collection(&["Unknown", "Tiger"]), ColorBy::MimicryRing, &ColorOverrides::default());
        assert_eq!(map.keys().collect::<Vec<_>>(), ["Tiger"]);
    }

    #[test]
    fn test_color_by_parse() {
        assert_eq!("mimicry".parse::<ColorBy>(), Ok(ColorBy::MimicryRing));
        assert_eq!(ColorBy::SequencingStatus.to_string(), "sequencing_status");
    }
}
