use crate::data::date::parse_observation_date;
use crate::geo::is_valid_position;
use chrono::NaiveDate;
use geojson::JsonObject;
use serde_json::Value;

/// Placeholder strings that mean "no value" in the source sheets
const INVALID_VALUES: [&str; 7] = ["unknown", "na", "n/a", "nan", "null", "none", "undefined"];

/// Date fields in priority order
const DATE_FIELDS: [&str; 4] = ["observation_date", "date", "preservation_date", "collection_date"];

/// Fields mapped onto typed `Record` members (everything else is passed through)
const KNOWN_FIELDS: [&str; 15] = [
    "id",
    "lat",
    "lng",
    "family",
    "tribe",
    "genus",
    "scientific_name",
    "subspecies",
    "mimicry_ring",
    "sequencing_status",
    "source",
    "country",
    "sex",
    "image_url",
    "observation_date",
];

/// Whether a categorical field carries a usable value
#[inline]
pub fn is_valid_value(value: Option<&str>) -> bool {
    match value {
        Some(v) => {
            let v = v.trim();
            !v.is_empty() && !INVALID_VALUES.iter().any(|bad| v.eq_ignore_ascii_case(bad))
        }
        None => false,
    }
}

/// Return the field only when it is valid
#[inline]
pub fn valid(value: &Option<String>) -> Option<&str> {
    let v = value.as_deref();
    if is_valid_value(v) {
        v
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Sex::Male,
            "female" | "f" => Sex::Female,
            _ => Sex::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Unknown => "unknown",
        }
    }
}

/// One specimen observation. Never mutated after load.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub family: Option<String>,
    pub tribe: Option<String>,
    pub genus: Option<String>,
    pub scientific_name: Option<String>,
    pub subspecies: Option<String>,
    pub mimicry_ring: Option<String>,
    pub sequencing_status: Option<String>,
    pub source: Option<String>,
    pub country: Option<String>,
    pub sex: Sex,
    pub image_url: Option<String>,
    /// Raw date string as found in the input
    pub observation_date: Option<String>,
    /// Parsed date, `None` when missing or unparseable
    pub date: Option<NaiveDate>,
    /// Fields not mapped above, re-emitted untouched
    pub extra: JsonObject,
}

impl Record {
    /// Build a record from a loose JSON object.
    /// Returns `None` when the object has no usable coordinates.
    pub fn from_json(mut obj: JsonObject) -> Option<Self> {
        let lat = number_field(obj.get("lat"))?;
        let lng = number_field(obj.get("lng"))?;
        if !is_valid_position(lat, lng) {
            return None;
        }

        let observation_date = DATE_FIELDS
            .iter()
            .find_map(|key| string_field(obj.get(*key)).filter(|s| is_valid_value(Some(s.as_str()))));
        let date = observation_date.as_deref().and_then(parse_observation_date);

        let record = Self {
            id: id_field(obj.get("id")),
            lat,
            lng,
            family: string_field(obj.get("family")),
            tribe: string_field(obj.get("tribe")),
            genus: string_field(obj.get("genus")),
            scientific_name: string_field(obj.get("scientific_name")),
            subspecies: string_field(obj.get("subspecies")),
            mimicry_ring: string_field(obj.get("mimicry_ring")),
            sequencing_status: string_field(obj.get("sequencing_status")),
            source: string_field(obj.get("source")),
            country: string_field(obj.get("country")),
            sex: string_field(obj.get("sex"))
                .map(|s| Sex::parse(&s))
                .unwrap_or(Sex::Unknown),
            image_url: string_field(obj.get("image_url")),
            observation_date,
            date,
            extra: JsonObject::new(),
        };

        for key in KNOWN_FIELDS.iter().chain(DATE_FIELDS.iter()) {
            obj.remove(*key);
        }

        Some(Self { extra: obj, ..record })
    }

    /// Has a usable photo link
    pub fn has_photo(&self) -> bool {
        valid(&self.image_url).is_some()
    }

    /// Project the record into GeoJSON properties
    pub fn to_properties(&self) -> JsonObject {
        let mut props = self.extra.clone();
        props.insert("id".into(), Value::String(self.id.clone()));
        props.insert("lat".into(), self.lat.into());
        props.insert("lng".into(), self.lng.into());
        for (key, value) in [
            ("family", &self.family),
            ("tribe", &self.tribe),
            ("genus", &self.genus),
            ("scientific_name", &self.scientific_name),
            ("subspecies", &self.subspecies),
            ("mimicry_ring", &self.mimicry_ring),
            ("sequencing_status", &self.sequencing_status),
            ("source", &self.source),
            ("country", &self.country),
            ("image_url", &self.image_url),
            ("observation_date", &self.observation_date),
        ] {
            props.insert(key.into(), value.clone().map(Value::String).unwrap_or(Value::Null));
        }
        props.insert("sex".into(), Value::String(self.sex.as_str().into()));
        props
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn id_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number_field(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}
