use std::{collections::HashMap, path::Path};

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use crate::{
    error::{CalendarResult, DataError, IoError},
    event::{CanonicalEvent, Category, Color},
};

/// Known event names and their ids, written into the `volume` column.
const DEFAULT_NAME_IDS: [(&str, u32); 8] = [
    ("Labor Day", 1),
    ("Thanksgiving", 2),
    ("Thanksgiving (Early Close)", 3),
    ("Christmas", 4),
    ("Christmas (Early Close)", 5),
    ("Monthly Expiration", 6),
    ("Quarterly Expiration", 7),
    ("User Event", 8),
];

const DEFAULT_COLOR_IDS: [(&str, u32); 5] = [
    ("#ffd700", 1),
    ("#ffa500", 2),
    ("#ff4d4f", 3),
    ("#ff85c0", 4),
    ("#8a2be2", 5),
];

// ================================================================================================
// Lookup Tables
// ================================================================================================

/// Lookup tables backing the numeric encoding.
///
/// Built once per run and handed to the [`Encoder`]; tests may substitute
/// their own tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingTables {
    category_colors: HashMap<Category, Color>,
    color_ids: HashMap<Color, u32>,
    name_ids: HashMap<String, u32>,
}

impl Default for EncodingTables {
    fn default() -> Self {
        let category_colors = Category::KNOWN
            .into_iter()
            .filter_map(|c| c.default_color().map(|color| (c, color)))
            .collect();
        let color_ids = DEFAULT_COLOR_IDS
            .into_iter()
            .map(|(hex, id)| (Color::from(hex), id))
            .collect();
        let name_ids = DEFAULT_NAME_IDS
            .into_iter()
            .map(|(name, id)| (name.to_string(), id))
            .collect();

        Self::new(category_colors, color_ids, name_ids)
    }
}

impl EncodingTables {
    pub fn new(
        category_colors: HashMap<Category, Color>,
        color_ids: HashMap<Color, u32>,
        name_ids: HashMap<String, u32>,
    ) -> Self {
        Self {
            category_colors,
            color_ids,
            name_ids,
        }
    }

    /// Adds or overrides name ids from a JSON object file (`{"Juneteenth": 9}`).
    pub fn with_names(mut self, path: impl AsRef<Path>) -> CalendarResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| IoError::ReadFailed(format!("{}: {e}", path.display())))?;
        let extra: HashMap<String, u32> = serde_json::from_str(&raw).map_err(DataError::from)?;
        self.name_ids.extend(extra);
        Ok(self)
    }

    pub fn color_of(&self, category: &Category) -> Option<&Color> {
        self.category_colors.get(category)
    }

    /// `0` if the category has no color or the color has no id.
    pub fn color_id(&self, category: &Category) -> u32 {
        self.color_of(category)
            .and_then(|color| self.color_ids.get(color))
            .copied()
            .unwrap_or(0)
    }

    /// `0` unless `details` matches a known name exactly.
    pub fn name_id(&self, details: &str) -> u32 {
        self.name_ids.get(details).copied().unwrap_or(0)
    }

    pub fn name_for_id(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.name_ids
            .iter()
            .filter(|(_, v)| **v == id)
            .map(|(k, _)| k.as_str())
            // Deterministic pick if a custom table reuses an id.
            .min()
    }
}

// ================================================================================================
// Records
// ================================================================================================

/// An event packed into an OHLCV-shaped row.
///
/// | column | meaning                                |
/// |--------|----------------------------------------|
/// | open   | `year * 10000 + month * 100 + day`     |
/// | high   | always `0`                             |
/// | low    | category type code                     |
/// | close  | id of the category's color             |
/// | volume | id of the exact event name             |
///
/// Serializes with one decimal per number (`20251225.0`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodedRecord {
    pub timestamp: String,
    #[serde(serialize_with = "one_decimal")]
    pub open: f64,
    #[serde(serialize_with = "one_decimal")]
    pub high: f64,
    #[serde(serialize_with = "one_decimal")]
    pub low: f64,
    #[serde(serialize_with = "one_decimal")]
    pub close: f64,
    #[serde(serialize_with = "one_decimal")]
    pub volume: f64,
}

fn one_decimal<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{value:.1}"))
}

/// Best-effort reading of an [`EncodedRecord`]; `None` where the encoding lost information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub date: Option<NaiveDate>,
    pub category: Option<Category>,
    pub details: Option<String>,
}

// ================================================================================================
// Encoder
// ================================================================================================

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    tables: EncodingTables,
}

impl Encoder {
    pub fn new(tables: EncodingTables) -> Self {
        Self { tables }
    }

    pub fn encode(&self, event: &CanonicalEvent) -> EncodedRecord {
        let packed_date =
            event.date.year() * 10_000 + event.date.month() as i32 * 100 + event.date.day() as i32;

        EncodedRecord {
            timestamp: event.date_string(),
            open: f64::from(packed_date),
            high: 0.0,
            low: f64::from(event.category.type_code()),
            close: f64::from(self.tables.color_id(&event.category)),
            volume: f64::from(self.tables.name_id(&event.details)),
        }
    }

    pub fn encode_all(&self, events: &[CanonicalEvent]) -> Vec<EncodedRecord> {
        events.iter().map(|e| self.encode(e)).collect()
    }

    pub fn decode(&self, record: &EncodedRecord) -> DecodedRecord {
        let packed = record.open as i64;
        let date = NaiveDate::from_ymd_opt(
            (packed / 10_000) as i32,
            ((packed / 100) % 100) as u32,
            (packed % 100) as u32,
        );

        DecodedRecord {
            date,
            category: Category::from_type_code(record.low as u32),
            details: self
                .tables
                .name_for_id(record.volume as u32)
                .map(str::to_string),
        }
    }
}
