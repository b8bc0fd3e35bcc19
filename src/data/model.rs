use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Column names recognised in uploaded tables
// ---------------------------------------------------------------------------

pub const FLOWRATE_COLUMN: &str = "Flowrate";
pub const PRESSURE_COLUMN: &str = "Pressure";
pub const TEMPERATURE_COLUMN: &str = "Temperature";
pub const TYPE_COLUMN: &str = "Type";

// ---------------------------------------------------------------------------
// Cell – a single value in an uploaded table
// ---------------------------------------------------------------------------

/// One cell of an uploaded table, typed on a best-effort basis at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Classify raw cell text. Empty cells are `Missing`, anything that
    /// parses as a finite float is a `Number`, the rest stays `Text`.
    pub fn guess(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(raw.to_string()),
        }
    }

    /// Numeric view of the cell, `None` for text and missing cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(_) | Cell::Missing => None,
        }
    }

    /// Categorical label of the cell, `None` when missing.
    pub fn label(&self) -> Option<String> {
        match self {
            Cell::Number(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Missing => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Missing => write!(f, "<missing>"),
        }
    }
}

// ---------------------------------------------------------------------------
// RawTable – the parsed upload, before aggregation
// ---------------------------------------------------------------------------

static MISSING: Cell = Cell::Missing;

/// One data row: column name → cell. Columns a short row does not reach are absent.
pub type Row = BTreeMap<String, Cell>;

/// Column-named rows of an uploaded file. Lives only for the duration of an ingestion.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Header names in file order.
    pub columns: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<Row>,
}

impl RawTable {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Iterate over a column's cells, yielding `Missing` for rows that lack it.
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(name).unwrap_or(&MISSING))
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parameter – the three averaged operating parameters
// ---------------------------------------------------------------------------

/// Numeric operating parameters tracked per dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Parameter {
    Flowrate,
    Pressure,
    Temperature,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [
        Parameter::Flowrate,
        Parameter::Pressure,
        Parameter::Temperature,
    ];

    /// Header name of the column carrying this parameter.
    pub fn column(self) -> &'static str {
        match self {
            Parameter::Flowrate => FLOWRATE_COLUMN,
            Parameter::Pressure => PRESSURE_COLUMN,
            Parameter::Temperature => TEMPERATURE_COLUMN,
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Parameter::Flowrate => "L/min",
            Parameter::Pressure => "atm",
            Parameter::Temperature => "K",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// TypeDistribution – equipment count per category label
// ---------------------------------------------------------------------------

/// Label → count, kept sorted by count descending then label ascending so
/// that listings and serialized output are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDistribution {
    entries: Vec<(String, usize)>,
}

impl TypeDistribution {
    /// Build from unordered counts.
    pub fn from_counts(counts: impl IntoIterator<Item = (String, usize)>) -> Self {
        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|(la, ca), (lb, cb)| cb.cmp(ca).then_with(|| la.cmp(lb)));
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TypeDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, count) in &self.entries {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TypeDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let counts = BTreeMap::<String, usize>::deserialize(deserializer)?;
        Ok(Self::from_counts(counts))
    }
}

// ---------------------------------------------------------------------------
// DatasetSummary – the retained record of one upload
// ---------------------------------------------------------------------------

/// Identifier assigned to a summary when it is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SummaryId(pub u64);

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregate figures computed from a table, before an identity is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_equipment: usize,
    /// `None` means no data for the parameter, never a measured zero.
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub type_distribution: TypeDistribution,
}

/// Summary of one uploaded dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    id: SummaryId,
    filename: String,
    uploaded_at: DateTime<Utc>,
    total_equipment: usize,
    avg_flowrate: Option<f64>,
    avg_pressure: Option<f64>,
    avg_temperature: Option<f64>,
    type_distribution: TypeDistribution,
}

impl DatasetSummary {
    pub fn new(
        id: SummaryId,
        filename: impl Into<String>,
        uploaded_at: DateTime<Utc>,
        stats: SummaryStats,
    ) -> Self {
        Self {
            id,
            filename: filename.into(),
            uploaded_at,
            total_equipment: stats.total_equipment,
            avg_flowrate: stats.avg_flowrate,
            avg_pressure: stats.avg_pressure,
            avg_temperature: stats.avg_temperature,
            type_distribution: stats.type_distribution,
        }
    }

    pub fn id(&self) -> SummaryId {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    pub fn total_equipment(&self) -> usize {
        self.total_equipment
    }

    pub fn avg_flowrate(&self) -> Option<f64> {
        self.avg_flowrate
    }

    pub fn avg_pressure(&self) -> Option<f64> {
        self.avg_pressure
    }

    pub fn avg_temperature(&self) -> Option<f64> {
        self.avg_temperature
    }

    /// Mean of the given parameter, `None` when unavailable.
    pub fn average(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Flowrate => self.avg_flowrate,
            Parameter::Pressure => self.avg_pressure,
            Parameter::Temperature => self.avg_temperature,
        }
    }

    pub fn type_distribution(&self) -> &TypeDistribution {
        &self.type_distribution
    }

    /// Ordering key used by the history: upload time, then creation order.
    pub fn history_key(&self) -> (DateTime<Utc>, SummaryId) {
        (self.uploaded_at, self.id)
    }
}
