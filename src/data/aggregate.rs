use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::model::{
    Cell, DatasetSummary, Parameter, RawTable, SummaryId, SummaryStats, TypeDistribution,
    TYPE_COLUMN,
};
use crate::error::IngestError;

/// Label under which rows with an empty `Type` cell are counted, so that the
/// distribution always sums to the row count.
pub const UNSPECIFIED_TYPE: &str = "(unspecified)";

/// What to do with a numeric column that is present but holds no numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyColumnPolicy {
    /// Reject the upload with [`IngestError::EmptyColumn`].
    #[default]
    Reject,
    /// Accept the upload and mark the average unavailable.
    Unavailable,
}

// ---------------------------------------------------------------------------
// Pure reduction: table → stats
// ---------------------------------------------------------------------------

/// Reduce a table to its aggregate figures.
pub fn compute_stats(
    table: &RawTable,
    policy: EmptyColumnPolicy,
) -> Result<SummaryStats, IngestError> {
    let [avg_flowrate, avg_pressure, avg_temperature] =
        Parameter::ALL.map(|p| column_mean(table, p.column(), policy));

    Ok(SummaryStats {
        total_equipment: table.len(),
        avg_flowrate: avg_flowrate?,
        avg_pressure: avg_pressure?,
        avg_temperature: avg_temperature?,
        type_distribution: type_distribution(table),
    })
}

/// Arithmetic mean of the numeric cells of `column`, skipping text and missing cells.
///
/// Accumulated as a running mean so that large finite values cannot push an
/// intermediate sum to infinity.
fn column_mean(
    table: &RawTable,
    column: &str,
    policy: EmptyColumnPolicy,
) -> Result<Option<f64>, IngestError> {
    if !table.has_column(column) || table.is_empty() {
        return Ok(None);
    }

    let (mean, count) = table
        .column(column)
        .fold((0.0_f64, 0_usize), |(mean, count), cell| match cell {
            Cell::Number(v) => {
                let n = (count + 1) as f64;
                // v/n and mean/n each stay within half the f64 range for n >= 2.
                (mean + (v / n - mean / n), count + 1)
            }
            Cell::Text(_) | Cell::Missing => (mean, count),
        });

    if count == 0 {
        return match policy {
            EmptyColumnPolicy::Reject => Err(IngestError::EmptyColumn {
                column: column.to_string(),
            }),
            EmptyColumnPolicy::Unavailable => Ok(None),
        };
    }

    if !mean.is_finite() {
        return Err(IngestError::MalformedInput(format!(
            "column '{column}' has an average outside the representable range"
        )));
    }

    Ok(Some(mean))
}

fn type_distribution(table: &RawTable) -> TypeDistribution {
    if !table.has_column(TYPE_COLUMN) {
        return TypeDistribution::default();
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for cell in table.column(TYPE_COLUMN) {
        let label = cell
            .label()
            .unwrap_or_else(|| UNSPECIFIED_TYPE.to_string());
        *counts.entry(label).or_default() += 1;
    }
    TypeDistribution::from_counts(counts)
}

// ---------------------------------------------------------------------------
// Aggregator – attaches identity and timestamp
// ---------------------------------------------------------------------------

/// Turns parsed tables into [`DatasetSummary`] records with increasing ids.
///
/// Holds nothing but the id counter, so one instance can be shared across
/// threads summarizing independent uploads.
#[derive(Debug)]
pub struct Aggregator {
    next_id: AtomicU64,
    policy: EmptyColumnPolicy,
}

impl Aggregator {
    pub fn new(policy: EmptyColumnPolicy) -> Self {
        Self::starting_at(SummaryId(1), policy)
    }

    /// Continue an existing id sequence, e.g. after reloading persisted history.
    pub fn starting_at(first: SummaryId, policy: EmptyColumnPolicy) -> Self {
        Self {
            next_id: AtomicU64::new(first.0),
            policy,
        }
    }

    pub fn summarize(
        &self,
        table: &RawTable,
        filename: &str,
        now: DateTime<Utc>,
    ) -> Result<DatasetSummary, IngestError> {
        let stats = compute_stats(table, self.policy)?;
        // Ids are only consumed by successful summaries.
        let id = SummaryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Ok(DatasetSummary::new(id, filename, now, stats))
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(EmptyColumnPolicy::default())
    }
}
