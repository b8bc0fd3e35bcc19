use std::fmt;

use crate::analytics::AnalyticsReport;
use crate::data::model::{DatasetSummary, Parameter};

// ---------------------------------------------------------------------------
// Plain-text views for terminal output
// ---------------------------------------------------------------------------

/// Format an average with its unit, `n/a` when unavailable.
pub fn format_metric(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.2} {unit}"),
        None => "n/a".to_string(),
    }
}

/// Summary statistics of one dataset.
pub struct SummaryCard<'a>(pub &'a DatasetSummary);

impl fmt::Display for SummaryCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(f, "Dataset #{}  {}", s.id(), s.filename())?;
        writeln!(f, "  uploaded     {}", s.uploaded_at().format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f, "  equipment    {} units", s.total_equipment())?;
        for p in Parameter::ALL {
            writeln!(
                f,
                "  {:<12} {}",
                p.column().to_lowercase(),
                format_metric(s.average(p), p.unit())
            )?;
        }
        if s.type_distribution().is_empty() {
            writeln!(f, "  types        (no Type column)")?;
        } else {
            writeln!(f, "  types")?;
            for (label, count) in s.type_distribution().iter() {
                writeln!(f, "    {label:<20} {count}")?;
            }
        }
        Ok(())
    }
}

/// One line per retained dataset, newest first.
pub struct HistoryList<'a>(pub &'a [DatasetSummary]);

impl fmt::Display for HistoryList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No upload history available yet");
        }
        for s in self.0 {
            writeln!(
                f,
                "#{:<4} {:<32} {}  {} units",
                s.id(),
                s.filename(),
                s.uploaded_at().format("%Y-%m-%d %H:%M:%S"),
                s.total_equipment()
            )?;
        }
        Ok(())
    }
}

/// Health, similarity heatmap and trend of one dataset.
pub struct AnalyticsView<'a>(pub &'a AnalyticsReport);

impl fmt::Display for AnalyticsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        match r.health_index {
            Some(h) => writeln!(f, "Health index: {h:.1}%")?,
            None => writeln!(f, "Health index: n/a")?,
        }

        writeln!(f)?;
        writeln!(f, "Parameter similarity (heuristic, not Pearson)")?;
        write!(f, "{:<12}", "")?;
        for p in &r.correlation.parameters {
            write!(f, "{:>12}", p.column())?;
        }
        writeln!(f)?;
        for (p, row) in r.correlation.parameters.iter().zip(&r.correlation.values) {
            write!(f, "{:<12}", p.column())?;
            for cell in row {
                match cell {
                    Some(v) => write!(f, "{v:>12.2}")?,
                    None => write!(f, "{:>12}", "n/a")?,
                }
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        if r.trend.is_empty() {
            writeln!(f, "Temperature trend: n/a")?;
        } else {
            writeln!(f, "Temperature trend")?;
            for point in &r.trend {
                writeln!(f, "  t={:>5.1}h  {:>8.2} K", point.offset, point.value)?;
            }
        }

        writeln!(f)?;
        match r.scatter_fit {
            Some(fit) => writeln!(
                f,
                "Flowrate vs pressure: {} points, pressure = {:.4} x flowrate {} {:.4}",
                r.scatter.len(),
                fit.slope,
                if fit.intercept < 0.0 { '-' } else { '+' },
                fit.intercept.abs()
            )?,
            None => writeln!(f, "Flowrate vs pressure: n/a")?,
        }
        Ok(())
    }
}
