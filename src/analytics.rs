//! Presentation-oriented figures derived from a single [`DatasetSummary`].
//!
//! Every function here is pure: the same summary (and the same random
//! source state, where one is taken) always yields the same output, and
//! nothing touches the history.

use serde::Serialize;

use crate::data::model::{DatasetSummary, Parameter, SummaryId};
use crate::rng::RandomSource;

/// Reference operating point for flowrate, in L/min.
pub const BASELINE_FLOWRATE: f64 = 100.0;
/// Reference operating point for pressure, in atm.
pub const BASELINE_PRESSURE: f64 = 5.0;
/// Reference operating point for temperature, in K.
pub const BASELINE_TEMPERATURE: f64 = 300.0;

/// Span of the synthetic trend, in hours.
pub const TREND_HORIZON: f64 = 24.0;
/// Amplitude of the sinusoidal trend component.
pub const TREND_AMPLITUDE: f64 = 10.0;

/// Half-width of the scatter jitter around the mean flowrate.
pub const SCATTER_FLOWRATE_SPREAD: f64 = 15.0;
/// Half-width of the scatter jitter around the mean pressure.
pub const SCATTER_PRESSURE_SPREAD: f64 = 2.0;
/// Upper bound on scatter points, whatever the equipment count.
pub const MAX_SCATTER_POINTS: usize = 500;

// ---------------------------------------------------------------------------
// Health index
// ---------------------------------------------------------------------------

/// Reference operating points the health index measures deviation from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baselines {
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl Default for Baselines {
    fn default() -> Self {
        Self {
            flowrate: BASELINE_FLOWRATE,
            pressure: BASELINE_PRESSURE,
            temperature: BASELINE_TEMPERATURE,
        }
    }
}

/// Health score in `[0, 100]` against the default baselines.
///
/// `None` when any of the three averages is unavailable.
pub fn health_index(summary: &DatasetSummary) -> Option<f64> {
    health_index_with(summary, &Baselines::default())
}

/// Health score in `[0, 100]`:
/// `100 − |flow−b_f|/10 − |pressure−b_p|×5 − |temp−b_t|/5`, clamped.
pub fn health_index_with(summary: &DatasetSummary, baselines: &Baselines) -> Option<f64> {
    let flow = summary.avg_flowrate()?;
    let pressure = summary.avg_pressure()?;
    let temp = summary.avg_temperature()?;

    let score = 100.0
        - (flow - baselines.flowrate).abs() / 10.0
        - (pressure - baselines.pressure).abs() * 5.0
        - (temp - baselines.temperature).abs() / 5.0;

    Some(score.clamp(0.0, 100.0))
}

// ---------------------------------------------------------------------------
// Correlation matrix
// ---------------------------------------------------------------------------

/// Pairwise similarity of the three parameter means.
///
/// This is a heuristic closeness score between two averages, NOT a Pearson
/// correlation: a single summary carries no per-row variance to correlate.
/// Use it for a heatmap, not for statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub parameters: [Parameter; 3],
    /// `values[i][j]` compares `parameters[i]` with `parameters[j]`.
    /// Off-diagonal cells are `None` when either mean is unavailable.
    pub values: [[Option<f64>; 3]; 3],
}

impl CorrelationMatrix {
    pub fn get(&self, row: Parameter, col: Parameter) -> Option<f64> {
        let i = self.parameters.iter().position(|p| *p == row)?;
        let j = self.parameters.iter().position(|p| *p == col)?;
        self.values[i][j]
    }
}

/// `clamp(1 − |a−b| / max(|a|, |b|, 1) × 0.5, 0, 1)`
///
/// Non-finite inputs score 0.
pub fn similarity(a: f64, b: f64) -> f64 {
    if !(a.is_finite() && b.is_finite()) {
        return 0.0;
    }
    let scale = a.abs().max(b.abs()).max(1.0);
    // Divide before subtracting so opposite-signed extremes cannot overflow.
    (1.0 - (a / scale - b / scale).abs() * 0.5).clamp(0.0, 1.0)
}

pub fn correlation_matrix(summary: &DatasetSummary) -> CorrelationMatrix {
    let parameters = Parameter::ALL;
    let mut values = [[None; 3]; 3];

    for (i, row) in parameters.iter().enumerate() {
        for (j, col) in parameters.iter().enumerate() {
            values[i][j] = if i == j {
                Some(1.0)
            } else {
                match (summary.average(*row), summary.average(*col)) {
                    (Some(a), Some(b)) => Some(similarity(a, b)),
                    _ => None,
                }
            };
        }
    }

    CorrelationMatrix { parameters, values }
}

// ---------------------------------------------------------------------------
// Trend series
// ---------------------------------------------------------------------------

/// Bounded random noise to add on top of a synthetic curve.
pub struct Jitter<'a> {
    pub source: &'a mut dyn RandomSource,
    /// Each sample moves by at most this much in either direction.
    pub amplitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub offset: f64,
    pub value: f64,
}

/// Synthetic temperature curve `avg_temperature + 10·sin(t/4)` sampled at
/// `points` evenly spaced offsets `t = i·24/points`.
///
/// Empty when `points` is zero or the mean temperature is unavailable.
pub fn trend_series(
    summary: &DatasetSummary,
    points: usize,
    mut jitter: Option<Jitter<'_>>,
) -> Vec<TrendPoint> {
    let Some(base) = summary.avg_temperature() else {
        return Vec::new();
    };
    if points == 0 {
        return Vec::new();
    }

    let step = TREND_HORIZON / points as f64;
    (0..points)
        .map(|i| {
            let offset = i as f64 * step;
            let noise = jitter
                .as_mut()
                .map(|j| j.source.jitter(j.amplitude))
                .unwrap_or(0.0);
            TrendPoint {
                offset,
                value: base + TREND_AMPLITUDE * (offset / 4.0).sin() + noise,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Flowrate vs pressure scatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub flowrate: f64,
    pub pressure: f64,
}

/// Illustrative flowrate/pressure cloud: one point per equipment (capped at
/// [`MAX_SCATTER_POINTS`]) scattered uniformly around the two means.
pub fn scatter_sample(
    summary: &DatasetSummary,
    source: &mut dyn RandomSource,
) -> Vec<ScatterPoint> {
    let (Some(flow), Some(pressure)) = (summary.avg_flowrate(), summary.avg_pressure()) else {
        return Vec::new();
    };

    (0..summary.total_equipment().min(MAX_SCATTER_POINTS))
        .map(|_| ScatterPoint {
            flowrate: flow + source.jitter(SCATTER_FLOWRATE_SPREAD),
            pressure: pressure + source.jitter(SCATTER_PRESSURE_SPREAD),
        })
        .collect()
}

/// Least-squares line `pressure = slope · flowrate + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, flowrate: f64) -> f64 {
        self.slope * flowrate + self.intercept
    }
}

/// Ordinary least-squares fit of pressure against flowrate.
///
/// `None` with fewer than two points or when every flowrate is the same.
pub fn linear_fit(points: &[ScatterPoint]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.flowrate).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.pressure).sum::<f64>() / n;

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.flowrate - mean_x;
        (sxx + dx * dx, sxy + dx * (p.pressure - mean_y))
    });

    if !(sxx.is_normal() && sxy.is_finite()) {
        return None;
    }

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

// ---------------------------------------------------------------------------
// Combined report
// ---------------------------------------------------------------------------

/// Everything the presentation layer shows for one retained dataset.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub summary_id: SummaryId,
    pub health_index: Option<f64>,
    pub correlation: CorrelationMatrix,
    pub trend: Vec<TrendPoint>,
    pub scatter: Vec<ScatterPoint>,
    /// Trend line through `scatter`.
    pub scatter_fit: Option<LinearFit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{SummaryStats, TypeDistribution};
    use crate::rng::SimpleRng;
    use chrono::Utc;

    /// Replays a fixed list of values, cycling when exhausted.
    struct Scripted {
        values: Vec<f64>,
        pos: usize,
    }

    impl RandomSource for Scripted {
        fn next_f64(&mut self) -> f64 {
            let v = self.values[self.pos % self.values.len()];
            self.pos += 1;
            v
        }
    }

    fn summary(flow: Option<f64>, pressure: Option<f64>, temp: Option<f64>) -> DatasetSummary {
        DatasetSummary::new(
            SummaryId(1),
            "test.csv",
            Utc::now(),
            SummaryStats {
                total_equipment: 4,
                avg_flowrate: flow,
                avg_pressure: pressure,
                avg_temperature: temp,
                type_distribution: TypeDistribution::default(),
            },
        )
    }

    #[test]
    fn test_health_at_baseline_is_exactly_100() {
        let s = summary(Some(100.0), Some(5.0), Some(300.0));
        assert_eq!(health_index(&s), Some(100.0));
    }

    #[test]
    fn test_health_penalties() {
        // 100 - 20/10 - 1*5 - 10/5 = 91
        let s = summary(Some(120.0), Some(6.0), Some(290.0));
        assert_eq!(health_index(&s), Some(91.0));
    }

    #[test]
    fn test_health_is_clamped() {
        let s = summary(Some(5000.0), Some(80.0), Some(2000.0));
        assert_eq!(health_index(&s), Some(0.0));
    }

    #[test]
    fn test_health_unavailable_metric() {
        let s = summary(Some(100.0), None, Some(300.0));
        assert_eq!(health_index(&s), None);
    }

    #[test]
    fn test_health_custom_baselines() {
        let s = summary(Some(50.0), Some(2.0), Some(350.0));
        let baselines = Baselines {
            flowrate: 50.0,
            pressure: 2.0,
            temperature: 350.0,
        };
        assert_eq!(health_index_with(&s, &baselines), Some(100.0));
    }

    #[test]
    fn test_health_and_correlation_are_repeatable() {
        let s = summary(Some(110.0), Some(5.25), Some(305.0));
        assert_eq!(
            health_index(&s).map(f64::to_bits),
            health_index(&s).map(f64::to_bits)
        );
        assert_eq!(correlation_matrix(&s), correlation_matrix(&s));
    }

    #[test]
    fn test_similarity_formula() {
        assert_eq!(similarity(5.0, 5.0), 1.0);
        // 1 - 100/200 * 0.5
        assert_eq!(similarity(100.0, 200.0), 0.75);
        // scale floors at 1
        assert_eq!(similarity(0.0, 0.5), 0.75);
        assert_eq!(similarity(-10.0, 10.0), 0.0);
    }

    #[test]
    fn test_correlation_matrix_shape() {
        let s = summary(Some(100.0), Some(5.0), Some(300.0));
        let m = correlation_matrix(&s);
        for i in 0..3 {
            assert_eq!(m.values[i][i], Some(1.0));
            for j in 0..3 {
                let v = m.values[i][j].unwrap();
                assert!((0.0..=1.0).contains(&v));
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
        assert_eq!(
            m.get(Parameter::Flowrate, Parameter::Temperature),
            Some(similarity(100.0, 300.0))
        );
    }

    #[test]
    fn test_correlation_with_unavailable_mean() {
        let s = summary(Some(100.0), None, Some(300.0));
        let m = correlation_matrix(&s);
        assert_eq!(m.get(Parameter::Pressure, Parameter::Pressure), Some(1.0));
        assert_eq!(m.get(Parameter::Flowrate, Parameter::Pressure), None);
        assert!(m.get(Parameter::Flowrate, Parameter::Temperature).is_some());
    }

    #[test]
    fn test_trend_without_jitter() {
        let s = summary(Some(100.0), Some(5.0), Some(300.0));
        let trend = trend_series(&s, 12, None);
        assert_eq!(trend.len(), 12);
        let offsets: Vec<f64> = trend.iter().map(|p| p.offset).collect();
        assert_eq!(
            offsets,
            vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0]
        );
        assert_eq!(trend[0].value, 300.0);
        assert_eq!(trend[2].value, 300.0 + 10.0 * 1.0_f64.sin());
    }

    #[test]
    fn test_trend_with_scripted_jitter() {
        let s = summary(None, None, Some(300.0));
        let mut source = Scripted {
            values: vec![1.0, 0.0, 0.5],
            pos: 0,
        };
        let trend = trend_series(
            &s,
            3,
            Some(Jitter {
                source: &mut source,
                amplitude: 3.0,
            }),
        );
        assert_eq!(trend[0].value, 303.0);
        assert_eq!(trend[1].value, 300.0 + 10.0 * 2.0_f64.sin() - 3.0);
        assert_eq!(trend[2].value, 300.0 + 10.0 * 4.0_f64.sin());
    }

    #[test]
    fn test_trend_with_seeded_rng_is_reproducible() {
        let s = summary(None, None, Some(300.0));
        let run = |seed| {
            let mut rng = SimpleRng::new(seed);
            trend_series(
                &s,
                8,
                Some(Jitter {
                    source: &mut rng,
                    amplitude: 3.0,
                }),
            )
        };
        let a = run(9);
        assert_eq!(a, run(9));
        let clean = trend_series(&s, 8, None);
        for (noisy, base) in a.iter().zip(&clean) {
            assert!((noisy.value - base.value).abs() <= 3.0 + 1e-9);
        }
    }

    #[test]
    fn test_trend_edge_cases() {
        let s = summary(None, None, None);
        assert!(trend_series(&s, 12, None).is_empty());
        let s = summary(None, None, Some(1.0));
        assert!(trend_series(&s, 0, None).is_empty());
    }

    #[test]
    fn test_scatter_sample_bounds() {
        let s = summary(Some(100.0), Some(5.0), None);
        let mut rng = SimpleRng::new(1);
        let points = scatter_sample(&s, &mut rng);
        assert_eq!(points.len(), 4);
        for p in points {
            assert!((85.0..115.0).contains(&p.flowrate));
            assert!((3.0..7.0).contains(&p.pressure));
        }
        let missing = summary(None, Some(5.0), None);
        assert!(scatter_sample(&missing, &mut rng).is_empty());
    }

    #[test]
    fn test_similarity_of_extreme_means_stays_in_range() {
        assert_eq!(similarity(1e308, 1e308), 1.0);
        assert_eq!(similarity(-1.7e308, 1.7e308), 0.0);
        assert_eq!(similarity(f64::INFINITY, 1.0), 0.0);
        assert_eq!(similarity(f64::NAN, 1.0), 0.0);

        let s = summary(Some(1e308), Some(5.0), Some(-1e308));
        let m = correlation_matrix(&s);
        for row in m.values {
            for v in row {
                assert!(v.is_some_and(|v| (0.0..=1.0).contains(&v)));
            }
        }
    }

    #[test]
    fn test_linear_fit_recovers_exact_line() {
        let points: Vec<ScatterPoint> = [80.0, 90.0, 100.0, 110.0]
            .into_iter()
            .map(|flowrate| ScatterPoint {
                flowrate,
                pressure: 0.05 * flowrate + 1.0,
            })
            .collect();
        let fit = linear_fit(&points).unwrap();
        assert!((fit.slope - 0.05).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.at(120.0) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_fit_minimises_residuals() {
        // y = x with the middle point lifted by 3: slope 1, intercept 1.
        let points = [
            ScatterPoint { flowrate: 0.0, pressure: 0.0 },
            ScatterPoint { flowrate: 1.0, pressure: 4.0 },
            ScatterPoint { flowrate: 2.0, pressure: 2.0 },
        ];
        let fit = linear_fit(&points).unwrap();
        assert!((fit.slope - 1.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linear_fit_degenerate_inputs() {
        assert_eq!(linear_fit(&[]), None);
        let one = [ScatterPoint { flowrate: 1.0, pressure: 2.0 }];
        assert_eq!(linear_fit(&one), None);
        let vertical = [
            ScatterPoint { flowrate: 3.0, pressure: 1.0 },
            ScatterPoint { flowrate: 3.0, pressure: 9.0 },
        ];
        assert_eq!(linear_fit(&vertical), None);
    }
}
