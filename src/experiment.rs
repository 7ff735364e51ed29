//! One-shot pipeline runs and their log records.
//!
//! A run ranks endpoints, generates candidates, optionally filters them, and searches. The
//! result is an [`ExperimentRecord`] holding every column of the tab-separated experiment log.
//! Writing the log, and skipping runs whose [`ExperimentKey`] is already present, is left to
//! the caller.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::{
    Budget, CandidateSet, EngineConfig, IntervalRule, Predicate, Result, WeightFunction,
    filter_candidates, find_minimizer_with_budget, find_representative_with_budget,
    generate_candidates, rank_endpoints_for,
};

/// How the candidate set was narrowed or weighted for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Filtering {
    /// Plain minimax over every candidate.
    Off,
    /// Minimax over candidates accepted by a predicate.
    Predicate,
    /// Weighted representative instead of a minimum.
    Weighted,
}

impl fmt::Display for Filtering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "False",
            Self::Predicate => "True",
            Self::Weighted => "Weighted",
        })
    }
}

/// Leading log columns that identify a run: `(N, K, rule, alpha, condition)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentKey {
    pub n: u64,
    pub k: usize,
    pub rule: String,
    pub alpha: f64,
    /// Predicate or weight-function name; empty for an unfiltered run.
    pub condition: String,
}

impl ExperimentKey {
    pub fn new<R>(n: u64, k: usize, rule: &R, condition: impl Into<String>) -> Self
    where
        R: IntervalRule + ?Sized,
    {
        Self {
            n,
            k,
            rule: rule.name().to_string(),
            alpha: rule.alpha(),
            condition: condition.into(),
        }
    }

    pub fn columns(&self) -> [String; 5] {
        [
            self.n.to_string(),
            self.k.to_string(),
            self.rule.clone(),
            self.alpha.to_string(),
            self.condition.clone(),
        ]
    }

    /// Tab-joined key columns plus a trailing tab; an existing log line starting with this
    /// is the same run.
    pub fn prefix(&self) -> String {
        let mut s = self.columns().join("\t");
        s.push('\t');
        s
    }
}

/// One log row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentRecord {
    pub key: ExperimentKey,
    pub filtering: Filtering,
    /// Minimax coverage, or the skewed average for weighted runs.
    pub min_value: f64,
    /// Completed `K`-vector reported by the search.
    pub minimizer: Vec<f64>,
    /// `1 - min_value`.
    pub risk: f64,
    pub candidates: usize,
    pub elapsed: Duration,
}

impl ExperimentRecord {
    pub const HEADER: [&'static str; 10] = [
        "N",
        "K",
        "Confidence Interval Function",
        "Confidence Interval Function Alpha",
        "Condition",
        "Filtering",
        "Minimum Value",
        "Minimizer",
        "Risk",
        "Elapsed Time",
    ];

    /// Row values in [`HEADER`](Self::HEADER) order. Elapsed time is in seconds.
    pub fn columns(&self) -> [String; 10] {
        let [n, k, rule, alpha, condition] = self.key.columns();
        let minimizer = self
            .minimizer
            .iter()
            .map(f64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        [
            n,
            k,
            rule,
            alpha,
            condition,
            self.filtering.to_string(),
            self.min_value.to_string(),
            format!("[{minimizer}]"),
            self.risk.to_string(),
            self.elapsed.as_secs_f64().to_string(),
        ]
    }

    pub fn key(&self) -> &ExperimentKey {
        &self.key
    }
}

impl fmt::Display for ExperimentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.columns().join("\t"))
    }
}

fn build_candidates<R>(
    n: u64,
    k: usize,
    rule: &R,
    predicate: Option<&dyn Predicate>,
    cfg: &EngineConfig,
) -> Result<CandidateSet>
where
    R: IntervalRule + ?Sized,
{
    if k == 0 {
        return Err(crate::Error::invalid("category count K must be > 0"));
    }
    let grid = rank_endpoints_for(n, k, rule, cfg.precision)?;
    let set = generate_candidates(k - 1, &grid, cfg)?;
    match predicate {
        Some(p) => filter_candidates(set, p, cfg.precision),
        None => Ok(set),
    }
}

/// Full minimax run for `(n, k, rule)`, optionally restricted by `predicate`.
pub fn run_minimax<R>(
    n: u64,
    k: usize,
    rule: &R,
    predicate: Option<&dyn Predicate>,
    cfg: &EngineConfig,
) -> Result<ExperimentRecord>
where
    R: IntervalRule + ?Sized,
{
    let start = Instant::now();
    let budget = Budget::from_config(cfg);
    let candidates = build_candidates(n, k, rule, predicate, cfg)?;
    let min = find_minimizer_with_budget(n, &candidates, rule, cfg, &budget)?;

    let record = ExperimentRecord {
        key: ExperimentKey::new(n, k, rule, predicate.map_or("", |p| p.name())),
        filtering: if predicate.is_some() {
            Filtering::Predicate
        } else {
            Filtering::Off
        },
        risk: min.risk(),
        min_value: min.value,
        minimizer: min.vector,
        candidates: candidates.len(),
        elapsed: start.elapsed(),
    };
    info!(record = %record, "minimax run");
    Ok(record)
}

/// Full weighted-representative run for `(n, k, rule)` under `weight`.
pub fn run_weighted<R, W>(
    n: u64,
    k: usize,
    rule: &R,
    predicate: Option<&dyn Predicate>,
    weight: &W,
    cfg: &EngineConfig,
) -> Result<ExperimentRecord>
where
    R: IntervalRule + ?Sized,
    W: WeightFunction + ?Sized,
{
    let start = Instant::now();
    let budget = Budget::from_config(cfg);
    let candidates = build_candidates(n, k, rule, predicate, cfg)?;
    let rep = find_representative_with_budget(n, &candidates, rule, weight, cfg, &budget)?;

    let record = ExperimentRecord {
        key: ExperimentKey::new(n, k, rule, weight.name()),
        filtering: Filtering::Weighted,
        min_value: rep.skewed_average,
        minimizer: rep.vector,
        risk: 1.0 - rep.skewed_average,
        candidates: candidates.len(),
        elapsed: start.elapsed(),
    };
    info!(record = %record, "weighted run");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstantWeight, Error, FitzpatrickScott, MaxAbove};

    #[test]
    fn minimax_record_columns() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let rec = run_minimax(4, 3, &fs, None, &EngineConfig::default()).unwrap();
        assert_eq!(rec.candidates, 12);
        assert_eq!(rec.filtering, Filtering::Off);
        assert_eq!(rec.minimizer, vec![0.010_009_003_9, 0.489_990_996_1, 0.5]);

        let cols = rec.columns();
        assert_eq!(cols.len(), ExperimentRecord::HEADER.len());
        assert_eq!(&cols[..6], &["4", "3", "Fitzpatrick_and_Scott", "0.05", "", "False"]);
        assert_eq!(cols[7], "[0.0100090039, 0.4899909961, 0.5]");
        assert_eq!(rec.key().prefix(), "4\t3\tFitzpatrick_and_Scott\t0.05\t\t");
        assert!(rec.to_string().starts_with(&rec.key().prefix()));
    }

    #[test]
    fn filtered_run_records_the_predicate() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let pred: &dyn Predicate = &MaxAbove::default();
        let rec = run_minimax(4, 3, &fs, Some(pred), &EngineConfig::default()).unwrap();
        assert_eq!(rec.filtering, Filtering::Predicate);
        assert_eq!(rec.key.condition, "max_above");
        assert!(rec.minimizer.iter().any(|&x| x > 0.5));
        assert!(rec.candidates < 12);
    }

    #[test]
    fn weighted_run_reports_the_skewed_average() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let weight = ConstantWeight::default();
        let rec = run_weighted(4, 3, &fs, None, &weight, &EngineConfig::default()).unwrap();
        assert_eq!(rec.filtering.to_string(), "Weighted");
        assert_eq!(rec.key.condition, "constant");
        assert!((rec.min_value - 0.943_830_855_177_468_5).abs() < 1e-10);
        assert!((rec.risk - (1.0 - rec.min_value)).abs() < 1e-15);
    }

    #[test]
    fn prefix_does_not_match_longer_condition_names() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let short = ExperimentKey::new(4, 3, &fs, "max_above");
        let long = ExperimentKey::new(4, 3, &fs, "max_above_0.7");
        let existing = format!("{}False\t0.9", long.prefix());
        assert!(existing.starts_with(&long.prefix()));
        assert!(!existing.starts_with(&short.prefix()));
    }

    #[test]
    fn over_filtering_is_an_error() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let impossible = MaxAbove { threshold: 1.0 };
        let pred: &dyn Predicate = &impossible;
        let err = run_minimax(4, 3, &fs, Some(pred), &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyCandidateSet));
    }

    #[test]
    fn huge_deadline_runs_to_completion() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        let cfg = EngineConfig {
            deadline: Some(std::time::Duration::MAX),
            ..EngineConfig::default()
        };
        let rec = run_minimax(4, 3, &fs, None, &cfg).unwrap();
        assert!((rec.min_value - 0.874_997_994_592_794_4).abs() < 1e-12);
    }

    #[test]
    fn zero_categories_are_rejected() {
        let fs = FitzpatrickScott::new(0.05).unwrap();
        assert!(matches!(
            run_minimax(4, 0, &fs, None, &EngineConfig::default()),
            Err(Error::InvalidInput(_))
        ));
    }
}
