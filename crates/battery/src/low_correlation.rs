//! Low Correlation test.
//!
//! Two sub-checks flag returns that are implausibly unrelated to anything they should move
//! with:
//!
//! - **Index:** regress the entity on the equal-weighted index of its group peers. Fails when
//!   the slope is not significant at `a`.
//! - **Max R²:** search the style-factor combinations of size `style_factors_max` for the best
//!   adjusted R², either with one combination over the whole sample (fixed mode) or with a
//!   combination switch at an estimated change point (switching mode). The same search is run
//!   on a random subsample of null columns; the check fails when the observed best adjusted R²
//!   falls below the `(1 - a)` percentile of those null values.
//!
//! The fitted series of the winning observed model is handed to the Serial Correlation test.

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{OlsFit, ols, percentile};
use chrono::NaiveDate;
use core_types::FactorMatrix;
use itertools::Itertools;
use rand::Rng;
use rand::seq::index;
use serde::Serialize;

/// Number of null columns the maximum R² search is repeated on.
pub const NULL_SUBSAMPLE: usize = 100;

/// Change points are only searched between these fractions of the sample.
pub const CHANGE_POINT_BOUNDS: (f64, f64) = (0.10, 0.90);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchMode {
    Fixed,
    Switching,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexCheck {
    pub slope: f64,
    pub p_value: f64,
    pub r_squared: f64,
    pub model: OlsFit,
    pub failure: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaxCheck {
    pub mode: SearchMode,
    /// Winning combination, e.g. "Market + Value" or "Market -> Value" when switching.
    pub label: String,
    pub factors: Vec<String>,
    /// Combination in force after the change point (switching mode only).
    pub switched_factors: Option<Vec<String>>,
    pub change_point: Option<usize>,
    pub change_point_date: Option<NaiveDate>,
    pub adjusted_r_squared: f64,
    pub threshold: f64,
    pub null_sample: usize,
    pub model: OlsFit,
    pub failure: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LowCorrelationData {
    pub index: IndexCheck,
    pub max: MaxCheck,
}

/// The verdict plus the fitted series of the winning maximum R² model.
#[derive(Debug, Clone)]
pub struct LowCorrelationOutcome {
    pub verdict: TestVerdict,
    pub fitted: Vec<f64>,
}

pub fn run<R: Rng + ?Sized>(
    ctx: &EntityContext<'_>,
    rng: &mut R,
) -> Result<LowCorrelationOutcome, BatteryError> {
    let params = ctx.params;
    let returns = ctx.returns();

    // --- 1. Index sub-check ---
    let peers = ctx.dataset.peer_index(ctx.index)?;
    let index_fit = ols(returns, &[&peers])?;
    let index_p = index_fit.slope_p_value(0);
    let index = IndexCheck {
        slope: index_fit.slope(0),
        p_value: index_p,
        r_squared: index_fit.r_squared,
        failure: index_p >= params.a,
        model: index_fit,
    };

    // --- 2. Max R² sub-check on the observed series ---
    let search = FactorSearch::new(
        ctx.dataset.factors(),
        params.style_factors_max,
        params.r2_switch,
    )?;
    let best = search.best(returns)?;

    // --- 3. Same search on a random subsample of null columns ---
    let simulations = ctx.null.simulations();
    let sample_size = NULL_SUBSAMPLE.min(simulations);
    let null_r2 = index::sample(rng, simulations, sample_size)
        .into_iter()
        .map(|j| search.best(ctx.null.column(j)).map(|c| c.fit.adjusted_r_squared))
        .collect::<Result<Vec<f64>, BatteryError>>()?;
    let threshold = percentile(&null_r2, (1.0 - params.a) * 100.0)?;

    let observed_r2 = best.fit.adjusted_r_squared;
    tracing::debug!(
        entity = ctx.name(),
        label = %search.label(&best),
        observed_r2,
        threshold,
        "Low correlation search complete."
    );

    let fitted = best.fit.fitted.clone();
    let max = MaxCheck {
        mode: search.mode,
        label: search.label(&best),
        factors: search.names(best.first),
        switched_factors: best.second.map(|c| search.names(c)),
        change_point: best.change_point,
        change_point_date: best
            .change_point
            .and_then(|cp| ctx.dataset.dates().get(cp).copied()),
        adjusted_r_squared: observed_r2,
        threshold,
        null_sample: sample_size,
        failure: observed_r2 < threshold,
        model: best.fit,
    };

    let checks = [index.failure, max.failure];
    let verdict = TestVerdict::from_checks(
        ctx,
        &checks,
        VerdictData::LowCorrelation(LowCorrelationData { index, max }),
    );
    Ok(LowCorrelationOutcome { verdict, fitted })
}

/// A fitted candidate of the maximum R² search.
#[derive(Debug, Clone)]
struct Candidate {
    first: usize,
    second: Option<usize>,
    change_point: Option<usize>,
    fit: OlsFit,
}

/// The candidate space: every combination of `size` style factors, used either whole-sample
/// or spliced around a change point.
struct FactorSearch<'a> {
    factors: &'a FactorMatrix,
    combinations: Vec<Vec<usize>>,
    mode: SearchMode,
}

impl<'a> FactorSearch<'a> {
    fn new(factors: &'a FactorMatrix, size: usize, switching: bool) -> Result<Self, BatteryError> {
        if size == 0 || size > factors.len() {
            return Err(BatteryError::NotEnoughData(format!(
                "cannot form combinations of {} from {} style factors",
                size,
                factors.len()
            )));
        }
        let combinations: Vec<Vec<usize>> = (0..factors.len()).combinations(size).collect();

        let mode = if switching && combinations.len() < 2 {
            tracing::warn!(
                combinations = combinations.len(),
                "Switching search needs two distinct factor combinations; using fixed mode."
            );
            SearchMode::Fixed
        } else if switching {
            SearchMode::Switching
        } else {
            SearchMode::Fixed
        };

        Ok(Self {
            factors,
            combinations,
            mode,
        })
    }

    fn best(&self, y: &[f64]) -> Result<Candidate, BatteryError> {
        match self.mode {
            SearchMode::Fixed => self.best_fixed(y),
            SearchMode::Switching => self.best_switching(y),
        }
    }

    fn best_fixed(&self, y: &[f64]) -> Result<Candidate, BatteryError> {
        let mut best: Option<Candidate> = None;
        for (c, combination) in self.combinations.iter().enumerate() {
            let columns: Vec<&[f64]> = combination
                .iter()
                .map(|&f| self.factors.column(f))
                .collect();
            let fit = ols(y, &columns)?;
            if is_better(&fit, best.as_ref()) {
                best = Some(Candidate {
                    first: c,
                    second: None,
                    change_point: None,
                    fit,
                });
            }
        }
        best.ok_or_else(|| BatteryError::NotEnoughData("no factor combinations".to_string()))
    }

    fn best_switching(&self, y: &[f64]) -> Result<Candidate, BatteryError> {
        let all: Vec<&[f64]> = (0..self.factors.len())
            .map(|f| self.factors.column(f))
            .collect();
        let cp = locate_change_point(y, &all)?;

        let mut best: Option<Candidate> = None;
        let pairs = (0..self.combinations.len())
            .cartesian_product(0..self.combinations.len())
            .filter(|(a, b)| a != b);
        for (before, after) in pairs {
            let spliced = self.splice(before, after, cp, y.len());
            let columns: Vec<&[f64]> = spliced.iter().map(Vec::as_slice).collect();
            let fit = ols(y, &columns)?;
            if is_better(&fit, best.as_ref()) {
                best = Some(Candidate {
                    first: before,
                    second: Some(after),
                    change_point: Some(cp),
                    fit,
                });
            }
        }
        best.ok_or_else(|| BatteryError::NotEnoughData("no factor combination pairs".to_string()))
    }

    /// Regressors following combination `before` up to `cp` and combination `after` from it.
    fn splice(&self, before: usize, after: usize, cp: usize, n: usize) -> Vec<Vec<f64>> {
        self.combinations[before]
            .iter()
            .zip(&self.combinations[after])
            .map(|(&b, &a)| {
                let (head, tail) = (self.factors.column(b), self.factors.column(a));
                (0..n).map(|t| if t < cp { head[t] } else { tail[t] }).collect()
            })
            .collect()
    }

    fn names(&self, combination: usize) -> Vec<String> {
        self.combinations[combination]
            .iter()
            .map(|&f| self.factors.name(f).to_string())
            .collect()
    }

    fn label(&self, candidate: &Candidate) -> String {
        let first = self.names(candidate.first).join(" + ");
        match candidate.second {
            Some(second) => format!("{} -> {}", first, self.names(second).join(" + ")),
            None => first,
        }
    }
}

fn is_better(fit: &OlsFit, incumbent: Option<&Candidate>) -> bool {
    match incumbent {
        Some(current) => fit.adjusted_r_squared > current.fit.adjusted_r_squared,
        None => true,
    }
}

/// Quandt-style change-point search.
///
/// For every candidate index in the central part of the sample, compares the residual sum of
/// squares of one regression over the whole sample with two separate regressions before and
/// after the index, and returns the index with the largest Chow F-statistic. Candidates
/// whose segment regressions cannot be estimated are skipped.
fn locate_change_point(y: &[f64], columns: &[&[f64]]) -> Result<usize, BatteryError> {
    let n = y.len();
    let p = columns.len() + 1;

    let (lo_frac, hi_frac) = CHANGE_POINT_BOUNDS;
    let lo = ((lo_frac * n as f64).floor() as usize).max(p + 1);
    let hi = ((hi_frac * n as f64).ceil() as usize).min(n.saturating_sub(p + 1));
    if lo > hi || n <= 2 * p {
        return Err(BatteryError::NotEnoughData(format!(
            "{} observations leave no admissible change point for {} parameters",
            n, p
        )));
    }

    let pooled = ols(y, columns)?.sse;
    let denominator_dof = (n - 2 * p) as f64;

    let mut best: Option<(usize, f64)> = None;
    for cp in lo..=hi {
        let head: Vec<&[f64]> = columns.iter().map(|c| &c[..cp]).collect();
        let tail: Vec<&[f64]> = columns.iter().map(|c| &c[cp..]).collect();
        let (Ok(before), Ok(after)) = (ols(&y[..cp], &head), ols(&y[cp..], &tail)) else {
            continue;
        };

        let split = before.sse + after.sse;
        let f_statistic = if split > 0.0 {
            ((pooled - split) / p as f64) / (split / denominator_dof)
        } else {
            f64::INFINITY
        };
        if best.is_none_or(|(_, f)| f_statistic > f) {
            best = Some((cp, f_statistic));
        }
    }

    best.map(|(cp, _)| cp).ok_or_else(|| {
        BatteryError::NotEnoughData("no change point candidate could be estimated".to_string())
    })
}
