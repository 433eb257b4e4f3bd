//! # Verdict Aggregator
//!
//! Folds the seven per-entity test outcomes into a single failure score and assembles the
//! cross-entity summary grid.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** Consumes finished `TestVerdict`s; never runs a test itself.
//! - **Errors Stay Visible:** A test that could not be computed is carried as
//!   `TestOutcome::Errored` and shows up as an empty summary cell, never as a pass.
//!
//! ## Public API
//!
//! - `TestOutcome`: one cell of the 7 x N results grid.
//! - `aggregate`: one entity's `EntityAggregate`.
//! - `summarize`: the 8 x N `Summary` (seven tests plus `Total`).

pub mod error;

pub use error::AnalyzerError;

use battery::TestVerdict;
use core_types::{LabeledArray, TestKind};
use serde::Serialize;

/// Entities whose summed failure coefficients exceed this are flagged overall.
pub const TOTAL_FAILURE_THRESHOLD: f64 = 3.5;

pub const TOTAL_ROW: &str = "Total";

/// Result of one test for one entity: either a verdict or the reason none could be computed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "Status")]
pub enum TestOutcome {
    Completed(TestVerdict),
    Errored {
        #[serde(rename = "Type")]
        kind: TestKind,
        #[serde(rename = "Entity")]
        entity: String,
        #[serde(rename = "Message")]
        message: String,
    },
}

impl TestOutcome {
    pub fn kind(&self) -> TestKind {
        match self {
            TestOutcome::Completed(verdict) => verdict.kind,
            TestOutcome::Errored { kind, .. } => *kind,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            TestOutcome::Completed(verdict) => &verdict.entity,
            TestOutcome::Errored { entity, .. } => entity,
        }
    }

    pub fn verdict(&self) -> Option<&TestVerdict> {
        match self {
            TestOutcome::Completed(verdict) => Some(verdict),
            TestOutcome::Errored { .. } => None,
        }
    }
}

/// 7 x N grid of outcomes, rows in `TestKind::ALL` order and columns in entity order.
pub type ResultsGrid = LabeledArray<TestOutcome>;

/// One `(Failure, Coefficient)` cell of the summary. Both are `None` for a test that errored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SummaryCell {
    pub failure: Option<bool>,
    pub coefficient: Option<f64>,
}

/// 8 x N grid: one row per test plus `Total`, one column per entity.
pub type Summary = LabeledArray<SummaryCell>;

/// The folded result for one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityAggregate {
    pub entity: String,
    pub cells: [SummaryCell; 7],
    /// Sum of the available test coefficients, in [0, 7].
    pub total: f64,
    pub failure: bool,
    pub errored: usize,
}

impl EntityAggregate {
    pub fn total_cell(&self) -> SummaryCell {
        SummaryCell {
            failure: Some(self.failure),
            coefficient: Some(self.total),
        }
    }
}

/// Folds one entity's seven outcomes, which must be in `TestKind::ALL` order.
pub fn aggregate(outcomes: &[&TestOutcome]) -> Result<EntityAggregate, AnalyzerError> {
    let entity = outcomes
        .first()
        .map(|o| o.entity().to_string())
        .unwrap_or_default();
    if outcomes.len() != TestKind::ALL.len() {
        return Err(AnalyzerError::IncompleteEntity {
            entity,
            found: outcomes.len(),
        });
    }

    let mut cells = [SummaryCell {
        failure: None,
        coefficient: None,
    }; 7];
    for (cell, (outcome, expected)) in cells.iter_mut().zip(outcomes.iter().zip(TestKind::ALL)) {
        if outcome.kind() != expected {
            return Err(AnalyzerError::OutOfOrder {
                entity,
                expected,
                found: outcome.kind(),
            });
        }
        if let Some(verdict) = outcome.verdict() {
            *cell = SummaryCell {
                failure: Some(verdict.failure),
                coefficient: Some(verdict.failure_coefficient),
            };
        }
    }

    let total: f64 = cells.iter().filter_map(|c| c.coefficient).sum();
    let errored = cells.iter().filter(|c| c.coefficient.is_none()).count();
    if errored > 0 {
        tracing::warn!(
            entity = %entity,
            errored,
            "Total covers only the tests that completed."
        );
    }

    Ok(EntityAggregate {
        entity,
        cells,
        total,
        failure: total > TOTAL_FAILURE_THRESHOLD,
        errored,
    })
}

/// Aggregates every entity of a results grid into the labelled summary.
pub fn summarize(results: &ResultsGrid) -> Result<Summary, AnalyzerError> {
    let aggregates = (0..results.columns().len())
        .map(|c| {
            let column = results.column(c).unwrap_or_default();
            aggregate(&column)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(summary_of(&aggregates))
}

/// Lays already-folded entities out as the summary grid.
pub fn summary_of(aggregates: &[EntityAggregate]) -> Summary {
    let rows: Vec<String> = TestKind::ALL
        .iter()
        .map(|k| k.label().to_string())
        .chain(std::iter::once(TOTAL_ROW.to_string()))
        .collect();
    let columns = aggregates.iter().map(|a| a.entity.clone()).collect();
    LabeledArray::from_fn(rows, columns, |r, c| match aggregates[c].cells.get(r) {
        Some(cell) => *cell,
        None => aggregates[c].total_cell(),
    })
}
