//! # Battery Engine
//!
//! Runs the full battery over every entity of a dataset and returns the results grid with
//! its summary.
//!
//! ## Architectural Principles
//!
//! - **Top-Level Orchestrator:** The only crate that knows the order of operations: validate
//!   the parameters, simulate each null matrix, run Low Correlation before Serial
//!   Correlation, run the five independent tests, aggregate.
//! - **Data Parallel:** Entities share nothing mutable, so they are processed on a dedicated
//!   rayon pool. Within an entity everything is sequential.
//! - **Reproducible:** Each entity draws from its own generator stream keyed by the run seed,
//!   so results do not depend on thread scheduling.
//!
//! ## Public API
//!
//! - `Engine`: built from `TestParameters` and `EngineSettings`; `run` / `run_with_progress`.
//! - `BatteryReport`: seed, validated parameters, 7 x N outcomes and the 8 x N summary.

pub mod error;

pub use analyzer::{ResultsGrid, Summary, TestOutcome};
pub use error::EngineError;

use analyzer::EntityAggregate;
use battery::{BatteryError, EntityContext, TestVerdict, low_correlation, serial_correlation};
use configuration::{EngineSettings, TestParameters};
use core_types::{Dataset, LabeledArray, TestKind};
use rayon::prelude::*;
use serde::Serialize;
use simulator::{NullSimulator, entity_rng};

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatteryReport {
    /// Seed actually used, drawn at start-up when none was configured.
    pub seed: u64,
    pub parameters: TestParameters,
    pub results: ResultsGrid,
    pub summary: Summary,
}

impl BatteryReport {
    /// Outcome of one test for one entity.
    pub fn outcome(&self, kind: TestKind, entity: usize) -> Option<&TestOutcome> {
        self.results.get(kind.index(), entity)
    }
}

pub struct Engine {
    params: TestParameters,
    pool: rayon::ThreadPool,
}

impl Engine {
    pub fn new(params: TestParameters, settings: &EngineSettings) -> Result<Self, EngineError> {
        let threads = settings.worker_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("battery-worker-{}", i))
            .build()?;
        tracing::debug!(threads, "Engine worker pool ready.");
        Ok(Self { params, pool })
    }

    pub fn run(&self, dataset: &Dataset) -> Result<BatteryReport, EngineError> {
        self.run_with_progress(dataset, |_| {})
    }

    /// Runs the battery, calling `on_entity` as each entity finishes (in completion order).
    pub fn run_with_progress<F>(
        &self,
        dataset: &Dataset,
        on_entity: F,
    ) -> Result<BatteryReport, EngineError>
    where
        F: Fn(&EntityAggregate) + Sync,
    {
        // --- 1. Fail fast on bad parameters ---
        let mut params = self.params.clone().validate(dataset.factors().len())?;
        let seed = *params.seed.get_or_insert_with(rand::random::<u64>);
        let simulator = NullSimulator::new(params.simulations)?;

        let entity_count = dataset.entities().len();
        tracing::info!(
            entities = entity_count,
            observations = dataset.observations(),
            factors = dataset.factors().len(),
            simulations = params.simulations,
            seed,
            "Starting test battery."
        );

        // --- 2. Entities in parallel; collect keeps input order ---
        let run_span = tracing::info_span!("battery", seed);
        let per_entity: Vec<(Vec<TestOutcome>, EntityAggregate)> = self.pool.install(|| {
            (0..entity_count)
                .into_par_iter()
                .map(|index| -> Result<(Vec<TestOutcome>, EntityAggregate), EngineError> {
                    let span = tracing::info_span!(
                        parent: &run_span,
                        "entity",
                        index,
                        name = %dataset.entities()[index].name
                    );
                    let _guard = span.enter();

                    let outcomes = run_entity(dataset, index, &params, &simulator, seed);
                    let refs: Vec<&TestOutcome> = outcomes.iter().collect();
                    let aggregate = analyzer::aggregate(&refs)?;
                    tracing::info!(
                        total = aggregate.total,
                        failure = aggregate.failure,
                        errored = aggregate.errored,
                        "Entity complete."
                    );
                    on_entity(&aggregate);
                    Ok((outcomes, aggregate))
                })
                .collect::<Result<Vec<_>, EngineError>>()
        })?;

        // --- 3. Assemble the test-major grid and the summary ---
        let (outcomes, aggregates): (Vec<_>, Vec<_>) = per_entity.into_iter().unzip();
        let results = results_grid(dataset.entity_names(), outcomes)?;
        let summary = analyzer::summary_of(&aggregates);

        let flagged = aggregates.iter().filter(|a| a.failure).count();
        tracing::info!(flagged, entities = entity_count, "Test battery complete.");

        Ok(BatteryReport {
            seed,
            parameters: params,
            results,
            summary,
        })
    }
}

/// Runs the seven tests for one entity, in `TestKind::ALL` order.
///
/// Never fails as a whole: anything that cannot be computed becomes an errored outcome.
fn run_entity(
    dataset: &Dataset,
    index: usize,
    params: &TestParameters,
    simulator: &NullSimulator,
    seed: u64,
) -> Vec<TestOutcome> {
    let entity = &dataset.entities()[index];
    let mut rng = entity_rng(seed, index);

    let null = match simulator.simulate(&entity.returns, &mut rng) {
        Ok(null) => null,
        Err(e) => return errored_all(&entity.name, &format!("null simulation failed: {}", e)),
    };
    let ctx = match EntityContext::new(dataset, index, &null, params) {
        Ok(ctx) => ctx,
        Err(e) => return errored_all(&entity.name, &e.to_string()),
    };

    let mut outcomes = Vec::with_capacity(TestKind::ALL.len());

    let low = low_correlation::run(&ctx, &mut rng);
    let serial = match &low {
        Ok(low) => serial_correlation::run(&ctx, &low.fitted),
        Err(e) => Err(BatteryError::NotEnoughData(format!(
            "no fitted series from Low Correlation: {}",
            e
        ))),
    };
    outcomes.push(outcome(
        TestKind::LowCorrelation,
        &entity.name,
        low.map(|o| o.verdict),
    ));
    outcomes.push(outcome(TestKind::SerialCorrelation, &entity.name, serial));

    for kind in &TestKind::ALL[2..] {
        outcomes.push(outcome(
            *kind,
            &entity.name,
            battery::run_independent(*kind, &ctx),
        ));
    }
    outcomes
}

fn outcome(kind: TestKind, entity: &str, result: Result<TestVerdict, BatteryError>) -> TestOutcome {
    match result {
        Ok(verdict) => TestOutcome::Completed(verdict),
        Err(e) => {
            tracing::warn!(test = %kind, error = %e, "Test could not be computed.");
            TestOutcome::Errored {
                kind,
                entity: entity.to_string(),
                message: e.to_string(),
            }
        }
    }
}

fn errored_all(entity: &str, message: &str) -> Vec<TestOutcome> {
    tracing::warn!(error = message, "Entity skipped; every test is reported as errored.");
    TestKind::ALL
        .iter()
        .map(|&kind| TestOutcome::Errored {
            kind,
            entity: entity.to_string(),
            message: message.to_string(),
        })
        .collect()
}

/// Transposes per-entity outcome lists into the test-major grid.
fn results_grid(
    entity_names: Vec<String>,
    per_entity: Vec<Vec<TestOutcome>>,
) -> Result<ResultsGrid, EngineError> {
    let rows: Vec<String> = TestKind::ALL.iter().map(|k| k.label().to_string()).collect();
    let mut columns: Vec<_> = per_entity.into_iter().map(Vec::into_iter).collect();
    let mut cells = Vec::with_capacity(rows.len() * columns.len());
    for _ in &rows {
        for column in columns.iter_mut() {
            cells.extend(column.next());
        }
    }
    Ok(LabeledArray::from_cells(rows, entity_names, cells)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simulator::SyntheticDataset;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick_params(seed: u64) -> TestParameters {
        TestParameters {
            a: 0.05,
            simulations: 1000,
            style_factors_max: 2,
            decimals: 4,
            r2_switch: false,
            seed: Some(seed),
        }
    }

    fn engine(params: TestParameters) -> Engine {
        Engine::new(params, &EngineSettings { threads: Some(2) }).unwrap()
    }

    fn small_dataset(seed: u64) -> Dataset {
        SyntheticDataset {
            entities: 3,
            observations: 120,
            seed,
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    #[test]
    fn grid_is_test_major_in_entity_order() {
        let dataset = small_dataset(1);
        let report = engine(quick_params(3)).run(&dataset).unwrap();

        assert_eq!(report.results.rows().len(), 7);
        assert_eq!(report.results.columns(), dataset.entity_names().as_slice());
        for (t, kind) in TestKind::ALL.iter().enumerate() {
            for (e, name) in dataset.entity_names().iter().enumerate() {
                let outcome = report.outcome(*kind, e).unwrap();
                assert_eq!(outcome.kind(), *kind, "row {}", t);
                assert_eq!(outcome.entity(), name);
            }
        }
        assert_eq!(report.summary.rows().len(), 8);
        assert_eq!(report.seed, 3);
    }

    #[test]
    fn same_seed_reproduces_results_across_thread_counts() {
        let dataset = small_dataset(2);
        let one = Engine::new(quick_params(11), &EngineSettings { threads: Some(1) })
            .unwrap()
            .run(&dataset)
            .unwrap();
        let four = Engine::new(quick_params(11), &EngineSettings { threads: Some(4) })
            .unwrap()
            .run(&dataset)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&one.summary).unwrap(),
            serde_json::to_value(&four.summary).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&one.results).unwrap(),
            serde_json::to_value(&four.results).unwrap()
        );
    }

    #[test]
    fn missing_seed_is_drawn_and_reported() {
        let dataset = small_dataset(3);
        let params = TestParameters {
            seed: None,
            ..quick_params(0)
        };
        let report = engine(params).run(&dataset).unwrap();
        assert_eq!(report.parameters.seed, Some(report.seed));
    }

    #[test]
    fn invalid_parameters_fail_before_any_work() {
        let dataset = small_dataset(4);
        let params = TestParameters {
            simulations: 10,
            ..quick_params(0)
        };
        let calls = AtomicUsize::new(0);
        let result = engine(params).run_with_progress(&dataset, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert!(matches!(result, Err(EngineError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn progress_is_reported_once_per_entity() {
        let dataset = small_dataset(5);
        let calls = AtomicUsize::new(0);
        engine(quick_params(1))
            .run_with_progress(&dataset, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn constant_series_errors_every_test_without_aborting_the_run() {
        let synthetic = small_dataset(6);
        let mut entities = synthetic.entities().to_vec();
        entities[1].returns = vec![0.01; synthetic.observations()];
        let dataset = Dataset::new(
            synthetic.dates().to_vec(),
            entities,
            synthetic.factors().clone(),
        )
        .unwrap();

        let report = engine(quick_params(2)).run(&dataset).unwrap();
        for kind in TestKind::ALL {
            assert!(matches!(
                report.outcome(kind, 1),
                Some(TestOutcome::Errored { .. })
            ));
            assert!(matches!(
                report.outcome(kind, 0),
                Some(TestOutcome::Completed(_))
            ));
        }
        let total = report.summary.get(7, 1).unwrap();
        assert_eq!(total.coefficient, Some(0.0));
        assert_eq!(total.failure, Some(false));
    }

    #[test]
    fn low_correlation_error_carries_into_serial_correlation() {
        let synthetic = small_dataset(7);
        let mut entities = synthetic.entities().to_vec();
        // A lone group leaves the first entity without peers.
        entities[0].group = Some("Alone".to_string());
        let dataset = Dataset::new(
            synthetic.dates().to_vec(),
            entities,
            synthetic.factors().clone(),
        )
        .unwrap();

        let report = engine(quick_params(4)).run(&dataset).unwrap();
        let Some(TestOutcome::Errored { message, .. }) =
            report.outcome(TestKind::SerialCorrelation, 0)
        else {
            panic!("serial correlation should be errored");
        };
        assert!(message.contains("Low Correlation"));
        assert!(matches!(
            report.outcome(TestKind::BiasRatio, 0),
            Some(TestOutcome::Completed(_))
        ));
    }
}
