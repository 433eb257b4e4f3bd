use configuration::{EngineSettings, TestParameters};
use core_types::TestKind;
use engine::{Engine, TestOutcome};
use simulator::SyntheticDataset;
use std::collections::HashMap;

fn params(seed: u64, r2_switch: bool) -> TestParameters {
    TestParameters {
        a: 0.01,
        simulations: 1000,
        style_factors_max: if r2_switch { 1 } else { 2 },
        decimals: 4,
        r2_switch,
        seed: Some(seed),
    }
}

fn clean_dataset(seed: u64) -> core_types::Dataset {
    SyntheticDataset {
        entities: 3,
        observations: 252,
        seed,
        ..Default::default()
    }
    .build()
    .unwrap()
}

/// Honest synthetic data should leave the battery quiet, test by test.
#[test]
fn clean_data_passes_across_seeds() {
    let mut failures: HashMap<TestKind, usize> = HashMap::new();
    let mut verdicts = 0;

    for seed in [1, 2, 3] {
        let dataset = clean_dataset(seed);
        let engine = Engine::new(params(seed * 100, false), &EngineSettings::default()).unwrap();
        let report = engine.run(&dataset).unwrap();

        for entity in 0..dataset.entities().len() {
            for kind in TestKind::ALL {
                match report.outcome(kind, entity) {
                    Some(TestOutcome::Completed(verdict)) => {
                        verdicts += 1;
                        if verdict.failure {
                            *failures.entry(kind).or_default() += 1;
                        }
                        assert!((0.0..=1.0).contains(&verdict.failure_coefficient));
                    }
                    other => panic!("{} for entity {} did not complete: {:?}", kind, entity, other),
                }
            }

            let total = report.summary.get(7, entity).unwrap();
            assert_eq!(total.failure, Some(false));
        }
    }

    assert_eq!(verdicts, 63);
    // Digits Conformity is left out: normal returns do not follow Benford's law.
    for kind in [
        TestKind::LowCorrelation,
        TestKind::SerialCorrelation,
        TestKind::BiasRatio,
        TestKind::DecemberSpike,
        TestKind::DiscontinuityAtZero,
    ] {
        assert_eq!(failures.get(&kind), None, "{} failed on clean data", kind);
    }
    assert!(failures.get(&TestKind::DataQuality).copied().unwrap_or(0) <= 1);
}

#[test]
fn switching_search_runs_end_to_end() {
    let dataset = clean_dataset(9);
    let engine = Engine::new(params(9, true), &EngineSettings::default()).unwrap();
    let report = engine.run(&dataset).unwrap();

    for entity in 0..3 {
        let outcome = report.outcome(TestKind::LowCorrelation, entity).unwrap();
        let verdict = outcome.verdict().unwrap();
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["Data"]["Max"]["Mode"], "Switching");
        assert!(json["Data"]["Max"]["ChangePointDate"].is_string());
        assert!(matches!(
            report.outcome(TestKind::SerialCorrelation, entity),
            Some(TestOutcome::Completed(_))
        ));
    }
}

#[test]
fn report_serializes_with_summary_labels() {
    let dataset = clean_dataset(4);
    let engine = Engine::new(params(4, false), &EngineSettings { threads: Some(2) }).unwrap();
    let report = engine.run(&dataset).unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["Seed"], 4);
    assert_eq!(json["Summary"]["rows"][7], "Total");
    assert_eq!(json["Summary"]["columns"][0], "Fund 01");
    assert_eq!(json["Results"]["cells"].as_array().unwrap().len(), 21);
}
