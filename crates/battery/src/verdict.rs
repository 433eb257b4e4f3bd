use crate::EntityContext;
use crate::bias_ratio::BiasRatioData;
use crate::data_quality::DataQualityData;
use crate::december_spike::DecemberSpikeData;
use crate::digits::DigitConformityData;
use crate::discontinuity::DiscontinuityData;
use crate::low_correlation::LowCorrelationData;
use crate::serial_correlation::SerialCorrelationData;
use configuration::TestParameters;
use core_types::TestKind;
use serde::Serialize;

/// The common envelope produced by every test for one entity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestVerdict {
    #[serde(rename = "Type")]
    pub kind: TestKind,
    /// Number of independent sub-checks.
    pub flags: usize,
    pub parameters: TestParameters,
    pub entity: String,
    pub failure: bool,
    /// Share of sub-checks that failed, in [0, 1].
    pub failure_coefficient: f64,
    pub data: VerdictData,
}

impl TestVerdict {
    /// Builds the envelope from the sub-check outcomes. `failure` is true when any sub-check
    /// failed; the coefficient is the failed share.
    pub fn from_checks(ctx: &EntityContext<'_>, checks: &[bool], data: VerdictData) -> Self {
        let failed = checks.iter().filter(|&&c| c).count();
        let failure_coefficient = if checks.is_empty() {
            0.0
        } else {
            failed as f64 / checks.len() as f64
        };
        Self {
            kind: data.kind(),
            flags: checks.len(),
            parameters: ctx.params.clone(),
            entity: ctx.name().to_string(),
            failure: failed > 0,
            failure_coefficient,
            data,
        }
    }
}

/// Test-specific audit trail, tagged by test name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "Test")]
pub enum VerdictData {
    LowCorrelation(LowCorrelationData),
    SerialCorrelation(SerialCorrelationData),
    BiasRatio(BiasRatioData),
    DecemberSpike(DecemberSpikeData),
    DiscontinuityAtZero(DiscontinuityData),
    DigitsConformity(DigitConformityData),
    DataQuality(DataQualityData),
}

impl VerdictData {
    pub fn kind(&self) -> TestKind {
        match self {
            VerdictData::LowCorrelation(_) => TestKind::LowCorrelation,
            VerdictData::SerialCorrelation(_) => TestKind::SerialCorrelation,
            VerdictData::BiasRatio(_) => TestKind::BiasRatio,
            VerdictData::DecemberSpike(_) => TestKind::DecemberSpike,
            VerdictData::DiscontinuityAtZero(_) => TestKind::DiscontinuityAtZero,
            VerdictData::DigitsConformity(_) => TestKind::DigitsConformity,
            VerdictData::DataQuality(_) => TestKind::DataQuality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn verdict_for(checks: &[bool]) -> TestVerdict {
        let returns = vec![0.01, -0.02, 0.03, -0.01, 0.02, 0.0];
        let dataset = test_support::single(returns.clone());
        let null = test_support::null_for(&returns, 10, 1);
        let params = test_support::params(0.05);
        let ctx = EntityContext::new(&dataset, 0, &null, &params).unwrap();
        let data = VerdictData::BiasRatio(BiasRatioData {
            std_dev: 0.0,
            positive: 0,
            negative: 0,
            ratio: 0.0,
            p_value: 1.0,
            null_median_ratio: 1.0,
            failure: false,
        });
        TestVerdict::from_checks(&ctx, checks, data)
    }

    #[test]
    fn coefficient_is_exact_failed_share() {
        let cases: [(&[bool], f64, bool); 4] = [
            (&[false, false], 0.0, false),
            (&[true, false], 0.5, true),
            (&[true, true, false, false, true], 0.6, true),
            (&[true], 1.0, true),
        ];
        for (checks, coefficient, failure) in cases {
            let verdict = verdict_for(checks);
            assert_eq!(verdict.flags, checks.len());
            assert_eq!(verdict.failure_coefficient, coefficient);
            assert_eq!(verdict.failure, failure);
            assert!((0.0..=1.0).contains(&verdict.failure_coefficient));
        }
    }

    #[test]
    fn serializes_with_envelope_field_names() {
        let verdict = verdict_for(&[true]);
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["Type"], "BiasRatio");
        assert_eq!(json["Entity"], "Target");
        assert_eq!(json["Flags"], 1);
        assert_eq!(json["FailureCoefficient"], 1.0);
        assert_eq!(json["Data"]["Test"], "BiasRatio");
    }
}
