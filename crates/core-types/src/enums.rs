use serde::{Deserialize, Serialize};

/// Identifies one of the seven tests in the battery.
///
/// The declaration order is the order in which results are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestKind {
    LowCorrelation,
    SerialCorrelation,
    BiasRatio,
    DecemberSpike,
    DiscontinuityAtZero,
    DigitsConformity,
    DataQuality,
}

impl TestKind {
    pub const ALL: [TestKind; 7] = [
        TestKind::LowCorrelation,
        TestKind::SerialCorrelation,
        TestKind::BiasRatio,
        TestKind::DecemberSpike,
        TestKind::DiscontinuityAtZero,
        TestKind::DigitsConformity,
        TestKind::DataQuality,
    ];

    /// Human-readable label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            TestKind::LowCorrelation => "Low Correlation",
            TestKind::SerialCorrelation => "Serial Correlation",
            TestKind::BiasRatio => "Bias Ratio",
            TestKind::DecemberSpike => "December Spike",
            TestKind::DiscontinuityAtZero => "Discontinuity At Zero",
            TestKind::DigitsConformity => "Digits Conformity",
            TestKind::DataQuality => "Data Quality",
        }
    }

    /// Position of the test in [`TestKind::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
