//! Digit Conformity test.
//!
//! Returns are written as integers by truncating `|r| * 10^decimals`. Two chi-square
//! goodness-of-fit checks follow:
//!
//! - **First digit** of every integer `>= 1` against Benford's law, `P(d) = log10(1 + 1/d)`.
//! - **Last digit** of every integer `>= 10` against the uniform distribution on 0-9.

use crate::error::BatteryError;
use crate::verdict::{TestVerdict, VerdictData};
use crate::EntityContext;
use analytics::{ChiSquareTest, chi_square_gof};
use serde::Serialize;

/// Guards truncation against representation error, e.g. `0.003 * 1e4 = 29.999...`.
const TRUNCATION_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DigitCheck {
    /// Observed count per digit (1-9 for the first digit, 0-9 for the last).
    pub counts: Vec<usize>,
    /// Probability of each digit under the reference law.
    pub expected: Vec<f64>,
    pub test: ChiSquareTest,
    pub failure: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DigitConformityData {
    pub decimals: u32,
    pub first_digit: DigitCheck,
    pub last_digit: DigitCheck,
}

/// Benford first-digit probabilities for digits 1 to 9.
pub fn benford_probabilities() -> [f64; 9] {
    std::array::from_fn(|i| (1.0 + 1.0 / (i + 1) as f64).log10())
}

fn to_integers(returns: &[f64], decimals: u32) -> Vec<u64> {
    let scale = 10f64.powi(decimals as i32);
    returns
        .iter()
        .map(|r| (r.abs() * scale + TRUNCATION_EPSILON).trunc() as u64)
        .collect()
}

fn leading_digit(mut value: u64) -> usize {
    while value >= 10 {
        value /= 10;
    }
    value as usize
}

/// Leading-digit counts of the values `>= 1`, index 0 holding digit 1.
pub fn first_digit_counts(values: &[u64]) -> [usize; 9] {
    let mut counts = [0; 9];
    for &v in values.iter().filter(|&&v| v >= 1) {
        counts[leading_digit(v) - 1] += 1;
    }
    counts
}

/// Final-digit counts of the values `>= 10`, index 0 holding digit 0.
pub fn last_digit_counts(values: &[u64]) -> [usize; 10] {
    let mut counts = [0; 10];
    for &v in values.iter().filter(|&&v| v >= 10) {
        counts[(v % 10) as usize] += 1;
    }
    counts
}

fn check(counts: &[usize], probabilities: &[f64], a: f64) -> Result<DigitCheck, BatteryError> {
    let test = chi_square_gof(counts, probabilities)?;
    Ok(DigitCheck {
        counts: counts.to_vec(),
        expected: probabilities.to_vec(),
        failure: test.p_value < a,
        test,
    })
}

pub fn first_digit_check(counts: &[usize; 9], a: f64) -> Result<DigitCheck, BatteryError> {
    check(counts, &benford_probabilities(), a)
}

pub fn last_digit_check(counts: &[usize; 10], a: f64) -> Result<DigitCheck, BatteryError> {
    check(counts, &[0.1; 10], a)
}

pub fn run(ctx: &EntityContext<'_>) -> Result<TestVerdict, BatteryError> {
    let decimals = ctx.params.decimals;
    let values = to_integers(ctx.returns(), decimals);

    let first_digit = first_digit_check(&first_digit_counts(&values), ctx.params.a)?;
    let last_digit = last_digit_check(&last_digit_counts(&values), ctx.params.a)?;

    tracing::debug!(
        entity = ctx.name(),
        first_p = first_digit.test.p_value,
        last_p = last_digit.test.p_value,
        "Digit conformity computed."
    );

    let checks = [first_digit.failure, last_digit.failure];
    Ok(TestVerdict::from_checks(
        ctx,
        &checks,
        VerdictData::DigitsConformity(DigitConformityData {
            decimals,
            first_digit,
            last_digit,
        }),
    ))
}
