//! Splitting a recruitment request into batches.
//!
//! MTurk charges an extra fee on tasks with ten or more assignments, so large
//! requests can be posted as several tasks of at most nine assignments each.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Largest batch that avoids the extra-participant fee.
pub const MAX_BATCH_WITHOUT_FEE: u32 = 9;

/// One task-creation request within a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentBatch {
    /// 1-based position in the plan.
    pub index: u32,
    pub assignments: u32,
    pub token: String,
}

/// Base idempotency token: `<experiment>_<YYYYMMDD_HHMM>`.
///
/// Minute resolution means a resubmission within the same clock minute is
/// rejected by the marketplace as a duplicate.
pub fn base_token<Tz: TimeZone>(experiment: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}", experiment, now.format("%Y%m%d_%H%M"))
}

/// Token of the batch at 1-based `index`.
pub fn batch_token(base: &str, index: u32) -> String {
    format!("{}_v{:03}", base, index)
}

/// Batch sizes for `total` assignments.
pub fn batch_sizes(total: u32, avoid_fee: bool) -> Vec<u32> {
    if total <= MAX_BATCH_WITHOUT_FEE || !avoid_fee {
        return vec![total];
    }

    let mut sizes = vec![MAX_BATCH_WITHOUT_FEE; (total / MAX_BATCH_WITHOUT_FEE) as usize];
    let remainder = total % MAX_BATCH_WITHOUT_FEE;
    if remainder > 0 {
        sizes.push(remainder);
    }
    sizes
}

/// Plan batches with their idempotency tokens.
pub fn plan_batches(total: u32, avoid_fee: bool, base: &str) -> Vec<DeploymentBatch> {
    batch_sizes(total, avoid_fee)
        .into_iter()
        .zip(1..)
        .map(|(assignments, index)| DeploymentBatch {
            index,
            assignments,
            token: batch_token(base, index),
        })
        .collect()
}

/// Whether `total` is large enough for the fee question to matter.
pub fn fee_applies(total: u32) -> bool {
    total > MAX_BATCH_WITHOUT_FEE
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_batch_sizes() {
        assert_eq!(batch_sizes(9, true), vec![9]);
        assert_eq!(batch_sizes(23, true), vec![9, 9, 5]);
        assert_eq!(batch_sizes(23, false), vec![23]);
        assert_eq!(batch_sizes(0, true), vec![0]);
        assert_eq!(batch_sizes(18, true), vec![9, 9]);
        assert_eq!(batch_sizes(10, true), vec![9, 1]);
    }

    #[test]
    fn test_tokens_are_sequential_and_padded() {
        let plan = plan_batches(23, true, "exp_20240101_1200");
        let tokens: Vec<&str> = plan.iter().map(|b| b.token.as_str()).collect();
        assert_eq!(
            tokens,
            vec![
                "exp_20240101_1200_v001",
                "exp_20240101_1200_v002",
                "exp_20240101_1200_v003",
            ]
        );
        assert_eq!(plan[2].index, 3);
        assert_eq!(plan[2].assignments, 5);
    }

    #[test]
    fn test_base_token_minute_resolution() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 59).unwrap();
        assert_eq!(base_token("exp", &now), "exp_20240101_1200");
    }

    #[test]
    fn test_fee_applies() {
        assert!(!fee_applies(9));
        assert!(fee_applies(10));
    }
}
