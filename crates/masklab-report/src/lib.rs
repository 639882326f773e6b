//! masklab-report — cohort aggregation over classroom attempt ledgers.

pub mod cohort;
