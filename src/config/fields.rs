//! Canonical field names with fixed meaning in the normalizer.
//!
//! Any other field declared in a source's synonym table is carried through
//! as a record attribute.

/// Job number a row is billed or charged to.
pub const JOB: &str = "job";
/// Cost code within a job.
pub const COST_CODE: &str = "cost_code";
/// Allocation units (equipment share).
pub const UNITS: &str = "units";
/// Rate per allocation unit.
pub const RATE: &str = "rate";
/// Billed amount.
pub const AMOUNT: &str = "amount";
