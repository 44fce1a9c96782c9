//! Carbon intensity computation: emission factors, the per-day and rolling
//! calculators, and the reference curve & rating engine.

pub mod compute;
pub mod factors;
pub mod reference;
