//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides the damped least-squares solver the concentration
//! estimator runs once per measurement. It is split into the damping schedule
//! ([`trust_region`]), the linear step ([`step`]), termination tests
//! ([`convergence`]) and the driver loop ([`algorithm`]).

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;
pub mod trust_region;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, StepResult};
pub use trust_region::TrustRegion;
