//! Utility functions and helpers for the spectro-kinetics library.

pub mod finite_difference;

pub use finite_difference::jacobian;
