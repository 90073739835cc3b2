//! Application layer for constraint-graph preprocessing
//!
//! Use cases orchestrating domain and infrastructure:
//! - **OfflinePreprocessor**: the round driver (init → seed → run → teardown)
//! - **SeedPolicy**: strategies electing the pointers worth refining

pub mod preprocessor;
pub mod seeding;

pub use preprocessor::{OfflinePreprocessor, PrepStats};
pub use seeding::SeedPolicy;
