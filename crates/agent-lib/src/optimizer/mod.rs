//! Resource optimization recommendations
//!
//! Rule evaluation is pure; applying a recommendation may reach a live
//! compute backend unless running dry or in simulation mode.

mod engine;
mod rules;

pub use engine::{RecommendationEngine, RESIZE_TARGET_SIZE, SIMULATED_VM_SIZE};
pub use rules::{recommend, MetricCategory};
