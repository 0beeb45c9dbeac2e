//! Scenario-based tests for stagerun
//!
//! Each scenario drives the execution engine with a mock command executor
//! and a mock readiness check, then inspects stage states and events.


mod best_effort;
mod failure_handling;
mod reporting;
mod service_readiness;
mod success_chain;
