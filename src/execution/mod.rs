//! Pipeline execution: stage sequencing, readiness probing and reporting

pub mod engine;
pub mod executor;
pub(crate) mod http;
pub mod prober;
pub mod reporter;
pub mod services;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::StageExecutor;
pub use prober::{ProbeReport, ReadinessCheck, ReadinessProber, SystemReadinessCheck};
pub use reporter::{CoverageReport, HttpReportSink, ReportSink, ResultReporter, StageSummary};
pub use services::ServiceHandle;
