//! Core domain models for a staged pipeline
//!
//! This module defines the fundamental data structures that represent
//! pipelines, stages, commands, services and their configuration.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod stage;
pub mod state;

pub use command::*;
pub use context::*;
pub use error::*;
pub use pipeline::*;
pub use service::*;
pub use stage::*;
pub use state::*;
