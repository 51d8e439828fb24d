//! opa-pvp core library.
//!
//! This crate turns already-evaluated OPA decisions into compliance
//! observations: it normalizes decision documents of any supported shape,
//! indexes them by policy/check id, and maps them to pass/fail/error
//! subjects grouped per check.
//!
//! High-level modules:
//! - `normalize`: Shape detection and decision extraction (pure).
//! - `loader`: Recursive directory load into a `ResultIndex`.
//! - `observe`: Verdict mapping and per-check observations.
//! - `compose`: Policy set generation and `opa build` bundling.
//! - `config`: Discovery and effective configuration resolution.
//! - `models`: Normalized results, catalog, and observation structs.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `output`: Human/JSON printers.
//! - `utils`: Supporting helpers.
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod observe;
pub mod output;
pub mod utils;

pub use error::{Error, Result};
pub use loader::ResultIndex;
pub use models::NormalizedResult;
pub use normalize::normalize;
pub use observe::{DirectReader, ObservationMapper, ResultSource, VerdictPolicy};
