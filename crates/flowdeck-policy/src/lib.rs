//! Sandboxed evaluation of separation-of-duties policy scripts.
//!
//! A policy script is user-authored source text attached to an `sod-policy`
//! workflow node. It must define a function named `validateSOD` that judges
//! whether a user may perform an action. The evaluator assembles the script
//! with a fixed harness, compiles it to `wasm32-wasip1`, and runs it under
//! Wasmtime in a disposable store with a bounded execution budget.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  PolicyEvaluator                                         │
//! │  - Contract check + harness assembly                     │
//! │  - cargo build --target wasm32-wasip1 (SHA-256 cached)   │
//! │  - Fresh Store + WASI pipes per invocation               │
//! │  - Fuel + wall-clock budget, outcome folding             │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod contract;
pub mod error;
pub mod evaluator;
pub mod verdict;

pub use contract::{ENTRY_POINT, assemble_guest_source, check_contract};
pub use error::{PolicyError, Result};
pub use evaluator::{DEFAULT_BUDGET, EvaluatorConfig, PolicyEvaluator};
pub use verdict::{EvaluationInput, EvaluationOutcome, Verdict};
