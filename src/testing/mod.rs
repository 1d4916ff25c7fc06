//! Testing infrastructure for zerogate.
//!
//! - **Mocks**: [`ScriptedRunner`] replaces real processes with scripted
//!   exit codes, output and delays
//! - **Assertions**: report-level assertions with descriptive panics
//!
//! # Example
//!
//! ```rust,ignore
//! use zerogate::testing::{ScriptedOutcome, ScriptedRunner, assert_result_order};
//!
//! let runner = ScriptedRunner::new()
//!     .with_outcome("typecheck", ScriptedOutcome::exit(1));
//! ```

pub mod assertions;
pub mod mocks;

pub use assertions::*;
pub use mocks::*;
