//! Common test infrastructure
//!
//! Integration tests build a store in a temporary directory, seed it through the
//! public resolvers and query it through [`StatsService`]. Tests should only import
//! from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestContext, NOW_MS};
//!
//! #[test]
//! fn test_something() {
//!     let ctx = TestContext::new();
//!     let track = ctx.add_track("Air", "La Femme d'Argent", None);
//!     ctx.play(track.id, NOW_MS - 1000, 60_000);
//! }
//! ```

#![allow(dead_code)]

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::*;
