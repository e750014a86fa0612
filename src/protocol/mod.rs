//! Transfer protocol messages
//!
//! This module implements the envelope catalog and its binary body
//! encoding. Framing (length prefixes) lives in [`crate::channel`].

mod build;
mod parse;
mod types;

pub use build::build_envelope;
pub use parse::{parse_envelope, ParseError};
pub use types::*;
