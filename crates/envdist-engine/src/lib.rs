//! Deterministic merge-and-resolve engine for per-service env files.
//!
//! The engine turns an ordered set of override files into a fully resolved
//! document in four steps: locate, merge, sanitize, resolve. It performs no
//! I/O beyond reading the override files and never consults the process
//! environment, so identical inputs produce byte-identical output.

mod merge;
mod resolve;
mod sanitize;
mod source;
mod tier;

pub use merge::{merge, MergedDocument};
pub use resolve::{resolve, ResolvedDocument, Strategy};
pub use sanitize::sanitize;
pub use source::{OverrideFile, OverrideKind, SourceError, SourceSet, TEMPLATE_MARKER};
pub use tier::{Tier, TierParseError};
