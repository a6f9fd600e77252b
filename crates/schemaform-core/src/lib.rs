//! Shared value model for the schemaform engines
//!
//! This crate provides:
//! - [`Value`], the dynamic value tree consumed by expressions and diffs
//! - [`ObjectHandle`] for lazily read field and form handles
//! - host-compatible coercions (truthiness, numeric/string conversion, equality)
//! - dot-path helpers

pub mod coerce;
pub mod error;
pub mod path;
pub mod value;

pub use coerce::{
	format_number, is_truthy, loose_equals, strict_equals, string_to_number, to_display_string,
	to_number, type_of,
};
pub use error::{CoreError, CoreResult};
pub use path::{get_by_path, join_path, split_path};
pub use value::{Map, ObjectHandle, RegexValue, Value};
