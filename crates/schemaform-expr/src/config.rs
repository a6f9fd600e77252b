//! Compiler configuration

use crate::error::ExpressionResult;
use serde::{Deserialize, Serialize};

/// Default number of compiled expressions kept in the cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Settings for an [`ExpressionCompiler`](crate::ExpressionCompiler)
///
/// # Examples
///
/// ```
/// use schemaform_expr::CompilerConfig;
///
/// let config = CompilerConfig::from_toml_str("cache_capacity = 64").unwrap();
/// assert_eq!(config.cache_capacity, 64);
/// assert!(config.warn_on_runtime_error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
	/// Maximum number of cached compiled expressions (FIFO eviction)
	pub cache_capacity: usize,
	/// Emit a `warn!` event when an expression fails at runtime
	pub warn_on_runtime_error: bool,
}

impl CompilerConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the cache capacity. Zero is clamped to one entry.
	pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
		self.cache_capacity = capacity;
		self
	}

	pub fn with_runtime_warnings(mut self, enabled: bool) -> Self {
		self.warn_on_runtime_error = enabled;
		self
	}

	/// Load settings from a TOML document; missing keys keep their defaults
	pub fn from_toml_str(source: &str) -> ExpressionResult<Self> {
		Ok(toml::from_str(source)?)
	}

	pub(crate) fn effective_capacity(&self) -> usize {
		self.cache_capacity.max(1)
	}
}

impl Default for CompilerConfig {
	fn default() -> Self {
		Self {
			cache_capacity: DEFAULT_CACHE_CAPACITY,
			warn_on_runtime_error: true,
		}
	}
}
