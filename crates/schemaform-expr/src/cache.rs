//! FIFO cache of compiled expressions

use crate::compiler::CompiledExpression;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
	/// Number of cache hits
	pub hits: u64,
	/// Number of cache misses
	pub misses: u64,
	/// Total number of lookups
	pub total_requests: u64,
	/// Number of entries evicted to make room
	pub evictions: u64,
	/// Number of expression bodies parsed
	pub compilations: u64,
	/// Current number of entries in cache
	pub entry_count: u64,
	/// Maximum number of entries
	pub capacity: u64,
}

impl CacheStatistics {
	/// Calculate hit rate (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use schemaform_expr::CacheStatistics;
	///
	/// let mut stats = CacheStatistics::default();
	/// stats.hits = 3;
	/// stats.misses = 1;
	/// stats.total_requests = 4;
	///
	/// assert_eq!(stats.hit_rate(), 0.75);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.hits as f64 / self.total_requests as f64
		}
	}
}

#[derive(Default)]
struct CacheState {
	entries: HashMap<String, Arc<CompiledExpression>>,
	/// Insertion order, oldest first
	order: VecDeque<String>,
}

/// Bounded map from expression source to its compiled form
///
/// Eviction is first-in-first-out: once `capacity` entries are held, inserting
/// a new one drops the oldest insertion regardless of how often it is read.
/// Lookup and the evict-then-insert step each run under the lock; nothing
/// else does, so a compiled expression may re-enter the cache while it runs.
pub struct ExpressionCache {
	state: Mutex<CacheState>,
	capacity: usize,
	hits: AtomicU64,
	misses: AtomicU64,
	evictions: AtomicU64,
}

impl ExpressionCache {
	pub fn new(capacity: usize) -> Self {
		Self {
			state: Mutex::new(CacheState::default()),
			capacity: capacity.max(1),
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
		}
	}

	pub fn get(&self, source: &str) -> Option<Arc<CompiledExpression>> {
		let found = self.state.lock().entries.get(source).cloned();
		let counter = if found.is_some() {
			&self.hits
		} else {
			&self.misses
		};
		counter.fetch_add(1, Ordering::Relaxed);
		found
	}

	/// Insert a compiled expression, returning the cached instance
	///
	/// If another caller inserted the same source first, that entry wins and
	/// is returned so every caller shares one instance.
	pub fn insert(&self, compiled: Arc<CompiledExpression>) -> Arc<CompiledExpression> {
		let mut state = self.state.lock();
		if let Some(existing) = state.entries.get(compiled.source()) {
			return Arc::clone(existing);
		}

		while state.entries.len() >= self.capacity {
			let Some(oldest) = state.order.pop_front() else {
				break;
			};
			state.entries.remove(&oldest);
			self.evictions.fetch_add(1, Ordering::Relaxed);
			tracing::trace!(expression = %oldest, "evicted compiled expression");
		}

		let source = compiled.source().to_string();
		state.order.push_back(source.clone());
		state.entries.insert(source, Arc::clone(&compiled));
		compiled
	}

	pub fn contains(&self, source: &str) -> bool {
		self.state.lock().entries.contains_key(source)
	}

	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Drop every entry; counters are kept
	pub fn clear(&self) {
		let mut state = self.state.lock();
		let dropped = state.entries.len();
		state.entries.clear();
		state.order.clear();
		tracing::debug!(entries = dropped, "cleared expression cache");
	}

	pub fn statistics(&self) -> CacheStatistics {
		let hits = self.hits.load(Ordering::Relaxed);
		let misses = self.misses.load(Ordering::Relaxed);
		CacheStatistics {
			hits,
			misses,
			total_requests: hits + misses,
			evictions: self.evictions.load(Ordering::Relaxed),
			compilations: 0,
			entry_count: self.len() as u64,
			capacity: self.capacity as u64,
		}
	}
}

impl std::fmt::Debug for ExpressionCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ExpressionCache")
			.field("entries", &self.len())
			.field("capacity", &self.capacity)
			.finish()
	}
}
