//! Value-tree comparison for schemaform
//!
//! This crate provides:
//! - [`deep_equal`], structural equality over [`Value`](schemaform_core::Value) trees
//! - [`diff`], a flat list of per-path entries between a baseline and a live tree
//! - [`get_diff_view`], the same classification shaped as UI rows
//!
//! All operations are pure and infallible.

pub mod diff;
pub mod equality;
pub mod view;

pub use diff::{DiffEntry, DiffResult, DiffType, diff};
pub use equality::deep_equal;
pub use view::{DiffFieldView, get_diff_view};
