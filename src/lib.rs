//! # quill
//!
//! Core library for emitting readable Java-like source: streaming unit
//! writers that pick the shortest unambiguous spelling for every type
//! reference and manage imports, deferred declarations, and local names.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! gen     → Generation pipeline (scanner, scopes, resolver, writer)
//!   ↓
//! base    → Primitives (TypeName, error types)
//! ```
//!
//! The usual entry point is [`gen::UnitWriter`]: create one per compilation
//! unit over a [`gen::TypeModel`], stream text and typed references into it,
//! and call `finish` to obtain the final unit with its import block.

/// Foundation types: qualified names, error taxonomy
pub mod base;

/// Source generation: scanning, scoping, resolution, emission
pub mod r#gen;

// Re-export the types almost every caller touches
pub use base::{EmitError, Result, TypeName};
pub use r#gen::{Fragment, SymbolVisibility, TableModel, TypeEntry, TypeModel, UnitWriter};
