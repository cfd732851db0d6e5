//! Foundation types for the quill generator.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`TypeName`] - Qualified names for (possibly nested) types
//! - [`EmitError`], [`Result`] - The error taxonomy
//!
//! This module has NO dependencies on other quill modules.

mod error;
mod name;

pub use error::{EmitError, Result};
pub use name::TypeName;
