//! Source generation: emitting compilable units with shortest unambiguous
//! type references.
//!
//! The pieces, in dependency order:
//!
//! ```text
//! scan      lexical scanner over emitted text (block events)
//! scope     two-level scope tree driven by scan events
//! model     symbol metadata and the TypeModel capability
//! resolve   visibility classification (in scope / hidden / importable)
//! shorten   reference allocation and the import block
//! declare   deferred declarations, named on first use
//! locals    per-method local naming and field qualification
//! writer    the streaming UnitWriter tying it all together
//! ```

pub mod declare;
pub mod locals;
pub mod model;
pub mod resolve;
pub mod scan;
pub mod scope;
pub mod shorten;
pub mod writer;

pub use declare::{DeclId, DeferredDecls};
pub use locals::FieldAccess;
pub use model::{Overlay, SymbolVisibility, TableModel, TypeEntry, TypeModel};
pub use resolve::{RefScope, Shown, VisibilityResolver};
pub use scan::{BlockKind, EmitScanner, ScanEvent};
pub use scope::{ScopeKey, ScopeLevel, ScopeTree, ScopeValue};
pub use shorten::{DefaultImportPolicy, ImportPolicy, ReferenceAllocator, Shortening, Usage};
pub use writer::{Fragment, Piece, UnitWriter};
