//! Deferred declarations: auxiliary definitions named on first use and
//! materialized exactly once.
//!
//! A declaration is registered with a preferred name and a definition
//! fragment. Nothing is emitted until the declaration is actually used;
//! the first use probes the file scope for a free name (`Helper`,
//! `Helper2`, `Helper3`, ...) and binds it permanently to that definition
//! instance. Rendering happens during the writer's flush, which runs to
//! fixpoint because expanding one body can pull in more declarations.

use smol_str::SmolStr;
use tracing::trace;

use crate::base::Result;
use super::scope::{ScopeKey, ScopeTree, ScopeValue};
use super::writer::Fragment;

/// Identity handle for a registered declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

impl DeclId {
    /// Create a handle from a raw index.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

struct DeclState {
    preferred: SmolStr,
    body: Fragment,
    bound: Option<SmolStr>,
    rendered: bool,
}

/// Registry of deferred declarations for one compilation unit.
#[derive(Default)]
pub struct DeferredDecls {
    decls: Vec<DeclState>,
}

impl DeferredDecls {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under a preferred name.
    ///
    /// Declaring the same body twice creates two independent declarations;
    /// identity is the returned handle, not the preferred name.
    pub fn declare(&mut self, preferred: impl Into<SmolStr>, body: Fragment) -> DeclId {
        let id = DeclId::new(self.decls.len() as u32);
        self.decls.push(DeclState {
            preferred: preferred.into(),
            body,
            bound: None,
            rendered: false,
        });
        id
    }

    /// The name bound to `id`, binding it now if this is the first use.
    ///
    /// Probes `preferred`, `preferred2`, `preferred3`, ... against the file
    /// scope until a free slot is claimed. The winning name is permanent.
    pub fn bind(&mut self, id: DeclId, scopes: &mut ScopeTree) -> Result<SmolStr> {
        let state = &mut self.decls[id.index() as usize];
        if let Some(name) = &state.bound {
            return Ok(name.clone());
        }
        let mut attempt = 1usize;
        let name = loop {
            let candidate = if attempt == 1 {
                state.preferred.clone()
            } else {
                SmolStr::new(format!("{}{}", state.preferred, attempt))
            };
            let key = ScopeKey::Declaration(candidate.clone());
            if scopes.put_if_absent(key, ScopeValue::Declaration(id))? {
                break candidate;
            }
            attempt += 1;
        };
        trace!(preferred = %state.preferred, bound = %name, "bound deferred declaration");
        state.bound = Some(name.clone());
        Ok(name)
    }

    /// The definition body for `id`.
    pub fn body(&self, id: DeclId) -> &Fragment {
        &self.decls[id.index() as usize].body
    }

    /// Whether `id` has already been materialized.
    pub fn is_rendered(&self, id: DeclId) -> bool {
        self.decls[id.index() as usize].rendered
    }

    /// Mark `id` as materialized.
    pub fn mark_rendered(&mut self, id: DeclId) {
        self.decls[id.index() as usize].rendered = true;
    }
}
