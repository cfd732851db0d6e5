//! Hierarchical key/value scopes tracking emitted block structure.
//!
//! Scopes form a tree with exactly two storage levels: the FILE scope at
//! the root and METHOD scopes opened for method (and other brace) bodies.
//! Nodes live in an arena and are addressed by [`ScopeId`]; child-to-parent
//! links are plain handles, so there is no ownership cycle to manage.
//!
//! Insertion is level-gated: a key declares the level it may be stored at,
//! and a request made in the wrong scope is forwarded up the chain. An
//! error is raised only when no ancestor can legally hold the key.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{EmitError, Result};
use super::declare::DeclId;

/// The storage level a scope (and a scope key) belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeLevel {
    /// The compilation unit itself. There is exactly one FILE scope, the
    /// root; type bodies share it for storage purposes.
    File,
    /// A method body, or any other brace block that can declare locals.
    Method,
}

/// A typed key in the scope tree. Each variant declares its storage level.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// A deferred declaration bound to `name`. FILE level, so the binding
    /// is visible from every nested block in the unit.
    Declaration(SmolStr),
    /// A local variable named `name`. METHOD level.
    Local(SmolStr),
    /// A field access forced to an explicit `this.` qualifier. METHOD level.
    QualifiedField(SmolStr),
}

impl ScopeKey {
    /// The level this key may be stored at.
    pub fn level(&self) -> ScopeLevel {
        match self {
            ScopeKey::Declaration(_) => ScopeLevel::File,
            ScopeKey::Local(_) | ScopeKey::QualifiedField(_) => ScopeLevel::Method,
        }
    }
}

/// The value stored under a [`ScopeKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeValue {
    /// The declaration bound to a [`ScopeKey::Declaration`] name.
    Declaration(DeclId),
    /// Marker value for locals and qualified fields.
    Marker,
}

/// Handle to a node in the scope arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

struct ScopeNode {
    level: ScopeLevel,
    parent: Option<ScopeId>,
    entries: FxHashMap<ScopeKey, ScopeValue>,
}

/// Arena of scope nodes with a cursor at the innermost open scope.
///
/// Scopes open and close in strict nesting order as the scanner observes
/// block boundaries; a closed scope's entries are dropped with it.
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
    current: ScopeId,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a tree holding only the FILE scope.
    pub fn new() -> Self {
        Self {
            nodes: vec![ScopeNode {
                level: ScopeLevel::File,
                parent: None,
                entries: FxHashMap::default(),
            }],
            current: ScopeId(0),
        }
    }

    /// Open a child scope of the current one and move the cursor into it.
    pub fn open(&mut self, level: ScopeLevel) -> ScopeId {
        let id = ScopeId(self.nodes.len() as u32);
        self.nodes.push(ScopeNode {
            level,
            parent: Some(self.current),
            entries: FxHashMap::default(),
        });
        self.current = id;
        id
    }

    /// Close the current scope, dropping its entries.
    pub fn close(&mut self) -> Result<()> {
        let node = &mut self.nodes[self.current.0 as usize];
        let Some(parent) = node.parent else {
            return Err(EmitError::ClosedFileScope);
        };
        node.entries.clear();
        self.current = parent;
        Ok(())
    }

    fn node(&self, id: ScopeId) -> &ScopeNode {
        &self.nodes[id.0 as usize]
    }

    /// The node that may legally hold `key`, walking up from the cursor.
    fn storage_scope(&self, key: &ScopeKey) -> Result<ScopeId> {
        match key.level() {
            // FILE keys always land in the file scope itself.
            ScopeLevel::File => Ok(ScopeId(0)),
            ScopeLevel::Method => {
                let mut cursor = Some(self.current);
                while let Some(id) = cursor {
                    if self.node(id).level == ScopeLevel::Method {
                        return Ok(id);
                    }
                    cursor = self.node(id).parent;
                }
                Err(EmitError::NoEligibleScope("method"))
            }
        }
    }

    /// Look up `key`, walking from the current scope to the root.
    pub fn lookup(&self, key: &ScopeKey) -> Option<&ScopeValue> {
        self.lookup_from(self.current, key)
    }

    /// Look up `key` starting from an explicit scope.
    pub fn lookup_from(&self, scope: ScopeId, key: &ScopeKey) -> Option<&ScopeValue> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let node = self.node(id);
            if let Some(value) = node.entries.get(key) {
                return Some(value);
            }
            cursor = node.parent;
        }
        None
    }

    /// Whether `key` is visible from the current scope.
    pub fn contains(&self, key: &ScopeKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Insert `key` at its level-gated scope unless already present there.
    ///
    /// Returns `true` if the value was inserted.
    pub fn put_if_absent(&mut self, key: ScopeKey, value: ScopeValue) -> Result<bool> {
        let target = self.storage_scope(&key)?;
        let entries = &mut self.nodes[target.0 as usize].entries;
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, value);
        Ok(true)
    }

    /// Return the value visible under `key`, inserting the supplied value
    /// at the level-gated scope if nothing in the chain holds one.
    pub fn get_or_insert_with(
        &mut self,
        key: ScopeKey,
        supplier: impl FnOnce() -> ScopeValue,
    ) -> Result<ScopeValue> {
        if let Some(value) = self.lookup(&key) {
            return Ok(value.clone());
        }
        let target = self.storage_scope(&key)?;
        let value = supplier();
        self.nodes[target.0 as usize]
            .entries
            .insert(key, value.clone());
        Ok(value)
    }

    /// All deferred declarations visible from the current scope.
    ///
    /// This is the `keys-of-type` aggregation: it collects matching keys
    /// from the current node and every ancestor (declarations live in the
    /// file scope, so in practice this surfaces the whole unit's set).
    pub fn declarations(&self) -> Vec<(SmolStr, DeclId)> {
        let mut found = Vec::new();
        let mut cursor = Some(self.current);
        while let Some(id) = cursor {
            let node = self.node(id);
            for (key, value) in &node.entries {
                if let (ScopeKey::Declaration(name), ScopeValue::Declaration(decl)) = (key, value) {
                    found.push((name.clone(), *decl));
                }
            }
            cursor = node.parent;
        }
        found
    }
}
