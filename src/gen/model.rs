//! Symbol metadata: visibility levels and the type-model capability.
//!
//! The resolver never inspects symbols directly; it goes through the
//! [`TypeModel`] trait so the same machinery works whether metadata comes
//! from a pre-compiled symbol table ([`TableModel`]) or from types the
//! current unit is generating right now ([`Overlay`]).

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::TypeName;

/// Declared visibility of a known type.
///
/// `Unknown` marks in-progress generated types that have been announced but
/// not fully declared; they are treated as reachable everywhere so forward
/// references inside the same unit resolve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolVisibility {
    Public,
    Protected,
    PackageLocal,
    Private,
    Unknown,
}

/// Metadata for one known type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeEntry {
    /// The type's qualified name.
    pub name: TypeName,
    /// Declared visibility level.
    pub visibility: SymbolVisibility,
    /// Direct supertypes: superclass first (if any), then interfaces.
    pub supertypes: Vec<TypeName>,
    /// Whether the host type system flagged this symbol as broken.
    /// References to such a type are rejected before any text is emitted.
    pub unresolvable: bool,
}

impl TypeEntry {
    /// A well-formed entry with the given visibility and no supertypes.
    pub fn new(name: TypeName, visibility: SymbolVisibility) -> Self {
        Self {
            name,
            visibility,
            supertypes: Vec::new(),
            unresolvable: false,
        }
    }

    /// Attach direct supertypes.
    pub fn with_supertypes(mut self, supertypes: Vec<TypeName>) -> Self {
        self.supertypes = supertypes;
        self
    }

    /// Mark this entry as a known-broken placeholder.
    pub fn unresolvable(mut self) -> Self {
        self.unresolvable = true;
        self
    }
}

/// Capability interface for inspecting symbol metadata.
///
/// Implementations must answer three questions: what is known about a type,
/// which types are nested directly inside it, and which top-level types a
/// package declares.
pub trait TypeModel {
    /// Metadata for `name`, if this model knows the type.
    fn lookup(&self, name: &TypeName) -> Option<&TypeEntry>;

    /// Types nested directly inside `name`.
    fn nested(&self, name: &TypeName) -> Vec<TypeName>;

    /// Top-level types declared in `package`.
    fn top_level(&self, package: &str) -> Vec<TypeName>;
}

/// In-memory symbol table, the "live compiler model" implementation.
///
/// `insert` maintains the nesting and package indexes, so one table serves
/// both referencing-scope shapes the resolver works with. The package index
/// is an `IndexMap` to keep member listings in registration order.
#[derive(Default)]
pub struct TableModel {
    by_name: FxHashMap<TypeName, TypeEntry>,
    nested: FxHashMap<TypeName, Vec<TypeName>>,
    by_package: IndexMap<SmolStr, Vec<TypeName>>,
}

impl TableModel {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. Re-registering a name replaces its entry but keeps
    /// its position in the indexes.
    pub fn insert(&mut self, entry: TypeEntry) {
        let name = entry.name.clone();
        if self.by_name.insert(name.clone(), entry).is_some() {
            return;
        }
        if let Some(enclosing) = name.enclosing() {
            self.nested.entry(enclosing).or_default().push(name);
        } else {
            self.by_package
                .entry(SmolStr::new(name.package()))
                .or_default()
                .push(name);
        }
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no types are registered.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl TypeModel for TableModel {
    fn lookup(&self, name: &TypeName) -> Option<&TypeEntry> {
        self.by_name.get(name)
    }

    fn nested(&self, name: &TypeName) -> Vec<TypeName> {
        self.nested.get(name).cloned().unwrap_or_default()
    }

    fn top_level(&self, package: &str) -> Vec<TypeName> {
        self.by_package.get(package).cloned().unwrap_or_default()
    }
}

/// Generated types layered over a base model.
///
/// Types the unit is generating are registered here as the scanner sees
/// their declarations, with supertypes recorded eagerly, so the resolver
/// treats them exactly like pre-existing symbols. Generated entries win
/// over base entries with the same name.
pub struct Overlay<'m> {
    base: &'m dyn TypeModel,
    generated: TableModel,
}

impl<'m> Overlay<'m> {
    /// Layer an empty generated table over `base`.
    pub fn new(base: &'m dyn TypeModel) -> Self {
        Self {
            base,
            generated: TableModel::new(),
        }
    }

    /// Layer an already-populated generated table over `base`.
    pub fn with_generated(base: &'m dyn TypeModel, generated: TableModel) -> Self {
        Self { base, generated }
    }

    /// Register an in-progress generated type.
    pub fn register(&mut self, entry: TypeEntry) {
        self.generated.insert(entry);
    }
}

impl TypeModel for Overlay<'_> {
    fn lookup(&self, name: &TypeName) -> Option<&TypeEntry> {
        self.generated.lookup(name).or_else(|| self.base.lookup(name))
    }

    fn nested(&self, name: &TypeName) -> Vec<TypeName> {
        let mut all = self.generated.nested(name);
        for n in self.base.nested(name) {
            if !all.contains(&n) {
                all.push(n);
            }
        }
        all
    }

    fn top_level(&self, package: &str) -> Vec<TypeName> {
        let mut all = self.generated.top_level(package);
        for n in self.base.top_level(package) {
            if !all.contains(&n) {
                all.push(n);
            }
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &TypeName) -> TypeEntry {
        TypeEntry::new(name.clone(), SymbolVisibility::Public)
    }

    #[test]
    fn test_table_indexes_top_level_by_package() {
        let mut table = TableModel::new();
        let a = TypeName::top_level("p", "A");
        let b = TypeName::top_level("p", "B");
        let other = TypeName::top_level("q", "C");
        table.insert(entry(&a));
        table.insert(entry(&b));
        table.insert(entry(&other));

        assert_eq!(table.top_level("p"), vec![a, b]);
        assert_eq!(table.top_level("q"), vec![other]);
        assert!(table.top_level("r").is_empty());
    }

    #[test]
    fn test_table_indexes_nested() {
        let mut table = TableModel::new();
        let outer = TypeName::top_level("p", "Outer");
        let inner = outer.nested("Inner");
        table.insert(entry(&outer));
        table.insert(entry(&inner));

        assert_eq!(table.nested(&outer), vec![inner.clone()]);
        // Nested types do not appear in the package listing.
        assert_eq!(table.top_level("p"), vec![outer]);
        assert!(table.lookup(&inner).is_some());
    }

    #[test]
    fn test_reinsert_keeps_single_index_entry() {
        let mut table = TableModel::new();
        let a = TypeName::top_level("p", "A");
        table.insert(entry(&a));
        table.insert(TypeEntry::new(a.clone(), SymbolVisibility::Private));

        assert_eq!(table.top_level("p").len(), 1);
        assert_eq!(
            table.lookup(&a).map(|e| e.visibility),
            Some(SymbolVisibility::Private)
        );
    }

    #[test]
    fn test_overlay_prefers_generated() {
        let mut base = TableModel::new();
        let a = TypeName::top_level("p", "A");
        base.insert(entry(&a));

        let mut overlay = Overlay::new(&base);
        overlay.register(TypeEntry::new(a.clone(), SymbolVisibility::Unknown));

        assert_eq!(
            overlay.lookup(&a).map(|e| e.visibility),
            Some(SymbolVisibility::Unknown)
        );
    }

    #[test]
    fn test_overlay_merges_listings() {
        let mut base = TableModel::new();
        let a = TypeName::top_level("p", "A");
        base.insert(entry(&a));

        let mut overlay = Overlay::new(&base);
        let b = TypeName::top_level("p", "B");
        overlay.register(TypeEntry::new(b.clone(), SymbolVisibility::Unknown));

        let tops = overlay.top_level("p");
        assert!(tops.contains(&a));
        assert!(tops.contains(&b));
        assert_eq!(tops.len(), 2);
    }
}
