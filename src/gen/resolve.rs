//! Visibility classification for candidate references.
//!
//! Given a referencing scope and a candidate type, [`VisibilityResolver`]
//! decides whether the candidate's simple name is already reachable
//! ([`Shown::InScope`]), blocked by a conflicting symbol ([`Shown::Hidden`]),
//! or reachable only once an import directive is added
//! ([`Shown::Importable`]).
//!
//! This mirrors the target language's nested-scope shadowing rules just
//! closely enough to never emit a short name that an inherited or nested
//! symbol would accidentally shadow; it is not a type checker.

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::trace;

use crate::base::TypeName;
use super::model::{SymbolVisibility, TypeModel};

/// Three-way classification of a candidate reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Shown {
    /// Already unambiguously reachable by its simple name.
    InScope,
    /// Another symbol with the same simple name dominates this scope; the
    /// candidate can only be spelled fully qualified.
    Hidden,
    /// Reachable unambiguously if an import directive is added.
    Importable,
}

/// The scope a reference occurs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefScope {
    /// Top-of-file context: only the package is in effect.
    Package(SmolStr),
    /// Inside the body of a specific (possibly nested) type.
    TypeBody(TypeName),
}

impl RefScope {
    /// Build a package scope.
    pub fn package(package: impl Into<SmolStr>) -> Self {
        RefScope::Package(package.into())
    }
}

/// Per-type map from simple name to the symbols visible under it.
type VisibleSet = FxHashMap<SmolStr, Vec<TypeName>>;

/// Classifies candidate references against a [`TypeModel`].
///
/// Visible-member sets are memoized per type, populated lazily, since many
/// usage sites tend to reference the same ancestor chains. A guard set
/// breaks supertype cycles (possible in not-yet-compiled generated code).
pub struct VisibilityResolver<'m> {
    model: &'m dyn TypeModel,
    visible: RefCell<FxHashMap<TypeName, Arc<VisibleSet>>>,
    in_progress: RefCell<FxHashSet<TypeName>>,
}

impl<'m> VisibilityResolver<'m> {
    /// Create a resolver over `model`.
    pub fn new(model: &'m dyn TypeModel) -> Self {
        Self {
            model,
            visible: RefCell::new(FxHashMap::default()),
            in_progress: RefCell::new(FxHashSet::default()),
        }
    }

    /// Classify `candidate` as seen from `scope`.
    pub fn classify(&self, scope: &RefScope, candidate: &TypeName) -> Shown {
        let shown = match scope {
            RefScope::Package(package) => self.classify_in_package(package, candidate),
            RefScope::TypeBody(body) => self.classify_in_type(body, candidate),
        };
        trace!(?scope, candidate = %candidate, ?shown, "classified");
        shown
    }

    fn classify_in_package(&self, package: &str, candidate: &TypeName) -> Shown {
        let members = self.model.top_level(package);
        if candidate.is_top_level() && candidate.package() == package {
            if members.contains(candidate) {
                return Shown::InScope;
            }
        }
        let clash = members
            .iter()
            .any(|m| m.simple_name() == candidate.simple_name());
        if clash { Shown::Hidden } else { Shown::Importable }
    }

    fn classify_in_type(&self, body: &TypeName, candidate: &TypeName) -> Shown {
        let visible = self.visible_members(body);
        match visible.get(candidate.simple_name()) {
            Some(matches) if matches.len() == 1 && matches[0] == *candidate => Shown::InScope,
            Some(_) => Shown::Hidden,
            None => match body.enclosing() {
                Some(enclosing) => self.classify_in_type(&enclosing, candidate),
                None => self.classify_in_package(body.package(), candidate),
            },
        }
    }

    /// The set of type symbols visible inside `body`: its directly nested
    /// types plus, for each supertype, everything visible there that the
    /// admission rule lets through. Memoized per type.
    fn visible_members(&self, body: &TypeName) -> Arc<VisibleSet> {
        if let Some(set) = self.visible.borrow().get(body) {
            return set.clone();
        }
        if !self.in_progress.borrow_mut().insert(body.clone()) {
            // Supertype cycle: treat the in-progress type as contributing
            // nothing rather than recursing forever.
            return Arc::new(VisibleSet::default());
        }

        let mut set = VisibleSet::default();
        for nested in self.model.nested(body) {
            add_visible(&mut set, nested);
        }
        let supertypes = self
            .model
            .lookup(body)
            .map(|e| e.supertypes.clone())
            .unwrap_or_default();
        for supertype in &supertypes {
            let inherited = self.visible_members(supertype);
            for members in inherited.values() {
                for member in members {
                    if self.admitted(member, body) {
                        add_visible(&mut set, member.clone());
                    }
                }
            }
        }

        let set = Arc::new(set);
        self.in_progress.borrow_mut().remove(body);
        self.visible.borrow_mut().insert(body.clone(), set.clone());
        set
    }

    /// The admission rule: does `member`, reached through inheritance, leak
    /// into `viewer`'s scope?
    fn admitted(&self, member: &TypeName, viewer: &TypeName) -> bool {
        let visibility = self
            .model
            .lookup(member)
            .map(|e| e.visibility)
            .unwrap_or(SymbolVisibility::Unknown);
        match visibility {
            // Inherited, or a forward-declared generated type.
            SymbolVisibility::Public | SymbolVisibility::Protected | SymbolVisibility::Unknown => {
                true
            }
            SymbolVisibility::PackageLocal => member.package() == viewer.package(),
            // Private members are never inherited.
            SymbolVisibility::Private => {
                member.enclosing().is_some_and(|enclosing| enclosing == *viewer)
            }
        }
    }
}

fn add_visible(set: &mut VisibleSet, name: TypeName) {
    let members = set.entry(SmolStr::new(name.simple_name())).or_default();
    if !members.contains(&name) {
        members.push(name);
    }
}
