//! Reference shortening: choosing the shortest unambiguous spelling.
//!
//! The allocator consumes the unit's recorded usage sites and assigns each
//! one a strategy: a bare name that is already visible, a bare name backed
//! by a new import directive, or the fully-qualified fallback. Conflicts
//! that only become visible after later allocations are repaired by pushing
//! already-resolved usages back onto an explicit worklist — a fixpoint that
//! terminates because every reservation and rejection only shrinks the set
//! of candidates left to fight over.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::base::TypeName;
use super::resolve::{RefScope, Shown, VisibilityResolver};

/// One recorded reference to a type, with the scope it occurred in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Usage {
    /// The referenced type.
    pub name: TypeName,
    /// The scope the reference occurs in.
    pub scope: RefScope,
}

/// Policy deciding whether a name is worth importing at all.
///
/// This is a readability heuristic, not a correctness rule, so it is
/// injectable: what counts as a "generic helper-looking" nested name
/// depends on the naming conventions of the code being generated.
pub trait ImportPolicy {
    /// Whether an import directive for `name` is sensible.
    fn importable(&self, name: &TypeName) -> bool;
}

/// Default policy: top-level names always import; nested names import only
/// when their simple name contains something besides an initial capital and
/// lowercase letters. A bare nested `Builder` stays qualified.
#[derive(Default)]
pub struct DefaultImportPolicy;

impl ImportPolicy for DefaultImportPolicy {
    fn importable(&self, name: &TypeName) -> bool {
        if name.is_top_level() {
            return true;
        }
        !is_trivial_nested(name.simple_name())
    }
}

fn is_trivial_nested(simple: &str) -> bool {
    let mut chars = simple.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| c.is_lowercase()),
        _ => false,
    }
}

/// How one usage ended up being spelled.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Resolution {
    /// The ancestor whose simple name the usage resolves through.
    ancestor: TypeName,
    /// Whether that ancestor is backed by an import directive.
    imported: bool,
}

/// The allocator's output: per-usage spellings plus the import block.
pub struct Shortening {
    resolutions: Vec<Option<Resolution>>,
    imports: Vec<TypeName>,
}

impl Shortening {
    /// The display spelling for usage `idx`.
    ///
    /// A resolved usage renders as the reserved simple name followed by any
    /// nested names beyond the resolved ancestor; an unresolved one renders
    /// fully qualified.
    pub fn display(&self, idx: usize, usage: &Usage) -> String {
        match &self.resolutions[idx] {
            Some(resolution) => {
                let mut out = String::from(resolution.ancestor.simple_name());
                for segment in usage.name.suffix_after(&resolution.ancestor) {
                    out.push('.');
                    out.push_str(segment);
                }
                out
            }
            None => usage.name.canonical(),
        }
    }

    /// The import directives to emit, sorted, one per distinct ancestor.
    pub fn imports(&self) -> &[TypeName] {
        &self.imports
    }
}

/// Assigns shortening strategies to a unit's usages.
pub struct ReferenceAllocator<'a> {
    resolver: &'a VisibilityResolver<'a>,
    policy: &'a dyn ImportPolicy,
}

/// A simple name reserved for one type, bare or via import.
struct Reservation {
    name: TypeName,
    imported: bool,
}

impl<'a> ReferenceAllocator<'a> {
    /// Create an allocator over a resolver and an import policy.
    pub fn new(resolver: &'a VisibilityResolver<'a>, policy: &'a dyn ImportPolicy) -> Self {
        Self { resolver, policy }
    }

    /// Resolve every usage, running conflict repair to fixpoint.
    pub fn allocate(&self, usages: &[Usage]) -> Shortening {
        let mut resolutions: Vec<Option<Resolution>> = vec![None; usages.len()];
        let mut reserved: FxHashMap<SmolStr, Reservation> = FxHashMap::default();
        let mut rejected: FxHashSet<SmolStr> = FxHashSet::default();

        // Worklist seeded so usages are first processed in reverse order;
        // conflict repair pushes earlier decisions back on top.
        let mut work: VecDeque<usize> = (0..usages.len()).collect();

        while let Some(idx) = work.pop_back() {
            resolutions[idx] = None;
            let usage = &usages[idx];
            for ancestor in usage.name.self_and_enclosing() {
                let simple = SmolStr::new(ancestor.simple_name());
                match self.resolver.classify(&usage.scope, &ancestor) {
                    Shown::InScope => {
                        match reserved.get(&simple) {
                            None => {
                                trace!(name = %ancestor, "reserved in scope");
                                reserved.insert(
                                    simple,
                                    Reservation {
                                        name: ancestor.clone(),
                                        imported: false,
                                    },
                                );
                            }
                            Some(r) if r.name == ancestor => {}
                            Some(r) if r.imported => {
                                // An in-scope symbol dominates an import of
                                // the same simple name; the import's usages
                                // must be redone.
                                debug!(
                                    loser = %r.name,
                                    winner = %ancestor,
                                    "import displaced by in-scope symbol"
                                );
                                push_back_resolved(&r.name.clone(), &mut resolutions, &mut work);
                                reserved.insert(
                                    simple,
                                    Reservation {
                                        name: ancestor.clone(),
                                        imported: false,
                                    },
                                );
                            }
                            Some(_) => {
                                // Short name taken by another in-scope type;
                                // this ancestor is unavailable.
                                continue;
                            }
                        }
                        resolutions[idx] = Some(Resolution {
                            ancestor,
                            imported: false,
                        });
                        break;
                    }
                    Shown::Importable => {
                        if rejected.contains(&simple) || !self.policy.importable(&ancestor) {
                            continue;
                        }
                        match reserved.get(&simple) {
                            Some(r) if r.name != ancestor => continue,
                            _ => {}
                        }
                        trace!(name = %ancestor, "reserved via import");
                        reserved.insert(
                            simple,
                            Reservation {
                                name: ancestor.clone(),
                                imported: true,
                            },
                        );
                        resolutions[idx] = Some(Resolution {
                            ancestor,
                            imported: true,
                        });
                        break;
                    }
                    Shown::Hidden => {
                        // This simple name can never be imported anywhere in
                        // the unit: some scope shadows it.
                        rejected.insert(simple.clone());
                        if let Some(r) = reserved.get(&simple) {
                            if r.imported {
                                debug!(name = %r.name, "import revoked by hidden sighting");
                                push_back_resolved(&r.name.clone(), &mut resolutions, &mut work);
                                reserved.remove(&simple);
                            }
                        }
                        continue;
                    }
                }
            }
        }

        let mut imports: Vec<TypeName> = Vec::new();
        for resolution in resolutions.iter().flatten() {
            if resolution.imported && !imports.contains(&resolution.ancestor) {
                imports.push(resolution.ancestor.clone());
            }
        }
        imports.sort();

        Shortening {
            resolutions,
            imports,
        }
    }
}

/// Push every already-resolved usage of `loser` back onto the worklist.
fn push_back_resolved(
    loser: &TypeName,
    resolutions: &mut [Option<Resolution>],
    work: &mut VecDeque<usize>,
) {
    for (idx, resolution) in resolutions.iter_mut().enumerate() {
        let matches = resolution
            .as_ref()
            .is_some_and(|r| r.ancestor == *loser);
        if matches {
            *resolution = None;
            work.push_back(idx);
        }
    }
}
