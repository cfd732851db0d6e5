//! Per-method-body identifier collision avoidance.
//!
//! Local variables probe underscore-suffixed variants of a preferred name
//! until one is free in the current method chain; field accesses check for
//! shadowing locals and fall back to an explicit `this.` qualification
//! instead of colliding.

use smol_str::SmolStr;

use crate::base::Result;
use super::scope::{ScopeKey, ScopeTree, ScopeValue};

/// How a field access must be spelled in the current scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldAccess {
    /// No local shadows the field; the bare name is safe.
    Bare(SmolStr),
    /// A local of the same name is in scope; the access needs `this.`.
    Qualified(SmolStr),
}

impl FieldAccess {
    /// Render the access as it must appear in the output.
    pub fn render(&self) -> String {
        match self {
            FieldAccess::Bare(name) => name.to_string(),
            FieldAccess::Qualified(name) => format!("this.{name}"),
        }
    }
}

/// Claim a fresh local variable name near `preferred`.
///
/// Probes `preferred`, `preferred_2`, `preferred_3`, ... against locals and
/// qualified-field markers visible in the current method chain, then claims
/// the winner in the innermost method scope.
pub fn fresh_local(scopes: &mut ScopeTree, preferred: &str) -> Result<SmolStr> {
    let mut attempt = 1usize;
    loop {
        let candidate = if attempt == 1 {
            SmolStr::new(preferred)
        } else {
            SmolStr::new(format!("{preferred}_{attempt}"))
        };
        let taken = scopes.contains(&ScopeKey::Local(candidate.clone()))
            || scopes.contains(&ScopeKey::QualifiedField(candidate.clone()));
        if !taken && scopes.put_if_absent(ScopeKey::Local(candidate.clone()), ScopeValue::Marker)? {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

/// Decide how a field named `name` must be accessed here.
///
/// If a local of the same name exists in the current or any enclosing
/// method scope the access is self-qualified, and a marker records that
/// this scope spelled the field with an explicit qualifier.
pub fn field_access(scopes: &mut ScopeTree, name: &str) -> Result<FieldAccess> {
    let name = SmolStr::new(name);
    if scopes.contains(&ScopeKey::Local(name.clone())) {
        scopes.put_if_absent(ScopeKey::QualifiedField(name.clone()), ScopeValue::Marker)?;
        return Ok(FieldAccess::Qualified(name));
    }
    Ok(FieldAccess::Bare(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#gen::scope::ScopeLevel;

    fn method_scope() -> ScopeTree {
        let mut scopes = ScopeTree::new();
        scopes.open(ScopeLevel::Method);
        scopes
    }

    #[test]
    fn test_fresh_local_probes_variants() {
        let mut scopes = method_scope();
        assert_eq!(fresh_local(&mut scopes, "value").unwrap().as_str(), "value");
        assert_eq!(
            fresh_local(&mut scopes, "value").unwrap().as_str(),
            "value_2"
        );
        assert_eq!(
            fresh_local(&mut scopes, "value").unwrap().as_str(),
            "value_3"
        );
    }

    #[test]
    fn test_field_bare_without_shadowing_local() {
        let mut scopes = method_scope();
        let access = field_access(&mut scopes, "x").unwrap();
        assert_eq!(access.render(), "x");
    }

    #[test]
    fn test_field_qualified_when_local_shadows() {
        let mut scopes = method_scope();
        fresh_local(&mut scopes, "x").unwrap();
        let access = field_access(&mut scopes, "x").unwrap();
        assert_eq!(access.render(), "this.x");
    }

    #[test]
    fn test_field_sees_locals_of_enclosing_method_scope() {
        let mut scopes = method_scope();
        fresh_local(&mut scopes, "x").unwrap();
        scopes.open(ScopeLevel::Method); // nested block

        let access = field_access(&mut scopes, "x").unwrap();
        assert_eq!(access.render(), "this.x");
    }

    #[test]
    fn test_local_avoids_qualified_field_marker() {
        let mut scopes = method_scope();
        fresh_local(&mut scopes, "x").unwrap();
        field_access(&mut scopes, "x").unwrap(); // records the marker
        scopes.open(ScopeLevel::Method);

        // The marker still counts against new locals in this chain.
        assert_eq!(fresh_local(&mut scopes, "x").unwrap().as_str(), "x_2");
    }

    #[test]
    fn test_locals_released_when_scope_closes() {
        let mut scopes = method_scope();
        scopes.open(ScopeLevel::Method);
        fresh_local(&mut scopes, "i").unwrap();
        scopes.close().unwrap();

        assert_eq!(fresh_local(&mut scopes, "i").unwrap().as_str(), "i");
    }
}
