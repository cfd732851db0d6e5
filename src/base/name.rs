//! Qualified type names.

use std::fmt;

use smol_str::SmolStr;

/// The fully qualified name of a (possibly nested) type.
///
/// A `TypeName` is an ordered path: a dotted package string (which may be
/// empty for the default package) followed by one or more simple names. The
/// first simple name is a top-level type, each subsequent one a type nested
/// in the previous.
///
/// Values are immutable; equality and ordering are structural (package
/// first, then the simple-name sequence), so names sort the way an import
/// block should read.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    package: SmolStr,
    names: Vec<SmolStr>,
}

impl TypeName {
    /// Create a top-level type name in `package`.
    ///
    /// An empty package string means the default package.
    pub fn top_level(package: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            package: package.into(),
            names: vec![name.into()],
        }
    }

    /// Create the name of a type nested directly inside `self`.
    pub fn nested(&self, name: impl Into<SmolStr>) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        Self {
            package: self.package.clone(),
            names,
        }
    }

    /// Heuristically split a dotted spelling like `com.example.Outer.Inner`
    /// into package and simple names: leading segments starting with a
    /// lowercase letter form the package, the rest the name path.
    ///
    /// Used for identifiers the scanner extracts from emitted headers,
    /// where only the spelling is known.
    pub fn infer(spelling: &str) -> Self {
        let segments: Vec<&str> = spelling.split('.').collect();
        let split = segments
            .iter()
            .position(|s| s.chars().next().is_some_and(|c| c.is_uppercase()))
            .unwrap_or(segments.len().saturating_sub(1));
        let package = segments[..split].join(".");
        let mut names: Vec<SmolStr> = segments[split..].iter().map(|s| SmolStr::new(s)).collect();
        if names.is_empty() {
            names.push(SmolStr::default());
        }
        Self {
            package: SmolStr::new(package),
            names,
        }
    }

    /// The package this type lives in (empty for the default package).
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The simple-name path, top-level type first.
    pub fn names(&self) -> &[SmolStr] {
        &self.names
    }

    /// The final, unqualified segment of the path.
    pub fn simple_name(&self) -> &str {
        self.names.last().map(SmolStr::as_str).unwrap_or_default()
    }

    /// Whether this is a top-level (non-nested) type.
    pub fn is_top_level(&self) -> bool {
        self.names.len() == 1
    }

    /// The name of the enclosing type, or `None` for a top-level type.
    pub fn enclosing(&self) -> Option<TypeName> {
        if self.is_top_level() {
            return None;
        }
        Some(Self {
            package: self.package.clone(),
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    /// The outermost (top-level) ancestor of this name.
    pub fn outermost(&self) -> TypeName {
        Self {
            package: self.package.clone(),
            names: vec![self.names[0].clone()],
        }
    }

    /// Walk from this name up through each enclosing type to the top level.
    ///
    /// Yields `self` first, then its enclosing type, and so on.
    pub fn self_and_enclosing(&self) -> impl Iterator<Item = TypeName> {
        let mut current = Some(self.clone());
        std::iter::from_fn(move || {
            let name = current.take()?;
            current = name.enclosing();
            Some(name)
        })
    }

    /// Whether `ancestor` is this name or one of its enclosing types.
    pub fn is_within(&self, ancestor: &TypeName) -> bool {
        self.package == ancestor.package
            && self.names.len() >= ancestor.names.len()
            && self.names[..ancestor.names.len()] == ancestor.names[..]
    }

    /// The simple names of `self` beyond `ancestor`.
    ///
    /// Empty when `self == ancestor`. Callers must ensure `ancestor` is an
    /// enclosing type of `self` (or `self` itself).
    pub fn suffix_after(&self, ancestor: &TypeName) -> &[SmolStr] {
        &self.names[ancestor.names.len().min(self.names.len())..]
    }

    /// The fully qualified dotted spelling, e.g. `com.example.Outer.Inner`.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        if !self.package.is_empty() {
            out.push_str(&self.package);
            out.push('.');
        }
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(name);
        }
        out
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.canonical())
    }
}
