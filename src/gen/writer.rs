//! Streaming emission of one compilation unit.
//!
//! [`UnitWriter`] accepts fragments of literal text and typed references,
//! keeps the scanner and scope tree current with every character, records
//! usage sites, and on [`UnitWriter::finish`] runs the reference allocator
//! and renders the final unit: package statement, sorted imports, body with
//! every reference rewritten, deferred declarations appended.

use smol_str::SmolStr;
use tracing::debug;

use crate::base::{EmitError, Result, TypeName};
use super::declare::{DeclId, DeferredDecls};
use super::locals::{self, FieldAccess};
use super::model::{Overlay, SymbolVisibility, TableModel, TypeEntry, TypeModel};
use super::resolve::{RefScope, VisibilityResolver};
use super::scan::{BlockKind, EmitScanner, ScanEvent};
use super::scope::{ScopeKey, ScopeLevel, ScopeTree, ScopeValue};
use super::shorten::{DefaultImportPolicy, ImportPolicy, ReferenceAllocator, Usage};

/// One piece of a [`Fragment`].
#[derive(Clone, Debug)]
pub enum Piece {
    /// Literal text, emitted verbatim.
    Text(String),
    /// A type reference, rewritten to its shortest unambiguous spelling.
    Type(TypeName),
    /// A use of a deferred declaration; emits its bound name.
    Deferred(DeclId),
    /// A nested sub-fragment.
    Group(Fragment),
}

/// An ordered sequence of emission pieces.
///
/// Fragments are plain values: they can be stored in the deferred registry
/// and replayed later through whichever writer materializes them.
#[derive(Clone, Debug, Default)]
pub struct Fragment {
    pieces: Vec<Piece>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment holding a single run of literal text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with_text(text)
    }

    /// Append literal text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.pieces.push(Piece::Text(text.into()));
        self
    }

    /// Append a type reference.
    pub fn with_type(mut self, name: TypeName) -> Self {
        self.pieces.push(Piece::Type(name));
        self
    }

    /// Append a use of a deferred declaration.
    pub fn with_deferred(mut self, id: DeclId) -> Self {
        self.pieces.push(Piece::Deferred(id));
        self
    }

    /// Append a nested sub-fragment.
    pub fn with_group(mut self, fragment: Fragment) -> Self {
        self.pieces.push(Piece::Group(fragment));
        self
    }

    /// The pieces in emission order.
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }
}

/// A rendered span of the body: literal text or a usage placeholder.
enum Chunk {
    Text(String),
    Ref(usize),
}

/// Streaming writer for a single compilation unit.
///
/// One writer per unit; nothing is shared across units. Text flows through
/// the scanner as it is appended, so scope bookkeeping is always current,
/// while reference spellings stay open until `finish` has seen every usage.
pub struct UnitWriter<'m> {
    package: SmolStr,
    base: &'m dyn TypeModel,
    generated: TableModel,
    scanner: EmitScanner,
    scopes: ScopeTree,
    decls: DeferredDecls,
    chunks: Vec<Chunk>,
    usages: Vec<Usage>,
    /// Open type bodies, outermost first.
    type_stack: Vec<TypeName>,
    /// Kinds of open blocks, mirroring the scanner's events.
    block_stack: Vec<BlockKind>,
    policy: Box<dyn ImportPolicy>,
}

impl<'m> UnitWriter<'m> {
    /// Create a writer for a unit in `package`, resolving against `base`.
    pub fn new(package: impl Into<SmolStr>, base: &'m dyn TypeModel) -> Self {
        Self {
            package: package.into(),
            base,
            generated: TableModel::new(),
            scanner: EmitScanner::new(),
            scopes: ScopeTree::new(),
            decls: DeferredDecls::new(),
            chunks: Vec::new(),
            usages: Vec::new(),
            type_stack: Vec::new(),
            block_stack: Vec::new(),
            policy: Box::new(DefaultImportPolicy),
        }
    }

    /// Replace the import policy (the "sensible import" heuristic).
    pub fn with_import_policy(mut self, policy: impl ImportPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// The scope a reference emitted right now would occur in.
    pub fn current_scope(&self) -> RefScope {
        match self.type_stack.last() {
            Some(body) => RefScope::TypeBody(body.clone()),
            None => RefScope::Package(self.package.clone()),
        }
    }

    /// Emit literal text.
    pub fn write(&mut self, text: &str) -> Result<()> {
        self.scan_text(text)?;
        match self.chunks.last_mut() {
            Some(Chunk::Text(run)) => run.push_str(text),
            _ => self.chunks.push(Chunk::Text(text.to_string())),
        }
        Ok(())
    }

    /// Emit a reference to `name`, to be shortened at finish time.
    ///
    /// References to symbols the model flags as unresolvable are rejected
    /// here, before any text lands.
    pub fn type_ref(&mut self, name: &TypeName) -> Result<()> {
        let entry = self
            .generated
            .lookup(name)
            .or_else(|| self.base.lookup(name));
        if entry.is_some_and(|e| e.unresolvable) {
            return Err(EmitError::UnresolvableReference(name.canonical()));
        }
        let usage = Usage {
            name: name.clone(),
            scope: self.current_scope(),
        };
        self.usages.push(usage);
        self.chunks.push(Chunk::Ref(self.usages.len() - 1));
        // The scanner sees the canonical spelling; the real spelling is
        // chosen later but has identical block structure.
        self.scan_text(&name.canonical())
    }

    /// Register a deferred declaration. Nothing is emitted until it is
    /// used; its body is materialized during flush.
    pub fn declare(&mut self, preferred: impl Into<SmolStr>, body: Fragment) -> DeclId {
        self.decls.declare(preferred, body)
    }

    /// Emit a use of a deferred declaration, binding its name on first use.
    pub fn deferred_ref(&mut self, id: DeclId) -> Result<()> {
        let name = self.decls.bind(id, &mut self.scopes)?;
        self.write(name.as_str())
    }

    /// Claim a collision-free local variable name near `preferred`.
    pub fn fresh_local(&mut self, preferred: &str) -> Result<SmolStr> {
        locals::fresh_local(&mut self.scopes, preferred)
    }

    /// Emit an access to field `name`, self-qualifying it when a local of
    /// the same name is in scope.
    pub fn write_field(&mut self, name: &str) -> Result<()> {
        let access: FieldAccess = locals::field_access(&mut self.scopes, name)?;
        self.write(&access.render())
    }

    /// Emit a whole fragment.
    pub fn emit(&mut self, fragment: &Fragment) -> Result<()> {
        for piece in fragment.pieces() {
            match piece {
                Piece::Text(text) => self.write(text)?,
                Piece::Type(name) => self.type_ref(name)?,
                Piece::Deferred(id) => self.deferred_ref(*id)?,
                Piece::Group(nested) => self.emit(nested)?,
            }
        }
        Ok(())
    }

    /// Materialize all deferred declarations reachable from file scope.
    ///
    /// Runs to fixpoint: rendering one body may bind further declarations,
    /// which are picked up on the next pass. Bodies are rendered in bound-
    /// name order (case-sensitive) so output is reproducible and
    /// type-shaped names group ahead of method-shaped ones. Flushing again
    /// once everything is rendered emits nothing.
    pub fn flush_deferred(&mut self) -> Result<()> {
        loop {
            let mut pending: Vec<(SmolStr, DeclId)> = self
                .scopes
                .declarations()
                .into_iter()
                .filter(|(_, id)| !self.decls.is_rendered(*id))
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            pending.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (_, id) in pending {
                if self.decls.is_rendered(id) {
                    continue;
                }
                // Marked before rendering so a self-referential body does
                // not re-queue itself.
                self.decls.mark_rendered(id);
                let body = self.decls.body(id).clone();
                self.write("\n")?;
                self.emit(&body)?;
            }
        }
    }

    /// Finish the unit: flush deferred declarations, verify balance, run
    /// the allocator, and render the final text.
    pub fn finish(mut self) -> Result<String> {
        self.flush_deferred()?;
        self.scanner.finish()?;

        let overlay = Overlay::with_generated(self.base, self.generated);
        let resolver = VisibilityResolver::new(&overlay);
        let allocator = ReferenceAllocator::new(&resolver, self.policy.as_ref());
        let shortening = allocator.allocate(&self.usages);
        debug!(
            usages = self.usages.len(),
            imports = shortening.imports().len(),
            "unit resolved"
        );

        let mut out = String::new();
        if !self.package.is_empty() {
            out.push_str("package ");
            out.push_str(&self.package);
            out.push_str(";\n\n");
        }
        for import in shortening.imports() {
            out.push_str("import ");
            out.push_str(&import.canonical());
            out.push_str(";\n");
        }
        if !shortening.imports().is_empty() {
            out.push('\n');
        }
        for chunk in &self.chunks {
            match chunk {
                Chunk::Text(text) => out.push_str(text),
                Chunk::Ref(idx) => out.push_str(&shortening.display(*idx, &self.usages[*idx])),
            }
        }
        Ok(out)
    }

    fn scan_text(&mut self, text: &str) -> Result<()> {
        let events = self.scanner.scan(text)?;
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    fn apply(&mut self, event: ScanEvent) -> Result<()> {
        match event {
            ScanEvent::TypeStart {
                name, supertypes, ..
            } => {
                let full = match self.type_stack.last() {
                    Some(enclosing) => enclosing.nested(name),
                    None => TypeName::top_level(self.package.clone(), name),
                };
                let supertypes = supertypes
                    .iter()
                    .map(|ident| self.supertype_name(ident))
                    .collect();
                // Registered eagerly, before anything references it, so the
                // resolver treats the in-progress type like any other.
                self.generated.insert(
                    TypeEntry::new(full.clone(), SymbolVisibility::Unknown)
                        .with_supertypes(supertypes),
                );
                self.type_stack.push(full);
                self.block_stack.push(BlockKind::Type);
                self.scopes.open(ScopeLevel::File);
            }
            ScanEvent::MethodStart { params, .. } => {
                self.block_stack.push(BlockKind::Method);
                self.scopes.open(ScopeLevel::Method);
                // Parameters occupy the method's local namespace.
                for param in params {
                    self.scopes
                        .put_if_absent(ScopeKey::Local(param), ScopeValue::Marker)?;
                }
            }
            ScanEvent::OtherStart => {
                self.block_stack.push(BlockKind::Other);
                self.scopes.open(ScopeLevel::Method);
            }
            ScanEvent::BlockEnd => {
                if self.block_stack.pop() == Some(BlockKind::Type) {
                    self.type_stack.pop();
                }
                self.scopes.close()?;
            }
        }
        Ok(())
    }

    /// Resolve a supertype identifier the scanner extracted from a header.
    ///
    /// Interpolated supertypes were recorded as usages just before the
    /// header's `{`, so the most recent usage matching the spelling wins;
    /// a plain identifier otherwise refers to the unit's own package.
    fn supertype_name(&self, ident: &str) -> TypeName {
        for usage in self.usages.iter().rev() {
            if usage.name.canonical() == ident {
                return usage.name.clone();
            }
            if !ident.contains('.') && usage.name.simple_name() == ident {
                return usage.name.clone();
            }
        }
        if ident.contains('.') {
            TypeName::infer(ident)
        } else {
            TypeName::top_level(self.package.clone(), ident)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(names: &[&TypeName]) -> TableModel {
        let mut model = TableModel::new();
        for name in names {
            model.insert(TypeEntry::new((*name).clone(), SymbolVisibility::Public));
        }
        model
    }

    #[test]
    fn test_simple_unit_with_import() {
        let list = TypeName::top_level("java.util", "List");
        let model = model_with(&[&list]);

        let mut writer = UnitWriter::new("com.example", &model);
        writer.write("class Store {\n").unwrap();
        writer.write("  ").unwrap();
        writer.type_ref(&list).unwrap();
        writer.write(" items;\n}\n").unwrap();
        let out = writer.finish().unwrap();

        assert_eq!(
            out,
            "package com.example;\n\n\
             import java.util.List;\n\n\
             class Store {\n  List items;\n}\n"
        );
    }

    #[test]
    fn test_empty_package_omits_statement() {
        let model = TableModel::new();
        let mut writer = UnitWriter::new("", &model);
        writer.write("class Main {\n}\n").unwrap();
        let out = writer.finish().unwrap();
        assert!(out.starts_with("class Main"));
    }

    #[test]
    fn test_generated_nested_type_shadows_reference() {
        // Inside the generated type, a nested "Outer" hides lib.Outer, so
        // a reference to lib.Outer.Inner must stay qualified.
        let outer = TypeName::top_level("lib", "Outer");
        let inner = outer.nested("Inner");
        let model = model_with(&[&outer, &inner]);

        let mut writer = UnitWriter::new("com.example", &model);
        writer.write("class Gen {\n").unwrap();
        writer.write("  static class Outer {\n  }\n").unwrap();
        writer.write("  ").unwrap();
        writer.type_ref(&inner).unwrap();
        writer.write(" value;\n}\n").unwrap();
        let out = writer.finish().unwrap();

        assert!(out.contains("lib.Outer.Inner value;"), "got:\n{out}");
        assert!(!out.contains("import"), "got:\n{out}");
    }

    #[test]
    fn test_unresolvable_reference_rejected_eagerly() {
        let broken = TypeName::top_level("lib", "Broken");
        let mut model = TableModel::new();
        model.insert(
            TypeEntry::new(broken.clone(), SymbolVisibility::Public).unresolvable(),
        );

        let mut writer = UnitWriter::new("com.example", &model);
        writer.write("class Gen {\n  ").unwrap();
        let err = writer.type_ref(&broken).unwrap_err();
        assert!(matches!(err, EmitError::UnresolvableReference(_)));
    }

    #[test]
    fn test_unbalanced_unit_fails_finish() {
        let model = TableModel::new();
        let mut writer = UnitWriter::new("p", &model);
        writer.write("class A {\n").unwrap();
        assert!(matches!(
            writer.finish(),
            Err(EmitError::UnclosedBlocks(1))
        ));
    }

    #[test]
    fn test_field_qualification_through_writer() {
        let model = TableModel::new();
        let mut writer = UnitWriter::new("p", &model);
        writer.write("class A {\n  void run() {\n    int ").unwrap();
        let local = writer.fresh_local("x").unwrap();
        writer.write(&format!("{local} = 0;\n    ")).unwrap();
        writer.write_field("x").unwrap();
        writer.write(" += 1;\n  }\n}\n").unwrap();
        let out = writer.finish().unwrap();

        assert!(out.contains("this.x += 1;"), "got:\n{out}");
    }

    #[test]
    fn test_parameters_claim_the_local_namespace() {
        let model = TableModel::new();
        let mut writer = UnitWriter::new("p", &model);
        writer
            .write("class A {\n  void run(int x) {\n    int ")
            .unwrap();
        // The parameter already holds "x".
        let local = writer.fresh_local("x").unwrap();
        assert_eq!(local.as_str(), "x_2");
        writer.write(&format!("{local} = 0;\n    ")).unwrap();
        // And a field named like the parameter needs qualification.
        writer.write_field("x").unwrap();
        writer.write(" = ").unwrap();
        writer.write(local.as_str()).unwrap();
        writer.write(";\n  }\n}\n").unwrap();
        let out = writer.finish().unwrap();

        assert!(out.contains("this.x = x_2;"), "got:\n{out}");
    }

    #[test]
    fn test_supertype_matched_from_recorded_usage() {
        let base = TypeName::top_level("lib", "Base");
        let member = base.nested("Member");
        let model = model_with(&[&base, &member]);

        let mut writer = UnitWriter::new("p", &model);
        writer.write("class Gen extends ").unwrap();
        writer.type_ref(&base).unwrap();
        writer.write(" {\n  ").unwrap();
        // Member is inherited into Gen's body, so it is in scope bare.
        writer.type_ref(&member).unwrap();
        writer.write(" value;\n}\n").unwrap();
        let out = writer.finish().unwrap();

        assert!(out.contains("  Member value;"), "got:\n{out}");
    }

    #[test]
    fn test_deferred_flush_appends_bodies() {
        let model = TableModel::new();
        let mut writer = UnitWriter::new("p", &model);
        let helper = writer.declare(
            "helper",
            Fragment::text("static int helper() { return 1; }\n"),
        );
        writer.write("class Gen {\n  int n = ").unwrap();
        writer.deferred_ref(helper).unwrap();
        writer.write("();\n}\n").unwrap();
        let out = writer.finish().unwrap();

        assert!(out.contains("int n = helper();"), "got:\n{out}");
        assert!(out.contains("static int helper() { return 1; }"), "got:\n{out}");
    }
}
