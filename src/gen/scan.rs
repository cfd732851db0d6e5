//! Incremental lexical scanner over emitted source text.
//!
//! The scanner consumes every character the writer emits, in emission
//! order, and reports block structure: the start of a type body, the start
//! of a method body, the start of any other brace block, and block ends.
//! It is intentionally shallow — it finds block boundaries and the handful
//! of identifiers scope bookkeeping needs, nothing more.
//!
//! Because it only ever sees the generator's own output, malformed text
//! (a `}` with no open block, an unterminated literal) is reported as a
//! fatal [`EmitError`] rather than recovered from.

use smol_str::SmolStr;
use tracing::debug;

use crate::base::{EmitError, Result};

/// Keywords that introduce a type declaration.
const TYPE_KEYWORDS: &[&str] = &["class", "interface", "enum", "record"];

/// Keywords that take a parenthesized clause before a block but do not
/// declare a method.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "synchronized", "try", "return", "throw", "assert",
    "do", "else", "new",
];

/// What kind of block a `{` opened.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// A type body (`class`, `interface`, `enum`, `record`).
    Type,
    /// A method or constructor body.
    Method,
    /// Any other brace block: control flow, initializers, array literals.
    Other,
}

/// An event fired while scanning emitted text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanEvent {
    /// A type body opened.
    TypeStart {
        /// The declaration keyword (`class`, `interface`, ...).
        keyword: SmolStr,
        /// The declared simple name.
        name: SmolStr,
        /// Identifiers referenced after `extends` / `implements`.
        supertypes: Vec<SmolStr>,
    },
    /// A method or constructor body opened.
    MethodStart {
        /// The method (or constructor) name.
        name: SmolStr,
        /// Parameter names, extracted positionally.
        params: Vec<SmolStr>,
    },
    /// Some other brace block opened.
    OtherStart,
    /// A block of any kind closed.
    BlockEnd,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LexState {
    Code,
    LineComment,
    BlockComment,
    Str,
    Chr,
}

/// Single-pass state machine over emitted characters.
pub struct EmitScanner {
    state: LexState,
    /// Previous char was an unconsumed `/` (possible comment start).
    pending_slash: bool,
    /// Previous char inside a block comment was `*`.
    pending_star: bool,
    /// Previous char inside a literal was an escaping `\`.
    escaped: bool,
    /// Statement text buffered since the last `{`, `}`, or `;`.
    stmt: String,
    /// Kinds of currently open blocks, outermost first.
    depth: Vec<BlockKind>,
}

impl Default for EmitScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitScanner {
    /// Create a scanner at the top of an empty compilation unit.
    pub fn new() -> Self {
        Self {
            state: LexState::Code,
            pending_slash: false,
            pending_star: false,
            escaped: false,
            stmt: String::new(),
            depth: Vec::new(),
        }
    }

    /// Feed emitted text, returning the block events it produced.
    pub fn scan(&mut self, text: &str) -> Result<Vec<ScanEvent>> {
        let mut events = Vec::new();
        for ch in text.chars() {
            self.step(ch, &mut events)?;
        }
        Ok(events)
    }

    /// Verify the unit ended in a balanced state.
    pub fn finish(&self) -> Result<()> {
        match self.state {
            LexState::Str => return Err(EmitError::UnterminatedLiteral("string")),
            LexState::Chr => return Err(EmitError::UnterminatedLiteral("character")),
            LexState::BlockComment => return Err(EmitError::UnterminatedLiteral("comment")),
            LexState::Code | LexState::LineComment => {}
        }
        if !self.depth.is_empty() {
            return Err(EmitError::UnclosedBlocks(self.depth.len()));
        }
        Ok(())
    }

    fn step(&mut self, ch: char, events: &mut Vec<ScanEvent>) -> Result<()> {
        match self.state {
            LexState::Code => self.step_code(ch, events),
            LexState::LineComment => {
                if ch == '\n' {
                    self.state = LexState::Code;
                    self.stmt.push(' ');
                }
                Ok(())
            }
            LexState::BlockComment => {
                if self.pending_star && ch == '/' {
                    self.state = LexState::Code;
                    self.stmt.push(' ');
                }
                self.pending_star = ch == '*';
                Ok(())
            }
            LexState::Str => self.step_literal(ch, '"', "string"),
            LexState::Chr => self.step_literal(ch, '\'', "character"),
        }
    }

    /// Literal bodies are not buffered, only their delimiters, so bracket
    /// balancing during classification cannot be confused by contents.
    fn step_literal(&mut self, ch: char, close: char, what: &'static str) -> Result<()> {
        if self.escaped {
            self.escaped = false;
            return Ok(());
        }
        match ch {
            '\\' => self.escaped = true,
            '\n' => return Err(EmitError::UnterminatedLiteral(what)),
            c if c == close => {
                self.state = LexState::Code;
                self.stmt.push(close);
            }
            _ => {}
        }
        Ok(())
    }

    fn step_code(&mut self, ch: char, events: &mut Vec<ScanEvent>) -> Result<()> {
        if self.pending_slash {
            self.pending_slash = false;
            match ch {
                '/' => {
                    self.state = LexState::LineComment;
                    return Ok(());
                }
                '*' => {
                    self.state = LexState::BlockComment;
                    self.pending_star = false;
                    return Ok(());
                }
                _ => self.stmt.push('/'),
            }
        }
        match ch {
            '/' => self.pending_slash = true,
            '"' => {
                self.state = LexState::Str;
                self.escaped = false;
                self.stmt.push('"');
            }
            '\'' => {
                self.state = LexState::Chr;
                self.escaped = false;
                self.stmt.push('\'');
            }
            '{' => {
                let stmt = std::mem::take(&mut self.stmt);
                let (kind, event) = classify(&stmt);
                debug!(?kind, depth = self.depth.len(), "block start");
                self.depth.push(kind);
                events.push(event);
            }
            '}' => {
                self.stmt.clear();
                if self.depth.pop().is_none() {
                    return Err(EmitError::UnexpectedBlockEnd);
                }
                debug!(depth = self.depth.len(), "block end");
                events.push(ScanEvent::BlockEnd);
            }
            ';' => self.stmt.clear(),
            c => self.stmt.push(c),
        }
        Ok(())
    }
}

// ============================================================================
// STATEMENT CLASSIFICATION
// ============================================================================

fn is_ident_start(c: char) -> bool {
    unicode_ident::is_xid_start(c) || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c) || c == '$'
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    /// A (possibly dot-qualified) identifier.
    Ident(String),
    Punct(char),
}

/// Classify the statement preceding a `{` and build its start event.
fn classify(stmt: &str) -> (BlockKind, ScanEvent) {
    let stripped = strip_annotations(stmt.trim());
    let Some(flat) = strip_generics(&stripped) else {
        // More closing angle brackets than opens: not a type or method
        // header (lambda arrows, comparisons).
        return (BlockKind::Other, ScanEvent::OtherStart);
    };
    let tokens = tokenize(&flat);

    if let Some(event) = match_type_header(&tokens) {
        return (BlockKind::Type, event);
    }
    if let Some(event) = match_method_header(&tokens) {
        return (BlockKind::Method, event);
    }
    (BlockKind::Other, ScanEvent::OtherStart)
}

/// Strip leading annotation markers: `@` followed by a dot-qualified name
/// and an optional parenthesized, bracket-balanced argument list.
///
/// `@interface` is left alone — that is an annotation-type declaration.
fn strip_annotations(stmt: &str) -> String {
    let chars: Vec<char> = stmt.chars().collect();
    let mut i = 0;
    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || chars[i] != '@' {
            break;
        }
        let name_start = i + 1;
        let mut j = name_start;
        while j < chars.len() && (is_ident_continue(chars[j]) || chars[j] == '.') {
            j += 1;
        }
        let name: String = chars[name_start..j].iter().collect();
        if name == "interface" {
            break;
        }
        // Optional argument list.
        let mut k = j;
        while k < chars.len() && chars[k].is_whitespace() {
            k += 1;
        }
        if k < chars.len() && chars[k] == '(' {
            let mut parens = 0usize;
            while k < chars.len() {
                match chars[k] {
                    '(' => parens += 1,
                    ')' => {
                        parens -= 1;
                        if parens == 0 {
                            k += 1;
                            break;
                        }
                    }
                    _ => {}
                }
                k += 1;
            }
            i = k;
        } else {
            i = j;
        }
    }
    chars[i..].iter().collect()
}

/// Remove angle-bracket balanced generic lists. Returns `None` when closes
/// outnumber opens, which marks the statement as not a header at all.
fn strip_generics(stmt: &str) -> Option<String> {
    let mut out = String::with_capacity(stmt.len());
    let mut angle = 0usize;
    for ch in stmt.chars() {
        match ch {
            '<' => angle += 1,
            '>' => {
                if angle == 0 {
                    return None;
                }
                angle -= 1;
            }
            c if angle == 0 => out.push(c),
            _ => {}
        }
    }
    Some(out)
}

fn tokenize(stmt: &str) -> Vec<Token> {
    let chars: Vec<char> = stmt.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            // Dot-qualified continuation: `.` followed by an identifier.
            while i + 1 < chars.len() && chars[i] == '.' && is_ident_start(chars[i + 1]) {
                i += 2;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Punct(c));
            i += 1;
        }
    }
    tokens
}

fn ident(token: &Token) -> Option<&str> {
    match token {
        Token::Ident(s) => Some(s),
        Token::Punct(_) => None,
    }
}

/// A type header is a declaration keyword followed by an identifier.
fn match_type_header(tokens: &[Token]) -> Option<ScanEvent> {
    let at = tokens
        .iter()
        .position(|t| ident(t).is_some_and(|s| TYPE_KEYWORDS.contains(&s)))?;
    let keyword = ident(&tokens[at]).unwrap_or_default();
    let name = ident(tokens.get(at + 1)?)?;
    if name.contains('.') {
        return None;
    }

    let mut supertypes = Vec::new();
    let mut collecting = false;
    for token in &tokens[at + 2..] {
        match token {
            Token::Ident(s) if s == "extends" || s == "implements" || s == "permits" => {
                collecting = s != "permits";
            }
            Token::Ident(s) if collecting => supertypes.push(SmolStr::new(s)),
            Token::Punct(',') => {}
            _ => collecting = false,
        }
    }
    Some(ScanEvent::TypeStart {
        keyword: SmolStr::new(keyword),
        name: SmolStr::new(name),
        supertypes,
    })
}

/// A method header is a plausible identifier directly before a balanced
/// argument list. Parameter names are the last identifier before each
/// comma or the closing paren.
fn match_method_header(tokens: &[Token]) -> Option<ScanEvent> {
    let open = tokens.iter().position(|t| *t == Token::Punct('('))?;
    let name = ident(tokens.get(open.checked_sub(1)?)?)?;
    if name.contains('.') || CONTROL_KEYWORDS.contains(&name) {
        return None;
    }
    // An assignment or allocation before the parens means this is an
    // expression statement, not a header.
    for token in &tokens[..open] {
        match token {
            Token::Punct('=') => return None,
            Token::Ident(s) if s == "new" => return None,
            _ => {}
        }
    }

    // Find the matching close paren.
    let mut depth = 0usize;
    let mut close = None;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Punct('(') => depth += 1,
            Token::Punct(')') => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close?;

    let mut params = Vec::new();
    let mut last_ident: Option<&str> = None;
    let mut depth = 0usize;
    for token in &tokens[open + 1..close] {
        match token {
            Token::Punct('(') => depth += 1,
            Token::Punct(')') => depth = depth.saturating_sub(1),
            Token::Punct(',') if depth == 0 => {
                if let Some(p) = last_ident.take() {
                    params.push(SmolStr::new(p));
                }
            }
            Token::Ident(s) => last_ident = Some(s),
            _ => {}
        }
    }
    if let Some(p) = last_ident {
        params.push(SmolStr::new(p));
    }

    Some(ScanEvent::MethodStart {
        name: SmolStr::new(name),
        params,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn scan_all(text: &str) -> Vec<ScanEvent> {
        let mut scanner = EmitScanner::new();
        scanner.scan(text).unwrap()
    }

    #[test]
    fn test_class_header() {
        let events = scan_all("public final class Widget extends Gadget implements Cog, Gear {");
        match &events[0] {
            ScanEvent::TypeStart {
                keyword,
                name,
                supertypes,
            } => {
                assert_eq!(keyword.as_str(), "class");
                assert_eq!(name.as_str(), "Widget");
                let supers: Vec<&str> = supertypes.iter().map(|s| s.as_str()).collect();
                assert_eq!(supers, vec!["Gadget", "Cog", "Gear"]);
            }
            other => panic!("expected TypeStart, got {other:?}"),
        }
    }

    #[test]
    fn test_generic_class_header() {
        let events = scan_all("class Box<T extends Number> extends Base<T> {");
        match &events[0] {
            ScanEvent::TypeStart {
                name, supertypes, ..
            } => {
                assert_eq!(name.as_str(), "Box");
                assert_eq!(supertypes.len(), 1);
                assert_eq!(supertypes[0].as_str(), "Base");
            }
            other => panic!("expected TypeStart, got {other:?}"),
        }
    }

    #[test]
    fn test_method_header_with_params() {
        let events = scan_all("public int frob(String name, int[] counts, Object... rest) {");
        match &events[0] {
            ScanEvent::MethodStart { name, params } => {
                assert_eq!(name.as_str(), "frob");
                let names: Vec<&str> = params.iter().map(|s| s.as_str()).collect();
                assert_eq!(names, vec!["name", "counts", "rest"]);
            }
            other => panic!("expected MethodStart, got {other:?}"),
        }
    }

    #[test]
    fn test_annotated_method_header() {
        let events = scan_all("@Override\n@SuppressWarnings(\"unchecked\")\npublic void run() {");
        assert!(matches!(
            &events[0],
            ScanEvent::MethodStart { name, params } if name.as_str() == "run" && params.is_empty()
        ));
    }

    #[rstest]
    #[case("if (a < b) {")]
    #[case("for (int i = 0; i < n; i++) {")]
    #[case("while (ready) {")]
    #[case("switch (kind) {")]
    #[case("static {")]
    #[case("int[] values = {")]
    #[case("new Runnable() {")]
    #[case("list.forEach(x -> {")]
    #[case("do {")]
    fn test_non_header_blocks(#[case] stmt: &str) {
        let events = scan_all(stmt);
        assert_eq!(events, vec![ScanEvent::OtherStart], "for {stmt:?}");
    }

    #[test]
    fn test_braces_in_literals_ignored() {
        let events = scan_all("String s = \"{ not a block }\";\nchar c = '{';\n");
        assert!(events.is_empty());
    }

    #[test]
    fn test_braces_in_comments_ignored() {
        let events = scan_all("// opening { here\n/* and } here */\nclass A {");
        assert!(matches!(&events[0], ScanEvent::TypeStart { name, .. } if name.as_str() == "A"));
    }

    #[test]
    fn test_block_end_event() {
        let events = scan_all("class A {\n}\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], ScanEvent::BlockEnd);
    }

    #[test]
    fn test_unmatched_close_is_fatal() {
        let mut scanner = EmitScanner::new();
        let err = scanner.scan("}").unwrap_err();
        assert!(matches!(err, EmitError::UnexpectedBlockEnd));
    }

    #[test]
    fn test_finish_rejects_open_blocks() {
        let mut scanner = EmitScanner::new();
        scanner.scan("class A {").unwrap();
        assert!(matches!(scanner.finish(), Err(EmitError::UnclosedBlocks(1))));
    }

    #[test]
    fn test_finish_rejects_open_literal() {
        let mut scanner = EmitScanner::new();
        scanner.scan("String s = \"oops").unwrap();
        assert!(matches!(
            scanner.finish(),
            Err(EmitError::UnterminatedLiteral("string"))
        ));
    }

    #[test]
    fn test_annotation_interface_is_type() {
        let events = scan_all("public @interface Marker {");
        assert!(matches!(
            &events[0],
            ScanEvent::TypeStart { keyword, name, .. }
                if keyword.as_str() == "interface" && name.as_str() == "Marker"
        ));
    }

    #[test]
    fn test_constructor_is_method() {
        let events = scan_all("class A {\nA(int seed) {");
        assert!(matches!(
            &events[1],
            ScanEvent::MethodStart { name, .. } if name.as_str() == "A"
        ));
    }

    #[test]
    fn test_qualified_supertype_kept_whole() {
        let events = scan_all("class A extends com.example.Base {");
        match &events[0] {
            ScanEvent::TypeStart { supertypes, .. } => {
                assert_eq!(supertypes[0].as_str(), "com.example.Base");
            }
            other => panic!("expected TypeStart, got {other:?}"),
        }
    }
}
