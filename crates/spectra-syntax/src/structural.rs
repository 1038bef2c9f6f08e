//! In-process structural tokenizer using tree-sitter.
//!
//! ## Why Tree-sitter here?
//!
//! Pattern tables cannot tell a type name from a variable or a call target
//! from a field. For the grammars linked into the binary, a real parse
//! gives those distinctions without spawning an analyzer process:
//! - **Error-tolerant**: half-typed code still yields a tree
//! - **Same output**: the tree is flattened into the same `Token` stream
//!   the pattern tables produce, so the controller cannot tell them apart
//!
//! ## Learning: FFI-backed values
//!
//! `Language` wraps a pointer to static C data and is `Send + Sync`;
//! `Parser` holds mutable C state and is not `Sync`, so each pass builds
//! its own parser instead of sharing one.

use std::ops::Range;
use tree_sitter::{Language, Node, Parser};

use crate::offsets::Utf16Mapper;
use crate::{SyntaxError, SyntaxResult, Token, TokenKind, Tokenizer};

/// Languages with a linked tree-sitter grammar.
pub const STRUCTURAL_LANGUAGES: &[&str] = &["rust", "javascript", "python", "json"];

/// Tokenizer that classifies nodes of a tree-sitter parse.
pub struct TreeSitterTokenizer {
    name: String,
    language: Language,
}

impl TreeSitterTokenizer {
    /// Creates a tokenizer for a language.
    pub fn new(lang: &str) -> SyntaxResult<Self> {
        let language = get_language(lang)?;

        // Fail at construction, not on the first pass, if the grammar and
        // runtime ABI versions disagree.
        Parser::new()
            .set_language(&language)
            .map_err(|_| SyntaxError::ParseError)?;

        Ok(Self {
            name: lang.to_string(),
            language,
        })
    }
}

impl Tokenizer for TreeSitterTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn tokenize(&self, text: &str) -> SyntaxResult<Vec<Token>> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|_| SyntaxError::ParseError)?;
        let tree = parser.parse(text, None).ok_or(SyntaxError::ParseError)?;

        let mut spans = Vec::new();
        collect_spans(tree.root_node(), &mut spans);

        let mut mapper = Utf16Mapper::new(text);
        Ok(spans
            .into_iter()
            .map(|(kind, bytes)| {
                let start = mapper.utf16_at(bytes.start);
                let end = mapper.utf16_at(bytes.end);
                Token::new(kind, start..end)
            })
            .collect())
    }
}

/// Walks the tree in document order. A classified node becomes one token
/// and its children are skipped, so spans never nest.
fn collect_spans(node: Node, spans: &mut Vec<(TokenKind, Range<usize>)>) {
    if let Some(kind) = classify(node) {
        if node.end_byte() > node.start_byte() {
            spans.push((kind, node.start_byte()..node.end_byte()));
        }
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_spans(child, spans);
    }
}

fn classify(node: Node) -> Option<TokenKind> {
    let kind = node.kind();
    let token = match kind {
        "line_comment" | "block_comment" | "comment" => TokenKind::Comment,

        "string_literal" | "raw_string_literal" | "string" | "template_string" => {
            TokenKind::String
        }
        "char_literal" => TokenKind::Character,

        "integer_literal" | "float_literal" | "number" | "integer" | "float" => {
            TokenKind::Number
        }

        "type_identifier" | "primitive_type" => TokenKind::TypeIdentifier,

        "attribute_item" | "inner_attribute_item" | "decorator" => TokenKind::Attribute,

        "identifier" | "field_identifier" | "property_identifier" if is_call_target(node) => {
            TokenKind::Call
        }
        "identifier" => TokenKind::Identifier,

        _ if node.is_named() && NAMED_KEYWORDS.contains(&kind) => TokenKind::Keyword,
        _ if !node.is_named() && KEYWORDS.contains(&kind) => TokenKind::Keyword,

        _ => return None,
    };
    Some(token)
}

/// Returns true if `node` names the function being called.
fn is_call_target(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };

    match parent.kind() {
        "call_expression" | "call" => same_node(parent.child_by_field_name("function"), node),
        "macro_invocation" => same_node(parent.child_by_field_name("macro"), node),
        // `a.b()`: the member is the call target when the member
        // expression itself is the callee.
        "field_expression" | "member_expression" | "attribute" => {
            let member_field = match parent.kind() {
                "field_expression" => "field",
                "member_expression" => "property",
                _ => "attribute",
            };
            same_node(parent.child_by_field_name(member_field), node)
                && parent.parent().is_some_and(|call| {
                    matches!(call.kind(), "call_expression" | "call")
                        && same_node(call.child_by_field_name("function"), parent)
                })
        }
        _ => false,
    }
}

fn same_node(candidate: Option<Node>, node: Node) -> bool {
    candidate.is_some_and(|c| c.id() == node.id())
}

/// Keyword-like nodes that grammars expose as named nodes.
const NAMED_KEYWORDS: &[&str] = &[
    "true", "false", "null", "none", "self", "crate", "super", "this",
    "undefined", "mutable_specifier",
];

/// Anonymous keyword nodes across the linked grammars.
const KEYWORDS: &[&str] = &[
    "fn", "let", "mut", "const", "static", "pub", "use", "mod", "struct",
    "enum", "impl", "trait", "type", "where", "if", "else", "match", "for",
    "while", "loop", "break", "continue", "return", "async", "await",
    "unsafe", "extern", "crate", "self", "super", "as", "in", "ref",
    "move", "dyn", "true", "false", "function", "class", "def", "import",
    "from", "try", "except", "finally", "with", "yield", "lambda", "var",
    "new", "delete", "typeof", "instanceof", "void", "throw", "catch",
    "switch", "case", "default", "export", "extends", "elif", "pass",
    "raise", "not", "and", "or", "is", "global", "nonlocal", "of", "do",
];

/// Gets the tree-sitter language.
fn get_language(lang: &str) -> SyntaxResult<Language> {
    match lang {
        "rust" | "rs" => Ok(tree_sitter_rust::LANGUAGE.into()),
        "javascript" | "js" | "jsx" => Ok(tree_sitter_javascript::LANGUAGE.into()),
        "python" | "py" => Ok(tree_sitter_python::LANGUAGE.into()),
        "json" => Ok(tree_sitter_json::LANGUAGE.into()),
        _ => Err(SyntaxError::UnknownLanguage(lang.to_string())),
    }
}
