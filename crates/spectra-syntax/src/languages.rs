//! Builtin pattern tables and language detection.
//!
//! Every builtin table follows the same layout, which fixes precedence:
//!
//! 1. block comments, then line comments
//! 2. string literals, triple-quoted before single-quoted
//! 3. character / single-quoted literals
//! 4. numbers (optional `0x` prefix, digit run, optional one-letter suffix)
//! 5. call-like identifiers (`name (`)
//! 6. language extras (attributes, type names, preprocessor lines)
//! 7. reserved words
//!
//! String patterns are deliberately escape-unaware: a literal ends at the
//! first matching delimiter even if a backslash precedes it.

use crate::{PatternTable, TokenKind};

const BLOCK_COMMENT: &str = r"/\*(?s:.)*?(?:\*/|\z)";
const LINE_COMMENT: &str = r"//.*";
const DOUBLE_QUOTED: &str = r#"(?s:"{3}.*?(?:"{3}|\z))|(?:"[^"\n]*(?:"|\z))"#;
const SINGLE_QUOTED: &str = r"(?s:'{3}.*?(?:'{3}|\z))|(?:'[^'\n]*(?:'|\z))";
const PLAIN_DOUBLE_QUOTED: &str = r#""[^"\n]*(?:"|\z)"#;
const PLAIN_SINGLE_QUOTED: &str = r"'[^'\n]*(?:'|\z)";
const NUMBER: &str = r"\b(?:0x)?\d+[efld]?";
const CALL: &str = r"[[\w$]&&[^\d]][\w$]* *\(";

/// Languages with a builtin pattern table.
pub const REGEX_LANGUAGES: &[&str] = &["groovy", "java", "swift", "c"];

fn groovy_keywords() -> &'static [&'static str] {
    &[
        "abstract", "assert", "default", "if", "private", "this", "boolean",
        "do", "implements", "protected", "throw", "break", "double", "import",
        "public", "throws", "byte", "else", "instanceof", "return",
        "transient", "case", "extends", "int", "short", "try", "catch",
        "final", "interface", "enum", "static", "void", "char", "finally",
        "long", "strictfp", "volatile", "class", "float", "native", "super",
        "while", "const", "for", "new", "switch", "continue", "goto",
        "package", "def", "as", "in", "synchronized", "null",
    ]
}

fn java_keywords() -> &'static [&'static str] {
    &[
        "abstract", "assert", "boolean", "break", "byte", "case", "catch",
        "char", "class", "const", "continue", "default", "do", "double",
        "else", "enum", "extends", "final", "finally", "float", "for",
        "goto", "if", "implements", "import", "instanceof", "int",
        "interface", "long", "native", "new", "package", "private",
        "protected", "public", "return", "short", "static", "strictfp",
        "super", "switch", "synchronized", "this", "throw", "throws",
        "transient", "try", "void", "volatile", "while", "var", "record",
        "true", "false", "null",
    ]
}

fn swift_keywords() -> &'static [&'static str] {
    &[
        "associatedtype", "class", "deinit", "enum", "extension",
        "fileprivate", "func", "import", "init", "inout", "internal", "let",
        "open", "operator", "private", "protocol", "public", "rethrows",
        "static", "struct", "subscript", "typealias", "var", "break", "case",
        "continue", "default", "defer", "do", "else", "fallthrough", "for",
        "guard", "if", "in", "repeat", "return", "switch", "where", "while",
        "as", "catch", "false", "is", "nil", "super", "self", "Self",
        "throw", "throws", "true", "try", "async", "await", "override",
        "mutating", "lazy", "weak", "unowned", "convenience", "required",
        "final",
    ]
}

fn c_keywords() -> &'static [&'static str] {
    &[
        "auto", "break", "case", "char", "const", "continue", "default",
        "do", "double", "else", "enum", "extern", "float", "for", "goto",
        "if", "inline", "int", "long", "register", "restrict", "return",
        "short", "signed", "sizeof", "static", "struct", "switch",
        "typedef", "union", "unsigned", "void", "volatile", "while", "NULL",
    ]
}

/// Builds a word-boundary-delimited alternation of reserved words.
pub fn keyword_pattern(words: &[&str]) -> String {
    format!(r"\b(?:{})\b", words.join("|"))
}

/// Returns the builtin pattern table for a language.
pub fn builtin_table(language: &str) -> Option<PatternTable> {
    let table = match language {
        "groovy" => PatternTable::new()
            .with(TokenKind::Comment, BLOCK_COMMENT)
            .with(TokenKind::Comment, LINE_COMMENT)
            .with(TokenKind::String, DOUBLE_QUOTED)
            .with(TokenKind::Character, SINGLE_QUOTED)
            .with(TokenKind::Number, NUMBER)
            .with(TokenKind::Call, CALL)
            .with(TokenKind::Keyword, keyword_pattern(groovy_keywords())),
        "java" => PatternTable::new()
            .with(TokenKind::Comment, BLOCK_COMMENT)
            .with(TokenKind::Comment, LINE_COMMENT)
            .with(TokenKind::String, DOUBLE_QUOTED)
            .with(TokenKind::Character, PLAIN_SINGLE_QUOTED)
            .with(TokenKind::Number, NUMBER)
            .with(TokenKind::Attribute, r"@\w+")
            .with(TokenKind::Call, CALL)
            .with(TokenKind::Keyword, keyword_pattern(java_keywords())),
        "swift" => PatternTable::new()
            .with(TokenKind::Comment, BLOCK_COMMENT)
            .with(TokenKind::DocComment, r"///.*")
            .with(TokenKind::Comment, LINE_COMMENT)
            .with(TokenKind::String, DOUBLE_QUOTED)
            .with(TokenKind::Number, NUMBER)
            .with(TokenKind::Attribute, r"@\w+")
            .with(TokenKind::BuildConfig, r"#(?:if|elseif|else|endif|available)\b")
            .with(TokenKind::Call, CALL)
            .with(TokenKind::Keyword, keyword_pattern(swift_keywords()))
            .with(TokenKind::TypeIdentifier, r"\b[A-Z]\w*\b"),
        "c" => PatternTable::new()
            .with(TokenKind::Comment, BLOCK_COMMENT)
            .with(TokenKind::Comment, LINE_COMMENT)
            .with(TokenKind::BuildConfig, r"(?m:^[ \t]*#[ \t]*\w+)")
            .with(TokenKind::String, PLAIN_DOUBLE_QUOTED)
            .with(TokenKind::Character, PLAIN_SINGLE_QUOTED)
            .with(TokenKind::Number, NUMBER)
            .with(TokenKind::Call, CALL)
            .with(TokenKind::Keyword, keyword_pattern(c_keywords())),
        _ => return None,
    };
    Some(table)
}

/// Detects language from file extension.
pub fn detect_language(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("");
    match ext {
        "groovy" | "gvy" | "gy" | "gsh" | "gradle" => "groovy",
        "java" => "java",
        "swift" => "swift",
        "c" | "h" => "c",
        "rs" => "rust",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "py" | "pyw" | "pyi" => "python",
        "json" | "jsonc" => "json",
        _ => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_compile() {
        for language in REGEX_LANGUAGES {
            let table = builtin_table(language).unwrap();
            assert!(table.compile().is_ok(), "{language} table failed to compile");
        }
    }

    #[test]
    fn test_unknown_language_has_no_table() {
        assert!(builtin_table("cobol").is_none());
    }

    #[test]
    fn test_keyword_pattern() {
        assert_eq!(keyword_pattern(&["if", "def"]), r"\b(?:if|def)\b");
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("build.gradle"), "groovy");
        assert_eq!(detect_language("Main.swift"), "swift");
        assert_eq!(detect_language("lib.rs"), "rust");
        assert_eq!(detect_language("README"), "text");
    }
}
