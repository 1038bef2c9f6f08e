//! Picks the tokenizer for a language.

use spectra_syntax::{
    ExternalAnalyzer, RegexTokenizer, STRUCTURAL_LANGUAGES, SyntaxError, Tokenizer,
    TreeSitterTokenizer, builtin_table,
};
use std::sync::Arc;

use crate::{Config, CoreResult};

/// Builds the tokenizer for `language`, trying in order:
///
/// 1. the external analyzer, if configured for the language
/// 2. a pattern table from `[languages.<name>]`
/// 3. the builtin pattern table
/// 4. the tree-sitter grammar
///
/// A configured pattern table that fails to compile still yields a
/// tokenizer; each of its passes fails and highlighting stays as it was.
pub fn tokenizer_for(language: &str, config: &Config) -> CoreResult<Arc<dyn Tokenizer>> {
    if config.analyzer.handles(language) {
        if let Some(command) = config.analyzer.command() {
            tracing::debug!(language, program = %command.program, "using external analyzer");
            return Ok(Arc::new(ExternalAnalyzer::new(language, command)));
        }
    }

    if let Some(table) = config.language(language).patterns {
        tracing::debug!(language, entries = table.len(), "using configured pattern table");
        return Ok(Arc::new(RegexTokenizer::lenient(language, table)));
    }

    if let Some(table) = builtin_table(language) {
        return Ok(Arc::new(RegexTokenizer::new(language, table)?));
    }

    if STRUCTURAL_LANGUAGES.contains(&language) {
        return Ok(Arc::new(TreeSitterTokenizer::new(language)?));
    }

    Err(SyntaxError::UnknownLanguage(language.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoreError, LanguageConfig};
    use spectra_syntax::{PatternTable, TokenKind};

    #[test]
    fn test_builtin_and_structural() {
        let config = Config::default();

        let groovy = tokenizer_for("groovy", &config).unwrap();
        assert!(!groovy.runs_off_thread());
        assert_eq!(groovy.tokenize("def x = 1").unwrap()[0].kind, TokenKind::Keyword);

        let rust = tokenizer_for("rust", &config).unwrap();
        assert_eq!(rust.tokenize("fn f() {}").unwrap()[0].kind, TokenKind::Keyword);
    }

    #[test]
    fn test_analyzer_takes_precedence() {
        let mut config = Config::default();
        config.analyzer.command = Some("sourcekitten".to_string());
        config.analyzer.languages = vec!["swift".to_string()];

        let swift = tokenizer_for("swift", &config).unwrap();
        assert!(swift.runs_off_thread());

        // Not routed to the analyzer
        assert!(!tokenizer_for("java", &config).unwrap().runs_off_thread());
    }

    #[test]
    fn test_configured_patterns_override_builtin() {
        let mut config = Config::default();
        config.languages.insert(
            "groovy".to_string(),
            LanguageConfig {
                patterns: Some(PatternTable::new().with(TokenKind::Number, r"\d+")),
                ..Default::default()
            },
        );

        let tokens = tokenizer_for("groovy", &config)
            .unwrap()
            .tokenize("def x = 1")
            .unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number);
    }

    #[test]
    fn test_broken_configured_patterns_degrade() {
        let mut config = Config::default();
        config.languages.insert(
            "groovy".to_string(),
            LanguageConfig {
                patterns: Some(PatternTable::new().with(TokenKind::Number, "(")),
                ..Default::default()
            },
        );

        let tokenizer = tokenizer_for("groovy", &config).unwrap();
        assert!(tokenizer.tokenize("1").is_err());
    }

    #[test]
    fn test_unknown_language() {
        assert!(matches!(
            tokenizer_for("text", &Config::default()),
            Err(CoreError::Syntax(SyntaxError::UnknownLanguage(_)))
        ));
    }
}
