//! The most recent full-buffer token set.

use spectra_syntax::Token;
use std::ops::Range;
use std::sync::Arc;

/// Tokens from the newest applied pass, tagged with that pass's generation.
///
/// The store is only ever replaced wholesale. A pass whose generation is
/// not newer than the applied one is rejected, so a slow pass can never
/// overwrite a faster, newer one.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    tokens: Arc<[Token]>,
    generation: u64,
}

impl TokenStore {
    /// Creates an empty store. Generation 0 means "nothing applied yet".
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the token set if `generation` is newer than the current one.
    /// Returns false for a stale pass.
    pub fn replace(&mut self, generation: u64, tokens: Vec<Token>) -> bool {
        if generation <= self.generation {
            return false;
        }
        self.tokens = tokens.into();
        self.generation = generation;
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Cheap shared handle to the token set.
    pub fn shared(&self) -> Arc<[Token]> {
        Arc::clone(&self.tokens)
    }

    /// Tokens intersecting `range`. Relies on tokens being sorted by start.
    pub fn tokens_in(&self, range: Range<usize>) -> impl Iterator<Item = &Token> + '_ {
        let upper = self.tokens.partition_point(|t| t.range.start < range.end);
        self.tokens[..upper]
            .iter()
            .filter(move |t| t.intersects(&range))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectra_syntax::TokenKind;

    fn tokens(ranges: &[Range<usize>]) -> Vec<Token> {
        ranges
            .iter()
            .map(|r| Token::new(TokenKind::Keyword, r.clone()))
            .collect()
    }

    #[test]
    fn test_starts_empty() {
        let store = TokenStore::new();
        assert!(store.is_empty());
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_rejects_stale_generations() {
        let mut store = TokenStore::new();
        assert!(store.replace(2, tokens(&[0..3])));
        assert!(!store.replace(1, tokens(&[5..9, 10..12])));
        assert!(!store.replace(2, Vec::new()));
        assert_eq!(store.tokens(), tokens(&[0..3]).as_slice());

        assert!(store.replace(3, Vec::new()));
        assert!(store.is_empty());
        assert_eq!(store.generation(), 3);
    }

    #[test]
    fn test_tokens_in_range() {
        let mut store = TokenStore::new();
        store.replace(1, tokens(&[0..3, 4..10, 12..14, 20..25]));

        let found: Vec<_> = store.tokens_in(5..13).map(|t| t.range.clone()).collect();
        assert_eq!(found, vec![4..10, 12..14]);
        assert_eq!(store.tokens_in(14..20).count(), 0);
        assert_eq!(store.tokens_in(0..100).count(), 4);
    }
}
