//! Symbol vocabulary
//!
//! Interns words and nonterminal labels into dense integer ids. A single
//! `Vocabulary` is shared by reference between the extractor, its labeler
//! and output formatting; tests build their own isolated instances.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Interned symbol id
pub type SymbolId = u32;

#[derive(Debug, Default)]
struct Inner {
    ids: HashMap<String, SymbolId>,
    words: Vec<String>,
}

/// Thread-safe string interner
#[derive(Debug, Default)]
pub struct Vocabulary {
    inner: RwLock<Inner>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for `word`, assigning the next free id on first sight.
    pub fn id(&self, word: &str) -> SymbolId {
        {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = inner.ids.get(word) {
                return id;
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(&id) = inner.ids.get(word) {
            return id;
        }
        let id = inner.words.len() as SymbolId;
        inner.words.push(word.to_string());
        inner.ids.insert(word.to_string(), id);
        id
    }

    /// Intern a sequence of words
    pub fn ids<S: AsRef<str>>(&self, words: &[S]) -> Vec<SymbolId> {
        words.iter().map(|w| self.id(w.as_ref())).collect()
    }

    /// Look up an id without interning
    pub fn get(&self, word: &str) -> Option<SymbolId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ids.get(word).copied()
    }

    /// The string for `id`, if it has been assigned
    pub fn word(&self, id: SymbolId) -> Option<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.words.get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_interning_is_stable() {
        let vocab = Vocabulary::new();
        let a = vocab.id("house");
        let b = vocab.id("Haus");
        assert_ne!(a, b);
        assert_eq!(vocab.id("house"), a);
        assert_eq!(vocab.word(b).as_deref(), Some("Haus"));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn test_get_does_not_intern() {
        let vocab = Vocabulary::new();
        assert_eq!(vocab.get("X"), None);
        assert!(vocab.is_empty());
        let id = vocab.id("X");
        assert_eq!(vocab.get("X"), Some(id));
        assert_eq!(vocab.word(42), None);
    }

    #[test]
    fn test_ids_in_order() {
        let vocab = Vocabulary::new();
        let ids = vocab.ids(&["a", "b", "a"]);
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_shared_across_threads() {
        let vocab = Arc::new(Vocabulary::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let vocab = Arc::clone(&vocab);
                std::thread::spawn(move || vocab.ids(&["x", "y", "z"]))
            })
            .collect();

        let results: Vec<Vec<SymbolId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(vocab.len(), 3);
    }
}
