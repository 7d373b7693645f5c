//! Fuzzy name matching used when an exact name lookup fails.

/// A deterministic, symmetric predicate over two case-folded names.
pub trait NameSimilarity: Send + Sync {
    fn is_similar(&self, a: &str, b: &str) -> bool;
}

/// Substring containment in either direction, guarded so that the shorter
/// name must be longer than `min_len` characters.
#[derive(Debug, Clone, Copy)]
pub struct SubstringSimilarity {
    min_len: usize,
}

impl SubstringSimilarity {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

impl Default for SubstringSimilarity {
    fn default() -> Self {
        Self::new(5)
    }
}

impl NameSimilarity for SubstringSimilarity {
    fn is_similar(&self, a: &str, b: &str) -> bool {
        let (shorter, longer) = if a.chars().count() <= b.chars().count() {
            (a, b)
        } else {
            (b, a)
        };
        shorter.chars().count() > self.min_len && longer.contains(shorter)
    }
}
