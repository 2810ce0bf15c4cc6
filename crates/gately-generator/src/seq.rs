use crate::Generator;
use gately_core::ShortKey;
use std::sync::atomic::{AtomicU64, Ordering};

/// A short key generator using a sequential counter.
///
/// This generator produces sequential keys like "seq000000", "seq000001".
/// Keys are unique within a single instance; for several nodes, give each
/// node its own prefix.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
    prefix: String,
}

impl SeqGenerator {
    /// Creates a new generator with a custom prefix, starting at zero.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_offset(prefix, 0)
    }

    /// Creates a new generator starting from a specific counter value.
    pub fn with_offset(prefix: impl Into<String>, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            prefix: prefix.into(),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> ShortKey {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortKey::new_unchecked(format!("{}{:06}", self.prefix, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_sequential_keys() {
        let generator = SeqGenerator::with_prefix("seq");
        assert_eq!(generator.generate().as_str(), "seq000000");
        assert_eq!(generator.generate().as_str(), "seq000001");
    }

    #[test]
    fn offset_moves_the_start() {
        let generator = SeqGenerator::with_offset("node-b", 1_000);
        assert_eq!(generator.generate().as_str(), "node-b001000");
    }

    #[test]
    fn concurrent_generation_never_repeats() {
        use std::collections::HashSet;
        use std::sync::Arc;

        let generator = Arc::new(SeqGenerator::with_prefix("c"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..250).map(|_| generator.generate()).collect::<Vec<_>>()
                })
            })
            .collect();

        let keys: HashSet<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(keys.len(), 1000);
    }
}
