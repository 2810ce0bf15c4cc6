pub mod random;
pub mod seq;

pub use random::UuidGenerator;
pub use seq::SeqGenerator;

use gately_core::ShortKey;

/// Trait for generating short keys.
///
/// Implementations are pure generators that don't interact with storage;
/// the mapping service still checks the store before inserting.
///
/// Implementations can vary from random identifiers to counters scoped by
/// a node prefix.
pub trait Generator: Send + Sync + 'static {
    /// Generates a short key that should be globally unique.
    fn generate(&self) -> ShortKey;
}
