use crate::Generator;
use gately_core::ShortKey;
use uuid::Uuid;

/// Generates random version 4 UUIDs in their hyphenated form.
///
/// With 122 random bits the collision probability is negligible, so no
/// coordination between nodes is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl UuidGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for UuidGenerator {
    fn generate(&self) -> ShortKey {
        ShortKey::new_unchecked(Uuid::new_v4().hyphenated().to_string())
    }
}
