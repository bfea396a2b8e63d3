//! Deterministic identifiers for generated elements.
//!
//! KiCad wants a UUID on most placed items. Converting the same input twice
//! must give byte-identical output, so UUIDs are version 5 (SHA-1 name
//! based), derived from a per-run seed plus a stable element key.

use uuid::Uuid;

/// Namespace for every UUID this crate generates.
const NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0x1c, 0x4f, 0x52, 0x0d, 0x3a, 0x4e, 0x8b, 0x9f, 0x27, 0x51, 0xc4, 0xe0, 0x8a, 0x3d, 0x17,
]);

/// Generates name-based UUIDs scoped to one conversion run.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    scope: Uuid,
}

impl IdGenerator {
    /// Creates a generator whose output depends only on `seed` and keys.
    #[must_use]
    pub fn new(seed: &str) -> Self {
        Self {
            scope: Uuid::new_v5(&NAMESPACE, seed.as_bytes()),
        }
    }

    /// Returns the UUID for a stable element key.
    #[must_use]
    pub fn uuid(&self, key: &str) -> String {
        Uuid::new_v5(&self.scope, key.as_bytes()).to_string()
    }

    /// Returns the UUID for a key made of parts joined with `/`.
    #[must_use]
    pub fn uuid_for(&self, parts: &[&str]) -> String {
        self.uuid(&parts.join("/"))
    }
}
