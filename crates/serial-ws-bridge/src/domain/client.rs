//! Client connection identity.

use std::fmt;

use uuid::Uuid;

/// Opaque identity of one accepted WebSocket connection.
///
/// A fresh random UUID is minted per connection, so a client that reconnects
/// is a different handle.  Used as the key of the client registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Mints a new identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first 8 hex digits are plenty to tell log lines apart.
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(ClientId::new(), ClientId::new());
    }

    #[test]
    fn test_id_is_copy_and_comparable() {
        let id = ClientId::new();
        let copy = id;
        assert_eq!(id, copy);
        assert_eq!(id.as_uuid(), copy.as_uuid());
    }

    #[test]
    fn test_display_is_short_hex_prefix() {
        let id = ClientId::new();
        let shown = id.to_string();
        assert_eq!(shown.len(), 8);
        assert!(id.as_uuid().simple().to_string().starts_with(&shown));
    }
}
