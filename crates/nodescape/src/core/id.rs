//! Content-derived identifiers
//!
//! Every node, link and line is keyed by a 64-bit FNV-1a hash of a canonical
//! name, so ids survive re-parsing the same source.

use std::fmt;

const FNV1A_OFFSET: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

#[inline]
fn fnv1a_hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(FNV1A_PRIME);
    }
}

/// Opaque, stable identifier for any item in the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    /// Id of the root node (the empty name)
    pub const ROOT: Id = Id(FNV1A_OFFSET);

    /// Hash a node name
    pub fn from_name(name: &str) -> Self {
        let mut hash = FNV1A_OFFSET;
        fnv1a_hash_bytes(&mut hash, name.as_bytes());
        Id(hash)
    }

    /// Id of the link `source -> target`
    pub fn for_link(source: &str, target: &str) -> Self {
        let mut hash = FNV1A_OFFSET;
        fnv1a_hash_bytes(&mut hash, source.as_bytes());
        fnv1a_hash_bytes(&mut hash, b"->");
        fnv1a_hash_bytes(&mut hash, target.as_bytes());
        Id(hash)
    }

    /// Id of the line hop `source => target`
    pub fn for_line(source: Id, target: Id) -> Self {
        let mut hash = FNV1A_OFFSET;
        fnv1a_hash_bytes(&mut hash, &source.0.to_le_bytes());
        fnv1a_hash_bytes(&mut hash, b"=>");
        fnv1a_hash_bytes(&mut hash, &target.0.to_le_bytes());
        Id(hash)
    }

    /// Id of a user-authored direct line `source ~> target`
    ///
    /// Distinct from [`Id::for_line`] so a direct line never merges with a
    /// hierarchical hop between the same endpoints.
    pub fn for_direct_line(source: Id, target: Id) -> Self {
        let mut hash = FNV1A_OFFSET;
        fnv1a_hash_bytes(&mut hash, &source.0.to_le_bytes());
        fnv1a_hash_bytes(&mut hash, b"~>");
        fnv1a_hash_bytes(&mut hash, &target.0.to_le_bytes());
        Id(hash)
    }

    /// Raw hash value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_root_is_empty_name() {
        assert_eq!(Id::from_name(""), Id::ROOT);
    }

    #[test]
    fn test_link_and_line_ids_are_directional() {
        assert_ne!(Id::for_link("a", "b"), Id::for_link("b", "a"));
        let a = Id::from_name("a");
        let b = Id::from_name("b");
        assert_ne!(Id::for_line(a, b), Id::for_line(b, a));
    }

    #[test]
    fn test_link_id_differs_from_endpoint_ids() {
        let link = Id::for_link("a", "b");
        assert_ne!(link, Id::from_name("a"));
        assert_ne!(link, Id::from_name("b"));
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(Id::ROOT.to_string(), "cbf29ce484222325");
    }

    proptest! {
        #[test]
        fn prop_equal_names_hash_equal(name in ".{0,40}") {
            prop_assert_eq!(Id::from_name(&name), Id::from_name(&name.clone()));
        }
    }
}
