//! Race fingerprinting — deterministic identity of a race configuration.
//!
//! Two setups with the same riders, stages, tier table, classification rules and
//! scoring policy hash to the same fingerprint, which roots the sampler's RNG
//! hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 digest of a canonically serialized race configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RaceFingerprint(pub [u8; 32]);

impl RaceFingerprint {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Hash any serializable value through its JSON form. Maps must be ordered
    /// (`BTreeMap`) for the result to be stable.
    pub fn of<T: Serialize>(value: &T) -> Self {
        let json = serde_json::to_vec(value).expect("race configuration must serialize");
        Self::from_bytes(&json)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for RaceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn same_input_same_fingerprint() {
        let mut a = BTreeMap::new();
        a.insert("x", 1.0);
        a.insert("y", 2.0);
        let mut b = BTreeMap::new();
        b.insert("y", 2.0);
        b.insert("x", 1.0);
        assert_eq!(RaceFingerprint::of(&a), RaceFingerprint::of(&b));
    }

    #[test]
    fn different_input_different_fingerprint() {
        assert_ne!(
            RaceFingerprint::from_bytes(b"stage-1"),
            RaceFingerprint::from_bytes(b"stage-2")
        );
    }

    #[test]
    fn hex_is_64_chars() {
        assert_eq!(RaceFingerprint::from_bytes(b"x").to_hex().len(), 64);
    }
}
