//! Path-sensitive coverage feedback.
//!
//! Each observable step of the target is reported as a [`StepLocation`] through the
//! [`tracer`]. The [`ngram::NGramCoverage`] hook keeps a sliding [`window::SignatureWindow`]
//! over the most recent steps and digests it into one [`Signature`] per step. The signatures of
//! one execution are tallied by a [`map::CoverageMap`] into an immutable
//! [`map::CoverageFact`].

use std::fmt;
use std::fmt::Formatter;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub mod map;
pub mod ngram;
pub mod tracer;
pub mod window;

pub use map::{CoverageFact, CoverageMap};
pub use ngram::NGramCoverage;
pub use window::{SignatureWindow, WindowSize};

/// One observable execution step: a context (usually a module path or function name) and a
/// position within it (usually a line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepLocation {
    pub context: &'static str,
    pub position: u32,
}

impl StepLocation {
    pub const fn new(context: &'static str, position: u32) -> Self {
        Self { context, position }
    }

    fn feed(&self, hasher: &mut Sha256) {
        hasher.update((self.context.len() as u64).to_le_bytes());
        hasher.update(self.context.as_bytes());
        hasher.update(self.position.to_le_bytes());
    }
}

impl fmt::Display for StepLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.context, self.position)
    }
}

pub const SIGNATURE_LEN: usize = 32;

/// Digest of the ordered contents of one window.
///
/// Only equality is meaningful to consumers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// Digests `steps` in iteration order.
    pub fn of<'a, I>(steps: I) -> Self
    where
        I: IntoIterator<Item = &'a StepLocation>,
    {
        let mut hasher = Sha256::new();
        for step in steps {
            step.feed(&mut hasher);
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", &hex::encode(self.0)[..12])
    }
}

impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let mut bytes = [0u8; SIGNATURE_LEN];
        hex::decode_to_slice(encoded, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// Identifies the set of signatures covered by one execution, independent of hit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(Signature);

impl PathId {
    pub(crate) fn of_sorted<'a, I>(signatures: I) -> Self
    where
        I: IntoIterator<Item = &'a Signature>,
    {
        let mut hasher = Sha256::new();
        for signature in signatures {
            hasher.update(signature.as_bytes());
        }
        Self(Signature(hasher.finalize().into()))
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F1: StepLocation = StepLocation::new("f", 1);
    const F2: StepLocation = StepLocation::new("f", 2);

    #[test]
    fn test_signature_is_deterministic() {
        assert_eq!(Signature::of(&[F1, F2]), Signature::of(&[F1, F2]));
    }

    #[test]
    fn test_signature_depends_on_order() {
        assert_ne!(Signature::of(&[F1, F2]), Signature::of(&[F2, F1]));
    }

    #[test]
    fn test_signature_separates_context_from_position() {
        // "ab":1 vs "a" followed by a context starting with "b"
        let joined = [StepLocation::new("ab", 1)];
        let split = [StepLocation::new("a", 0), StepLocation::new("b", 1)];
        assert_ne!(Signature::of(&joined), Signature::of(&split));
    }

    #[test]
    fn test_signature_serde_uses_hex() {
        let signature = Signature::of(&[F1]);
        let json = serde_json::to_string(&signature).unwrap();
        assert_eq!(json, format!("\"{}\"", signature));

        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signature);
    }

    #[test]
    fn test_signature_is_stable_across_processes() {
        // Pinned digest of [(f,1)], guards against accidental encoding changes
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(1u64.to_le_bytes());
            hasher.update(b"f");
            hasher.update(1u32.to_le_bytes());
            hex::encode(hasher.finalize())
        };
        assert_eq!(Signature::of(&[F1]).to_string(), expected);
    }
}
