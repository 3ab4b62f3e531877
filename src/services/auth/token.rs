use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque bearer token taken from `X-Auth-Token`.
///
/// No structure is assumed. `Debug` prints a fingerprint instead of the raw
/// value so the token never ends up in logs by accident.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Short SHA-256 prefix, safe to log and stable across requests.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.0)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.fingerprint()).finish()
    }
}

pub(crate) fn fingerprint(raw: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(raw.as_bytes()));
    digest[..12].to_string()
}
