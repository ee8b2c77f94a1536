//! Store path identifiers
//!
//! A store path is named by its base name: a 32 character hash part in the
//! store's base-32 alphabet, a dash, and a human readable name.

use super::{StoreError, StoreResult};
use std::fmt;

/// Length of the hash part of a base name
pub const HASH_PART_LEN: usize = 32;

/// Base-32 alphabet used for hash parts (omits e, o, u and t)
pub const BASE32_CHARS: &[u8] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// Validated base name of an entry in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    base_name: String,
}

impl StorePath {
    /// Parse a base name from raw bytes as received over the wire
    pub fn from_bytes(raw: &[u8]) -> StoreResult<Self> {
        let base_name = std::str::from_utf8(raw).map_err(|_| StoreError::InvalidPath {
            path: String::from_utf8_lossy(raw).into_owned(),
            reason: "not valid UTF-8",
        })?;
        Self::parse(base_name)
    }

    /// Parse a base name
    pub fn parse(base_name: &str) -> StoreResult<Self> {
        let invalid = |reason| StoreError::InvalidPath {
            path: base_name.to_string(),
            reason,
        };

        let bytes = base_name.as_bytes();
        if bytes.len() < HASH_PART_LEN + 2 {
            return Err(invalid("path is too short"));
        }
        if !bytes[..HASH_PART_LEN].iter().all(|c| BASE32_CHARS.contains(c)) {
            return Err(invalid("hash part contains an illegal character"));
        }
        if bytes[HASH_PART_LEN] != b'-' {
            return Err(invalid("missing '-' after hash part"));
        }

        let name = &bytes[HASH_PART_LEN + 1..];
        if name[0] == b'.' {
            return Err(invalid("name may not start with '.'"));
        }
        if !name.iter().all(|&c| is_name_char(c)) {
            return Err(invalid("name contains an illegal character"));
        }

        Ok(Self {
            base_name: base_name.to_string(),
        })
    }

    /// Full base name (`<hash>-<name>`)
    pub fn as_str(&self) -> &str {
        &self.base_name
    }

    /// Raw bytes of the base name, as sent over the wire
    pub fn as_bytes(&self) -> &[u8] {
        self.base_name.as_bytes()
    }

    pub fn hash_part(&self) -> &str {
        &self.base_name[..HASH_PART_LEN]
    }

    pub fn name(&self) -> &str {
        &self.base_name[HASH_PART_LEN + 1..]
    }
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'+' | b'-' | b'.' | b'_' | b'?' | b'=')
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_name)
    }
}

impl std::str::FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "7rjj86a15146cq1d3qy068lml7n8ykzm";

    #[test]
    fn test_parse_valid() {
        let path = StorePath::parse(&format!("{}-hello-2.12.1", HASH)).unwrap();
        assert_eq!(path.hash_part(), HASH);
        assert_eq!(path.name(), "hello-2.12.1");
        assert_eq!(path.to_string(), format!("{}-hello-2.12.1", HASH));
    }

    #[test]
    fn test_parse_allowed_name_chars() {
        assert!(StorePath::parse(&format!("{}-a+b_c?d=e.f-g", HASH)).is_ok());
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            StorePath::parse(HASH),
            Err(StoreError::InvalidPath { .. })
        ));
        assert!(StorePath::parse(&format!("{}-", HASH)).is_err());
    }

    #[test]
    fn test_bad_hash_char() {
        // 'e' is not part of the base-32 alphabet
        let bad = format!("e{}-hello", &HASH[1..]);
        assert!(StorePath::parse(&bad).is_err());
    }

    #[test]
    fn test_missing_dash() {
        assert!(StorePath::parse(&format!("{}_hello", HASH)).is_err());
    }

    #[test]
    fn test_leading_dot_and_illegal_chars() {
        assert!(StorePath::parse(&format!("{}-.hidden", HASH)).is_err());
        assert!(StorePath::parse(&format!("{}-a/b", HASH)).is_err());
        assert!(StorePath::parse(&format!("{}-a b", HASH)).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_invalid_utf8() {
        let mut raw = format!("{}-x", HASH).into_bytes();
        raw.push(0xFF);
        assert!(matches!(
            StorePath::from_bytes(&raw),
            Err(StoreError::InvalidPath { .. })
        ));
    }
}
