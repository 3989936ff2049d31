//! ID prefixes and generation.
//!
//! Concord-generated identifiers are a three-letter prefix, a dash and eight
//! lowercase hex characters, e.g. `txn-a3f8b2c1`. Process entity ids are
//! supplied by callers and are not generated here.

use crate::errors::CoreError;

pub const PREFIX_TRANSACTION: &str = "txn";
pub const PREFIX_GAP: &str = "gap";
pub const PREFIX_FIX: &str = "fix";
pub const PREFIX_RUN: &str = "run";

pub const ALL_PREFIXES: &[&str] = &[PREFIX_TRANSACTION, PREFIX_GAP, PREFIX_FIX, PREFIX_RUN];

/// Generate a prefixed random id, e.g. `gap-0c1d9e4f`.
///
/// # Errors
///
/// Returns `CoreError::IdGeneration` if the OS random source is unavailable.
pub fn generate_id(prefix: &str) -> Result<String, CoreError> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes).map_err(|e| CoreError::IdGeneration(e.to_string()))?;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{prefix}-{hex}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generate_id_correct_format() {
        let id = generate_id(PREFIX_GAP).unwrap();
        assert!(id.starts_with("gap-"), "ID should start with 'gap-': {id}");
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generate_id_all_prefixes() {
        for prefix in ALL_PREFIXES {
            let id = generate_id(prefix).unwrap();
            assert!(id.starts_with(&format!("{prefix}-")));
        }
    }

    #[test]
    fn generate_id_uniqueness() {
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = generate_id("tst").unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }
}
