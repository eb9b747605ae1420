//! User accounts.
//!
//! Identity is the stable `id`; `login_name` is a secondary key that must be
//! unique under case/accent-insensitive normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub login_name: String,
    pub display_name: String,
    pub role: String,
    pub active: bool,
    /// Last-write timestamp, used by the element-level user merge.
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// The normalized secondary key. Two accounts must never normalize equal.
    pub fn normalized_login(&self) -> String {
        normalize_login(&self.login_name)
    }
}

/// Case/accent-insensitive normalization of a login name.
pub fn normalize_login(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .collect()
}

/// Fold common Latin diacritics onto their base letter.
fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_folds_case_and_accents() {
        assert_eq!(normalize_login("José"), "jose");
        assert_eq!(normalize_login("  MÜLLER "), "muller");
        assert_eq!(normalize_login("françois"), "francois");
    }

    #[test]
    fn distinct_logins_stay_distinct() {
        assert_ne!(normalize_login("ana"), normalize_login("anna"));
    }
}
