//! Utility types: the recurring bill kinds expected every month.

use serde::{Deserialize, Serialize};

pub type UtilityTypeId = i64;

/// A recurring bill kind such as electricity or water.
///
/// Types are deactivated instead of deleted so historic bills keep a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityType {
    pub id: UtilityTypeId,
    /// Stable lowercase key referenced by `bills.utility_type`.
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

/// Normalizes user input into a utility code: trimmed, lowercase, spaces as `_`.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::normalize_code;

    #[test]
    fn normalize_code_lowercases_and_joins_words() {
        assert_eq!(normalize_code("  Hot Water "), "hot_water");
        assert_eq!(normalize_code("INTERNET"), "internet");
        assert_eq!(normalize_code("   "), "");
    }
}
