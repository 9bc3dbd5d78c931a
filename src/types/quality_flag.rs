//! Defines the `QualityFlag` enum, mapping the provider's numeric quality level
//! codes (the `QN` columns of the data files) to descriptive variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned per-sample confidence code.
///
/// Codes `0..=7` map to the named variants. Any other code maps to
/// [`QualityFlag::FlagNonExistent`], which is distinct from a datapoint having
/// no flag at all (`Option::None` on [`crate::Datapoint::quality`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QualityFlag {
    /// Code 0: Unflagged.
    Unflagged,
    /// Code 1: No objections, either checked or unchecked.
    NoObjections,
    /// Code 2: Corrected.
    Corrected,
    /// Code 3: Confirmed after an objection was rejected.
    ConfirmedAfterObjection,
    /// Code 4: Added or calculated.
    AddedOrCalculated,
    /// Code 5: Objected.
    Objected,
    /// Code 6: Only formally checked.
    OnlyFormalCheck,
    /// Code 7: Formal objection.
    FormalObjection,
    /// The file carried a code outside the documented range.
    FlagNonExistent,
}

impl QualityFlag {
    /// Maps a numeric quality level to its flag.
    ///
    /// # Examples
    ///
    /// ```
    /// use dwd_climate::QualityFlag;
    ///
    /// assert_eq!(QualityFlag::from_code(2), QualityFlag::Corrected);
    /// assert_eq!(QualityFlag::from_code(10), QualityFlag::FlagNonExistent);
    /// ```
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => QualityFlag::Unflagged,
            1 => QualityFlag::NoObjections,
            2 => QualityFlag::Corrected,
            3 => QualityFlag::ConfirmedAfterObjection,
            4 => QualityFlag::AddedOrCalculated,
            5 => QualityFlag::Objected,
            6 => QualityFlag::OnlyFormalCheck,
            7 => QualityFlag::FormalObjection,
            _ => QualityFlag::FlagNonExistent,
        }
    }

    /// Parses the raw text of a quality level column. Text that is not an
    /// integer is treated like an out-of-range code.
    pub fn from_raw(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map(Self::from_code)
            .unwrap_or(QualityFlag::FlagNonExistent)
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            QualityFlag::Unflagged => Some(0),
            QualityFlag::NoObjections => Some(1),
            QualityFlag::Corrected => Some(2),
            QualityFlag::ConfirmedAfterObjection => Some(3),
            QualityFlag::AddedOrCalculated => Some(4),
            QualityFlag::Objected => Some(5),
            QualityFlag::OnlyFormalCheck => Some(6),
            QualityFlag::FormalObjection => Some(7),
            QualityFlag::FlagNonExistent => None,
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityFlag::Unflagged => "unflagged",
            QualityFlag::NoObjections => "noObjections",
            QualityFlag::Corrected => "corrected",
            QualityFlag::ConfirmedAfterObjection => "confirmedAfterObjection",
            QualityFlag::AddedOrCalculated => "addedOrCalculated",
            QualityFlag::Objected => "objected",
            QualityFlag::OnlyFormalCheck => "onlyFormalCheck",
            QualityFlag::FormalObjection => "formalObjection",
            QualityFlag::FlagNonExistent => "flagNonExistent",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for code in 0..=7 {
            assert_eq!(QualityFlag::from_code(code).code(), Some(code));
        }
    }

    #[test]
    fn out_of_range_and_garbage_map_to_sentinel() {
        assert_eq!(QualityFlag::from_code(-999), QualityFlag::FlagNonExistent);
        assert_eq!(QualityFlag::from_raw("  9"), QualityFlag::FlagNonExistent);
        assert_eq!(QualityFlag::from_raw("x"), QualityFlag::FlagNonExistent);
        assert_eq!(QualityFlag::from_raw(" 3"), QualityFlag::ConfirmedAfterObjection);
        assert_ne!(QualityFlag::from_raw("0"), QualityFlag::FlagNonExistent);
    }
}
