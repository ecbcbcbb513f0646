use thiserror::Error;

/// How existing target properties are handled when the source also defines
/// them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Every existing target key is removed before copying begins, so the
    /// target ends up structurally equal to the source.
    #[default]
    Overwrite,
    /// Conflicting target values are replaced by the source value; target
    /// keys that never conflict are kept.
    MergePreferSource,
    /// Conflicting target values are kept, even deep inside sub-nodes.
    MergePreferTarget,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("conflict policy code must be 0, 1 or 2, got {0}")]
pub struct InvalidPolicyCode(pub i64);

impl ConflictPolicy {
    /// Decodes the numeric policy codes of the wire/CLI form. Any code
    /// outside 0..=2 is rejected.
    pub fn from_code(code: i64) -> Result<ConflictPolicy, InvalidPolicyCode> {
        match code {
            0 => Ok(ConflictPolicy::Overwrite),
            1 => Ok(ConflictPolicy::MergePreferSource),
            2 => Ok(ConflictPolicy::MergePreferTarget),
            other => Err(InvalidPolicyCode(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ConflictPolicy::Overwrite => 0,
            ConflictPolicy::MergePreferSource => 1,
            ConflictPolicy::MergePreferTarget => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_three_codes() {
        assert_eq!(
            ConflictPolicy::from_code(0),
            Ok(ConflictPolicy::Overwrite)
        );
        assert_eq!(
            ConflictPolicy::from_code(1),
            Ok(ConflictPolicy::MergePreferSource)
        );
        assert_eq!(
            ConflictPolicy::from_code(2),
            Ok(ConflictPolicy::MergePreferTarget)
        );
    }

    #[test]
    fn rejects_out_of_range_codes() {
        assert_eq!(ConflictPolicy::from_code(3), Err(InvalidPolicyCode(3)));
        assert_eq!(ConflictPolicy::from_code(-1), Err(InvalidPolicyCode(-1)));
    }

    #[test]
    fn default_is_overwrite() {
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Overwrite);
    }

    #[test]
    fn codes_round_trip() {
        for code in 0..=2 {
            assert_eq!(ConflictPolicy::from_code(code).unwrap().code(), code);
        }
    }
}
