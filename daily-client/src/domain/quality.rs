use std::{fmt, str::FromStr};

/// Coarse completeness label attached to every daily aggregate.
///
/// `Suspect` is part of the stored vocabulary but no aggregation rule
/// currently assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityIndicator {
    Ok,
    Incomplete,
    Suspect,
}

impl QualityIndicator {
    /// `Ok` when `count` reaches `ok_threshold`, `Incomplete` otherwise.
    pub fn from_count(count: usize, ok_threshold: usize) -> Self {
        if count >= ok_threshold {
            Self::Ok
        } else {
            Self::Incomplete
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Incomplete => "INCOMPLETE",
            Self::Suspect => "SUSPECT",
        }
    }
}

impl fmt::Display for QualityIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityIndicator {
    type Err = RowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Self::Ok),
            "INCOMPLETE" => Ok(Self::Incomplete),
            "SUSPECT" => Ok(Self::Suspect),
            other => Err(RowError::UnknownQuality(other.to_string())),
        }
    }
}

/// Raised when a stored aggregate row cannot be mapped back to the domain.
#[derive(thiserror::Error, Debug)]
pub enum RowError {
    #[error("unknown quality indicator '{0}'")]
    UnknownQuality(String),
    #[error("count out of range: {0}")]
    CountOutOfRange(i64),
}

pub(crate) fn count_from_db(v: i64) -> Result<u32, RowError> {
    u32::try_from(v).map_err(|_| RowError::CountOutOfRange(v))
}
