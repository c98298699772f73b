use std::fmt;

use thiserror::Error;

/// Longest accepted identifier after normalization.
pub const MAX_IMSI_LEN: usize = 15;

/// Why a raw token could not be turned into an [`Imsi`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImsiError {
    #[error("token contains no digits")]
    Empty,

    #[error("token has {len} digits, more than the {MAX_IMSI_LEN} allowed")]
    TooLong { len: usize },
}

/// A normalized subscriber identifier: 1 to 15 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Imsi(String);

impl Imsi {
    /// Strip every non-digit character from `raw` and validate the length.
    ///
    /// `"001-01-0123456789"` normalizes to `"001010123456789"`.
    pub fn normalize(raw: &str) -> Result<Self, ImsiError> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        match digits.len() {
            0 => Err(ImsiError::Empty),
            len if len > MAX_IMSI_LEN => Err(ImsiError::TooLong { len }),
            _ => Ok(Self(digits)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Imsi {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Imsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
