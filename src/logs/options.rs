// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use thiserror::Error;

/// How much of a container's log to request.
///
/// Follow mode tails the live stream with no line bound. A fixed tail must
/// name a positive line count: an empty fixed tail is a caller error, not
/// emptiness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailOptions {
    pub follow: bool,
    pub lines: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TailOptionsError {
    #[error("a fixed tail requires a line count")]
    MissingLines,
    #[error("a fixed tail requires a positive line count, got {0}")]
    NonPositiveLines(i64),
}

impl TailOptions {
    /// Live tail with unbounded lines.
    pub fn follow() -> Self {
        Self {
            follow: true,
            lines: None,
        }
    }

    /// Bounded one-shot tail of the last `lines` lines.
    pub fn fixed(lines: i64) -> Result<Self, TailOptionsError> {
        let options = Self {
            follow: false,
            lines: Some(lines),
        };
        options.validate()?;
        Ok(options)
    }

    /// Validated before any network call is made.
    pub fn validate(&self) -> Result<(), TailOptionsError> {
        if self.follow {
            return Ok(());
        }
        match self.lines {
            None => Err(TailOptionsError::MissingLines),
            Some(lines) if lines <= 0 => Err(TailOptionsError::NonPositiveLines(lines)),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_needs_no_line_count() {
        assert!(TailOptions::follow().validate().is_ok());
    }

    #[test]
    fn fixed_tail_requires_positive_lines() {
        assert_eq!(TailOptions::fixed(10).unwrap().lines, Some(10));
        assert_eq!(
            TailOptions::fixed(0).unwrap_err(),
            TailOptionsError::NonPositiveLines(0)
        );
        assert_eq!(
            TailOptions::fixed(-5).unwrap_err(),
            TailOptionsError::NonPositiveLines(-5)
        );
    }

    #[test]
    fn fixed_tail_without_lines_is_rejected() {
        let options = TailOptions {
            follow: false,
            lines: None,
        };
        assert_eq!(options.validate().unwrap_err(), TailOptionsError::MissingLines);
    }
}
