//! Sentinel-on-failure results for external collaborators
//!
//! Every adapter that wraps an upstream service hands back an [`Outcome`]:
//! either the real value or a fixed fallback that lets the interaction
//! continue. The error that caused the fallback is logged once, here.

use crate::Error;

/// Result of a call to an external collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The upstream call succeeded
    Success(T),
    /// The upstream call failed and `value` is the sentinel
    Fallback {
        value: T,
        /// Rendered error that triggered the fallback
        reason: String,
    },
}

impl<T> Outcome<T> {
    /// Convert a fallible upstream result, substituting `fallback` on error
    ///
    /// The error is logged with the service name so call sites stay quiet.
    pub fn capture(
        service: &'static str,
        result: Result<T, Error>,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => {
                tracing::error!(service, error = %e, "upstream call failed, using fallback");
                Self::Fallback {
                    value: fallback(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Whether this outcome carries the sentinel value
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Borrow the carried value
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Success(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Take the carried value, real or sentinel
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Success(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Failure reason, if this is a fallback
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_success() {
        let outcome = Outcome::capture("test", Ok(3), || 0);
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.into_inner(), 3);
    }

    #[test]
    fn test_capture_failure_uses_sentinel() {
        let outcome: Outcome<Option<u8>> =
            Outcome::capture("test", Err(Error::Tts("quota exceeded".to_string())), || None);

        assert!(outcome.is_fallback());
        assert_eq!(outcome.value(), &None);
        assert!(outcome.reason().unwrap().contains("quota exceeded"));
    }
}
