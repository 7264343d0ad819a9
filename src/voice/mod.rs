//! Voice processing module
//!
//! Handles voice-message transcription (transcode + STT) and reply
//! synthesis (TTS). Audio files live in per-user directories.

mod stt;
mod transcode;
mod tts;

use std::path::{Path, PathBuf};

pub use stt::{SpeechToText, TRANSCRIPTION_FALLBACK, Transcription};
pub use transcode::{FfmpegTranscoder, Transcoder};
pub use tts::TextToSpeech;

use crate::{Error, Result};

/// Check that a user identifier is usable as a single path component
///
/// # Errors
///
/// Returns `Error::InvalidUserId` for blank ids, `.`/`..`, or ids containing
/// path separators or NUL bytes
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let unsafe_id = user_id.trim().is_empty()
        || user_id == "."
        || user_id == ".."
        || user_id.contains(['/', '\\', '\0']);

    if unsafe_id {
        return Err(Error::InvalidUserId(user_id.to_string()));
    }
    Ok(())
}

/// Per-user subdirectory of `base`
///
/// # Errors
///
/// Returns error if the user id is not a safe path component
pub fn user_dir(base: &Path, user_id: &str) -> Result<PathBuf> {
    validate_user_id(user_id)?;
    Ok(base.join(user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ids_are_valid() {
        assert!(validate_user_id("123456789").is_ok());
        assert!(validate_user_id("ada.lovelace").is_ok());
        assert!(validate_user_id("user-42_x").is_ok());
    }

    #[test]
    fn test_traversal_rejected() {
        for id in ["", "  ", ".", "..", "../etc", "a/b", "a\\b", "nul\0"] {
            assert!(
                matches!(validate_user_id(id), Err(Error::InvalidUserId(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_user_dir() {
        let dir = user_dir(Path::new("audio_outputs"), "42").unwrap();
        assert_eq!(dir, PathBuf::from("audio_outputs/42"));
    }
}
