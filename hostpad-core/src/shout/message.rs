use std::{fmt, sync::LazyLock, time::Duration};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Display time used when every message gets the same duration.
pub const DEFAULT_FIXED_DURATION: Duration = Duration::from_secs(5);
/// Per-character display time for the proportional policy.
pub const DEFAULT_PER_CHAR_DURATION: Duration = Duration::from_millis(80);
/// Lower clamp for the proportional policy.
pub const DEFAULT_MIN_DURATION: Duration = Duration::from_secs(3);
/// Upper clamp for the proportional policy.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(15);

static URL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://\S").expect("static URL pattern compiles")
});

/// Why raw input could not become a [`ShoutMessage`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    /// Nothing left to display after normalization.
    #[error("message is empty")]
    EmptyMessage,
    /// Request envelope was malformed, missing `message`, or not a string.
    #[error("invalid shout payload: {reason}")]
    InvalidPayload {
        /// Parser diagnostics, for logs only.
        reason: String,
    },
}

/// Body accepted by the shout endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ShoutRequest {
    /// Raw, unsanitized text.
    pub message: String,
}

impl ShoutRequest {
    /// Parse a JSON body, requiring a string `message` field.
    ///
    /// The envelope must be a JSON object; serde's sequence form of the
    /// struct (`["text"]`) is rejected.
    pub fn from_json(body: &[u8]) -> Result<Self, SanitizeError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(invalid_payload)?;
        if !value.is_object() {
            return Err(SanitizeError::InvalidPayload {
                reason: "request body is not a JSON object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(invalid_payload)
    }
}

fn invalid_payload(err: serde_json::Error) -> SanitizeError {
    SanitizeError::InvalidPayload {
        reason: err.to_string(),
    }
}

/// Display variant chosen for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShoutKind {
    /// An http(s) URL handed to the renderer untouched.
    ImagePassthrough,
    /// Text escaped with a leading `.`; shown as typed.
    CommandEscape,
    /// Ordinary text, shown upper-cased.
    Shout,
}

impl ShoutKind {
    /// Value exported to the renderer through `SHOUT_KIND`.
    pub fn as_str(self) -> &'static str {
        match self {
            ShoutKind::ImagePassthrough => "image",
            ShoutKind::CommandEscape => "command",
            ShoutKind::Shout => "shout",
        }
    }

    /// Text transform applied to messages of this kind.
    ///
    /// Applying it to its own output is a no-op.
    pub fn normalize(self, text: &str) -> String {
        match self {
            ShoutKind::ImagePassthrough | ShoutKind::CommandEscape => {
                text.to_string()
            }
            ShoutKind::Shout => text.to_uppercase(),
        }
    }
}

impl fmt::Display for ShoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sanitized message ready for the overlay renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoutMessage {
    text: String,
    kind: ShoutKind,
    display_duration: Duration,
}

impl ShoutMessage {
    /// Text to display. Never empty.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Variant the text was classified as.
    pub fn kind(&self) -> ShoutKind {
        self.kind
    }

    /// How long the overlay should stay up.
    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }

    /// Length in characters, used for logging instead of the text itself.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// How display time is derived from a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy {
    /// Same duration for every message.
    Fixed {
        /// Display time.
        duration: Duration,
    },
    /// `per_char * chars`, clamped to `[min, max]`.
    Proportional {
        /// Time added per displayed character.
        per_char: Duration,
        /// Shortest display time.
        min: Duration,
        /// Longest display time.
        max: Duration,
    },
}

impl Default for DurationPolicy {
    fn default() -> Self {
        DurationPolicy::Fixed {
            duration: DEFAULT_FIXED_DURATION,
        }
    }
}

impl DurationPolicy {
    /// Proportional policy with the stock constants.
    pub fn proportional() -> Self {
        DurationPolicy::Proportional {
            per_char: DEFAULT_PER_CHAR_DURATION,
            min: DEFAULT_MIN_DURATION,
            max: DEFAULT_MAX_DURATION,
        }
    }

    /// Display time for `text`.
    pub fn duration_for(&self, text: &str) -> Duration {
        match *self {
            DurationPolicy::Fixed { duration } => duration,
            DurationPolicy::Proportional { per_char, min, max } => {
                let chars =
                    u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
                per_char.saturating_mul(chars).max(min).min(max)
            }
        }
    }
}

/// Turns raw client text into [`ShoutMessage`]s under one duration policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageSanitizer {
    policy: DurationPolicy,
}

impl MessageSanitizer {
    /// Sanitizer applying `policy` to every message.
    pub fn new(policy: DurationPolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect.
    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    /// Normalize, classify and time a raw message.
    pub fn sanitize(&self, raw: &str) -> Result<ShoutMessage, SanitizeError> {
        let (kind, text) = classify(raw)?;
        let display_duration = self.policy.duration_for(&text);

        Ok(ShoutMessage {
            text,
            kind,
            display_duration,
        })
    }
}

/// [`MessageSanitizer::sanitize`] with an explicit policy.
pub fn sanitize(
    raw: &str,
    policy: &DurationPolicy,
) -> Result<ShoutMessage, SanitizeError> {
    MessageSanitizer::new(*policy).sanitize(raw)
}

/// Collapse whitespace and pick the display variant, in priority order:
/// URL, dot escape, plain shout.
pub fn classify(raw: &str) -> Result<(ShoutKind, String), SanitizeError> {
    let collapsed = collapse_whitespace(raw);
    if collapsed.is_empty() {
        return Err(SanitizeError::EmptyMessage);
    }

    if URL_PREFIX.is_match(&collapsed) {
        return Ok((ShoutKind::ImagePassthrough, collapsed));
    }

    if let Some(rest) = collapsed.strip_prefix('.') {
        let rest = rest.trim_start();
        if rest.is_empty() {
            return Err(SanitizeError::EmptyMessage);
        }
        return Ok((ShoutKind::CommandEscape, rest.to_string()));
    }

    Ok((ShoutKind::Shout, ShoutKind::Shout.normalize(&collapsed)))
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
