//! Core types for Capline

use serde::{Deserialize, Serialize};

/// One caption line, shown starting at `time` seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    /// Start time in seconds
    pub time: f64,
    /// Caption text (may be empty)
    pub text: String,
}

impl Caption {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Captions in input order.
///
/// The list is not sorted by time: when two captions overlap the tolerance
/// window, the one that comes first in the list wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionList(Vec<Caption>);

impl CaptionList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Caption> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Caption] {
        &self.0
    }
}

impl From<Vec<Caption>> for CaptionList {
    fn from(captions: Vec<Caption>) -> Self {
        Self(captions)
    }
}

impl<'a> IntoIterator for &'a CaptionList {
    type Item = &'a Caption;
    type IntoIter = std::slice::Iter<'a, Caption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Player view state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// No URL loaded
    #[default]
    Idle,
    /// URL loaded, waiting for the backend to signal readiness
    Loading,
    /// Backend is ready, clock samples are flowing
    Ready,
}

impl PlayerState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlayerState) -> bool {
        use PlayerState::*;
        matches!(
            (self, target),
            (Idle, Loading)
                | (Loading, Loading)
                | (Loading, Ready)
                | (Ready, Loading)
                | (_, Idle)
        )
    }

    pub fn is_loading(&self) -> bool {
        *self == PlayerState::Loading
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Ready => write!(f, "ready"),
        }
    }
}

/// What the parser does with a line that holds only whitespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlankLines {
    /// Treat it as an invalid timestamp
    #[default]
    Reject,
    /// Ignore it
    Skip,
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Sampling period for embedded players (milliseconds)
    pub poll_interval_ms: u64,
    /// Half-width of the window around a caption's start time (seconds)
    pub tolerance_secs: f64,
    /// Blank line handling in caption input
    pub blank_lines: BlankLines,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            tolerance_secs: crate::captions::TOLERANCE_SECS,
            blank_lines: BlankLines::Reject,
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the clock adapters cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.tolerance_secs.is_finite() || self.tolerance_secs <= 0.0 {
            return Err(crate::Error::InvalidConfig(format!(
                "tolerance_secs must be a positive number, got {}",
                self.tolerance_secs
            )));
        }
        Ok(())
    }
}

/// Unique identifier for a player session
#[cfg(feature = "runtime")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

#[cfg(feature = "runtime")]
impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

#[cfg(feature = "runtime")]
impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "runtime")]
impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert!(PlayerState::Idle.can_transition_to(PlayerState::Loading));
        assert!(PlayerState::Loading.can_transition_to(PlayerState::Ready));
        assert!(PlayerState::Ready.can_transition_to(PlayerState::Loading));
        assert!(PlayerState::Ready.can_transition_to(PlayerState::Idle));

        assert!(!PlayerState::Idle.can_transition_to(PlayerState::Ready));
        assert!(!PlayerState::Ready.can_transition_to(PlayerState::Ready));
    }

    #[test]
    fn test_config_from_json_partial() {
        let config = PlayerConfig::from_json(r#"{"blank_lines": "skip"}"#).unwrap();
        assert_eq!(config.blank_lines, BlankLines::Skip);
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.tolerance_secs, 0.5);
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        let err = PlayerConfig::from_json(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_caption_list_serializes_as_array() {
        let list = CaptionList::from(vec![Caption::new(60.0, "Caption text")]);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"[{"time":60.0,"text":"Caption text"}]"#);
    }
}
