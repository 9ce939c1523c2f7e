//! [`LandmarkClassifier`] implementations.
//!
//! - [`KeywordClassifier`] matches landmark names as whole words. Works
//!   offline and is deterministic.
//! - [`LlmClassifier`] asks the language model, first for a yes/no verdict
//!   and then for the landmark name.

use async_trait::async_trait;
use seekdog_nav::ObstacleMap;
use seekdog_types::SeekError;
use tracing::debug;

use crate::collaborator::LandmarkClassifier;
use crate::llm_driver::{ChatMessage, LlmDriver};

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// KeywordClassifier
// ─────────────────────────────────────────────────────────────────────────────

/// Whole-word match of landmark names against the feedback text.
///
/// Multi-word names (`"kitchen_sink"`, `"front door"`) must appear as a
/// contiguous run of words. When several names match, the longest wins.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    // (name, name split into words), longest first
    names: Vec<(String, Vec<String>)>,
}

impl KeywordClassifier {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<(String, Vec<String>)> = names
            .into_iter()
            .map(Into::into)
            .map(|name| {
                let w = words(&name);
                (name, w)
            })
            .filter(|(_, w)| !w.is_empty())
            .collect();
        names.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
        Self { names }
    }

    /// Classifier over every landmark in `map`.
    pub fn from_map(map: &ObstacleMap) -> Self {
        Self::new(map.landmarks().keys().cloned())
    }

    fn find(&self, text: &str) -> Option<&str> {
        let text = words(text);
        self.names
            .iter()
            .find(|(_, name)| text.windows(name.len()).any(|w| w == name.as_slice()))
            .map(|(name, _)| name.as_str())
    }
}

#[async_trait]
impl LandmarkClassifier for KeywordClassifier {
    async fn is_landmark_reference(&self, text: &str) -> Result<bool, SeekError> {
        Ok(self.find(text).is_some())
    }

    async fn resolve_landmark(&self, text: &str) -> Result<Option<String>, SeekError> {
        Ok(self.find(text).map(str::to_string))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmClassifier
// ─────────────────────────────────────────────────────────────────────────────

/// Asks the language model whether feedback names a landmark.
pub struct LlmClassifier {
    driver: LlmDriver,
    landmarks: Vec<String>,
}

impl LlmClassifier {
    pub fn new(driver: LlmDriver, map: &ObstacleMap) -> Self {
        Self {
            driver,
            landmarks: map.landmarks().keys().cloned().collect(),
        }
    }

    async fn ask(&self, question: String) -> Result<String, SeekError> {
        let messages = [
            ChatMessage::system(format!(
                "You classify operator instructions for a robot. Known landmarks: {}.",
                self.landmarks.join(", ")
            )),
            ChatMessage::user(question),
        ];
        self.driver
            .complete(&messages, None)
            .await
            .map_err(|e| SeekError::Collaborator(e.to_string()))
    }
}

fn parse_verdict(reply: &str) -> Result<bool, SeekError> {
    let reply = reply.trim().trim_matches(|c: char| !c.is_alphanumeric());
    if reply.eq_ignore_ascii_case("true") || reply.eq_ignore_ascii_case("yes") {
        Ok(true)
    } else if reply.eq_ignore_ascii_case("false") || reply.eq_ignore_ascii_case("no") {
        Ok(false)
    } else {
        Err(SeekError::Collaborator(format!(
            "expected true or false, got '{reply}'"
        )))
    }
}

fn parse_name(reply: &str) -> Option<String> {
    let name = reply
        .trim()
        .trim_matches(|c: char| matches!(c, '\'' | '"' | '.' | '`'))
        .trim();
    if name.is_empty() || name.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(name.to_string())
    }
}

#[async_trait]
impl LandmarkClassifier for LlmClassifier {
    async fn is_landmark_reference(&self, text: &str) -> Result<bool, SeekError> {
        let reply = self
            .ask(format!(
                "Does this instruction ask the robot to go to one of the known landmarks? \
                 Answer only true or false.\nInstruction: {text}"
            ))
            .await?;
        debug!(reply = %reply.trim(), "landmark verdict");
        parse_verdict(&reply)
    }

    async fn resolve_landmark(&self, text: &str) -> Result<Option<String>, SeekError> {
        let reply = self
            .ask(format!(
                "Which known landmark does this instruction refer to? \
                 Answer with the landmark name only, or none.\nInstruction: {text}"
            ))
            .await?;
        Ok(parse_name(&reply))
    }
}
