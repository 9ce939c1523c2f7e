//! [`LlmDecider`] – a [`Decider`] backed by a chat-completions model.
//!
//! Each round the frame is run through a [`Perception`] stage, the resulting
//! observation is folded into a prompt together with the pose, the target,
//! any operator feedback and the round history, and the model answers with a
//! [`DecisionReply`] constrained by its JSON schema. Action strings are
//! parsed into [`Action`]s here; an unknown action fails the whole round.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use seekdog_types::{Action, Observation, Pose, SeekError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::collaborator::{Decider, Decision, DecisionRequest, Perception};
use crate::llm_driver::{ChatMessage, LlmDriver};

const SYSTEM_PROMPT: &str = "\
You are a quadruped robot searching a room for a target object. \
Your state is a tuple (x, y, orientation) on a grid. One grid cell is 0.5 meters.
- orientation 0 means facing north (positive y).
- orientation 90 means facing east (positive x).
- orientation 180 means facing south (negative y).
- orientation 270 means facing west (negative x).

Actions:
- 'move forward' / 'move backward': one cell along your facing direction.
- 'shift right' / 'shift left': one cell sideways, keeping your orientation.
- 'turn right' / 'turn left': rotate 90 degrees clockwise / counter-clockwise in place.
- 'stop': the target is right in front of you; the search is over.

Instructions:
1. If the target is detected near the horizontal centre of the image, move towards it.
2. If it is detected off-centre, shift towards it before moving.
3. If it is not visible, turn to check every orientation at the current cell before moving on, \
   and use the memory to avoid repeating orientations that were already explored.
4. If feedback is given, follow it exactly; it overrides the instructions above.";

/// Structured reply requested from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecisionReply {
    /// Whether the target is visible in this round's image analysis.
    pub target_visible: bool,
    /// 0-100 confidence that the target is near what is currently seen.
    pub likelihood: u8,
    /// Action names, executed in order.
    pub actions: Vec<String>,
    /// Grid x after the actions.
    pub x: i32,
    /// Grid y after the actions.
    pub y: i32,
    /// Orientation in degrees after the actions.
    pub orientation: i32,
    /// One sentence naming the instruction that drove the choice.
    pub reason: String,
}

impl DecisionReply {
    /// Parse a raw model reply, tolerating Markdown code fences and prose
    /// around the JSON object.
    ///
    /// Models that ignore `response_format` and answer in labelled
    /// `Key: value` lines are accepted too, as long as the reply carries an
    /// action line and a new-position line.
    pub fn parse(raw: &str) -> Result<Self, SeekError> {
        match (raw.find('{'), raw.rfind('}')) {
            (Some(s), Some(e)) if s < e => serde_json::from_str(&raw[s..=e])
                .map_err(|e| SeekError::Serialization(e.to_string())),
            _ => Self::parse_labelled(raw),
        }
    }

    fn parse_labelled(raw: &str) -> Result<Self, SeekError> {
        let fields: HashMap<String, &str> = raw
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| {
                let key = key
                    .trim()
                    .trim_start_matches(['-', '*', '#', ' '])
                    .to_lowercase()
                    .replace('_', " ");
                (key, value.trim())
            })
            .collect();
        let field = |names: &[&str]| names.iter().find_map(|n| fields.get(*n).copied());

        let (Some(actions), Some(pose)) = (
            field(&["action", "actions"]),
            field(&["new position", "new state", "new pose"]),
        ) else {
            return Err(SeekError::Serialization(format!(
                "no JSON object or labelled fields in reply: {raw}"
            )));
        };
        let actions = Action::parse_list(&actions.replace('.', ","))?;
        let pose: Pose = pose.parse()?;
        let likelihood = field(&["likelihood"])
            .and_then(|v| {
                v.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse::<u32>()
                    .ok()
            })
            .map_or(0, |n| n.min(100) as u8);
        let target_visible = field(&["target", "target visible"]).is_some_and(|v| {
            let v = v.to_lowercase();
            v.starts_with("yes") || v.starts_with("true")
        });

        Ok(Self {
            target_visible,
            likelihood,
            actions: actions.iter().map(|a| a.label().to_string()).collect(),
            x: pose.x,
            y: pose.y,
            orientation: pose.heading.degrees(),
            reason: field(&["reason"]).unwrap_or_default().to_string(),
        })
    }

    /// Convert to a typed [`Decision`].
    ///
    /// # Errors
    ///
    /// [`SeekError::UnknownAction`], [`SeekError::InvalidHeading`] or
    /// [`SeekError::MalformedPose`] when the model strays outside the grid
    /// vocabulary or reports a cell beyond [`Pose::COORD_LIMIT`].
    pub fn into_decision(self, observation: Observation) -> Result<Decision, SeekError> {
        let actions = self
            .actions
            .iter()
            .map(|a| a.parse::<Action>())
            .collect::<Result<Vec<_>, _>>()?;
        let new_pose = Pose::from_degrees(self.x, self.y, self.orientation)?;
        Ok(Decision {
            observation,
            new_pose,
            actions,
            rationale: self.reason,
        })
    }
}

/// Builds the per-round user prompt.
fn user_prompt(request: &DecisionRequest, observation: &Observation) -> String {
    let feedback = request
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("None.");
    format!(
        "Your target object is '{target}'.\n\
         Current Position: {pose}\n\n\
         # Image Analysis:\n{seen}\n\n\
         # Feedback:\n{feedback}\n\n\
         # Memory:\n{memory}",
        target = request.target,
        pose = request.pose,
        seen = observation.summary(),
        memory = request.memory,
    )
}

pub struct LlmDecider {
    driver: LlmDriver,
    perception: Arc<dyn Perception>,
    schema: serde_json::Value,
}

impl LlmDecider {
    pub fn new(driver: LlmDriver, perception: Arc<dyn Perception>) -> Self {
        let schema =
            serde_json::to_value(schema_for!(DecisionReply)).unwrap_or(serde_json::Value::Null);
        Self {
            driver,
            perception,
            schema,
        }
    }
}

#[async_trait]
impl Decider for LlmDecider {
    #[instrument(skip_all, fields(pose = %request.pose, model = self.driver.model()))]
    async fn decide(&self, request: DecisionRequest) -> Result<Decision, SeekError> {
        let observation = self.perception.perceive(&request.frame)?;
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(user_prompt(&request, &observation)),
        ];

        let raw = self
            .driver
            .complete(&messages, Some(&self.schema))
            .await
            .map_err(|e| SeekError::Collaborator(e.to_string()))?;
        debug!(reply = %raw, "decision reply");

        DecisionReply::parse(&raw)?.into_decision(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seekdog_hal::CameraFrame;
    use seekdog_types::{Detection, Heading};

    fn request(feedback: Option<&str>) -> DecisionRequest {
        DecisionRequest {
            pose: Pose::new(1, 2, Heading::East),
            frame: CameraFrame::blank(2, 2),
            target: "banana".to_string(),
            feedback: feedback.map(str::to_string),
            memory: "None.".to_string(),
        }
    }

    #[test]
    fn prompt_carries_round_context() {
        let obs = Observation {
            detections: vec![Detection {
                label: "banana".to_string(),
                center_px: (10, 20),
                distance_m: 0.8,
            }],
            description: String::new(),
        };
        let text = user_prompt(&request(Some("turn left twice")), &obs);
        assert!(text.contains("'banana'"));
        assert!(text.contains("Current Position: (1, 2, 90)"));
        assert!(text.contains("You detected banana"));
        assert!(text.contains("# Feedback:\nturn left twice"));
        assert!(text.contains("# Memory:\nNone."));
    }

    #[test]
    fn blank_feedback_renders_as_none() {
        let text = user_prompt(&request(Some("   ")), &Observation::empty());
        assert!(text.contains("# Feedback:\nNone."));
    }

    #[test]
    fn parses_fenced_reply_into_decision() {
        let raw = "```json\n{\"target_visible\": true, \"likelihood\": 100, \
                   \"actions\": [\"move forward\", \"Turn_Right\"], \"x\": 2, \"y\": 2, \
                   \"orientation\": 180, \"reason\": \"target ahead\"}\n```";
        let decision = DecisionReply::parse(raw)
            .unwrap()
            .into_decision(Observation::empty())
            .unwrap();
        assert_eq!(decision.actions, vec![Action::MoveForward, Action::TurnRight]);
        assert_eq!(decision.new_pose, Pose::new(2, 2, Heading::South));
        assert_eq!(decision.rationale, "target ahead");
    }

    #[test]
    fn unknown_action_is_rejected() {
        let reply = DecisionReply {
            target_visible: false,
            likelihood: 10,
            actions: vec!["jump".to_string()],
            x: 0,
            y: 0,
            orientation: 0,
            reason: String::new(),
        };
        let err = reply.into_decision(Observation::empty()).unwrap_err();
        assert_eq!(err, SeekError::UnknownAction("jump".to_string()));
    }

    #[test]
    fn off_grid_orientation_is_rejected() {
        let reply = DecisionReply {
            target_visible: false,
            likelihood: 10,
            actions: vec![],
            x: 0,
            y: 0,
            orientation: 60,
            reason: String::new(),
        };
        assert!(matches!(
            reply.into_decision(Observation::empty()),
            Err(SeekError::InvalidHeading(60))
        ));
    }

    #[test]
    fn reply_without_json_is_a_serialization_error() {
        assert!(matches!(
            DecisionReply::parse("I think you should turn left."),
            Err(SeekError::Serialization(_))
        ));
    }

    #[test]
    fn reply_schema_lists_fields() {
        let schema = serde_json::to_value(schema_for!(DecisionReply)).unwrap().to_string();
        assert!(schema.contains("actions"));
        assert!(schema.contains("orientation"));
        assert!(schema.contains("target_visible"));
    }

    #[test]
    fn out_of_range_reported_cell_is_rejected() {
        let reply = DecisionReply {
            target_visible: false,
            likelihood: 0,
            actions: vec!["move forward".to_string()],
            x: i32::MAX,
            y: 0,
            orientation: 90,
            reason: String::new(),
        };
        assert!(matches!(
            reply.into_decision(Observation::empty()),
            Err(SeekError::MalformedPose(_))
        ));
    }

    #[test]
    fn labelled_line_reply_is_accepted() {
        let raw = "Current Position: (0, 0, 0)\n\
                   Target: Yes, on the left\n\
                   Likelihood: 80%\n\
                   Action: turn left. move forward.\n\
                   New Position: (-1, 0, 270)\n\
                   Reason: Instruction 2, the banana is to the left.";
        let reply = DecisionReply::parse(raw).unwrap();
        assert!(reply.target_visible);
        assert_eq!(reply.likelihood, 80);
        assert_eq!(reply.reason, "Instruction 2, the banana is to the left.");

        let decision = reply.into_decision(Observation::empty()).unwrap();
        assert_eq!(decision.actions, vec![Action::TurnLeft, Action::MoveForward]);
        assert_eq!(decision.new_pose, Pose::new(-1, 0, Heading::West));
    }

    #[test]
    fn labelled_reply_with_unknown_action_fails() {
        let raw = "Action: jump\nNew Position: (0, 0, 0)";
        assert_eq!(
            DecisionReply::parse(raw).unwrap_err(),
            SeekError::UnknownAction("jump".to_string())
        );
    }
}
