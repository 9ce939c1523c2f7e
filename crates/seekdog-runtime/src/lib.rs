//! `seekdog-runtime` – The Search Loop
//!
//! Drives a target search round by round and lets an operator pre-empt it
//! with feedback at any moment.
//!
//! # Modules
//!
//! - [`scheduler`] – [`RoundScheduler`][scheduler::RoundScheduler]: the
//!   perceive–decide–act loop, its configuration and lifecycle states.
//! - [`feedback`] – [`FeedbackChannel`][feedback::FeedbackChannel] and
//!   [`FeedbackSession`][feedback::FeedbackSession]: interrupt the loop, then
//!   either drive to a named landmark or hand free-form text to the decider.
//! - [`signals`] – [`RoundSignals`][signals::RoundSignals]: the session,
//!   feedback-complete and latched interrupt flags shared by both paths.
//! - [`collaborator`] – the [`Decider`][collaborator::Decider],
//!   [`LandmarkClassifier`][collaborator::LandmarkClassifier] and
//!   [`Perception`][collaborator::Perception] seams.
//! - [`classifier`] – keyword and LLM landmark classifiers.
//! - [`llm_driver`] – [`LlmDriver`][llm_driver::LlmDriver]: an
//!   OpenAI-compatible chat-completions client for local models such as
//!   [Ollama](https://ollama.com).
//! - [`llm_decider`] – [`LlmDecider`][llm_decider::LlmDecider]: builds the
//!   round prompt and parses the schema-constrained reply into typed actions.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console
//!   logging plus an optional OTLP span exporter.

pub mod classifier;
pub mod collaborator;
pub mod feedback;
pub mod llm_decider;
pub mod llm_driver;
pub mod scheduler;
pub mod signals;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use classifier::{KeywordClassifier, LlmClassifier};
pub use collaborator::{
    Decider, Decision, DecisionRequest, LandmarkClassifier, NullPerception, Perception,
    SidecarPerception,
};
pub use feedback::{FeedbackChannel, FeedbackOutcome, FeedbackSession};
pub use llm_decider::{DecisionReply, LlmDecider};
pub use llm_driver::{ChatMessage, LlmDriver, LlmError, Role, SEARCH_GUIDELINES};
pub use scheduler::{
    Collaborators, CompletionReason, PoseCorrection, RoundScheduler, RunSummary, SchedulerConfig,
    SchedulerState,
};
pub use signals::RoundSignals;
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
