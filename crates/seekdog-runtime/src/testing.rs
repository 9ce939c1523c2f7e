//! Scripted collaborators shared by the scheduler and feedback tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use seekdog_hal::{SimActuator, SimCamera};
use seekdog_memory::RoundMemory;
use seekdog_nav::ObstacleMap;
use seekdog_types::{Action, Observation, Pose, SeekError};
use tokio::sync::Notify;

use crate::classifier::KeywordClassifier;
use crate::collaborator::{Decider, Decision, DecisionRequest};
use crate::scheduler::{Collaborators, RoundScheduler, SchedulerConfig};

pub(crate) fn decision(actions: Vec<Action>, new_pose: Pose) -> Decision {
    Decision {
        observation: Observation::empty(),
        new_pose,
        actions,
        rationale: "scripted".to_string(),
    }
}

/// Replies from a queue, then with a fixed fallback.
pub(crate) struct ScriptedDecider {
    replies: Mutex<VecDeque<Result<Decision, SeekError>>>,
    fallback: Result<Decision, SeekError>,
    stall_first: AtomicBool,
    calls: AtomicUsize,
    requests: Mutex<Vec<DecisionRequest>>,
    started: Notify,
}

impl ScriptedDecider {
    pub(crate) fn new(fallback: Result<Decision, SeekError>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            stall_first: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            started: Notify::new(),
        })
    }

    /// Queue `reply` ahead of the fallback.
    pub(crate) fn with_reply(self: Arc<Self>, reply: Result<Decision, SeekError>) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Never answer the first call.
    pub(crate) fn stalling_first(self: Arc<Self>) -> Arc<Self> {
        self.stall_first.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolves once a call has started (immediately if one already did).
    pub(crate) async fn started(&self) {
        self.started.notified().await;
    }

    pub(crate) fn memories(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.memory.clone()).collect()
    }

    pub(crate) fn feedbacks(&self) -> Vec<Option<String>> {
        self.requests.lock().unwrap().iter().map(|r| r.feedback.clone()).collect()
    }
}

#[async_trait]
impl Decider for ScriptedDecider {
    async fn decide(&self, request: DecisionRequest) -> Result<Decision, SeekError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();
        if n == 0 && self.stall_first.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// A scheduler wired to simulated hardware and the default map.
pub(crate) struct Harness {
    pub(crate) scheduler: Arc<RoundScheduler>,
    executed: Arc<Mutex<Vec<Action>>>,
}

impl Harness {
    pub(crate) fn new(config: SchedulerConfig, decider: Arc<dyn Decider>) -> Self {
        Self::with_memory(config, decider, RoundMemory::new())
    }

    pub(crate) fn with_memory(
        config: SchedulerConfig,
        decider: Arc<dyn Decider>,
        memory: RoundMemory,
    ) -> Self {
        let actuator = SimActuator::new(config.start_pose);
        let executed = actuator.executed();
        let map = ObstacleMap::from_config(&config.map);
        let collaborators = Collaborators {
            decider,
            classifier: Arc::new(KeywordClassifier::from_map(&map)),
            camera: Box::new(SimCamera::new("front")),
            actuator: Box::new(actuator),
            memory,
        };
        Self {
            scheduler: Arc::new(RoundScheduler::new(config, collaborators)),
            executed,
        }
    }

    pub(crate) fn executed(&self) -> Vec<Action> {
        self.executed.lock().unwrap().clone()
    }
}
