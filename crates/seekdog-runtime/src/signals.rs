//! Coordination signals between the round loop and the feedback path.
//!
//! | Signal               | Set by                         | Cleared by                   |
//! |----------------------|--------------------------------|------------------------------|
//! | `session_active`     | construction                   | shutdown / end of run        |
//! | `feedback_complete`  | feedback submit, cancel, drop  | feedback request             |
//! | `interrupt_requested`| feedback request (latched)     | round loop, before a round   |
//!
//! `interrupt_requested` is paired with a [`Notify`] so an in-flight decision
//! call can be cancelled the moment feedback is requested rather than at the
//! next checkpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use seekdog_types::SeekError;
use tokio::sync::{Notify, watch};
use tracing::debug;

#[derive(Debug)]
pub struct RoundSignals {
    session_active: watch::Sender<bool>,
    feedback_complete: watch::Sender<bool>,
    interrupt_requested: AtomicBool,
    interrupt_notify: Notify,
    feedback_open: AtomicBool,
}

impl Default for RoundSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundSignals {
    /// Active session, no feedback in progress, no interrupt pending.
    pub fn new() -> Self {
        let (session_active, _) = watch::channel(true);
        let (feedback_complete, _) = watch::channel(true);
        Self {
            session_active,
            feedback_complete,
            interrupt_requested: AtomicBool::new(false),
            interrupt_notify: Notify::new(),
            feedback_open: AtomicBool::new(false),
        }
    }

    pub fn is_session_active(&self) -> bool {
        *self.session_active.borrow()
    }

    /// Mark the session inactive and wake anything waiting on it.
    pub fn close_session(&self) {
        self.session_active.send_replace(false);
        self.interrupt_notify.notify_waiters();
    }

    pub fn is_feedback_complete(&self) -> bool {
        *self.feedback_complete.borrow()
    }

    pub fn interrupt_pending(&self) -> bool {
        self.interrupt_requested.load(Ordering::SeqCst)
    }

    /// Clear the interrupt flag, returning whether it was set.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt_requested.swap(false, Ordering::SeqCst)
    }

    /// Open a feedback window: pause the round loop and interrupt the
    /// current round.
    ///
    /// # Errors
    ///
    /// [`SeekError::SessionClosed`] once the session has ended and
    /// [`SeekError::FeedbackBusy`] while another window is open.
    pub fn begin_feedback(&self) -> Result<(), SeekError> {
        if !self.is_session_active() {
            return Err(SeekError::SessionClosed);
        }
        if self.feedback_open.swap(true, Ordering::SeqCst) {
            return Err(SeekError::FeedbackBusy);
        }
        self.feedback_complete.send_replace(false);
        self.interrupt_requested.store(true, Ordering::SeqCst);
        self.interrupt_notify.notify_waiters();
        debug!("feedback window opened");
        Ok(())
    }

    /// Close the feedback window and let the round loop continue.
    /// Idempotent.
    pub fn end_feedback(&self) {
        self.feedback_open.store(false, Ordering::SeqCst);
        self.feedback_complete.send_replace(true);
        debug!("feedback window closed");
    }

    /// Resolves once an interrupt is pending (immediately if one already is)
    /// or the session closes.
    pub async fn interrupted(&self) {
        loop {
            let notified = self.interrupt_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.interrupt_pending() || !self.is_session_active() {
                return;
            }
            notified.await;
        }
    }

    /// Resolves once the session is no longer active.
    pub async fn session_closed(&self) {
        let mut rx = self.session_active.subscribe();
        // Err means the sender is gone, which only happens on teardown.
        let _ = rx.wait_for(|active| !*active).await;
    }

    /// Wait until no feedback is in progress.
    ///
    /// Returns `false` if the session closed first.
    pub async fn wait_for_turn(&self) -> bool {
        let mut done = self.feedback_complete.subscribe();
        tokio::select! {
            res = done.wait_for(|complete| *complete) => {
                res.is_ok() && self.is_session_active()
            }
            _ = self.session_closed() => false,
        }
    }
}
