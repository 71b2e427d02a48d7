//! Single-slot transient message store shared by the whole view tree.
//!
//! At most one message is live. Every [`show`](NotificationQueue::show)
//! replaces the current message and moves its expiry deadline, so an older
//! message can never dismiss a newer one.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a notification stays visible unless replaced or dismissed.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    #[default]
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationMessage {
    pub visible: bool,
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Default)]
struct Slot {
    message: NotificationMessage,
    deadline: Option<Instant>,
}

/// Cloneable handle to the session's notification slot.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    slot: Rc<RefCell<Slot>>,
    dwell: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL)
    }
}

impl NotificationQueue {
    pub fn new(dwell: Duration) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::default())),
            dwell,
        }
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    /// Replaces whatever is showing and restarts the dwell timer.
    pub fn show(&self, text: impl Into<String>, severity: Severity) {
        let text = text.into();
        tracing::debug!(?severity, %text, "notification shown");
        let mut slot = self.slot.borrow_mut();
        slot.message = NotificationMessage {
            visible: true,
            text,
            severity,
        };
        slot.deadline = Some(Instant::now() + self.dwell);
    }

    pub fn dismiss(&self) {
        let mut slot = self.slot.borrow_mut();
        slot.message = NotificationMessage::default();
        slot.deadline = None;
    }

    /// The live message, clearing it first if its dwell has elapsed.
    pub fn current(&self) -> Option<NotificationMessage> {
        self.expire_due(Instant::now());
        let slot = self.slot.borrow();
        slot.message.visible.then(|| slot.message.clone())
    }

    /// Current slot contents, including the hidden state.
    pub fn snapshot(&self) -> NotificationMessage {
        self.expire_due(Instant::now());
        self.slot.borrow().message.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.borrow().deadline
    }

    /// Resolves once the live message has been cleared by its timer. Pends
    /// forever while nothing is showing, so it is meant to be raced against
    /// other events in the UI loop.
    pub async fn expired(&self) {
        loop {
            let Some(deadline) = self.deadline() else {
                futures::future::pending::<()>().await;
                return;
            };
            tokio::time::sleep_until(deadline).await;
            if self.expire_due(Instant::now()) {
                return;
            }
        }
    }

    fn expire_due(&self, now: Instant) -> bool {
        let mut slot = self.slot.borrow_mut();
        match slot.deadline {
            Some(deadline) if deadline <= now => {
                slot.message = NotificationMessage::default();
                slot.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_message_clears_after_dwell() {
        let queue = NotificationQueue::default();
        queue.show("Saved", Severity::Success);
        assert_eq!(queue.current().unwrap().text, "Saved");

        advance(Duration::from_millis(1999)).await;
        assert!(queue.current().is_some());

        advance(Duration::from_millis(1)).await;
        assert!(queue.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_show_restarts_dwell() {
        let queue = NotificationQueue::default();
        queue.show("first", Severity::Info);
        advance(Duration::from_millis(1500)).await;
        queue.show("second", Severity::Danger);

        advance(Duration::from_millis(1000)).await;
        let live = queue.current().unwrap();
        assert_eq!(live.text, "second");
        assert_eq!(live.severity, Severity::Danger);

        advance(Duration::from_millis(1000)).await;
        assert!(queue.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_is_idempotent_and_cancels_expiry() {
        let queue = NotificationQueue::default();
        queue.show("bye", Severity::Warning);
        queue.dismiss();
        queue.dismiss();
        assert!(queue.current().is_none());
        assert!(queue.deadline().is_none());
        assert!(!queue.snapshot().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_waits_for_latest_deadline() {
        let queue = NotificationQueue::default();
        queue.show("first", Severity::Info);
        let started = Instant::now();

        let waiter = queue.clone();
        let replacer = queue.clone();
        let replace = async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            replacer.show("second", Severity::Info);
        };
        let ((), ()) = tokio::join!(waiter.expired(), replace);

        assert_eq!(Instant::now() - started, Duration::from_millis(2500));
        assert!(queue.current().is_none());
    }

    #[test]
    fn test_default_severity_is_neutral() {
        assert_eq!(NotificationMessage::default().severity, Severity::Neutral);
        assert_eq!(NotificationQueue::default().dwell(), DEFAULT_DWELL);
    }
}
