use super::notifications::{NotificationQueue, Severity};
use crate::infrastructure::{StoreError, TokenStore, Transport};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Everything a view needs to talk to the API: the transport, the stored
/// credentials and the shared notification slot.
///
/// Cloning is cheap and every clone refers to the same session. Once
/// [`teardown`](Self::teardown) runs, responses still in flight are
/// discarded by their controllers instead of being applied.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

struct SessionInner {
    transport: Rc<dyn Transport>,
    tokens: TokenStore,
    notifications: NotificationQueue,
    open: Cell<bool>,
}

impl Session {
    pub fn new(transport: Rc<dyn Transport>, tokens: TokenStore) -> Self {
        Self::with_notifications(transport, tokens, NotificationQueue::default())
    }

    pub fn with_dwell(transport: Rc<dyn Transport>, tokens: TokenStore, dwell: Duration) -> Self {
        Self::with_notifications(transport, tokens, NotificationQueue::new(dwell))
    }

    pub fn with_notifications(
        transport: Rc<dyn Transport>,
        tokens: TokenStore,
        notifications: NotificationQueue,
    ) -> Self {
        tracing::info!(authenticated = tokens.bearer_token().is_some(), "session opened");
        Self {
            inner: Rc::new(SessionInner {
                transport,
                tokens,
                notifications,
                open: Cell::new(true),
            }),
        }
    }

    pub fn transport(&self) -> Rc<dyn Transport> {
        Rc::clone(&self.inner.transport)
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    pub fn notify(&self, text: impl Into<String>, severity: Severity) {
        self.inner.notifications.show(text, severity);
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Closes the session. Pending responses will be dropped on arrival and
    /// the notification slot is cleared.
    pub fn teardown(&self) {
        if self.inner.open.replace(false) {
            self.inner.notifications.dismiss();
            tracing::info!("session closed");
        }
    }

    /// Forgets the stored credentials and closes the session.
    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.inner.tokens.clear()?;
        self.teardown();
        Ok(())
    }
}
