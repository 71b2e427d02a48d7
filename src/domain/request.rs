//! Lifecycle of one remote operation.
//!
//! A [`RequestState`] starts `Idle`, becomes `Pending` when its controller
//! triggers a call, and settles as `Succeeded` or `Failed`. Settlements are
//! numbered so that the state can tell whether its `data` belongs to the
//! latest settlement or is left over from an earlier success.

use super::errors::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl RequestStatus {
    pub fn is_settled(self) -> bool {
        matches!(self, RequestStatus::Succeeded | RequestStatus::Failed)
    }
}

/// Observable state of a resource request.
///
/// # Examples
///
/// ```
/// use bizdesk::domain::{RequestState, RequestStatus, RequestError};
///
/// let mut state: RequestState<u32> = RequestState::default();
/// state.begin();
/// state.succeed(1, 7);
/// state.begin();
/// state.fail(2, RequestError::transport("offline"));
///
/// assert_eq!(state.status(), RequestStatus::Failed);
/// assert_eq!(state.data(), Some(&7));
/// assert!(state.is_stale());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    status: RequestStatus,
    data: Option<T>,
    error: Option<RequestError>,
    /// Sequence of the call that produced `data`.
    data_seq: u64,
    /// Sequence of the call that produced `error`.
    error_seq: u64,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            status: RequestStatus::Idle,
            data: None,
            error: None,
            data_seq: 0,
            error_seq: 0,
        }
    }
}

impl<T> RequestState<T> {
    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// Last successful payload, possibly from an earlier settlement.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Payload only when the latest settlement succeeded.
    pub fn fresh_data(&self) -> Option<&T> {
        match self.status {
            RequestStatus::Succeeded => self.data.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == RequestStatus::Idle
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == RequestStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.status == RequestStatus::Failed
    }

    /// True when `data` is present but was produced before the latest failure.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some() && self.data_seq < self.error_seq
    }

    /// Sequence numbers of the settlements behind `data` and `error`.
    pub fn settlement_seqs(&self) -> (u64, u64) {
        (self.data_seq, self.error_seq)
    }

    /// Moves to `Pending`, dropping the previous error.
    pub fn begin(&mut self) {
        self.error = None;
        self.error_seq = 0;
        self.status = RequestStatus::Pending;
    }

    pub fn succeed(&mut self, seq: u64, data: T) {
        self.data = Some(data);
        self.data_seq = seq;
        self.error = None;
        self.error_seq = 0;
        self.status = RequestStatus::Succeeded;
    }

    /// Records a failure; `data` from an earlier success is kept for display.
    pub fn fail(&mut self, seq: u64, error: RequestError) {
        self.error = Some(error);
        self.error_seq = seq;
        self.status = RequestStatus::Failed;
    }

    /// Replaces the payload without a remote round trip, used for local
    /// corrections such as removing a deleted row.
    pub fn set_data(&mut self, data: T) {
        self.data = Some(data);
    }

    pub fn data_mut(&mut self) -> Option<&mut T> {
        self.data.as_mut()
    }

    /// Everything [`begin`](Self::begin) changes, so that a call that never
    /// settles can be undone.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            status: self.status,
            error: self.error.clone(),
            error_seq: self.error_seq,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.status = checkpoint.status;
        self.error = checkpoint.error;
        self.error_seq = checkpoint.error_seq;
    }
}

/// Status and error of a [`RequestState`] as they were before a call began.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    status: RequestStatus,
    error: Option<RequestError>,
    error_seq: u64,
}
