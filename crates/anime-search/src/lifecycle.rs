//! Request lifecycle: at most one authoritative attempt at a time.
//!
//! Starting an attempt cancels whichever attempt came before it. Settlements
//! are checked against the current attempt id before they touch state, so a
//! reply that arrives after its attempt was superseded is dropped even if the
//! transport ignored the cancellation.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identifier of one fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(u64);

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle for one attempt: its id and the token that aborts it
#[derive(Debug, Clone)]
pub struct Attempt {
    pub id: AttemptId,
    pub token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct RequestLifecycle {
    current: Option<Attempt>,
    issued: u64,
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new attempt, cancelling the previous one if still active
    pub fn begin(&mut self) -> Attempt {
        if let Some(previous) = self.current.take() {
            debug!(attempt = %previous.id, "Superseding attempt");
            previous.token.cancel();
        }

        self.issued += 1;
        let attempt = Attempt {
            id: AttemptId(self.issued),
            token: CancellationToken::new(),
        };
        self.current = Some(attempt.clone());
        attempt
    }

    /// Cancel the current attempt. No-op when nothing is active.
    pub fn cancel(&mut self) {
        if let Some(current) = self.current.take() {
            debug!(attempt = %current.id, "Cancelling attempt");
            current.token.cancel();
        }
    }

    /// Whether `id` is still the authoritative attempt
    pub fn is_current(&self, id: AttemptId) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.id == id && !current.token.is_cancelled())
    }

    /// Mark `id` as settled. Returns `false` if it was superseded or cancelled.
    pub fn finish(&mut self, id: AttemptId) -> bool {
        if self.is_current(id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}
