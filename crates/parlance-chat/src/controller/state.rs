//! Request lifecycle states.

use crate::ChatError;

/// `Idle -> Sending -> Streaming -> {Completed | Cancelled | Failed} -> Idle`,
/// with `Sending` also allowed to end directly in `Cancelled` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl RequestState {
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Idle, Sending)
                | (Sending, Streaming | Cancelled | Failed)
                | (Streaming, Completed | Cancelled | Failed)
                | (Completed | Cancelled | Failed, Idle)
        )
    }

    pub fn transition(self, next: RequestState) -> Result<RequestState, ChatError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ChatError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// A request is open and may still produce events.
    pub fn is_in_flight(self) -> bool {
        matches!(self, RequestState::Sending | RequestState::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Completed | RequestState::Cancelled | RequestState::Failed
        )
    }
}
