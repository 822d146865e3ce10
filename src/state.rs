//! Exchange finite-state machine (FSM) types.
//!
//! State transitions are driven by [`crate::exchange::Exchange`]; this module
//! only names the states and the one legal forward path through them.
//!
//! ```text
//!  Idle ──DATA sent──▶ DataSent ──ACK verified──▶ AckReceived
//!                                                      │
//!                                         final DATA   │
//!                                              sent    ▼
//!                        Done ◀──close attempted── FinSent
//!
//!  any state ──error──▶ Failed
//! ```

/// All possible states of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    /// Nothing sent yet.
    #[default]
    Idle,
    /// DATA segment sent; waiting for the ACK.
    DataSent,
    /// ACK verified; final zero-length DATA not yet sent.
    AckReceived,
    /// Final DATA sent; consuming the peer's closing ACK.
    FinSent,
    /// Exchange complete.
    Done,
    /// Exchange aborted.
    Failed,
}

impl ExchangeState {
    /// The state reached on success from `self`, or `None` when terminal.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::DataSent),
            Self::DataSent => Some(Self::AckReceived),
            Self::AckReceived => Some(Self::FinSent),
            Self::FinSent => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_ends_in_done() {
        let mut state = ExchangeState::default();
        let mut path = vec![state];
        while let Some(next) = state.successor() {
            state = next;
            path.push(state);
        }
        assert_eq!(
            path,
            [
                ExchangeState::Idle,
                ExchangeState::DataSent,
                ExchangeState::AckReceived,
                ExchangeState::FinSent,
                ExchangeState::Done,
            ]
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn failed_is_terminal() {
        assert!(ExchangeState::Failed.is_terminal());
        assert_eq!(ExchangeState::Failed.successor(), None);
        assert!(!ExchangeState::FinSent.is_terminal());
    }
}
