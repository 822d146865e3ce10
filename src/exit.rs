//! Process exit conditions.
//!
//! Every way the sender can end maps onto one of a small closed set of
//! conditions, each with a fixed numeric exit code.

use std::process::ExitCode;

use crate::exchange::{ExchangeError, Leg};
use crate::input::InputError;
use crate::socket::SocketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCondition {
    Success,
    /// Bad arguments or unusable input.
    Usage,
    Resolve,
    Socket,
    Build,
    Send,
    Receive,
    Verify,
    /// Building the final zero-length segment failed.
    FinBuild,
    /// Sending the final zero-length segment failed.
    FinSend,
}

impl ExitCondition {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Usage => 1,
            Self::Resolve => 2,
            Self::Socket => 3,
            Self::Build => 4,
            Self::Send => 5,
            Self::Receive => 6,
            Self::Verify => 7,
            Self::FinBuild => 8,
            Self::FinSend => 9,
        }
    }
}

impl From<ExitCondition> for ExitCode {
    fn from(condition: ExitCondition) -> Self {
        ExitCode::from(condition.code())
    }
}

impl From<&ExchangeError> for ExitCondition {
    fn from(err: &ExchangeError) -> Self {
        match err {
            ExchangeError::Build { leg: Leg::Data, .. } => Self::Build,
            ExchangeError::Build { leg: Leg::Fin, .. } => Self::FinBuild,
            ExchangeError::SendFailed { leg: Leg::Data, .. }
            | ExchangeError::ShortSend { leg: Leg::Data, .. } => Self::Send,
            ExchangeError::SendFailed { leg: Leg::Fin, .. }
            | ExchangeError::ShortSend { leg: Leg::Fin, .. } => Self::FinSend,
            ExchangeError::ReceiveFailed(_) => Self::Receive,
            ExchangeError::Verify(_) => Self::Verify,
            // Misuse of the library, not something a CLI user can cause.
            ExchangeError::AlreadyRun { .. } => Self::Usage,
        }
    }
}

impl From<&SocketError> for ExitCondition {
    fn from(err: &SocketError) -> Self {
        match err {
            SocketError::Resolve { .. } | SocketError::NoAddress(_) => Self::Resolve,
            SocketError::Io(_) => Self::Socket,
        }
    }
}

impl From<&InputError> for ExitCondition {
    fn from(_: &InputError) -> Self {
        Self::Usage
    }
}
