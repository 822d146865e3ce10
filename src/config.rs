//! Sender configuration.
//!
//! The protocol fixes the first DATA segment at seqnum 0 and every segment
//! this sender emits at window 1; those are the defaults here.  Receives are
//! unbounded unless the caller sets a timeout, which the exchange applies to
//! both of its receives.

use std::time::Duration;

/// Sequence number of the first DATA segment.
pub const INITIAL_SEQNUM: u8 = 0;

/// Window advertised on every DATA segment.
pub const DEFAULT_WINDOW: u8 = 1;

/// Adjustable exchange parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Seqnum of the DATA segment carrying the payload.
    pub initial_seqnum: u8,
    /// Window advertised on the payload-carrying DATA segment.
    pub data_window: u8,
    /// Window advertised on the final zero-length DATA segment.
    pub fin_window: u8,
    /// Upper bound on each of the exchange's receives; `None` waits
    /// indefinitely.
    pub recv_timeout: Option<Duration>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            initial_seqnum: INITIAL_SEQNUM,
            data_window: DEFAULT_WINDOW,
            fin_window: DEFAULT_WINDOW,
            recv_timeout: None,
        }
    }
}

impl SenderConfig {
    /// Default parameters with a bounded receive.
    pub fn with_recv_timeout(timeout: Option<Duration>) -> Self {
        Self {
            recv_timeout: timeout,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol() {
        let cfg = SenderConfig::default();
        assert_eq!(cfg.initial_seqnum, 0);
        assert_eq!(cfg.data_window, 1);
        assert_eq!(cfg.fin_window, 1);
        assert_eq!(cfg.recv_timeout, None);
    }

    #[test]
    fn timeout_keeps_other_defaults() {
        let cfg = SenderConfig::with_recv_timeout(Some(Duration::from_millis(250)));
        assert_eq!(cfg.recv_timeout, Some(Duration::from_millis(250)));
        assert_eq!(cfg.initial_seqnum, INITIAL_SEQNUM);
    }
}
