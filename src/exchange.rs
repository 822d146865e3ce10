//! One DATA → ACK → final-DATA exchange with a remote receiver.
//!
//! An [`Exchange`] owns the transport for its whole lifetime and drives the
//! FSM in [`crate::state`] strictly in order:
//!
//! 1. encode the payload as a DATA segment and send it,
//! 2. receive one datagram and verify it as an ACK,
//! 3. send a zero-length DATA segment carrying the peer's acknowledged seqnum,
//! 4. receive once more to consume the closing ACK.
//!
//! Steps 1–3 fail the exchange on any error.  Step 4 is best-effort: whatever
//! it observes is recorded in the report but never turns success into
//! failure.  There are no retransmissions; a lost datagram on either leg
//! blocks on receive unless [`SenderConfig::recv_timeout`] bounds the wait.
//!
//! ```ignore
//! let socket = Socket::bind_for(peer).await?;
//! let config = SenderConfig::with_recv_timeout(Some(Duration::from_secs(2)));
//! let mut exchange = Exchange::new(socket, peer, config);
//! let report = exchange.run(b"hello").await?;
//! ```

use std::fmt;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::ack::{verify_ack, Ack};
use crate::config::SenderConfig;
use crate::segment::{encode_data, SegmentError, MAX_SEGMENT_LEN};
use crate::socket::Transport;
use crate::state::ExchangeState;

/// Size of the buffer each datagram is received into.
pub const RECV_BUF_LEN: usize = 1024;

/// Which DATA segment an error relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// The payload-carrying segment.
    Data,
    /// The final zero-length segment.
    Fin,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Fin => write!(f, "final"),
        }
    }
}

/// Errors that abort an exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("cannot build {leg} segment: {source}")]
    Build {
        leg: Leg,
        #[source]
        source: SegmentError,
    },
    #[error("sending {leg} segment failed: {source}")]
    SendFailed {
        leg: Leg,
        #[source]
        source: io::Error,
    },
    #[error("{leg} segment only partially sent ({sent} of {expected} bytes)")]
    ShortSend {
        leg: Leg,
        sent: usize,
        expected: usize,
    },
    #[error("receiving ACK failed: {0}")]
    ReceiveFailed(#[source] io::Error),
    #[error("ACK rejected: {0}")]
    Verify(#[source] SegmentError),
    #[error("exchange already ran (state {state})")]
    AlreadyRun { state: ExchangeState },
}

/// What a completed exchange observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReport {
    /// The verified ACK of the DATA segment.
    pub ack: Ack,
    /// The closing ACK, if one arrived and verified.  Informational only.
    pub final_ack: Option<Ack>,
    /// Wire length of the DATA segment.
    pub data_len: usize,
    /// Wire length of the final DATA segment.
    pub fin_len: usize,
}

/// A single sender-side exchange over transport `T`.
#[derive(Debug)]
pub struct Exchange<T> {
    transport: T,
    peer: SocketAddr,
    config: SenderConfig,
    state: ExchangeState,
}

impl<T: Transport> Exchange<T> {
    pub fn new(transport: T, peer: SocketAddr, config: SenderConfig) -> Self {
        Self {
            transport,
            peer,
            config,
            state: ExchangeState::Idle,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Give the transport back, e.g. to inspect a test double.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the exchange to completion.
    ///
    /// On error the exchange is left in [`ExchangeState::Failed`] and no
    /// further segment is sent.  An exchange is single-use: calling `run`
    /// again returns [`ExchangeError::AlreadyRun`] without touching the
    /// transport or the state.
    pub async fn run(&mut self, payload: &[u8]) -> Result<ExchangeReport, ExchangeError> {
        if self.state != ExchangeState::Idle {
            return Err(ExchangeError::AlreadyRun { state: self.state });
        }
        match self.drive(payload).await {
            Ok(report) => Ok(report),
            Err(e) => {
                log::warn!("[ctp] exchange failed in {}: {e}", self.state);
                self.state = ExchangeState::Failed;
                Err(e)
            }
        }
    }

    async fn drive(&mut self, payload: &[u8]) -> Result<ExchangeReport, ExchangeError> {
        let mut send_buf = [0u8; MAX_SEGMENT_LEN];
        let mut recv_buf = [0u8; RECV_BUF_LEN];

        // Idle → DataSent
        let data_len = encode_data(
            &mut send_buf,
            payload,
            self.config.initial_seqnum,
            self.config.data_window,
        )
        .map_err(|source| ExchangeError::Build {
            leg: Leg::Data,
            source,
        })?;
        self.send(Leg::Data, &send_buf[..data_len]).await?;
        log::debug!(
            "[ctp] → DATA seq={} len={} ({} bytes on wire)",
            self.config.initial_seqnum,
            payload.len(),
            data_len
        );
        self.advance();

        // DataSent → AckReceived
        let (n, from) = self
            .receive(&mut recv_buf)
            .await
            .map_err(ExchangeError::ReceiveFailed)?;
        let ack = verify_ack(&recv_buf[..n]).map_err(ExchangeError::Verify)?;
        log::debug!(
            "[ctp] ← ACK seq={} window={} from {from}",
            ack.seqnum,
            ack.window
        );
        self.advance();

        // AckReceived → FinSent: the final segment carries the peer's seqnum.
        let fin_len = encode_data(&mut send_buf, &[], ack.seqnum, self.config.fin_window)
            .map_err(|source| ExchangeError::Build {
                leg: Leg::Fin,
                source,
            })?;
        self.send(Leg::Fin, &send_buf[..fin_len]).await?;
        log::debug!("[ctp] → DATA seq={} len=0 (end of transfer)", ack.seqnum);
        self.advance();

        // FinSent → Done
        let final_ack = self.consume_closing_ack(&mut recv_buf).await;
        self.advance();

        Ok(ExchangeReport {
            ack,
            final_ack,
            data_len,
            fin_len,
        })
    }

    async fn send(&self, leg: Leg, segment: &[u8]) -> Result<(), ExchangeError> {
        let sent = self
            .transport
            .send_to(segment, self.peer)
            .await
            .map_err(|source| ExchangeError::SendFailed { leg, source })?;
        if sent != segment.len() {
            return Err(ExchangeError::ShortSend {
                leg,
                sent,
                expected: segment.len(),
            });
        }
        Ok(())
    }

    /// Receive one datagram, giving up after `recv_timeout` if one is set.
    async fn receive(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        match self.config.recv_timeout {
            None => self.transport.recv_from(buf).await,
            Some(limit) => tokio::time::timeout(limit, self.transport.recv_from(buf))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "receive timed out"))?,
        }
    }

    /// One receive whose outcome never fails the exchange.
    async fn consume_closing_ack(&self, buf: &mut [u8]) -> Option<Ack> {
        match self.receive(buf).await {
            Ok((n, _)) => match verify_ack(&buf[..n]) {
                Ok(ack) => {
                    log::debug!("[ctp] ← closing ACK seq={}", ack.seqnum);
                    Some(ack)
                }
                Err(e) => {
                    log::debug!("[ctp] closing ACK ignored: {e}");
                    None
                }
            },
            Err(e) => {
                log::debug!("[ctp] no closing ACK: {e}");
                None
            }
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.successor() {
            log::trace!("[ctp] {} → {}", self.state, next);
            self.state = next;
        }
    }
}
