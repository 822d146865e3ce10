//! In-memory peer for deterministic testing.
//!
//! Real networks drop and corrupt datagrams, and a real receiver is not
//! always around.  [`Simulator`] implements [`Transport`] entirely in memory
//! and answers each DATA segment the way the reference receiver does, subject
//! to a configurable fault model:
//!
//! | Behaviour    | Reply to a DATA segment                          |
//! |--------------|--------------------------------------------------|
//! | `Ack`        | valid ACK for `seqnum + 1`                       |
//! | `AckWith`    | valid ACK with a fixed seqnum and window         |
//! | `Corrupt`    | ACK whose checksum1 no longer matches            |
//! | `Nack`       | NACK-typed segment                               |
//! | `TrFlag`     | ACK with the TR bit set                          |
//! | `Truncated`  | the first 8 bytes of an ACK                      |
//! | `Silent`     | nothing                                          |
//!
//! Outbound datagrams can be failed or truncated with [`SendFault`], either on
//! every send or on one send picked by index (0 is the DATA segment, 1 the
//! final one).  A receive with nothing queued fails with
//! [`io::ErrorKind::TimedOut`] instead of blocking forever.

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::segment::{unix_timestamp, Segment, SegmentType};
use crate::socket::Transport;

/// How the simulated receiver answers one DATA segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckBehavior {
    Ack,
    AckWith { seqnum: u8, window: u8 },
    Corrupt,
    Nack,
    TrFlag,
    Truncated,
    Silent,
}

/// How the simulated network treats outbound datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendFault {
    #[default]
    None,
    /// Every send fails with an I/O error.
    Error,
    /// Sends report at most this many bytes.
    Short(usize),
    /// Only the send with this zero-based index fails.
    ErrorOn(usize),
    /// Only the send with index `nth` reports at most `limit` bytes.
    ShortOn { nth: usize, limit: usize },
}

/// Configuration for the fault-injection model.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Reply to the first DATA segment.
    pub data_reply: AckBehavior,
    /// Reply to every later DATA segment (the final one in an exchange).
    pub fin_reply: AckBehavior,
    /// Window advertised on generated ACKs.
    pub ack_window: u8,
    pub send_fault: SendFault,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default — simulator behaves like a healthy receiver.
        Self {
            data_reply: AckBehavior::Ack,
            fin_reply: AckBehavior::Ack,
            ack_window: 1,
            send_fault: SendFault::None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    sent: Vec<Vec<u8>>,
    inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    data_seen: usize,
    send_calls: usize,
    recv_calls: usize,
}

/// A scripted receiver living behind the [`Transport`] trait.
#[derive(Debug)]
pub struct Simulator {
    pub config: SimulatorConfig,
    inner: Mutex<Inner>,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Queue a raw datagram to be returned by the next receive.
    pub fn inject(&self, datagram: Vec<u8>, from: SocketAddr) {
        self.lock().inbox.push_back((datagram, from));
    }

    /// Every datagram handed to `send_to`, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// Sent datagrams decoded as segments; undecodable ones are skipped.
    pub fn sent_segments(&self) -> Vec<Segment> {
        self.lock()
            .sent
            .iter()
            .filter_map(|d| Segment::decode(d).ok())
            .collect()
    }

    /// Datagrams queued but not yet received.
    pub fn pending(&self) -> usize {
        self.lock().inbox.len()
    }

    /// How many times `recv_from` was called, successful or not.
    pub fn recv_calls(&self) -> usize {
        self.lock().recv_calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reply_to(&self, segment: &Segment, behavior: AckBehavior) -> Option<Vec<u8>> {
        let next = segment.seqnum.wrapping_add(1);
        let mut ack = Segment::ack(next, self.config.ack_window, unix_timestamp());
        match behavior {
            AckBehavior::Ack => {}
            AckBehavior::AckWith { seqnum, window } => {
                ack = Segment::ack(seqnum, window, unix_timestamp());
            }
            AckBehavior::Nack => ack.kind = SegmentType::Nack,
            AckBehavior::TrFlag => ack.tr = true,
            AckBehavior::Corrupt => {
                let mut bytes = ack.to_bytes().ok()?;
                bytes[1] ^= 0xFF;
                return Some(bytes);
            }
            AckBehavior::Truncated => {
                let mut bytes = ack.to_bytes().ok()?;
                bytes.truncate(8);
                return Some(bytes);
            }
            AckBehavior::Silent => return None,
        }
        ack.to_bytes().ok()
    }
}

impl Transport for Simulator {
    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        let mut inner = self.lock();
        let index = inner.send_calls;
        inner.send_calls += 1;

        let sent = match self.config.send_fault {
            SendFault::None => buf.len(),
            SendFault::Error => return Err(send_failure()),
            SendFault::ErrorOn(nth) if nth == index => return Err(send_failure()),
            SendFault::ErrorOn(_) => buf.len(),
            SendFault::Short(limit) => buf.len().min(limit),
            SendFault::ShortOn { nth, limit } if nth == index => buf.len().min(limit),
            SendFault::ShortOn { .. } => buf.len(),
        };
        inner.sent.push(buf.to_vec());

        if let Ok(segment) = Segment::decode(buf) {
            if segment.kind == SegmentType::Data {
                let behavior = if inner.data_seen == 0 {
                    self.config.data_reply
                } else {
                    self.config.fin_reply
                };
                inner.data_seen += 1;
                if let Some(reply) = self.reply_to(&segment, behavior) {
                    inner.inbox.push_back((reply, dest));
                }
            }
        }
        Ok(sent)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut inner = self.lock();
        inner.recv_calls += 1;
        let (datagram, from) = inner
            .inbox
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no datagram queued"))?;
        drop(inner);
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok((n, from))
    }
}

fn send_failure() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionRefused, "simulated send failure")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::verify_ack;
    use crate::segment::{encode_data_at, MAX_SEGMENT_LEN};

    fn peer() -> SocketAddr {
        "192.0.2.7:6000".parse().unwrap()
    }

    fn data(seqnum: u8) -> Vec<u8> {
        let mut buf = [0u8; MAX_SEGMENT_LEN];
        let n = encode_data_at(&mut buf, b"abc", seqnum, 1, 0).unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn healthy_peer_acks_next_seqnum() {
        let sim = Simulator::new(SimulatorConfig {
            ack_window: 4,
            ..Default::default()
        });
        sim.send_to(&data(10), peer()).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, from) = sim.recv_from(&mut buf).await.unwrap();
        assert_eq!(from, peer());
        let ack = verify_ack(&buf[..n]).unwrap();
        assert_eq!(ack.seqnum, 11);
        assert_eq!(ack.window.get(), 4);
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let sim = Simulator::new(SimulatorConfig {
            data_reply: AckBehavior::Silent,
            ..Default::default()
        });
        sim.send_to(&data(0), peer()).await.unwrap();
        let mut buf = [0u8; 64];
        let err = sim.recv_from(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn second_data_uses_fin_reply() {
        let sim = Simulator::new(SimulatorConfig {
            fin_reply: AckBehavior::Nack,
            ..Default::default()
        });
        sim.send_to(&data(0), peer()).await.unwrap();
        sim.send_to(&data(1), peer()).await.unwrap();
        assert_eq!(sim.pending(), 2);
        assert_eq!(sim.sent_segments().len(), 2);
    }

    #[tokio::test]
    async fn short_send_reports_limit() {
        let sim = Simulator::new(SimulatorConfig {
            send_fault: SendFault::Short(5),
            ..Default::default()
        });
        assert_eq!(sim.send_to(&data(0), peer()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn indexed_faults_hit_only_their_send() {
        let sim = Simulator::new(SimulatorConfig {
            send_fault: SendFault::ErrorOn(1),
            ..Default::default()
        });
        assert!(sim.send_to(&data(0), peer()).await.is_ok());
        assert!(sim.send_to(&data(1), peer()).await.is_err());
        assert!(sim.send_to(&data(2), peer()).await.is_ok());
        assert_eq!(sim.sent().len(), 2);

        let sim = Simulator::new(SimulatorConfig {
            send_fault: SendFault::ShortOn { nth: 0, limit: 2 },
            ..Default::default()
        });
        assert_eq!(sim.send_to(&data(0), peer()).await.unwrap(), 2);
        assert_eq!(sim.send_to(&data(1), peer()).await.unwrap(), data(1).len());
    }

    #[tokio::test]
    async fn receives_are_counted_even_when_empty() {
        let sim = Simulator::new(SimulatorConfig::default());
        let mut buf = [0u8; 64];
        assert!(sim.recv_from(&mut buf).await.is_err());
        sim.send_to(&data(0), peer()).await.unwrap();
        assert!(sim.recv_from(&mut buf).await.is_ok());
        assert_eq!(sim.recv_calls(), 2);
    }
}
