//! `ctp-sender` — the sending side of the CTP datagram protocol over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  DATA   ┌──────────┐
//!  │ segment  │────────▶│          │
//!  └──────────┘         │ Exchange │  Idle → DataSent → AckReceived
//!  ┌──────────┐  ACK    │  (FSM)   │       → FinSent → Done
//!  │   ack    │◀────────│          │
//!  └──────────┘         └────┬─────┘
//!                            │ raw UDP datagrams
//!                       ┌────▼──────┐
//!                       │ Transport │  (Socket, or Simulator in tests)
//!                       └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`segment`]   — wire format (encode / decode, both checksums)
//! - [`ack`]       — ACK verification
//! - [`exchange`]  — the one-shot DATA/ACK/final-DATA driver
//! - [`state`]     — finite-state-machine types
//! - [`socket`]    — transport trait, tokio UDP socket, address resolution
//! - [`input`]     — bounded payload acquisition
//! - [`config`]    — sender parameters
//! - [`exit`]      — process exit conditions
//! - [`simulator`] — in-memory receiver with a fault model, for testing

pub mod ack;
pub mod config;
pub mod exchange;
pub mod exit;
pub mod input;
pub mod segment;
pub mod simulator;
pub mod socket;
pub mod state;

pub use ack::{verify_ack, Ack};
pub use config::SenderConfig;
pub use exchange::{Exchange, ExchangeError, ExchangeReport};
pub use exit::ExitCondition;
pub use segment::{encode_data, Segment, SegmentError, SegmentType, Window};
pub use socket::{Socket, Transport};
pub use state::ExchangeState;
