//! Entry point for `ctp-sender`.
//!
//! Parses CLI arguments, reads the payload, resolves the receiver and runs a
//! single exchange.  All protocol work is delegated to library modules;
//! `main.rs` owns only process setup (logging, argument parsing, exit codes).

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use ctp_sender::exchange::{Exchange, ExchangeReport};
use ctp_sender::exit::ExitCondition;
use ctp_sender::input::{read_payload, InputSource};
use ctp_sender::socket::{resolve, Socket};
use ctp_sender::SenderConfig;

/// Send up to 512 bytes to a CTP receiver in a single DATA/ACK exchange.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Read the payload from this file instead of stdin.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Give up on each receive after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Receiver host name or address.
    host: String,

    /// Receiver UDP port (numeric; service names are not looked up).
    port: u16,
}

/// A failure together with the exit condition it maps to.
struct Failure {
    condition: ExitCondition,
    error: anyhow::Error,
}

impl Failure {
    fn from_err<E>(context: &'static str) -> impl FnOnce(E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        for<'a> ExitCondition: From<&'a E>,
    {
        move |err| Self {
            condition: ExitCondition::from(&err),
            error: anyhow::Error::new(err).context(context),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let usage_error = e.use_stderr();
            let _ = e.print();
            return if usage_error {
                ExitCondition::Usage.into()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(report) => {
            log::info!(
                "Exchange complete: {} bytes sent, peer acknowledged seq={}",
                report.data_len,
                report.ack.seqnum
            );
            ExitCondition::Success.into()
        }
        Err(failure) => {
            eprintln!("error: {:#}", failure.error);
            failure.condition.into()
        }
    }
}

async fn run(cli: Cli) -> Result<ExchangeReport, Failure> {
    let config = SenderConfig::with_recv_timeout(cli.timeout_ms.map(Duration::from_millis));
    let source = cli.file.map_or(InputSource::Stdin, InputSource::File);

    let payload = read_payload(&source)
        .await
        .map_err(Failure::from_err("reading payload"))?;

    let peer = resolve(&cli.host, cli.port)
        .await
        .map_err(Failure::from_err("resolving receiver"))?;

    let socket = Socket::bind_for(peer)
        .await
        .map_err(Failure::from_err("opening UDP socket"))?;
    log::info!("Sending {} bytes to {peer} from {}", payload.len(), socket.local_addr);

    // The socket is owned by the exchange and closed when it drops.
    let mut exchange = Exchange::new(socket, peer, config);
    exchange.run(&payload).await.map_err(|err| Failure {
        condition: ExitCondition::from(&err),
        error: anyhow::Error::new(err).context(format!("exchange with {peer}")),
    })
}
