//! Stdio front end for the broker filter.
//!
//! One newline-delimited JSON envelope per line: inbound on stdin (listing
//! batches, detail responses, user commands), outbound on stdout (rewritten
//! batches, paced detail requests, user messages). Logging goes to stderr
//! only; stdout is reserved for the event stream.

use anyhow::{Context, Result};
use broker_filter::{PassiveIndex, PASSIVE_CATEGORIES};
use broker_protocol::{Inbound, Outbound, DEFAULT_PACING_MS};
use broker_session::{FilterSession, PacedDispatcher, SessionConfig};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

mod commands;
mod fixtures;

pub use commands::handle_command_line;

const EXPIRY_TICK_MS: u64 = 500;

#[derive(Parser, Debug)]
#[command(name = "broker-proxyd")]
#[command(about = "Filters broker listing batches by passivity rolls", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Delay between consecutive outbound detail requests, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PACING_MS)]
    pub pacing_ms: u64,

    /// Give up on an incomplete gather cycle after this many milliseconds
    /// and forward the batch unfiltered (0 disables expiry)
    #[arg(long, default_value_t = 10_000)]
    pub stale_after_ms: u64,

    /// Character name stamped on outbound tooltip requests
    #[arg(long, default_value = "")]
    pub owner: String,

    /// JSON file mapping passivity category keys to member id lists
    #[arg(long)]
    pub passives: Option<PathBuf>,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            owner: self.owner.clone(),
            stale_after: (self.stale_after_ms > 0)
                .then(|| Duration::from_millis(self.stale_after_ms)),
        }
    }
}

pub async fn main_entry() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let lookup = fixtures::load_lookup(cli.passives.as_deref())?;
    let index = Arc::new(PassiveIndex::populate(&lookup, &PASSIVE_CATEGORIES).await);
    info!(
        "passive index ready ({} of {} categories resolved)",
        index.resolved_categories(),
        PASSIVE_CATEGORIES.len()
    );

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let paced_tx = PacedDispatcher::spawn(
        Duration::from_millis(cli.pacing_ms),
        outbound_tx.clone(),
    );
    let session = FilterSession::new(index, cli.session_config(), paced_tx, outbound_tx.clone());

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    run_loop(stdin, stdout, session, outbound_tx, outbound_rx).await
}

/// The single event-processing loop: every state transition happens here, one
/// event at a time, so the session needs no locking.
pub async fn run_loop<R, W>(
    reader: R,
    mut writer: W,
    mut session: FilterSession,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut expiry = tokio::time::interval(Duration::from_millis(EXPIRY_TICK_MS));
    expiry.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => match line.context("reading inbound event")? {
                Some(line) => handle_line(&mut session, &outbound_tx, &line),
                None => break,
            },
            Some(event) = outbound_rx.recv() => {
                write_event(&mut writer, &event).await?;
            }
            _ = expiry.tick() => session.expire_stale(Instant::now()),
        }
    }

    // Stdin closed: flush whatever the session already emitted.
    while let Ok(event) = outbound_rx.try_recv() {
        write_event(&mut writer, &event).await?;
    }
    Ok(())
}

fn handle_line(
    session: &mut FilterSession,
    outbound_tx: &mpsc::UnboundedSender<Outbound>,
    line: &str,
) {
    if line.trim().is_empty() {
        return;
    }
    let inbound: Inbound = match serde_json::from_str(line) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!("unparseable inbound line ({e}); ignored");
            return;
        }
    };
    match inbound {
        Inbound::ListingBatch(batch) => session.handle_listing(batch),
        Inbound::DetailResponse(response) => session.handle_detail(response),
        Inbound::Command { line } => {
            for text in commands::handle_command_line(session, &line) {
                if outbound_tx.send(Outbound::Message { text }).is_err() {
                    warn!("outbound channel closed; dropping message");
                }
            }
        }
    }
}

async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &Outbound) -> Result<()> {
    let raw = serde_json::to_string(event).context("serializing outbound event")?;
    writer.write_all(raw.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
