//! Local socket sink for recognised turns
//!
//! Consumers connect to the socket and read a continuous stream of
//! `U;R';F2;` text, one write per move batch. A single client is served at a
//! time. Batches that arrive while no client is attached are dropped.

use crate::domain::moves::{join_moves, Move};
use anyhow::{Context, Result};
use interprocess::local_socket::{
    traits::Listener as _, GenericNamespaced, Listener, ListenerNonblockingMode, ListenerOptions,
    Stream as LocalStream, ToNsName,
};
use std::io::{ErrorKind, Write};
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

/// Batches buffered between the session and the writer thread
const QUEUE_CAPACITY: usize = 256;

pub struct TurnPipe {
    sender: mpsc::Sender<Vec<Move>>,
    handle: JoinHandle<()>,
}

impl TurnPipe {
    /// Bind the socket and start the writer thread
    pub fn spawn(name: &str) -> Result<Self> {
        let pipe_name = name
            .to_ns_name::<GenericNamespaced>()
            .with_context(|| format!("Invalid pipe name {}", name))?;
        let listener = ListenerOptions::new()
            .name(pipe_name)
            .nonblocking(ListenerNonblockingMode::Accept)
            .create_sync()
            .with_context(|| format!("Failed to bind turn pipe {}", name))?;
        info!("Turn pipe listening on {}", name);

        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let handle = std::thread::Builder::new()
            .name("turn-pipe".to_string())
            .spawn(move || serve(listener, receiver))
            .context("Failed to start turn pipe thread")?;

        Ok(Self { sender, handle })
    }

    /// Queue a batch of moves; empty batches are dropped, and so are batches
    /// that arrive while the writer is backed up
    pub fn send(&self, moves: &[Move]) -> Result<()> {
        if moves.is_empty() {
            return Ok(());
        }
        match self.sender.try_send(moves.to_vec()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(batch)) => {
                warn!("Turn pipe queue full, dropping {} moves", batch.len());
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(anyhow::anyhow!("Turn pipe thread has stopped")),
        }
    }

    /// Close the queue and wait for pending writes
    pub fn shutdown(self) {
        drop(self.sender);
        if self.handle.join().is_err() {
            error!("Turn pipe thread panicked");
        }
    }
}

fn serve(listener: Listener, mut receiver: mpsc::Receiver<Vec<Move>>) {
    let mut client: Option<LocalStream> = None;

    while let Some(moves) = receiver.blocking_recv() {
        if client.is_none() {
            match listener.accept() {
                Ok(stream) => {
                    info!("Turn pipe client connected");
                    client = Some(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    debug!("No turn pipe client, dropping {} moves", moves.len());
                    continue;
                }
                Err(e) => {
                    warn!("Turn pipe accept failed, dropping {} moves: {}", moves.len(), e);
                    continue;
                }
            }
        }

        if let Some(stream) = client.as_mut() {
            if let Err(e) = write_batch(stream, &moves) {
                warn!("Turn pipe client went away: {}", e);
                client = None;
            }
        }
    }

    debug!("Turn pipe writer finished");
}

/// Write one batch in pipe format and flush
pub fn write_batch<W: Write>(writer: &mut W, moves: &[Move]) -> std::io::Result<()> {
    writer.write_all(join_moves(moves).as_bytes())?;
    writer.flush()
}
