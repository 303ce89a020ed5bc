//! Fan-in of many per-session streams into one merged stream.
//!
//! Sessions join their status streams at any time while the
//! multiplexer is open. Items from all joined streams are forwarded
//! into a single merged output in arrival order; the merged stream
//! closes only after [Multiplexer::close] has been called and every
//! joined source has been fully drained.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Buffer for streams on their way to the pump task. The pump drains
/// it continuously, so this never caps how many sources may join.
const JOIN_BUFFER: usize = 16;

/// Buffer of the merged output stream.
const OUTPUT_BUFFER: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("multiplexer is closed to new streams")]
pub struct MultiplexerClosed;

/// Must be created inside a tokio runtime; the pump task that carries
/// joined sources into the merge runs from construction.
pub struct Multiplexer<T> {
    join_tx: Option<mpsc::Sender<mpsc::Receiver<T>>>,
    out_rx: Option<mpsc::Receiver<T>>,
    pump: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Multiplexer<T> {
    pub fn new() -> Self {
        let (join_tx, mut join_rx) = mpsc::channel::<mpsc::Receiver<T>>(JOIN_BUFFER);
        let (out_tx, out_rx) = mpsc::channel(OUTPUT_BUFFER);
        let pump = tokio::spawn(async move {
            let mut forwards = JoinSet::new();
            while let Some(mut stream) = join_rx.recv().await {
                let out_tx = out_tx.clone();
                forwards.spawn(async move {
                    while let Some(item) = stream.recv().await {
                        if out_tx.send(item).await.is_err() {
                            break;
                        }
                    }
                });
            }
            // No further joins are possible. The merged stream closes
            // once every forwarder has drained its source and dropped
            // its sender.
            drop(out_tx);
            while forwards.join_next().await.is_some() {}
        });
        Self {
            join_tx: Some(join_tx),
            out_rx: Some(out_rx),
            pump: Some(pump),
        }
    }

    /// Add a source stream to the merge. Fails once [Self::close] has
    /// been called; a stream that closes on its own only removes
    /// itself, never the merge.
    pub async fn join(&self, stream: mpsc::Receiver<T>) -> Result<(), MultiplexerClosed> {
        let Some(join_tx) = &self.join_tx else {
            return Err(MultiplexerClosed);
        };
        join_tx.send(stream).await.map_err(|_| MultiplexerClosed)
    }

    /// Take the merged output stream.
    ///
    /// # Panics
    ///
    /// Panics if called twice; the merged stream has exactly one
    /// consumer.
    pub fn output(&mut self) -> mpsc::Receiver<T> {
        match self.out_rx.take() {
            Some(out_rx) => out_rx,
            None => panic!("merged output stream was already taken"),
        }
    }

    /// Refuse further joins and wait for every joined source to drain.
    pub async fn close(&mut self) {
        self.join_tx.take();
        // A merge nobody consumed cannot drain; dropping the receiver
        // lets the forwarders finish instead.
        self.out_rx.take();
        if let Some(pump) = self.pump.take() {
            if let Err(err) = pump.await {
                log::debug!("multiplexer pump task failed: {err}");
            }
        }
    }
}

impl<T: Send + 'static> Default for Multiplexer<T> {
    fn default() -> Self {
        Self::new()
    }
}
