use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Delivery quiet window. Bursts of frames arriving closer together than
/// this collapse into a single delivery of the newest frame.
pub const QUIET_WINDOW: Duration = Duration::from_millis(50);

/// Wraps a downstream handler and delivers only the most recent frame after
/// a quiet period.
///
/// Each `push` replaces the stored frame and restarts the window timer; when
/// the timer fires without an intervening push, the stored frame is handed
/// downstream exactly once. `shutdown()` discards any pending delivery: no
/// frame reaches the handler after teardown.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<Value>,
    cancel: CancellationToken,
}

impl Debouncer {
    pub fn spawn(window: Duration, handler: impl Fn(Value) + Send + 'static) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run(rx, window, handler, cancel.clone()));
        Self { tx, cancel }
    }

    /// Store `frame` as the latest and restart the quiet-window timer.
    /// A push after `shutdown()` is a no-op.
    pub fn push(&self, frame: Value) {
        let _ = self.tx.send(frame);
    }

    /// Tear down: cancel the timer task and suppress any pending delivery.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Value>,
    window: Duration,
    handler: impl Fn(Value) + Send + 'static,
    cancel: CancellationToken,
) {
    let mut latest: Option<Value> = None;

    loop {
        match latest.take() {
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    frame = rx.recv() => match frame {
                        Some(frame) => latest = Some(frame),
                        None => return,
                    },
                }
            }
            Some(held) => {
                // The sleep restarts from scratch on every new frame.
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    frame = rx.recv() => match frame {
                        Some(frame) => latest = Some(frame),
                        // Sender gone with a frame still held: discard it.
                        None => return,
                    },
                    _ = tokio::time::sleep(window) => handler(held),
                }
            }
        }
    }
}
