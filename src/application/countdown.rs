use super::session::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// The expiry clock for one checkout session.
///
/// Seeded once from `expires_at - now`, it decrements once per tick,
/// floor-clamps at zero and emits `ExpiryElapsed` exactly once before the
/// task terminates. The handle is owned by the session driver; the tick task
/// is aborted on `stop()` and on drop, so no event can reach a discarded
/// session.
pub struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    pub fn start(seconds: u64, tick: Duration, events: UnboundedSender<SessionEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let mut remaining = seconds;
            let mut interval = tokio::time::interval(tick);
            // The first interval tick resolves immediately.
            interval.tick().await;
            loop {
                if remaining == 0 {
                    debug!("countdown reached zero, emitting expiry");
                    let _ = events.send(SessionEvent::ExpiryElapsed);
                    break;
                }
                interval.tick().await;
                remaining -= 1;
                let _ = events.send(SessionEvent::CountdownTick { remaining });
            }
        });
        Self { handle }
    }

    /// Cancels the recurring tick. Idempotent.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Formats a remaining-seconds value for display, omitting leading zero
/// units: `3661 -> "1h 1m 1s"`, `125 -> "2m 5s"`, `0 -> "0s"`.
pub fn format_remaining(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
