use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::warn;

/// How long an authoring or deletion proposal waits for the user.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(120);

/// Terminal state of a pending action. Exactly one of these resolves per
/// pending action; the oneshot sender is consumed on first use.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Confirmed(T),
    Cancelled,
    TimedOut,
}

/// Held by whatever surfaces the confirm/cancel affordance.
pub struct ConfirmHandle<T> {
    tx: oneshot::Sender<Option<T>>,
}

impl<T> ConfirmHandle<T> {
    pub fn confirm(self, value: T) {
        let _ = self.tx.send(Some(value));
    }

    pub fn cancel(self) {
        let _ = self.tx.send(None);
    }
}

/// The suspended workflow side: awaits the user's decision with a deadline.
pub struct PendingAction<T> {
    rx: oneshot::Receiver<Option<T>>,
}

pub fn pending<T>() -> (ConfirmHandle<T>, PendingAction<T>) {
    let (tx, rx) = oneshot::channel();
    (ConfirmHandle { tx }, PendingAction { rx })
}

impl<T> PendingAction<T> {
    /// Wait for the decision. `cleanup` runs only when the action is
    /// abandoned (cancelled, timed out, or the handle was dropped); its
    /// failure is logged and tolerated.
    pub async fn wait<C>(self, timeout: Duration, cleanup: C) -> Outcome<T>
    where
        C: Future<Output = anyhow::Result<()>>,
    {
        let outcome = match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(Some(value))) => return Outcome::Confirmed(value),
            // A dropped handle counts as cancellation.
            Ok(Ok(None)) | Ok(Err(_)) => Outcome::Cancelled,
            Err(_) => Outcome::TimedOut,
        };
        if let Err(e) = cleanup.await {
            warn!("pending-action cleanup failed: {e:#}");
        }
        outcome
    }
}
