use std::{sync::Weak, time::Duration};

use minichat_core::ChatApi;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::{ChatSession, SessionInner};

/// Running poll task. Dropping the handle does not stop the task; call [`cancel`].
///
/// [`cancel`]: PollerHandle::cancel
#[derive(Debug)]
pub(crate) struct PollerHandle {
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop scheduling ticks. A tick already running finishes its requests.
    pub(crate) fn cancel(self) {
        self.stop.cancel();
        drop(self.task);
    }
}

/// Spawn a task firing [`ChatSession::poll_tick`] every `period`, first after one period.
///
/// The task holds only a weak session reference and ends once the session is gone.
pub(crate) fn spawn_poller<A: ChatApi>(
    session: Weak<SessionInner<A>>,
    period: Duration,
) -> PollerHandle {
    let stop = CancellationToken::new();
    let stop_child = stop.child_token();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(period_ms = period.as_millis() as u64, "poller started");

        loop {
            tokio::select! {
                _ = stop_child.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = session.upgrade() else {
                        break;
                    };
                    let session = ChatSession::from_inner(inner);
                    if let Err(err) = session.poll_tick().await {
                        warn!(error = %err, "poll refresh failed");
                    }
                }
            }
        }

        debug!("poller stopped");
    });

    PollerHandle { stop, task }
}
