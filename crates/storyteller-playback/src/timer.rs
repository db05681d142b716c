//! The playback timer task.
//!
//! One task per activation, ticking once per second into the controller.
//! Activation bumps the controller's epoch; a task whose epoch has gone
//! stale exits on its next tick, so at most one timer ever drives the
//! session.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::controller::SessionController;

/// Drives 1-second ticks into the controller until the epoch goes stale.
pub(crate) async fn run(controller: Arc<SessionController>, epoch: u64) {
    let mut interval = time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately; the
    // countdown starts one full second after activation.
    interval.tick().await;

    loop {
        interval.tick().await;
        if !controller.handle_tick(epoch).await {
            debug!(epoch, "timer task retired");
            return;
        }
    }
}
