use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use tripdesk_db::repositories::ApprovalRepository;

/// Decision handlers expire overdue requests lazily; the sweep covers the
/// requests nobody ever returns to, so approvers stop seeing dead entries.
pub async fn sweep_once(approvals: &dyn ApprovalRepository) -> u64 {
    match approvals.expire_overdue(Utc::now()).await {
        Ok(0) => 0,
        Ok(expired) => {
            info!(event_name = "approvals.sweep", expired, "expired overdue approval requests");
            expired
        }
        Err(error) => {
            error!(
                event_name = "approvals.sweep_failed",
                error = %error,
                "approval expiry sweep failed; retrying next interval"
            );
            0
        }
    }
}

pub fn spawn(approvals: Arc<dyn ApprovalRepository>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(approvals.as_ref()).await;
        }
    })
}
