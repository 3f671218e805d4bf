//! Background sweep that finishes steps once their end date passes.
//!
//! Deadlines live in the store, not in memory: each tick finishes every open
//! step that is due, so steps whose deadline passed while the server was down
//! are closed by the first sweep after startup.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::services::StepService;

/// Runs one sweep and returns how many steps it finished.
pub async fn sweep_once(steps: &StepService) -> u64 {
    match steps.finish_due_steps(Utc::now()).await {
        Ok(finished) => {
            debug!("Step sweep finished {} steps", finished);
            finished
        }
        Err(e) => {
            error!("Step sweep failed: {}", e);
            0
        }
    }
}

/// Sweeps immediately, then every `interval`.
pub fn spawn(steps: StepService, interval: Duration) -> JoinHandle<()> {
    info!("Starting step sweep every {}s", interval.as_secs());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            // The first tick completes immediately.
            ticker.tick().await;
            sweep_once(&steps).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::StepStatus;
    use crate::services::step_service::NewStep;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn overdue_steps_are_finished_on_the_first_sweep() {
        let ctx = TestContext::new().await;
        let creator = ctx.staff("creator").await;
        let event = ctx.event(creator.id, None).await;

        let overdue = NewStep {
            name: "missed".into(),
            creation_date: Some("2020-01-01T00:00:00Z".into()),
            end_date: "2020-01-02T00:00:00Z".into(),
            ..Default::default()
        };
        let bundle = ctx
            .services
            .steps
            .create_step(event.event.id, overdue, creator.id)
            .await
            .unwrap();

        let handle = spawn(ctx.services.steps.clone(), Duration::from_secs(3600));
        let mut status = StepStatus::Process;
        for _ in 0..50 {
            status = ctx.services.steps.get_step(bundle.step.id).await.unwrap().step.status;
            if status == StepStatus::Finished {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(status, StepStatus::Finished);
    }

    #[tokio::test]
    async fn a_sweep_with_nothing_due_changes_nothing() {
        let ctx = TestContext::new().await;
        let creator = ctx.staff("creator").await;
        ctx.event_with_steps(creator.id, 2).await;
        assert_eq!(sweep_once(&ctx.services.steps).await, 0);
    }
}
