//! Background loop that runs the daily report on schedule
//!
//! # Example
//!
//! ```no_run
//! use daily_basket::{ReportService, config::Config};
//! use daily_basket::scheduler::DailySchedule;
//! use daily_basket::scheduler_task::SchedulerTask;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let service = ReportService::new(config).await?;
//! let schedule = DailySchedule::from_config(&service.config.schedule)?;
//!
//! let task = SchedulerTask::new(schedule, service.task.clone(), service.shutdown_token());
//!
//! // Runs until the shutdown token is cancelled
//! tokio::spawn(task.run());
//! # Ok(())
//! # }
//! ```

use crate::report_task::ReportTask;
use crate::scheduler::DailySchedule;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sleeps until the next scheduled time, runs the report task, repeats
pub struct SchedulerTask {
    schedule: DailySchedule,
    task: Arc<ReportTask>,
    shutdown: CancellationToken,
}

impl SchedulerTask {
    /// Creates a new scheduler task
    pub fn new(
        schedule: DailySchedule,
        task: Arc<ReportTask>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            schedule,
            task,
            shutdown,
        }
    }

    /// Run until `shutdown` is cancelled
    ///
    /// Each scheduled run is spawned so a long retry backoff never delays the next trigger.
    /// Task outcomes are logged, never propagated.
    pub async fn run(self) {
        info!(schedule = %self.schedule, "Report scheduler started");

        loop {
            let now = Utc::now();
            let next = self.schedule.next_run_after(now);
            let delay = self.schedule.delay_until_next(now);
            debug!(next_run = %next, delay_secs = delay.as_secs(), "Waiting for next report run");

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Report scheduler shutting down");
                    break;
                }
                _ = sleep(delay) => {}
            }

            let task = self.task.clone();
            tokio::spawn(async move {
                let outcome = task.execute().await;
                if outcome.is_success() {
                    info!(attempts = outcome.attempts(), "Scheduled report delivered");
                } else {
                    warn!(attempts = outcome.attempts(), "Scheduled report failed permanently");
                }
            });
        }

        info!("Report scheduler stopped");
    }
}
