//! Service facade wiring the report pipeline together

use crate::config::{Config, RetryConfig};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetch::{BatchFetcher, FetchRequest, FetchResult};
use crate::mail::{Mailer, ResendMailer};
use crate::report_task::{ReportTask, TaskOutcome};
use crate::scheduler::DailySchedule;
use crate::scheduler_task::SchedulerTask;
use crate::types::{Entity, Partition, ReportEvent};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel; slow subscribers miss older events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The running report service
///
/// Owns the recipient database, the sales API client and the report task. Spawns the HTTP
/// API and the daily scheduler; both stop when [`ReportService::shutdown`] is called.
pub struct ReportService {
    /// Validated configuration
    pub config: Arc<Config>,
    /// Recipient database
    pub db: Arc<Database>,
    /// Sales API client
    pub fetcher: BatchFetcher,
    /// The daily report task
    pub task: Arc<ReportTask>,
    event_tx: broadcast::Sender<ReportEvent>,
    shutdown: CancellationToken,
}

impl ReportService {
    /// Validate `config`, open the database and build the production mailer
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Arc::new(Database::new(&config.persistence.database_path).await?);
        let mailer = Arc::new(ResendMailer::new(&config.mail)?);
        Self::with_parts(config, db, mailer)
    }

    /// Assemble the service from an open database and any mailer
    pub fn with_parts(
        config: Config,
        db: Arc<Database>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let fetcher = BatchFetcher::new(&config.sales_api)?;
        let task = Arc::new(ReportTask::new(
            &config,
            fetcher.clone(),
            mailer,
            db.clone(),
            event_tx.clone(),
        )?);

        Ok(Self {
            config: Arc::new(config),
            db,
            fetcher,
            task,
            event_tx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Subscribe to report task events
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.event_tx.subscribe()
    }

    /// Token cancelled when the service shuts down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the report now, reporting on `date` (default: yesterday)
    ///
    /// With `retry` false a single attempt is made.
    pub async fn run_report_now(&self, date: Option<NaiveDate>, retry: bool) -> TaskOutcome {
        let policy = if retry {
            self.config.retry.clone()
        } else {
            RetryConfig::single_attempt()
        };
        self.task.execute_with(&policy, date).await
    }

    /// Fetch today's orders or invoices of one payment-method partition
    pub async fn fetch_daily_sales(
        &self,
        entity: Entity,
        partition: Partition,
    ) -> Result<FetchResult> {
        let offset = self.config.schedule.utc_offset()?;
        let today = Utc::now().with_timezone(&offset).date_naive();
        let day = today.format("%Y-%m-%d").to_string();

        let request = FetchRequest::new(entity, self.config.sales_api.batch_size)
            .with_fields(partition.daily_sales_fields().iter().copied())
            .with_filter("startDate", day.clone())
            .with_filter("endDate", day)
            .with_filter("paymentMethods", partition.payment_method());

        Ok(self.fetcher.fetch_all(&request).await)
    }

    /// Spawn the daily scheduler, or `None` when scheduling is disabled
    pub fn spawn_scheduler(&self) -> Result<Option<JoinHandle<()>>> {
        if !self.config.schedule.enabled {
            tracing::info!("Daily report schedule disabled");
            return Ok(None);
        }

        let schedule = DailySchedule::from_config(&self.config.schedule)?;
        let task = SchedulerTask::new(schedule, self.task.clone(), self.shutdown.clone());
        Ok(Some(tokio::spawn(task.run())))
    }

    /// Spawn the HTTP API server
    pub fn spawn_api_server(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let service = self.clone();
        tokio::spawn(async move { crate::api::start_api_server(service).await })
    }

    /// Stop background tasks and close the database
    pub async fn shutdown(&self) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Other("service already shut down".to_string()));
        }
        tracing::info!("Shutting down report service");
        self.shutdown.cancel();
        self.db.close().await;
        Ok(())
    }
}
