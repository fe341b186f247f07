//! Scheduled daily report task
//!
//! One execution fetches yesterday's BIS and voucher orders, writes both reports, mails them
//! to the primary recipient with the active database recipients in CC, and removes the files.
//! The whole sequence is one attempt; failed attempts are re-run from the start under the
//! configured [`RetryConfig`]. Exhausting the retries yields
//! [`TaskOutcome::PermanentlyFailed`], never an error.

use crate::config::{Config, MailConfig, RetryConfig};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetch::{BatchFetcher, FetchRequest, FetchResult};
use crate::mail::{EmailMessage, Mailer, ReportSummary};
use crate::report::{ReportBuilder, ReportData};
use crate::retry::{IsRetryable, with_retry_notify};
use crate::types::{Entity, Partition, ReportEvent, TaskState};
use async_trait::async_trait;
use chrono::{Days, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Source of the CC list, re-read on every attempt
#[async_trait]
pub trait RecipientSource: Send + Sync {
    /// Email addresses of active recipients, in order
    async fn active_recipient_emails(&self) -> Result<Vec<String>>;
}

#[async_trait]
impl RecipientSource for Database {
    async fn active_recipient_emails(&self) -> Result<Vec<String>> {
        Database::active_recipient_emails(self).await
    }
}

/// What a successful execution delivered
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    /// Day the reports cover
    pub date: NaiveDate,
    /// Records in the BIS report
    pub bis_records: usize,
    /// Records in the voucher report
    pub voucher_records: usize,
    /// Provider message id
    pub email_id: String,
    /// Number of CC recipients
    pub cc_recipients: usize,
}

/// Terminal result of one task execution
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The email was dispatched
    Succeeded {
        /// Attempts made, including the successful one
        attempts: u32,
        /// What was delivered
        summary: DeliverySummary,
    },
    /// Every attempt failed
    PermanentlyFailed {
        /// Attempts made
        attempts: u32,
        /// Error of the last attempt
        error: String,
    },
}

impl TaskOutcome {
    /// Terminal state of this outcome
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Succeeded { .. } => TaskState::Succeeded,
            TaskOutcome::PermanentlyFailed { .. } => TaskState::PermanentlyFailed,
        }
    }

    /// Number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Succeeded { attempts, .. }
            | TaskOutcome::PermanentlyFailed { attempts, .. } => *attempts,
        }
    }

    /// Whether the email was dispatched
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

/// Error of one attempt, tagged with its attempt number
#[derive(Debug)]
struct AttemptError {
    attempt: u32,
    source: Error,
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt {}: {}", self.attempt, self.source)
    }
}

impl IsRetryable for AttemptError {
    fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

/// The daily report task
pub struct ReportTask {
    fetcher: BatchFetcher,
    builder: ReportBuilder,
    mailer: Arc<dyn Mailer>,
    recipients: Arc<dyn RecipientSource>,
    mail: MailConfig,
    retry: RetryConfig,
    batch_size: NonZeroU32,
    utc_offset: FixedOffset,
    event_tx: broadcast::Sender<ReportEvent>,
}

impl ReportTask {
    /// Assemble the task from its collaborators
    pub fn new(
        config: &Config,
        fetcher: BatchFetcher,
        mailer: Arc<dyn Mailer>,
        recipients: Arc<dyn RecipientSource>,
        event_tx: broadcast::Sender<ReportEvent>,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            builder: ReportBuilder::from_config(&config.reports),
            mailer,
            recipients,
            mail: config.mail.clone(),
            retry: config.retry.clone(),
            batch_size: config.sales_api.batch_size,
            utc_offset: config.schedule.utc_offset()?,
            event_tx,
        })
    }

    /// Run with the configured retry policy, reporting on yesterday
    pub async fn execute(&self) -> TaskOutcome {
        self.execute_with(&self.retry, None).await
    }

    /// Run with an explicit retry policy
    ///
    /// With `date` set, every attempt reports on that day instead of the day before the
    /// attempt started.
    pub async fn execute_with(&self, policy: &RetryConfig, date: Option<NaiveDate>) -> TaskOutcome {
        self.emit(ReportEvent::StateChanged {
            state: TaskState::Pending,
            attempt: 0,
        });

        let mut attempts = 0;
        let result = with_retry_notify(
            policy,
            |attempt| {
                attempts = attempt;
                self.run_attempt(attempt, date)
            },
            |_, next_attempt, delay| {
                info!(
                    next_attempt,
                    delay_secs = delay.as_secs(),
                    "Report attempt failed, retry scheduled"
                );
                self.emit(ReportEvent::StateChanged {
                    state: TaskState::RetryScheduled,
                    attempt: next_attempt,
                });
            },
        )
        .await;

        let outcome = match result {
            Ok(summary) => TaskOutcome::Succeeded { attempts, summary },
            Err(e) => {
                error!(
                    attempts,
                    error = %e.source,
                    "Max retries exceeded. Report task failed permanently."
                );
                TaskOutcome::PermanentlyFailed {
                    attempts,
                    error: e.source.to_string(),
                }
            }
        };

        self.emit(ReportEvent::StateChanged {
            state: outcome.state(),
            attempt: attempts,
        });
        self.emit(ReportEvent::TaskFinished {
            state: outcome.state(),
            attempts,
            error: match &outcome {
                TaskOutcome::PermanentlyFailed { error, .. } => Some(error.clone()),
                TaskOutcome::Succeeded { .. } => None,
            },
        });
        outcome
    }

    async fn run_attempt(
        &self,
        attempt: u32,
        date: Option<NaiveDate>,
    ) -> std::result::Result<DeliverySummary, AttemptError> {
        self.emit(ReportEvent::StateChanged {
            state: TaskState::Running,
            attempt,
        });

        let result = match date {
            Some(date) => Ok(date),
            None => self.yesterday(),
        };
        let result = match result {
            Ok(date) => self.deliver(date).await,
            Err(e) => Err(e),
        };

        result.map_err(|source| {
            warn!(attempt, error = %source, "Report attempt failed");
            AttemptError { attempt, source }
        })
    }

    /// One attempt: fetch, build, mail, clean up
    pub async fn deliver(&self, date: NaiveDate) -> Result<DeliverySummary> {
        info!(%date, "Starting daily report");

        let bis = self.fetch_partition(Partition::Bis, date).await;
        let voucher = self.fetch_partition(Partition::Voucher, date).await;

        let summary = summarize(date, &bis, &voucher);
        if summary.fetch_failed {
            // Only the first failure is carried; both were logged by the fetcher
            let message = bis
                .as_ref()
                .err()
                .or(voucher.as_ref().err())
                .map(|e| e.message.clone())
                .unwrap_or_default();
            return Err(Error::TaskExecutionFailed(message));
        }

        let bis_report = self.builder.build(
            Partition::Bis.sheet_title(),
            ReportData::from(&bis),
            &Partition::Bis.report_file_name(date),
        )?;
        let voucher_report = self.builder.build(
            Partition::Voucher.sheet_title(),
            ReportData::from(&voucher),
            &Partition::Voucher.report_file_name(date),
        )?;

        let attachments = vec![
            bis_report.to_attachment().await?,
            voucher_report.to_attachment().await?,
        ];
        let cc = self.recipients.active_recipient_emails().await?;

        let message = EmailMessage {
            from: self.mail.sender(),
            to: vec![self.mail.to_address.clone()],
            cc,
            subject: summary.subject(),
            html: summary.html_body(&self.mail.sender_name),
            text: summary.text_body(&self.mail.sender_name),
            attachments,
        };

        let email_id = self.mailer.send(&message).await?;
        self.emit(ReportEvent::ReportDispatched {
            email_id: email_id.clone(),
            cc_recipients: message.cc.len(),
        });

        bis_report.remove().await?;
        voucher_report.remove().await?;

        info!(%date, email_id = %email_id, "Daily report delivered");
        Ok(DeliverySummary {
            date,
            bis_records: summary.bis_records,
            voucher_records: summary.voucher_records,
            email_id,
            cc_recipients: message.cc.len(),
        })
    }

    async fn fetch_partition(&self, partition: Partition, date: NaiveDate) -> FetchResult {
        let day = date.format("%Y-%m-%d").to_string();
        let request = FetchRequest::new(Entity::Orders, self.batch_size)
            .with_fields(partition.report_fields())
            .with_filter("startDate", day.clone())
            .with_filter("endDate", day)
            .with_filter("paymentMethods", partition.payment_method());

        let result = self.fetcher.fetch_all(&request).await;
        match &result {
            Ok(records) => self.emit(ReportEvent::PartitionFetched {
                partition,
                records: records.len(),
            }),
            Err(e) => self.emit(ReportEvent::PartitionFailed {
                partition,
                kind: e.kind.clone(),
                message: e.message.clone(),
            }),
        }
        result
    }

    /// The day before today in the configured offset
    fn yesterday(&self) -> Result<NaiveDate> {
        let today = Utc::now().with_timezone(&self.utc_offset).date_naive();
        today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| Error::Other(format!("no day precedes {}", today)))
    }

    fn emit(&self, event: ReportEvent) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// Email summary for two fetch results; counts are zero when either fetch failed
fn summarize(date: NaiveDate, bis: &FetchResult, voucher: &FetchResult) -> ReportSummary {
    match (bis, voucher) {
        (Ok(bis), Ok(voucher)) => ReportSummary {
            date,
            bis_records: bis.len(),
            voucher_records: voucher.len(),
            fetch_failed: false,
        },
        _ => ReportSummary {
            date,
            bis_records: 0,
            voucher_records: 0,
            fetch_failed: true,
        },
    }
}

#[cfg(test)]
mod tests;
