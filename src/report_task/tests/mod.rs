#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::config::{ReportConfig, SalesApiConfig};
use crate::mail::ResendMailer;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir, tempdir};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COUNT_PATH: &str = "/foodbasket/orders/count";
const PAGE_PATH: &str = "/foodbasket/orders";

struct StaticRecipients(Vec<String>);

#[async_trait]
impl RecipientSource for StaticRecipients {
    async fn active_recipient_emails(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

struct Harness {
    api: MockServer,
    mail: MockServer,
    dir: TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self {
            api: MockServer::start().await,
            mail: MockServer::start().await,
            dir: tempdir().unwrap(),
        }
    }

    fn config(&self) -> Config {
        Config {
            sales_api: SalesApiConfig {
                base_url: self.api.uri(),
                timeout: Duration::from_millis(300),
                ..SalesApiConfig::default()
            },
            mail: MailConfig {
                api_url: self.mail.uri(),
                api_key: Some("re_test".into()),
                from_address: "reports@example.com".into(),
                to_address: "finance@example.com".into(),
                ..MailConfig::default()
            },
            reports: ReportConfig {
                output_dir: self.dir.path().to_path_buf(),
            },
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
                backoff_multiplier: 1.0,
                jitter: false,
            },
            ..Config::default()
        }
    }

    fn task_with(
        &self,
        recipients: Arc<dyn RecipientSource>,
    ) -> (ReportTask, broadcast::Receiver<ReportEvent>) {
        let config = self.config();
        let (event_tx, event_rx) = broadcast::channel(64);
        let task = ReportTask::new(
            &config,
            BatchFetcher::new(&config.sales_api).unwrap(),
            Arc::new(ResendMailer::new(&config.mail).unwrap()),
            recipients,
            event_tx,
        )
        .unwrap();
        (task, event_rx)
    }

    fn task(&self) -> (ReportTask, broadcast::Receiver<ReportEvent>) {
        self.task_with(Arc::new(StaticRecipients(vec!["ops@example.com".into()])))
    }

    async fn mount_partition(&self, partition: &str, records: Vec<serde_json::Value>) {
        Mock::given(method("GET"))
            .and(path(COUNT_PATH))
            .and(query_param("paymentMethods", partition))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": records.len()})),
            )
            .mount(&self.api)
            .await;
        Mock::given(method("GET"))
            .and(path(PAGE_PATH))
            .and(query_param("paymentMethods", partition))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"Orders": records}})),
            )
            .mount(&self.api)
            .await;
    }

    async fn mount_mail_ok(&self, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1"})))
            .expect(expected)
            .mount(&self.mail)
            .await;
    }
}

fn report_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

fn drain(rx: &mut broadcast::Receiver<ReportEvent>) -> Vec<ReportEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn states(events: &[ReportEvent]) -> Vec<TaskState> {
    events
        .iter()
        .filter_map(|e| match e {
            ReportEvent::StateChanged { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn successful_run_mails_both_reports_and_removes_files() {
    let h = Harness::start().await;
    h.mount_partition(
        "bis",
        vec![
            json!({"DocNum": 1, "DocTotal": 10.0}),
            json!({"DocNum": 2, "DocTotal": 12.5}),
        ],
    )
    .await;
    h.mount_partition("voucher", vec![]).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({
            "from": "SynergyDailyBasket <reports@example.com>",
            "to": ["finance@example.com"],
            "cc": ["ops@example.com"],
            "subject": "BIS and Voucher Reports - 2024-03-01",
            "attachments": [
                {"filename": "BIS_orders_2024-03-01.xlsx"},
                {"filename": "Voucher_orders_2024-03-01.xlsx"},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_42"})))
        .expect(1)
        .mount(&h.mail)
        .await;

    let (task, mut rx) = h.task();
    let outcome = task
        .execute_with(&h.config().retry, Some(report_date()))
        .await;

    match &outcome {
        TaskOutcome::Succeeded { attempts, summary } => {
            assert_eq!(*attempts, 1);
            assert_eq!(summary.bis_records, 2);
            assert_eq!(summary.voucher_records, 0);
            assert_eq!(summary.email_id, "msg_42");
            assert_eq!(summary.cc_recipients, 1);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert!(dir_is_empty(h.dir.path()), "report files should be deleted");

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![TaskState::Pending, TaskState::Running, TaskState::Succeeded]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        ReportEvent::ReportDispatched { email_id, .. } if email_id == "msg_42"
    )));
}

#[tokio::test]
async fn fetch_filters_use_report_date_and_partition_fields() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path(COUNT_PATH))
        .and(query_param("startDate", "2024-03-01"))
        .and(query_param("endDate", "2024-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": 1})))
        .expect(2)
        .mount(&h.api)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .and(query_param("paymentMethods", "bis"))
        .and(query_param(
            "fields",
            Partition::Bis.report_fields().join(","),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"Orders": [{"DocNum": 1}]}})),
        )
        .expect(1)
        .mount(&h.api)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .and(query_param("paymentMethods", "voucher"))
        .and(query_param(
            "fields",
            Partition::Voucher.report_fields().join(","),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"Orders": [{"DocNum": 2}]}})),
        )
        .expect(1)
        .mount(&h.api)
        .await;
    h.mount_mail_ok(1).await;

    let (task, _rx) = h.task();
    let outcome = task
        .execute_with(&h.config().retry, Some(report_date()))
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn timeout_on_first_attempt_then_success_retries_once() {
    let h = Harness::start().await;

    // First bis count request hangs past the client timeout
    Mock::given(method("GET"))
        .and(path(COUNT_PATH))
        .and(query_param("paymentMethods", "bis"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": 1}))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&h.api)
        .await;
    h.mount_partition("bis", vec![json!({"DocNum": 1})]).await;
    h.mount_partition("voucher", vec![json!({"DocNum": 2})]).await;
    h.mount_mail_ok(1).await;

    let (task, mut rx) = h.task();
    let outcome = task
        .execute_with(&h.config().retry, Some(report_date()))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 2);
    assert!(dir_is_empty(h.dir.path()));

    let events = drain(&mut rx);
    assert_eq!(
        states(&events),
        vec![
            TaskState::Pending,
            TaskState::Running,
            TaskState::RetryScheduled,
            TaskState::Running,
            TaskState::Succeeded,
        ]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        ReportEvent::PartitionFailed {
            partition: Partition::Bis,
            kind: crate::fetch::FetchErrorKind::Timeout,
            ..
        }
    )));
}

#[tokio::test]
async fn exhausted_retries_fail_permanently_without_email() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path(COUNT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&h.api)
        .await;
    h.mount_mail_ok(0).await;

    let (task, mut rx) = h.task();
    let outcome = task
        .execute_with(&h.config().retry, Some(report_date()))
        .await;

    match &outcome {
        TaskOutcome::PermanentlyFailed { attempts, error } => {
            assert_eq!(*attempts, 3);
            assert_eq!(
                error,
                "task execution failed: An error occurred while fetching orders count"
            );
        }
        other => panic!("expected permanent failure, got {other:?}"),
    }
    assert!(dir_is_empty(h.dir.path()), "no reports are built on failure");

    let events = drain(&mut rx);
    assert!(matches!(
        events.last(),
        Some(ReportEvent::TaskFinished {
            state: TaskState::PermanentlyFailed,
            attempts: 3,
            error: Some(_),
        })
    ));
}

#[tokio::test]
async fn only_the_first_partition_failure_is_reported() {
    let h = Harness::start().await;
    Mock::given(method("GET"))
        .and(path(COUNT_PATH))
        .and(query_param("paymentMethods", "bis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&h.api)
        .await;
    Mock::given(method("GET"))
        .and(path(COUNT_PATH))
        .and(query_param("paymentMethods", "voucher"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.api)
        .await;
    h.mount_mail_ok(0).await;

    let (task, mut rx) = h.task();
    let outcome = task
        .execute_with(&RetryConfig::single_attempt(), Some(report_date()))
        .await;

    match outcome {
        TaskOutcome::PermanentlyFailed { attempts, error } => {
            assert_eq!(attempts, 1);
            assert!(error.contains("Response for orders count is missing 'data'"));
            assert!(!error.contains("An error occurred"));
        }
        other => panic!("expected permanent failure, got {other:?}"),
    }

    // Both failures are still visible as events
    let failed: Vec<Partition> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            ReportEvent::PartitionFailed { partition, .. } => Some(partition),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![Partition::Bis, Partition::Voucher]);
}

#[tokio::test]
async fn mail_rejection_keeps_files_until_a_later_attempt_succeeds() {
    let h = Harness::start().await;
    h.mount_partition("bis", vec![json!({"DocNum": 1})]).await;
    h.mount_partition("voucher", vec![]).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&h.mail)
        .await;
    h.mount_mail_ok(1).await;

    let (task, _rx) = h.task();
    let outcome = task
        .execute_with(&h.config().retry, Some(report_date()))
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts(), 2);
    assert!(dir_is_empty(h.dir.path()));
}

#[tokio::test]
async fn failed_dispatch_leaves_report_files_on_disk() {
    let h = Harness::start().await;
    h.mount_partition("bis", vec![json!({"DocNum": 1})]).await;
    h.mount_partition("voucher", vec![json!({"DocNum": 2})]).await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.mail)
        .await;

    let (task, _rx) = h.task();
    let outcome = task
        .execute_with(&RetryConfig::single_attempt(), Some(report_date()))
        .await;

    assert_eq!(outcome.state(), TaskState::PermanentlyFailed);
    assert!(h.dir.path().join("BIS_orders_2024-03-01.xlsx").exists());
    assert!(h.dir.path().join("Voucher_orders_2024-03-01.xlsx").exists());
}

#[tokio::test]
async fn cc_list_comes_from_active_database_recipients() {
    let h = Harness::start().await;
    h.mount_partition("bis", vec![]).await;
    h.mount_partition("voucher", vec![]).await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(json!({"cc": ["a@example.com", "c@example.com"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_db"})))
        .expect(1)
        .mount(&h.mail)
        .await;

    let db_file = NamedTempFile::new().unwrap();
    let db = Database::new(db_file.path()).await.unwrap();
    for (email, active) in [
        ("a@example.com", true),
        ("b@example.com", false),
        ("c@example.com", true),
    ] {
        db.insert_recipient(crate::db::NewRecipient {
            email: email.into(),
            name: None,
            active,
        })
        .await
        .unwrap();
    }

    let (task, _rx) = h.task_with(Arc::new(db));
    let outcome = task
        .execute_with(&RetryConfig::single_attempt(), Some(report_date()))
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn default_run_reports_on_yesterday() {
    let h = Harness::start().await;
    h.mount_partition("bis", vec![]).await;
    h.mount_partition("voucher", vec![]).await;
    h.mount_mail_ok(1).await;

    let (task, _rx) = h.task();
    let outcome = task.execute().await;

    let expected = Utc::now().date_naive().pred_opt().unwrap();
    match outcome {
        TaskOutcome::Succeeded { summary, .. } => assert_eq!(summary.date, expected),
        other => panic!("expected success, got {other:?}"),
    }
}

#[test]
fn summary_zeroes_counts_when_either_fetch_failed() {
    let failure = crate::fetch::FetchError {
        kind: crate::fetch::FetchErrorKind::Timeout,
        message: "Request timed out while fetching orders data".into(),
        details: crate::fetch::TIMEOUT_DETAILS.into(),
        context: None,
    };
    let ok: FetchResult = Ok(vec![serde_json::Map::new()]);
    let failed: FetchResult = Err(failure);

    let summary = summarize(report_date(), &ok, &failed);
    assert!(summary.fetch_failed);
    assert_eq!(summary.bis_records, 0);
    assert_eq!(summary.voucher_records, 0);

    let summary = summarize(report_date(), &ok, &ok);
    assert!(!summary.fetch_failed);
    assert_eq!(summary.bis_records, 1);
}
