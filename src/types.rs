//! Core types shared across the fetch, report and task layers

use crate::fetch::FetchErrorKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// One record returned by the sales API
///
/// Key order is the order the API sent them in (`serde_json` is built with
/// `preserve_order`), which in turn fixes the header order of built reports.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Field set shared by both report partitions
pub const REPORT_COMMON_FIELDS: &[&str] = &[
    "DocDate",
    "DocTime",
    "CreationDate",
    "DocNum",
    "DocEntry",
    "CardCode",
    "DocTotal",
    "U_total_cash",
    "U_total_debit",
    "U_receipt_id",
];

/// Sales entity exposed by the remote API
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    /// Sales orders
    Orders,
    /// Sales invoices
    Invoices,
}

impl Entity {
    /// Path segment used in API URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Orders => "orders",
            Entity::Invoices => "invoices",
        }
    }

    /// Key under `data` that holds the page's records (entity name capitalized)
    pub fn envelope_key(&self) -> &'static str {
        match self {
            Entity::Orders => "Orders",
            Entity::Invoices => "Invoices",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "orders" => Ok(Entity::Orders),
            "invoices" => Ok(Entity::Invoices),
            other => Err(format!("unknown entity '{}'", other)),
        }
    }
}

/// Payment-method partition of a day's sales
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// BIS payments
    Bis,
    /// Voucher payments
    Voucher,
}

impl Partition {
    /// Value sent as the `paymentMethods` filter
    pub fn payment_method(&self) -> &'static str {
        match self {
            Partition::Bis => "bis",
            Partition::Voucher => "voucher",
        }
    }

    /// Label used in email summaries and report file names
    pub fn label(&self) -> &'static str {
        match self {
            Partition::Bis => "BIS",
            Partition::Voucher => "Voucher",
        }
    }

    /// Sheet title of this partition's daily report
    pub fn sheet_title(&self) -> &'static str {
        match self {
            Partition::Bis => "Orders Data",
            Partition::Voucher => "Vouchers Data",
        }
    }

    /// File name of this partition's report for `date`
    pub fn report_file_name(&self, date: NaiveDate) -> String {
        format!("{}_orders_{}.xlsx", self.label(), date.format("%Y-%m-%d"))
    }

    /// Fields requested for the emailed daily report
    pub fn report_fields(&self) -> Vec<&'static str> {
        let extra: &[&str] = match self {
            Partition::Bis => &["U_num_at_card", "U_total_bis"],
            Partition::Voucher => &["U_voucher_id", "U_total_voucher"],
        };
        REPORT_COMMON_FIELDS.iter().chain(extra).copied().collect()
    }

    /// Fields requested by the same-day sales routes
    pub fn daily_sales_fields(&self) -> &'static [&'static str] {
        match self {
            Partition::Bis => &[
                "DocDate",
                "DocNum",
                "DocEntry",
                "CardCode",
                "DocTotal",
                "U_num_at_card",
                "U_total_bis",
                "U_total_cash",
                "U_total_debit",
                "U_receipt_id",
            ],
            Partition::Voucher => &[
                "DocDate",
                "DocNum",
                "DocEntry",
                "CardCode",
                "DocTotal",
                "U_voucher_id",
                "U_total_voucher",
                "U_total_cash",
                "U_total_debit",
                "U_receipt_id",
            ],
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payment_method())
    }
}

/// Lifecycle state of one report task execution
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Accepted, no attempt started yet
    Pending,
    /// An attempt is in progress
    Running,
    /// The last attempt failed and another one is waiting for its backoff
    RetryScheduled,
    /// The report email was dispatched
    Succeeded,
    /// Every attempt failed
    PermanentlyFailed,
}

/// Event emitted while a report task executes
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    /// Task moved to a new state
    StateChanged {
        /// New state
        state: TaskState,
        /// Attempt number (1-based, 0 while pending)
        attempt: u32,
    },

    /// A partition was fetched completely
    PartitionFetched {
        /// Partition that was fetched
        partition: Partition,
        /// Number of records received
        records: usize,
    },

    /// Fetching a partition failed
    PartitionFailed {
        /// Partition that failed
        partition: Partition,
        /// Classified failure kind
        kind: FetchErrorKind,
        /// Failure message
        message: String,
    },

    /// The report email was accepted by the provider
    ReportDispatched {
        /// Provider message id
        email_id: String,
        /// Number of CC recipients
        cc_recipients: usize,
    },

    /// The task execution finished
    TaskFinished {
        /// Terminal state (`succeeded` or `permanently_failed`)
        state: TaskState,
        /// Attempts made
        attempts: u32,
        /// Error message of the last attempt, when the task failed
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}
