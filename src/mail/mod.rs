//! Email composition and dispatch
//!
//! The report task only talks to the [`Mailer`] trait. [`ResendMailer`] is the production
//! implementation for a Resend-compatible HTTP API.

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

mod resend;

pub use resend::ResendMailer;

/// A file attached to an email
///
/// `content` serializes as a JSON array of byte values, which is the attachment encoding the
/// provider accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Raw file bytes
    pub content: Vec<u8>,
    /// File name shown to the recipient
    pub filename: String,
}

/// A fully composed email
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Sender, `"Name <address>"`
    pub from: String,
    /// Primary recipients
    pub to: Vec<String>,
    /// Carbon-copy recipients
    pub cc: Vec<String>,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
    /// Plain-text body
    pub text: String,
    /// Attached files
    pub attachments: Vec<Attachment>,
}

/// Sends composed emails
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Dispatch `message`, returning the provider's message id
    async fn send(&self, message: &EmailMessage) -> Result<String>;
}

/// Counts and status reported in the daily email
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Day the report covers
    pub date: NaiveDate,
    /// Records in the BIS report
    pub bis_records: usize,
    /// Records in the voucher report
    pub voucher_records: usize,
    /// Whether any partition failed to fetch
    pub fetch_failed: bool,
}

impl ReportSummary {
    /// Subject line of the daily email
    pub fn subject(&self) -> String {
        format!("BIS and Voucher Reports - {}", self.date.format("%Y-%m-%d"))
    }

    fn status(&self) -> &'static str {
        if self.fetch_failed { "FAILED" } else { "SUCCESS" }
    }

    /// HTML body signed by `sender_name`
    pub fn html_body(&self, sender_name: &str) -> String {
        format!(
            "<p>Goodmorning,</p>\
             <p>Please find the attached reports for yesterday.</p>\
             <p><strong>Summary:</strong></p>\
             <ul>\
             <li>BIS Data Records: {}</li>\
             <li>Voucher Data Records: {}</li>\
             <li>Fetch Status: {}</li>\
             </ul>\
             <p>Kind regards,<br>{}</p>",
            self.bis_records,
            self.voucher_records,
            self.status(),
            sender_name
        )
    }

    /// Plain-text body signed by `sender_name`
    pub fn text_body(&self, sender_name: &str) -> String {
        format!(
            "Goodmorning,\n\n\
             Please find the attached reports for yesterday.\n\n\
             Summary:\n\
             - BIS Data Records: {}\n\
             - Voucher Data Records: {}\n\
             - Fetch Status: {}\n\n\
             Kind regards,\n{}\n",
            self.bis_records,
            self.voucher_records,
            self.status(),
            sender_name
        )
    }
}
