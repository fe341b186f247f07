//! Email recipient CRUD operations.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, NewRecipient, Recipient, RecipientUpdate};

const DUPLICATE_EMAIL: &str = "Email already exists.";

impl Database {
    /// Get all recipients, oldest first
    pub async fn list_recipients(&self) -> Result<Vec<Recipient>> {
        let recipients = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT id, email, name, active
            FROM email_recipients
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list recipients: {}",
                e
            )))
        })?;

        Ok(recipients)
    }

    /// Get recipient by ID
    pub async fn get_recipient(&self, id: i64) -> Result<Option<Recipient>> {
        let recipient = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT id, email, name, active
            FROM email_recipients
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get recipient: {}",
                e
            )))
        })?;

        Ok(recipient)
    }

    /// Get recipient by email address
    pub async fn find_recipient_by_email(&self, email: &str) -> Result<Option<Recipient>> {
        let recipient = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT id, email, name, active
            FROM email_recipients
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to look up recipient by email: {}",
                e
            )))
        })?;

        Ok(recipient)
    }

    /// Email addresses of active recipients, in insertion order
    ///
    /// Duplicates are impossible here because `email` is unique, but nothing else is
    /// filtered or normalized.
    pub async fn active_recipient_emails(&self) -> Result<Vec<String>> {
        let emails = sqlx::query_scalar::<_, String>(
            "SELECT email FROM email_recipients WHERE active = 1 ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get active recipients: {}",
                e
            )))
        })?;

        Ok(emails)
    }

    /// Insert a new recipient
    ///
    /// Fails with [`Error::Duplicate`] when the email address is already registered.
    pub async fn insert_recipient(&self, recipient: NewRecipient) -> Result<Recipient> {
        let NewRecipient {
            email,
            name,
            active,
        } = recipient;
        let email = email.trim().to_string();

        if self.find_recipient_by_email(&email).await?.is_some() {
            return Err(Error::Duplicate(DUPLICATE_EMAIL.to_string()));
        }

        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO email_recipients (email, name, active, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&email)
        .bind(&name)
        .bind(active)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(write_error("insert recipient"))?;

        Ok(Recipient {
            id: result.last_insert_rowid(),
            email,
            name,
            active,
        })
    }

    /// Apply a partial update to a recipient
    ///
    /// Returns `Ok(None)` when no recipient has `id`. Changing the email to one owned by a
    /// different recipient fails with [`Error::Duplicate`].
    pub async fn update_recipient(
        &self,
        id: i64,
        update: RecipientUpdate,
    ) -> Result<Option<Recipient>> {
        let Some(mut recipient) = self.get_recipient(id).await? else {
            return Ok(None);
        };

        if let Some(email) = update.email {
            let email = email.trim().to_string();
            if let Some(owner) = self.find_recipient_by_email(&email).await?
                && owner.id != id
            {
                return Err(Error::Duplicate(DUPLICATE_EMAIL.to_string()));
            }
            recipient.email = email;
        }
        if let Some(name) = update.name {
            recipient.name = Some(name);
        }
        if let Some(active) = update.active {
            recipient.active = active;
        }

        sqlx::query(
            r#"
            UPDATE email_recipients
            SET email = ?, name = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(&recipient.email)
        .bind(&recipient.name)
        .bind(recipient.active)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error("update recipient"))?;

        Ok(Some(recipient))
    }

    /// Delete a recipient, returning whether a row was removed
    pub async fn delete_recipient(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM email_recipients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete recipient: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

/// Map a write failure, turning unique violations into [`Error::Duplicate`]
///
/// Covers the race where two writers pass the existence check at the same time.
fn write_error(action: &'static str) -> impl Fn(sqlx::Error) -> Error {
    move |e| {
        let unique = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            Error::Duplicate(DUPLICATE_EMAIL.to_string())
        } else {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to {}: {}",
                action, e
            )))
        }
    }
}
