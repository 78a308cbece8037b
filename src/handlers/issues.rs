//! Issue report filing

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::conversation::SenderId;
use crate::dispatch::{HandlerError, IssueTracker};

pub struct SqlIssueTracker {
    pool: SqlitePool,
}

impl SqlIssueTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IssueTracker for SqlIssueTracker {
    async fn file_report(
        &self,
        sender: &SenderId,
        title: &str,
        description: &str,
    ) -> Result<(), HandlerError> {
        let mut trx = self.pool.begin().await?;

        let resident_id: Option<(i64,)> =
            sqlx::query_as("SELECT resident_id FROM resident WHERE whatsapp_number = ?")
                .bind(sender.as_str())
                .fetch_optional(&mut *trx)
                .await?;

        let (resident_id,) =
            resident_id.ok_or_else(|| HandlerError::UnknownResident(sender.clone()))?;

        sqlx::query(
            r#"
            INSERT INTO issue_report (resident_id, title, description, status, approval_status)
            VALUES (?, ?, ?, 'To do', 'Pending')
            "#,
        )
        .bind(resident_id)
        .bind(title)
        .bind(description)
        .execute(&mut *trx)
        .await?;

        trx.commit().await?;
        Ok(())
    }
}
