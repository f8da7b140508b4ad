//! PostgreSQL suppression store.

use async_trait::async_trait;
use caby_core::{BounceRecordId, ComplaintRecordId};
use caby_mail::{
    BounceKind, BounceRecord, ComplaintKind, ComplaintRecord, MailError, SuppressionStore,
    normalize_address,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use crate::auth::db::decode_error;

#[derive(FromRow)]
struct BounceRow {
    id: String,
    email: String,
    kind: String,
    bounce_type: String,
    bounce_sub_type: String,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl BounceRow {
    fn try_into_record(self) -> Result<BounceRecord, sqlx::Error> {
        let id = BounceRecordId::from_str(&self.id)
            .map_err(|e| decode_error("bounce id", &self.id, e))?;
        let kind =
            BounceKind::from_str(&self.kind).map_err(|e| decode_error("bounce kind", &self.kind, e))?;
        Ok(BounceRecord::with_all_fields(
            id,
            self.email,
            kind,
            self.bounce_type,
            self.bounce_sub_type,
            self.enabled,
            self.created_at,
        ))
    }
}

#[derive(FromRow)]
struct ComplaintRow {
    id: String,
    feedback_id: String,
    email: String,
    kind: String,
    complaint_type: Option<String>,
    complaint_timestamp: Option<DateTime<Utc>>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl ComplaintRow {
    fn try_into_record(self) -> Result<ComplaintRecord, sqlx::Error> {
        let id = ComplaintRecordId::from_str(&self.id)
            .map_err(|e| decode_error("complaint id", &self.id, e))?;
        let kind = ComplaintKind::from_str(&self.kind)
            .map_err(|e| decode_error("complaint kind", &self.kind, e))?;
        Ok(ComplaintRecord::with_all_fields(
            id,
            self.feedback_id,
            self.email,
            kind,
            self.complaint_type,
            self.complaint_timestamp,
            self.enabled,
            self.created_at,
        ))
    }
}

/// [`SuppressionStore`] over the `mail_bounces` and `mail_complaints` tables.
#[derive(Clone)]
pub struct PgSuppressionStore {
    pool: PgPool,
}

impl PgSuppressionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SuppressionStore for PgSuppressionStore {
    async fn find_bounce(&self, email: &str) -> Result<Option<BounceRecord>, MailError> {
        let row: Option<BounceRow> = sqlx::query_as(
            r#"
            SELECT id, email, kind, bounce_type, bounce_sub_type, enabled, created_at
            FROM mail_bounces
            WHERE email = $1
            "#,
        )
        .bind(normalize_address(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(MailError::storage)?;

        row.map(BounceRow::try_into_record)
            .transpose()
            .map_err(MailError::storage)
    }

    async fn find_complaint(&self, email: &str) -> Result<Option<ComplaintRecord>, MailError> {
        let row: Option<ComplaintRow> = sqlx::query_as(
            r#"
            SELECT id, feedback_id, email, kind, complaint_type, complaint_timestamp,
                   enabled, created_at
            FROM mail_complaints
            WHERE email = $1
            "#,
        )
        .bind(normalize_address(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(MailError::storage)?;

        row.map(ComplaintRow::try_into_record)
            .transpose()
            .map_err(MailError::storage)
    }

    async fn insert_bounce(&self, record: &BounceRecord) -> Result<(), MailError> {
        sqlx::query(
            r#"
            INSERT INTO mail_bounces
                (id, email, kind, bounce_type, bounce_sub_type, enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(record.id().to_string())
        .bind(record.email())
        .bind(record.kind().as_str())
        .bind(record.bounce_type())
        .bind(record.bounce_sub_type())
        .bind(record.enabled())
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(MailError::storage)?;

        Ok(())
    }

    async fn insert_complaint(&self, record: &ComplaintRecord) -> Result<(), MailError> {
        sqlx::query(
            r#"
            INSERT INTO mail_complaints
                (id, feedback_id, email, kind, complaint_type, complaint_timestamp,
                 enabled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(record.id().to_string())
        .bind(record.feedback_id())
        .bind(record.email())
        .bind(record.kind().as_str())
        .bind(record.complaint_type())
        .bind(record.complaint_timestamp())
        .bind(record.enabled())
        .bind(record.created_at())
        .execute(&self.pool)
        .await
        .map_err(MailError::storage)?;

        Ok(())
    }
}
