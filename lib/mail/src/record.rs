//! Bounce and complaint records.
//!
//! Records are created from the mail provider's delivery notifications and
//! consulted before every send. The gate never mutates them; an operator can
//! disable a record to let mail through again.

use caby_core::{BounceRecordId, ComplaintRecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalizes an address for storage and lookup.
#[must_use]
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Validated bounce classification (`<type>.<sub-type>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BounceKind {
    PermanentGeneral,
    PermanentNoEmail,
    PermanentSuppressed,
    PermanentOnAccountSuppressionList,
    TransientGeneral,
    TransientMailboxFull,
    TransientMessageTooLarge,
    TransientContentRejected,
    TransientAttachmentRejected,
    /// The provider could not classify the bounce, or reported a
    /// combination we do not know.
    Undetermined,
}

impl BounceKind {
    const ALL: [BounceKind; 10] = [
        Self::PermanentGeneral,
        Self::PermanentNoEmail,
        Self::PermanentSuppressed,
        Self::PermanentOnAccountSuppressionList,
        Self::TransientGeneral,
        Self::TransientMailboxFull,
        Self::TransientMessageTooLarge,
        Self::TransientContentRejected,
        Self::TransientAttachmentRejected,
        Self::Undetermined,
    ];

    /// Classifies a raw bounce type and sub-type.
    ///
    /// Unknown types, and sub-types that do not belong to their type, map to
    /// [`BounceKind::Undetermined`].
    #[must_use]
    pub fn classify(bounce_type: &str, sub_type: &str) -> Self {
        match (bounce_type, sub_type) {
            ("Permanent", "General") => Self::PermanentGeneral,
            ("Permanent", "NoEmail") => Self::PermanentNoEmail,
            ("Permanent", "Suppressed") => Self::PermanentSuppressed,
            ("Permanent", "OnAccountSuppressionList") => Self::PermanentOnAccountSuppressionList,
            ("Transient", "General") => Self::TransientGeneral,
            ("Transient", "MailboxFull") => Self::TransientMailboxFull,
            ("Transient", "MessageTooLarge") => Self::TransientMessageTooLarge,
            ("Transient", "ContentRejected") => Self::TransientContentRejected,
            ("Transient", "AttachmentRejected") => Self::TransientAttachmentRejected,
            _ => Self::Undetermined,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermanentGeneral => "Permanent.General",
            Self::PermanentNoEmail => "Permanent.NoEmail",
            Self::PermanentSuppressed => "Permanent.Suppressed",
            Self::PermanentOnAccountSuppressionList => "Permanent.OnAccountSuppressionList",
            Self::TransientGeneral => "Transient.General",
            Self::TransientMailboxFull => "Transient.MailboxFull",
            Self::TransientMessageTooLarge => "Transient.MessageTooLarge",
            Self::TransientContentRejected => "Transient.ContentRejected",
            Self::TransientAttachmentRejected => "Transient.AttachmentRejected",
            Self::Undetermined => "Undetermined",
        }
    }

    /// Returns true for permanent bounces.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(
            self,
            Self::PermanentGeneral
                | Self::PermanentNoEmail
                | Self::PermanentSuppressed
                | Self::PermanentOnAccountSuppressionList
        )
    }
}

impl fmt::Display for BounceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BounceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown bounce kind '{s}'"))
    }
}

impl From<BounceKind> for String {
    fn from(kind: BounceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for BounceKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A recipient whose mail bounced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BounceRecord {
    id: BounceRecordId,
    email: String,
    kind: BounceKind,
    bounce_type: String,
    bounce_sub_type: String,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl BounceRecord {
    /// Creates an enabled record, keeping the raw provider values.
    #[must_use]
    pub fn new(email: &str, bounce_type: &str, bounce_sub_type: &str) -> Self {
        Self {
            id: BounceRecordId::new(),
            email: normalize_address(email),
            kind: BounceKind::classify(bounce_type, bounce_sub_type),
            bounce_type: bounce_type.to_string(),
            bounce_sub_type: bounce_sub_type.to_string(),
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs a record from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: BounceRecordId,
        email: String,
        kind: BounceKind,
        bounce_type: String,
        bounce_sub_type: String,
        enabled: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            kind,
            bounce_type,
            bounce_sub_type,
            enabled,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> BounceRecordId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn kind(&self) -> BounceKind {
        self.kind
    }

    #[must_use]
    pub fn bounce_type(&self) -> &str {
        &self.bounce_type
    }

    #[must_use]
    pub fn bounce_sub_type(&self) -> &str {
        &self.bounce_sub_type
    }

    /// Whether the record currently suppresses mail.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Human-readable suppression reason.
    #[must_use]
    pub fn reason(&self) -> String {
        format!(
            "bounce: {}({}).{}",
            self.kind, self.bounce_type, self.bounce_sub_type
        )
    }
}

/// Validated complaint feedback type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ComplaintKind {
    Abuse,
    AuthFailure,
    Fraud,
    NotSpam,
    Other,
    Virus,
    Unknown,
}

impl ComplaintKind {
    const ALL: [ComplaintKind; 7] = [
        Self::Abuse,
        Self::AuthFailure,
        Self::Fraud,
        Self::NotSpam,
        Self::Other,
        Self::Virus,
        Self::Unknown,
    ];

    /// Classifies a raw feedback type; unknown or missing values map to
    /// [`ComplaintKind::Unknown`].
    #[must_use]
    pub fn classify(feedback_type: Option<&str>) -> Self {
        feedback_type
            .and_then(|raw| raw.parse().ok())
            .filter(|kind| *kind != Self::Unknown)
            .unwrap_or(Self::Unknown)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Abuse => "abuse",
            Self::AuthFailure => "auth-failure",
            Self::Fraud => "fraud",
            Self::NotSpam => "not-spam",
            Self::Other => "other",
            Self::Virus => "virus",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ComplaintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown complaint kind '{s}'"))
    }
}

impl From<ComplaintKind> for String {
    fn from(kind: ComplaintKind) -> Self {
        kind.as_str().to_string()
    }
}

impl TryFrom<String> for ComplaintKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A recipient who flagged our mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintRecord {
    id: ComplaintRecordId,
    feedback_id: String,
    email: String,
    kind: ComplaintKind,
    complaint_type: Option<String>,
    complaint_timestamp: Option<DateTime<Utc>>,
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl ComplaintRecord {
    /// Creates an enabled record, keeping the raw feedback type.
    #[must_use]
    pub fn new(
        feedback_id: &str,
        email: &str,
        complaint_type: Option<&str>,
        complaint_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: ComplaintRecordId::new(),
            feedback_id: feedback_id.to_string(),
            email: normalize_address(email),
            kind: ComplaintKind::classify(complaint_type),
            complaint_type: complaint_type.map(str::to_string),
            complaint_timestamp,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs a record from storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: ComplaintRecordId,
        feedback_id: String,
        email: String,
        kind: ComplaintKind,
        complaint_type: Option<String>,
        complaint_timestamp: Option<DateTime<Utc>>,
        enabled: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            feedback_id,
            email,
            kind,
            complaint_type,
            complaint_timestamp,
            enabled,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> ComplaintRecordId {
        self.id
    }

    #[must_use]
    pub fn feedback_id(&self) -> &str {
        &self.feedback_id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn kind(&self) -> ComplaintKind {
        self.kind
    }

    #[must_use]
    pub fn complaint_type(&self) -> Option<&str> {
        self.complaint_type.as_deref()
    }

    #[must_use]
    pub fn complaint_timestamp(&self) -> Option<DateTime<Utc>> {
        self.complaint_timestamp
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Human-readable suppression reason.
    #[must_use]
    pub fn reason(&self) -> String {
        format!(
            "complaint: {}({})",
            self.kind,
            self.complaint_type.as_deref().unwrap_or("none")
        )
    }
}
