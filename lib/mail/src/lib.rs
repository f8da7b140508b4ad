//! Transactional mail for caby.
//!
//! Every send goes through the [`MailGate`], which refuses recipients that
//! previously bounced or complained. Those records are fed by the provider's
//! delivery notifications through the [`NotificationIngestor`].

pub mod error;
pub mod gate;
pub mod notification;
pub mod provider;
pub mod record;
pub mod store;

pub use error::MailError;
pub use gate::{DEFAULT_DISPLAY_NAME, MailGate, SentMail};
pub use notification::{IngestSummary, NotificationIngestor, provider_messages};
pub use provider::{DisabledProvider, MailProvider, OutgoingMail, SmtpProvider, SmtpSettings};
pub use record::{BounceKind, BounceRecord, ComplaintKind, ComplaintRecord, normalize_address};
pub use store::{InMemorySuppressionStore, SuppressionStore};
