//! Mailgun statistics API client used by the webhook relay.

mod mailgun_client;

pub use mailgun_client::{MailgunClient, MailgunError, MailgunStatsResponse};
