//! Pure transformation core for the Mailgun stats relay.
//!
//! Everything in this crate is synchronous and free of I/O: slash-command
//! text parsing, aggregation of Mailgun's time-bucketed stat records into
//! flat per-category totals, and rendering of those totals into Slack's
//! attachment schema.

mod command_text;
mod slack_message;
mod stats_totals;

pub use command_text::{parse_stats_command, StatsQuery, DEFAULT_DURATION, DEFAULT_EVENTS};
pub use slack_message::{render_slack_message, SlackAttachment, SlackMessage};
pub use stats_totals::{aggregate_stat_totals, CategoryTotals, StatRecord, StatTotals};
