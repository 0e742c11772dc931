//! Renders aggregated totals into Slack's rich-message attachment schema.

use serde::Serialize;

use crate::stats_totals::StatTotals;


const FALLBACK_COLOR: &str = "#3367d6";

const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("accepted", "#9bc0ab"),
    ("delivered", "#629976"),
    ("temporary", "#d9a8aa"),
    ("permanent", "#b85555"),
    ("complained", "#aa2d2c"),
    ("unsubscribed", "#373f41"),
    ("stored", "#bedafc"),
    ("clicked", "#ea912e"),
    ("opened", "#3770df"),
];

fn category_color(name: &str) -> &'static str {
    CATEGORY_COLORS
        .iter()
        .find(|(category, _)| *category == name)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_COLOR)
}

/// One visual block per category in Slack's legacy attachment format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackAttachment {
    pub color: String,
    pub title: String,
    pub text: String,
}

/// The full slash-command response, visible to everyone in the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub response_type: &'static str,
    pub text: String,
    pub attachments: Vec<SlackAttachment>,
}

/// Builds the channel-visible summary message for one aggregated window.
/// Attachments follow the totals' category order; each body line is
/// `_{sub_key}:_ {count}` with a trailing newline kept on the last line.
pub fn render_slack_message(totals: &StatTotals, start: &str, end: &str) -> SlackMessage {
    let range = if start == end {
        format!("for {start}")
    } else {
        format!("from {start} to {end}")
    };

    let attachments = totals
        .categories()
        .map(|category| {
            let mut text = String::new();
            for (sub_key, count) in category.counts() {
                text.push_str(&format!("_{sub_key}:_ {count}\n"));
            }
            SlackAttachment {
                color: category_color(category.name()).to_string(),
                title: category.name().to_string(),
                text,
            }
        })
        .collect();

    SlackMessage {
        response_type: "in_channel",
        text: format!("Mailgun totals {range}"),
        attachments,
    }
}
