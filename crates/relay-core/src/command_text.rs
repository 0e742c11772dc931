//! Slash-command text parsing with explicit defaulting.

pub const DEFAULT_DURATION: &str = "24h";
pub const DEFAULT_EVENTS: &[&str] = &["accepted", "delivered", "failed"];

/// Resolved stats request parsed out of the slash-command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsQuery {
    pub duration: String,
    pub events: Vec<String>,
}

impl Default for StatsQuery {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION.to_string(),
            events: DEFAULT_EVENTS.iter().map(|event| event.to_string()).collect(),
        }
    }
}

/// Parses the free-text command field into a duration token and an event
/// list. The first whitespace-separated token is the duration, the second a
/// comma-separated event list. Either token falls back to its default
/// independently; a missing or empty text field yields both defaults.
pub fn parse_stats_command(text: Option<&str>) -> StatsQuery {
    let mut query = StatsQuery::default();
    let mut tokens = text.unwrap_or_default().split_whitespace();

    if let Some(duration) = tokens.next() {
        query.duration = duration.to_string();
    }

    if let Some(event_list) = tokens.next() {
        let events: Vec<String> = event_list
            .split(',')
            .map(str::trim)
            .filter(|event| !event.is_empty())
            .map(str::to_string)
            .collect();
        if !events.is_empty() {
            query.events = events;
        }
    }

    query
}
