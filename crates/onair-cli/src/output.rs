//! Output formatting for CLI

use onair_core::UiState;
use serde::Serialize;
use std::time::Duration;

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Serialize)]
struct StateLine<'a> {
    elapsed_ms: u128,
    #[serde(flatten)]
    state: &'a UiState,
}

fn flag(on: bool, name: &str) -> String {
    if on {
        name.to_uppercase()
    } else {
        format!("{:width$}", "-", width = name.len())
    }
}

/// Render one UI state transition
pub fn format_state(state: &UiState, elapsed: Duration, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string(&StateLine {
            elapsed_ms: elapsed.as_millis(),
            state,
        })
        .unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Text => format!(
            "[{:>6}ms] {} {} {} {} {}",
            elapsed.as_millis(),
            flag(state.playing, "playing"),
            flag(state.buffering, "buffering"),
            flag(state.muted, "muted"),
            flag(state.fullscreen, "fullscreen"),
            flag(state.controls_visible, "controls"),
        ),
    }
}

/// Format any serializable value
pub fn format_output<T: Serialize>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => {
            format!("{:#}", serde_json::to_value(data).unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_state_line() {
        let line = format_state(&UiState::default(), Duration::from_millis(42), "text");
        assert_eq!(line, "[    42ms] -       BUFFERING MUTED -          CONTROLS");
    }

    #[test]
    fn test_json_state_line() {
        let line = format_state(&UiState::default(), Duration::from_millis(7), "json");
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["elapsed_ms"], 7);
        assert_eq!(value["muted"], true);
        assert_eq!(value["playing"], false);
    }
}
