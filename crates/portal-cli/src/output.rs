//! Terminal rendering of connection state, notifications and events

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use portal_connection::{ConnectionState, Notification, ReconnectEvent, Severity};

pub fn state_table(state: &ConnectionState) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);

    let yes_no = |flag: bool| if flag { "yes" } else { "no" }.to_string();
    table.add_row(vec!["Connected".to_string(), yes_no(state.is_connected)]);
    table.add_row(vec!["Checking".to_string(), yes_no(state.is_checking)]);
    table.add_row(vec!["Reconnecting".to_string(), yes_no(state.reconnecting)]);
    table.add_row(vec![
        "Response time".to_string(),
        state
            .response_time
            .map(|latency| format!("{} ms", latency.as_millis()))
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Last checked".to_string(),
        state
            .last_checked
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
    ]);
    table.add_row(vec![
        "Consecutive errors".to_string(),
        state.consecutive_errors.to_string(),
    ]);
    table.add_row(vec![
        "Last error".to_string(),
        state.connection_error.clone().unwrap_or_else(|| "-".to_string()),
    ]);
    table
}

pub fn notification_line(notification: &Notification) -> String {
    let marker = match notification.severity() {
        Severity::Success => "ok",
        Severity::Warning => "warn",
        Severity::Error => "error",
    };
    format!("[{marker}] {notification}")
}

pub fn event_line(event: &ReconnectEvent) -> String {
    match event {
        ReconnectEvent::Scheduled { attempt, delay } => {
            format!("reconnect attempt {attempt} in {:.1}s", delay.as_secs_f64())
        }
        ReconnectEvent::Attempting {
            attempt,
            max_attempts,
        } => format!("reconnect attempt {attempt}/{max_attempts}"),
        ReconnectEvent::Succeeded {
            attempts_taken,
            latency,
        } => format!(
            "reconnected after {attempts_taken} attempt(s) ({} ms)",
            latency.as_millis()
        ),
        ReconnectEvent::Failed { attempt, error } => {
            format!("reconnect attempt {attempt} failed: {error}")
        }
        ReconnectEvent::Exhausted { total_attempts } => {
            format!("gave up after {total_attempts} attempts")
        }
    }
}
