pub mod config;
pub mod doctor;
pub mod export;
pub mod migrate;
pub mod price;
pub mod schedule;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::build(command, None, message, None, 0)
    }

    pub fn success_with_payload(
        command: &str,
        message: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::build(command, None, message, Some(payload), 0)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::build(command, Some(error_class), message, None, exit_code)
    }

    fn build(
        command: &str,
        error_class: Option<&str>,
        message: impl Into<String>,
        payload: Option<serde_json::Value>,
        exit_code: u8,
    ) -> Self {
        let outcome = CommandOutcome {
            command: command.to_string(),
            status: if error_class.is_none() { "ok" } else { "error" }.to_string(),
            error_class: error_class.map(str::to_string),
            message: message.into(),
            payload,
        };
        Self { exit_code, output: serialize_payload(outcome) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string_pretty(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
