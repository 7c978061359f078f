use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::diff::diff_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLogMode {
    #[default]
    Full,
    Diffed,
}

/// Appends device traffic to an NDJSON file.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_body: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            mode,
            file,
            previous_body: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&Value>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_command(&mut self, action: &str, code: Option<&str>, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "cmd",
            "action": action,
            "code": code,
            "body": body,
        });
        self.write_line(&entry);
    }

    /// Failed polls carry no body and leave the diff baseline untouched.
    pub fn log_poll(&mut self, status: u16, body: Option<&Value>) {
        let Some(body) = body else {
            let entry = json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "poll",
                "status": status,
            });
            self.write_line(&entry);
            return;
        };

        let entry = match (self.mode, self.previous_body.as_ref()) {
            (MessageLogMode::Full, _) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "poll",
                "status": status,
                "body": body,
            }),
            (MessageLogMode::Diffed, None) => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "poll",
                "status": status,
                "full": true,
                "body": body,
            }),
            (MessageLogMode::Diffed, Some(prev)) => {
                let mut changes = Vec::new();
                diff_json(prev, body, "", &mut changes);
                let change_entries: Vec<Value> = changes
                    .iter()
                    .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "poll",
                    "status": status,
                    "changes": change_entries,
                })
            }
        };
        self.write_line(&entry);

        if self.mode == MessageLogMode::Diffed {
            self.previous_body = Some(body.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
