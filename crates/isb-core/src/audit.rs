//! Append-only audit trail, one file per local calendar day.

use std::{fs::OpenOptions, io::Write, path::PathBuf};

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;

use crate::{domain::Identity, errors::Error, Result};

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    fn base(event: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: event.to_string(),
            user_id: None,
            name: None,
            message_type: None,
            content: None,
            action: None,
            target_id: None,
            outcome: None,
            source: None,
            error: None,
        }
    }

    fn by(mut self, who: &Identity) -> Self {
        self.user_id = Some(who.id);
        self.name = Some(who.display_name().to_string());
        self
    }

    pub fn message(who: &Identity, message_type: &str, content: &str) -> Self {
        let mut ev = Self::base("message").by(who);
        ev.message_type = Some(message_type.to_string());
        ev.content = Some(content.to_string());
        ev
    }

    pub fn banned(who: &Identity, content: &str) -> Self {
        let mut ev = Self::base("banned").by(who);
        ev.content = Some(content.to_string());
        ev
    }

    pub fn spam(who: &Identity, verdict: &str) -> Self {
        let mut ev = Self::base("spam").by(who);
        ev.outcome = Some(verdict.to_string());
        ev
    }

    /// `actor` is `None` for the operator console.
    pub fn moderation(
        actor: Option<&Identity>,
        action: &str,
        target_id: i64,
        outcome: &str,
    ) -> Self {
        let mut ev = Self::base("moderation");
        if let Some(a) = actor {
            ev = ev.by(a);
        }
        ev.source = Some(if actor.is_some() { "chat" } else { "console" }.to_string());
        ev.action = Some(action.to_string());
        ev.target_id = Some(target_id);
        ev.outcome = Some(outcome.to_string());
        ev
    }

    pub fn console(line: &str) -> Self {
        let mut ev = Self::base("console");
        ev.content = Some(line.to_string());
        ev
    }

    pub fn error(who: Option<&Identity>, error: &str) -> Self {
        let mut ev = Self::base("error");
        if let Some(w) = who {
            ev = ev.by(w);
        }
        ev.error = Some(error.to_string());
        ev
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    dir: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(dir: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            dir: dir.into(),
            json,
        }
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("session-{}.log", day.format("%Y-%m-%d")))
    }

    pub fn today_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_text(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.today_path())?;

        if self.json {
            let line = serde_json::to_string(&event)?;
            writeln!(file, "{line}")?;
            return Ok(());
        }

        // Plain text format for readability.
        let value = serde_json::to_value(&event)?;
        let Some(obj) = value.as_object() else {
            return Err(Error::Validation(
                "audit event is not a JSON object".to_string(),
            ));
        };
        let mut out = String::from("\n");
        out.push_str(&"=".repeat(60));
        for (k, v) in obj {
            out.push('\n');
            out.push_str(k);
            out.push_str(": ");
            match v {
                serde_json::Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            }
        }
        out.push('\n');

        file.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Write and swallow failures; the audit trail never breaks a handler.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!("failed to write audit event: {e}");
        }
    }
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    fn tmp_dir(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let dir = PathBuf::from(format!("/tmp/{prefix}-{}-{ts}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
    }

    #[test]
    fn files_are_named_per_day() {
        let log = AuditLogger::new("/var/log/isb", false);
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            log.path_for(day),
            PathBuf::from("/var/log/isb/session-2024-03-09.log")
        );
    }

    #[test]
    fn json_lines_carry_moderation_fields() {
        let log = AuditLogger::new(tmp_dir("isb-audit-json"), true);
        log.write(AuditEvent::moderation(None, "ban", 99, "added"))
            .unwrap();

        let written = std::fs::read_to_string(log.today_path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(v["event"], "moderation");
        assert_eq!(v["source"], "console");
        assert_eq!(v["target_id"], 99);
        assert!(v.get("user_id").is_none());
    }

    #[test]
    fn plain_format_truncates_content() {
        let log = AuditLogger::new(tmp_dir("isb-audit-plain"), false);
        let who = Identity::new(1);
        log.write(AuditEvent::message(&who, "text", &"x".repeat(AUDIT_MAX_TEXT + 1)))
            .unwrap();

        let written = std::fs::read_to_string(log.today_path()).unwrap();
        assert!(written.contains("event: message"));
        assert!(written.contains("..."));
    }
}
