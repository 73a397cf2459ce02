// Operator notifications: a daily log file plus an optional chat channel.
//
// Delivery is best effort. `Notifier::notify` never fails; sink errors go to
// tracing, and chat failures are also written to the day's log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use serde_json::json;

use crate::config::NotifyConfig;
use crate::error::NotifyError;

const DISCORD_API: &str = "https://discord.com/api/v10";

/// A chat destination for notification lines.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Channel identifier, for error context.
    fn channel(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Posts messages to a Discord channel through the bot REST API.
pub struct DiscordChannel {
    http: reqwest::Client,
    token: String,
    channel_id: String,
}

impl DiscordChannel {
    pub fn new(token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl ChatSink for DiscordChannel {
    fn channel(&self) -> &str {
        &self.channel_id
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{DISCORD_API}/channels/{}/messages", self.channel_id);
        self.http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(&json!({ "content": text }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| NotifyError::Chat {
                channel: self.channel_id.clone(),
                source,
            })?;
        Ok(())
    }
}

/// Appends lines to `<dir>/<YYYY-MM-DD>.log`, switching files when the date changes.
pub struct LogFile {
    dir: PathBuf,
    current: Mutex<Option<(NaiveDate, File)>>,
}

impl LogFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for a given day.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.log", date.format("%Y-%m-%d")))
    }

    /// Write one already-formatted line stamped at `now`.
    pub fn append(&self, now: DateTime<Local>, line: &str) -> Result<(), NotifyError> {
        let today = now.date_naive();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());

        let stale = !matches!(current.as_ref(), Some((date, _)) if *date == today);
        if stale {
            std::fs::create_dir_all(&self.dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path_for(today))?;
            *current = Some((today, file));
        }

        if let Some((_, file)) = current.as_mut() {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}

/// Fans a message out to the log file and, when configured, the chat channel.
pub struct Notifier {
    log: LogFile,
    chat: Option<Box<dyn ChatSink>>,
}

impl Notifier {
    pub fn new(log: LogFile, chat: Option<Box<dyn ChatSink>>) -> Self {
        Self { log, chat }
    }

    pub fn from_config(config: &NotifyConfig) -> Self {
        let chat = config.discord.as_ref().map(|d| {
            Box::new(DiscordChannel::new(&d.token, &d.channel_id)) as Box<dyn ChatSink>
        });
        Self::new(LogFile::new(&config.log_dir), chat)
    }

    /// Deliver a message everywhere. Failures are logged, never returned.
    pub async fn notify(&self, message: &str) {
        let now = Local::now();
        let line = format_line(now, message);
        tracing::info!("{message}");

        if let Err(e) = self.log.append(now, &line) {
            tracing::warn!(dir = %self.log.dir().display(), "Failed to write log file: {e}");
        }

        if let Some(chat) = &self.chat {
            if let Err(e) = chat.send(&line).await {
                tracing::warn!(channel = chat.channel(), "Failed to send notification: {e}");
                let failure = format!("Error sending message to channel {}: {e}", chat.channel());
                if let Err(e) = self.log.append(now, &format_line(now, &failure)) {
                    tracing::warn!(dir = %self.log.dir().display(), "Failed to write log file: {e}");
                }
            }
        }
    }
}

/// `[HH:MM:SS] message`
pub fn format_line(now: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", now.format("%H:%M:%S"))
}
