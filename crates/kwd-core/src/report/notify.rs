//! Outbound status notifications.
//!
//! Mail transport is not part of this crate: the default notifier drops each
//! message into an outbox directory (one RFC 822 style file per message) for
//! whatever relays mail on the host.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// One status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub cc: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Message text with headers, as written to the outbox.
    pub fn to_message(&self) -> String {
        let mut out = format!("To: {}\n", self.to);
        if !self.cc.is_empty() {
            out.push_str(&format!("Cc: {}\n", self.cc));
        }
        out.push_str(&format!("Subject: {}\n", self.subject));
        out.push_str("Auto-Submitted: auto-generated\n\n");
        out.push_str(&self.body);
        if !self.body.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Logs the notification instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        tracing::info!(to = %n.to, cc = %n.cc, subject = %n.subject, "status report:\n{}", n.body);
        Ok(())
    }
}

/// Writes each notification to its own file in a directory.
#[derive(Debug)]
pub struct OutboxNotifier {
    dir: PathBuf,
    seq: AtomicU64,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    /// Default outbox: `~/.local/state/kwd/outbox`.
    pub fn default_dir() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("kwd")?;
        Ok(xdg_dirs.get_state_home().join("kwd").join("outbox"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create outbox: {}", self.dir.display()))?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let pid = std::process::id();
        // Another process may share the outbox; never reuse an existing name.
        loop {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let path = self.dir.join(format!(
                "{}-{:09}-{pid}-{seq:04}.eml",
                now.as_secs(),
                now.subsec_nanos()
            ));
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("create notification: {}", path.display()))
                }
            };
            file.write_all(n.to_message().as_bytes())
                .await
                .with_context(|| format!("write notification: {}", path.display()))?;
            file.flush().await?;
            tracing::info!(path = %path.display(), subject = %n.subject, "queued status report");
            return Ok(());
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(n.clone());
        Ok(())
    }
}
