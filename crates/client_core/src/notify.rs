use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeContext {
    Browse,
    Load,
    Review,
    Commit,
    Upload,
    CreateFolder,
}

impl NoticeContext {
    fn as_str(self) -> &'static str {
        match self {
            NoticeContext::Browse => "browse",
            NoticeContext::Load => "load",
            NoticeContext::Review => "review",
            NoticeContext::Commit => "commit",
            NoticeContext::Upload => "upload",
            NoticeContext::CreateFolder => "create_folder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NoticeLevel,
    pub context: NoticeContext,
    pub message: String,
}

/// Fan-out of notifications to whatever front-end is listening.
///
/// Publishing never fails: with no subscribers the notification is only
/// logged.
#[derive(Clone)]
pub struct Notifier {
    events: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self { events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    pub fn success(&self, context: NoticeContext, message: impl Into<String>) {
        let message = message.into();
        info!(context = context.as_str(), "{message}");
        self.publish(NoticeLevel::Success, context, message);
    }

    pub fn info(&self, context: NoticeContext, message: impl Into<String>) {
        let message = message.into();
        info!(context = context.as_str(), "{message}");
        self.publish(NoticeLevel::Info, context, message);
    }

    pub fn error(&self, context: NoticeContext, error: &ClientError) {
        if error.is_soft() {
            info!(context = context.as_str(), "{error}");
        } else {
            warn!(context = context.as_str(), error = ?error, "{error}");
        }
        self.publish(NoticeLevel::Error, context, error.to_string());
    }

    fn publish(&self, level: NoticeLevel, context: NoticeContext, message: String) {
        let _ = self.events.send(Notification {
            level,
            context,
            message,
        });
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
