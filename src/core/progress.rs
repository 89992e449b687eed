use crate::domain::model::ProgressEvent;
use tokio::sync::mpsc::UnboundedSender;

/// Logs every progress event and forwards it to the listener, if one is attached.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A reporter that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::BatchFailed(_)
            | ProgressEvent::ArchiveFailed(_)
            | ProgressEvent::Failed(_) => tracing::warn!("{}", event),
            ProgressEvent::PageFetched { .. } => tracing::debug!("{}", event),
            _ => tracing::info!("{}", event),
        }

        if let Some(sender) = &self.sender {
            // A listener that went away does not stop the run.
            let _ = sender.send(event);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        self.emit(ProgressEvent::Message(text.into()));
    }
}
