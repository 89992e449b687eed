use crate::core::pipeline::DocumentPipeline;
use crate::core::progress::ProgressReporter;
use crate::domain::model::ProgressEvent;
use crate::domain::ports::ApiConnector;
use crate::utils::error::{DocumentorError, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub cancel: CancellationToken,
}

/// Caller side of a pipeline running on its own task. Requests go in on one channel,
/// progress events come back on the other. Runs execute one after another.
pub struct RunHandle {
    requests: mpsc::Sender<RunRequest>,
    events: mpsc::UnboundedReceiver<ProgressEvent>,
    worker: JoinHandle<()>,
}

impl RunHandle {
    pub async fn submit(&self, request: RunRequest) -> Result<()> {
        self.requests.send(request).await.map_err(|_| {
            DocumentorError::IoError(std::io::Error::other("pipeline worker has stopped"))
        })
    }

    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        self.events.recv().await
    }

    /// Collects events until the current run reports `Finished` or `Failed`.
    pub async fn wait_for_terminal<F: FnMut(&ProgressEvent)>(
        &mut self,
        mut on_event: F,
    ) -> Option<ProgressEvent> {
        while let Some(event) = self.next_event().await {
            on_event(&event);
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    /// Stops accepting requests and waits for the in-flight run to finish.
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.worker.await {
            tracing::error!("Pipeline worker ended abnormally: {}", e);
        }
    }
}

pub fn spawn_service<C>(pipeline: DocumentPipeline<C>) -> RunHandle
where
    C: ApiConnector + 'static,
    C::Api: 'static,
{
    let (request_tx, mut request_rx) = mpsc::channel::<RunRequest>(1);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let pipeline = pipeline.with_progress(ProgressReporter::new(event_tx));

    let worker = tokio::spawn(async move {
        while let Some(request) = request_rx.recv().await {
            if let Err(e) = pipeline.run(&request.cancel).await {
                tracing::error!("Run aborted: {}", e);
            }
        }
        tracing::debug!("Pipeline worker exiting");
    });

    RunHandle {
        requests: request_tx,
        events: event_rx,
        worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::PlentyConnector;
    use crate::config::ConfigStore;
    use crate::core::pipeline::DownloadLayout;
    use crate::domain::model::StageKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_unreadable_config_ends_with_failed_event() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = DocumentPipeline::new(
            PlentyConnector,
            ConfigStore::new(temp_dir.path().join("missing.txt")),
            DownloadLayout::under(temp_dir.path().join("Download")),
        );

        let mut handle = spawn_service(pipeline);
        handle.submit(RunRequest::default()).await.unwrap();

        let mut seen = Vec::new();
        let terminal = handle
            .wait_for_terminal(|event| seen.push(event.to_string()))
            .await
            .unwrap();

        assert!(matches!(terminal, ProgressEvent::Failed(_)));
        assert_eq!(seen[0], ProgressEvent::StageStarted(StageKind::LoadConfig).to_string());
        handle.shutdown().await;
    }
}
