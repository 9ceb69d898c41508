//! The `upload` command: submit files, wait for the queue, report.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use chunkwise_client::{Client, ClientOptions};
use chunkwise_queue::{
    UploadCallbacks, UploadCoordinator, UploadEndpoint, UploadFile, UploadItemView,
    UploadProgress, UploadStatus,
};
use chunkwise_transfer::{SpeedCalculator, format_size};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::endpoint_adapter::HttpEndpoint;

/// Final state of one CLI run.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub items: Vec<UploadItemView>,
    /// Human-readable reasons for files refused at admission.
    pub rejected: Vec<String>,
}

impl Summary {
    /// `true` when nothing was rejected and every item completed.
    pub fn succeeded(&self) -> bool {
        self.rejected.is_empty()
            && self
                .items
                .iter()
                .all(|item| item.status == UploadStatus::Completed)
    }

    pub fn print_text(&self) {
        for item in &self.items {
            match item.status {
                UploadStatus::Completed => println!(
                    "completed  {}  {}  {}",
                    item.file_name,
                    format_size(item.file_size),
                    item.remote_url.as_deref().unwrap_or_default()
                ),
                status => println!(
                    "{:<10} {}  {}",
                    format!("{status:?}").to_lowercase(),
                    item.file_name,
                    item.error.as_deref().unwrap_or_default()
                ),
            }
        }
        for reason in &self.rejected {
            println!("rejected   {reason}");
        }
    }
}

/// Uploads `files` to the configured endpoint.
pub async fn run(config: &CliConfig, files: Vec<UploadFile>) -> anyhow::Result<Summary> {
    let url = config
        .endpoint
        .as_deref()
        .context("no endpoint configured; pass --endpoint or set \"endpoint\" in the config file")?;
    let client = Client::new(
        url,
        ClientOptions {
            bearer_token: config.token.clone(),
            timeout: config.timeout(),
        },
    )?;
    info!(endpoint = %client.upload_url(), files = files.len(), "uploading");

    upload_with(config, Arc::new(HttpEndpoint::new(client)), files).await
}

/// Runs the coordinator against `endpoint`, retrying failed items up to
/// `config.retries` times.
pub async fn upload_with(
    config: &CliConfig,
    endpoint: Arc<dyn UploadEndpoint>,
    files: Vec<UploadFile>,
) -> anyhow::Result<Summary> {
    let reporter = Arc::new(ProgressReporter::default());
    let coordinator =
        UploadCoordinator::new(config.uploader.clone(), endpoint, reporter.callbacks());

    let report = coordinator.submit(files);
    coordinator.wait_idle().await;

    for attempt in 1..=config.retries {
        let failed: Vec<String> = coordinator
            .items()
            .into_iter()
            .filter(|item| item.status == UploadStatus::Error)
            .map(|item| item.id)
            .collect();
        if failed.is_empty() {
            break;
        }
        info!(attempt, items = failed.len(), "retrying failed uploads");
        for id in &failed {
            coordinator.retry(id)?;
        }
        coordinator.wait_idle().await;
    }

    Ok(Summary {
        items: coordinator.items(),
        rejected: report.rejected.iter().map(ToString::to_string).collect(),
    })
}

/// Logs progress with a transfer rate and ETA for the active item.
#[derive(Default)]
struct ProgressReporter {
    state: Mutex<RateState>,
}

#[derive(Default)]
struct RateState {
    /// Item the samples belong to.
    current: Option<String>,
    speed: SpeedCalculator,
}

impl ProgressReporter {
    fn callbacks(self: &Arc<Self>) -> UploadCallbacks {
        let reporter = Arc::clone(self);
        UploadCallbacks::new()
            .on_progress(move |id, progress| reporter.observe(id, progress))
            .on_upload_complete(|uploads| {
                for upload in uploads {
                    info!(file = %upload.file.name(), url = %upload.url, "uploaded");
                }
            })
            .on_error(|message, file| match file {
                Some(file) => warn!(file = %file.name(), error = %message, "upload error"),
                None => warn!(error = %message, "upload error"),
            })
    }

    fn observe(&self, id: &str, progress: &UploadProgress) {
        let (rate, eta) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.current.as_deref() != Some(id) {
                state.current = Some(id.to_string());
                state.speed.reset();
            }
            state.speed.record(progress.bytes_sent);
            (
                state.speed.bytes_per_second() as u64,
                state.speed.eta(progress.remaining()),
            )
        };

        info!(
            id = %id,
            percent = progress.percent,
            sent = %format_size(progress.bytes_sent),
            total = %format_size(progress.total_bytes),
            rate = %format!("{}/s", format_size(rate)),
            eta_secs = eta.map(|d| d.as_secs()),
            "progress"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &mockito::ServerGuard) -> CliConfig {
        let mut config = CliConfig {
            endpoint: Some(format!("{}/upload", server.url())),
            ..CliConfig::default()
        };
        config.uploader.chunk_size_bytes = 4;
        config
    }

    #[tokio::test]
    async fn uploads_every_file_over_http() {
        let mut server = mockito::Server::new_async().await;
        let chunks = server
            .mock("POST", "/upload")
            .with_status(200)
            .expect(3)
            .create_async()
            .await;
        let finalize = server
            .mock("POST", "/upload/finalize")
            .with_status(200)
            .with_body(r#"{"url":"https://cdn.example/file"}"#)
            .expect(2)
            .create_async()
            .await;

        let files = vec![
            UploadFile::from_name("a.txt", "12345678"),
            UploadFile::from_name("b.txt", "xyz"),
        ];
        let summary = run(&config_for(&server), files).await.unwrap();

        assert!(summary.succeeded());
        assert_eq!(summary.items.len(), 2);
        assert!(
            summary
                .items
                .iter()
                .all(|item| item.remote_url.as_deref() == Some("https://cdn.example/file"))
        );
        chunks.assert_async().await;
        finalize.assert_async().await;
    }

    #[tokio::test]
    async fn failures_are_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let chunks = server
            .mock("POST", "/upload")
            .with_status(500)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let mut config = config_for(&server);
        config.retries = 1;
        let summary = run(&config, vec![UploadFile::from_name("a.txt", "abc")])
            .await
            .unwrap();

        assert!(!summary.succeeded());
        let item = &summary.items[0];
        assert_eq!(item.status, UploadStatus::Error);
        assert_eq!(
            item.error.as_deref(),
            Some("upload endpoint returned 500: unavailable")
        );
        chunks.assert_async().await;
    }

    #[tokio::test]
    async fn rejections_fail_the_run() {
        let mut server = mockito::Server::new_async().await;
        let _chunks = server.mock("POST", "/upload").create_async().await;
        let _finalize = server
            .mock("POST", "/upload/finalize")
            .with_body(r#"{"url":"https://cdn.example/file"}"#)
            .create_async()
            .await;

        let mut config = config_for(&server);
        config.uploader.max_size_bytes = 4;
        let summary = run(
            &config,
            vec![
                UploadFile::from_name("ok.txt", "abc"),
                UploadFile::from_name("big.txt", "abcdef"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.rejected.len(), 1);
        assert!(summary.rejected[0].contains("big.txt"));
        assert!(!summary.succeeded());
    }

    #[tokio::test]
    async fn missing_endpoint_is_an_error() {
        let err = run(&CliConfig::default(), Vec::new()).await.unwrap_err();
        assert!(err.to_string().contains("no endpoint configured"));
    }

    #[test]
    fn reporter_keeps_working_after_lock_poisoning() {
        let reporter = Arc::new(ProgressReporter::default());
        let poisoner = Arc::clone(&reporter);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("reporter poisoned");
        })
        .join();
        assert!(reporter.state.is_poisoned());

        reporter.observe("item-1", &UploadProgress::new(4, 8));
        let state = reporter.state.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(state.current.as_deref(), Some("item-1"));
    }

    #[test]
    fn summary_json_shape() {
        let summary = Summary {
            items: Vec::new(),
            rejected: vec!["uploads are disabled, 1 not added".into()],
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["rejected"][0], "uploads are disabled, 1 not added");
        assert!(json["items"].as_array().unwrap().is_empty());
    }
}
