//! Export queue integration tests: submission validation, the full
//! transform pipeline per format family, and resource release on removal.

use async_trait::async_trait;
use serde_json::json;
use shepherd_export::{
    ExportError, ExportFormat, ExportOptions, ExportQueue, ExportStatus, Orientation, PageSize,
    RenderSpec, WidgetDataSource, WidgetRenderer, WidgetSnapshot,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct DashboardSource {
    widgets: HashMap<String, WidgetSnapshot>,
}

impl DashboardSource {
    fn new() -> Arc<Self> {
        let mut widgets = HashMap::new();
        for (id, title) in [("usage", "Token usage"), ("agents", "Agent status")] {
            widgets.insert(
                id.to_string(),
                WidgetSnapshot {
                    id: id.to_string(),
                    title: title.to_string(),
                    columns: vec!["name".to_string(), "value".to_string()],
                    rows: vec![
                        vec![json!("alpha"), json!(42)],
                        vec![json!("beta"), json!(7)],
                    ],
                },
            );
        }
        Arc::new(Self { widgets })
    }
}

#[async_trait]
impl WidgetDataSource for DashboardSource {
    async fn snapshot(&self, widget_id: &str) -> shepherd_export::Result<WidgetSnapshot> {
        self.widgets
            .get(widget_id)
            .cloned()
            .ok_or_else(|| ExportError::WidgetData {
                widget_id: widget_id.to_string(),
                message: "unknown widget".to_string(),
            })
    }
}

struct RecordingRenderer;

#[async_trait]
impl WidgetRenderer for RecordingRenderer {
    async fn render(
        &self,
        widgets: &[WidgetSnapshot],
        spec: &RenderSpec,
    ) -> shepherd_export::Result<Vec<u8>> {
        Ok(format!(
            "{:?} {}x{} q{} widgets={}",
            spec.format,
            spec.width,
            spec.height,
            spec.quality,
            widgets.len()
        )
        .into_bytes())
    }
}

async fn wait_terminal(queue: &ExportQueue, job_id: &str) -> shepherd_export::ExportJob {
    for _ in 0..300 {
        if let Some(job) = queue.get(job_id).await {
            if job.status.is_terminal() {
                return job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached a terminal state", job_id);
}

#[tokio::test]
async fn test_empty_selection_is_rejected_before_job_creation() {
    let dir = tempfile::tempdir().unwrap();
    let queue = ExportQueue::new(DashboardSource::new(), dir.path());

    let result = queue
        .submit(ExportFormat::Json, vec![], ExportOptions::default())
        .await;
    assert!(matches!(result, Err(ExportError::EmptySelection)));
    assert_eq!(queue.count().await, 0);
}

#[tokio::test]
async fn test_every_tabular_format_completes() {
    let dir = tempfile::tempdir().unwrap();
    let queue = ExportQueue::new(DashboardSource::new(), dir.path());

    for format in [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Excel] {
        let id = queue
            .submit(
                format,
                vec!["usage".to_string(), "agents".to_string()],
                ExportOptions::default(),
            )
            .await
            .unwrap();

        let job = wait_terminal(&queue, &id).await;
        assert_eq!(job.status, ExportStatus::Completed, "{:?} failed", format);
        let download = job.download.unwrap();
        assert!(download.path.exists());
        assert!(download.size_bytes > 0);
    }
    assert_eq!(queue.count().await, 3);
}

#[tokio::test]
async fn test_rendered_export_receives_surface_spec() {
    let dir = tempfile::tempdir().unwrap();
    let queue = ExportQueue::new(DashboardSource::new(), dir.path())
        .with_renderer(Arc::new(RecordingRenderer));

    let id = queue
        .submit(
            ExportFormat::Pdf,
            vec!["usage".to_string()],
            ExportOptions {
                page_size: PageSize::Letter,
                orientation: Orientation::Landscape,
                quality: 60,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let job = wait_terminal(&queue, &id).await;
    assert_eq!(job.status, ExportStatus::Completed);

    let content = std::fs::read_to_string(&job.download.unwrap().path).unwrap();
    // Letter landscape: 1056x816, quality passed through.
    assert_eq!(content, "Pdf 1056x816 q60 widgets=1");
}

#[tokio::test]
async fn test_jobs_run_concurrently_and_independently() {
    let dir = tempfile::tempdir().unwrap();
    let queue = ExportQueue::new(DashboardSource::new(), dir.path());

    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(
            queue
                .submit(
                    ExportFormat::Json,
                    vec!["usage".to_string()],
                    ExportOptions::default(),
                )
                .await
                .unwrap(),
        );
    }
    // One poisoned job in the middle of the batch.
    let poisoned = queue
        .submit(
            ExportFormat::Json,
            vec!["does-not-exist".to_string()],
            ExportOptions::default(),
        )
        .await
        .unwrap();

    for id in &ids {
        assert_eq!(wait_terminal(&queue, id).await.status, ExportStatus::Completed);
    }
    assert_eq!(
        wait_terminal(&queue, &poisoned).await.status,
        ExportStatus::Error
    );
}

#[tokio::test]
async fn test_removal_releases_all_resources() {
    let dir = tempfile::tempdir().unwrap();
    let queue = ExportQueue::new(DashboardSource::new(), dir.path());

    let id = queue
        .submit(
            ExportFormat::Csv,
            vec!["usage".to_string()],
            ExportOptions {
                file_name: Some("report.csv".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    wait_terminal(&queue, &id).await;
    let artifact = dir.path().join("report.csv");
    assert!(artifact.exists());

    queue.remove(&id).await.unwrap();
    assert!(!artifact.exists());
    assert_eq!(queue.count().await, 0);
}
