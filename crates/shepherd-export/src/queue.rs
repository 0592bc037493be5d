//! Export job queue.
//!
//! One tokio task per job; jobs are independent and a failure in one never
//! touches another. Tabular encoding happens on a blocking worker so the
//! caller's thread stays responsive; every job is bounded by the worker
//! timeout. Removing a job aborts its task and releases its artifact.

use crate::encode;
use crate::error::{ExportError, Result};
use crate::job::{DownloadHandle, ExportFormat, ExportJob, ExportOptions, ExportStatus};
use crate::render::{RenderSpec, WidgetRenderer};
use crate::widget::{WidgetDataSource, WidgetSnapshot};
use chrono::Utc;
use shepherd_core::config::ExportConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Queue of export jobs. Exclusive owner of all job records.
pub struct ExportQueue {
    /// Job records by id.
    jobs: Arc<RwLock<HashMap<String, ExportJob>>>,

    /// Running task handles, for cancellation on remove.
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,

    /// Snapshot source for widget data.
    data_source: Arc<dyn WidgetDataSource>,

    /// Renderer for image formats; jobs for those formats fail without one.
    renderer: Option<Arc<dyn WidgetRenderer>>,

    /// Directory finished artifacts are written into.
    output_dir: PathBuf,

    /// Per-job bound on processing time.
    worker_timeout: Duration,
}

impl ExportQueue {
    /// Create a queue writing artifacts into `output_dir`, with the default
    /// 30s worker timeout.
    pub fn new(data_source: Arc<dyn WidgetDataSource>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tasks: Mutex::new(HashMap::new()),
            data_source,
            renderer: None,
            output_dir: output_dir.into(),
            worker_timeout: Duration::from_secs(30),
        }
    }

    /// Create a queue from the export section of the console config.
    pub fn from_config(
        data_source: Arc<dyn WidgetDataSource>,
        config: &ExportConfig,
    ) -> Result<Self> {
        let output_dir = match &config.output_dir {
            Some(dir) => dir.clone(),
            None => shepherd_core::paths::exports_dir()
                .map_err(|e| ExportError::Config(e.to_string()))?,
        };
        Ok(Self::new(data_source, output_dir)
            .with_timeout(Duration::from_secs(config.worker_timeout_secs)))
    }

    /// Attach a renderer for png/pdf/svg jobs.
    pub fn with_renderer(mut self, renderer: Arc<dyn WidgetRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Override the per-job worker timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.worker_timeout = timeout;
        self
    }

    /// Submit an export job. An empty selection is rejected synchronously
    /// and no job is created. Returns the new job id.
    pub async fn submit(
        &self,
        format: ExportFormat,
        widget_ids: Vec<String>,
        mut options: ExportOptions,
    ) -> Result<String> {
        if widget_ids.is_empty() {
            return Err(ExportError::EmptySelection);
        }

        let id = Uuid::new_v4().to_string();
        options.selected_widget_ids = widget_ids;

        let file_name = options.file_name.clone().unwrap_or_else(|| {
            format!(
                "export-{}-{}.{}",
                Utc::now().format("%Y%m%d-%H%M%S"),
                &id[..8],
                format.extension()
            )
        });

        let job = ExportJob {
            id: id.clone(),
            format,
            status: ExportStatus::Pending,
            progress: 0,
            start_time: Utc::now(),
            end_time: None,
            error: None,
            download: None,
            file_name: file_name.clone(),
            options: options.clone(),
        };

        self.jobs.write().await.insert(id.clone(), job);
        info!("Export job {} submitted ({:?})", id, format);

        let worker = JobWorker {
            jobs: Arc::clone(&self.jobs),
            data_source: Arc::clone(&self.data_source),
            renderer: self.renderer.clone(),
            output_path: self.output_dir.join(&file_name),
            format,
            options,
            timeout: self.worker_timeout,
        };
        let job_id = id.clone();
        let handle = tokio::spawn(async move { worker.run(job_id).await });
        self.tasks.lock().await.insert(id.clone(), handle);

        Ok(id)
    }

    /// Get a job by id.
    pub async fn get(&self, job_id: &str) -> Option<ExportJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// All jobs. Ordering is a view concern.
    pub async fn list(&self) -> Vec<ExportJob> {
        self.jobs.read().await.values().cloned().collect()
    }

    /// Number of jobs, terminal or not.
    pub async fn count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Delete a job: aborts its task if still running and releases the
    /// held artifact.
    pub async fn remove(&self, job_id: &str) -> Result<()> {
        let job = self
            .jobs
            .write()
            .await
            .remove(job_id)
            .ok_or_else(|| ExportError::UnknownJob(job_id.to_string()))?;

        if let Some(handle) = self.tasks.lock().await.remove(job_id) {
            handle.abort();
        }

        // Release the artifact whether the job completed or was cut short
        // mid-write; a missing file is fine.
        let artifact = self.output_dir.join(&job.file_name);
        if tokio::fs::remove_file(&artifact).await.is_ok() {
            debug!("Removed export artifact {}", artifact.display());
        }

        Ok(())
    }
}

/// Everything one job's task needs, detached from the queue so job tasks
/// never hold queue locks across processing.
struct JobWorker {
    jobs: Arc<RwLock<HashMap<String, ExportJob>>>,
    data_source: Arc<dyn WidgetDataSource>,
    renderer: Option<Arc<dyn WidgetRenderer>>,
    output_path: PathBuf,
    format: ExportFormat,
    options: ExportOptions,
    timeout: Duration,
}

impl JobWorker {
    async fn run(&self, job_id: String) {
        self.update(&job_id, |job| {
            job.status = ExportStatus::Processing;
            job.progress = 10;
        })
        .await;

        let seconds = self.timeout.as_secs();
        let outcome = match tokio::time::timeout(self.timeout, self.process(&job_id)).await {
            Ok(result) => result,
            Err(_) => Err(ExportError::Timeout { seconds }),
        };

        match outcome {
            Ok(download) => {
                self.update(&job_id, |job| {
                    job.status = ExportStatus::Completed;
                    job.progress = 100;
                    job.download = Some(download.clone());
                    job.end_time = Some(Utc::now());
                })
                .await;
                info!("Export job {} completed", job_id);
            }
            Err(e) => {
                warn!("Export job {} failed: {}", job_id, e);
                self.update(&job_id, |job| {
                    job.status = ExportStatus::Error;
                    job.error = Some(e.to_string());
                    job.progress = 0;
                    job.end_time = Some(Utc::now());
                })
                .await;
            }
        }
    }

    async fn process(&self, job_id: &str) -> Result<DownloadHandle> {
        // Snapshot the selected widgets
        let mut widgets = Vec::with_capacity(self.options.selected_widget_ids.len());
        for widget_id in &self.options.selected_widget_ids {
            widgets.push(self.data_source.snapshot(widget_id).await?);
        }
        self.update(job_id, |job| job.progress = 30).await;

        // Transform
        let bytes = if self.format.is_tabular() {
            self.encode_on_worker(widgets).await?
        } else {
            let renderer = self
                .renderer
                .as_ref()
                .ok_or_else(|| ExportError::Render("no widget renderer configured".to_string()))?;
            let spec = RenderSpec::from_options(self.format, &self.options);
            renderer.render(&widgets, &spec).await?
        };
        self.update(job_id, |job| job.progress = 80).await;

        // Write the artifact
        if let Some(parent) = self.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.output_path, &bytes).await?;

        Ok(DownloadHandle {
            path: self.output_path.clone(),
            size_bytes: bytes.len() as u64,
        })
    }

    /// Serialize large datasets off the async threads. If the job is
    /// aborted mid-encode the blocking call finishes and its result is
    /// discarded.
    async fn encode_on_worker(&self, widgets: Vec<WidgetSnapshot>) -> Result<Vec<u8>> {
        let format = self.format;
        tokio::task::spawn_blocking(move || encode::encode(format, &widgets))
            .await
            .map_err(|e| ExportError::Encode(e.to_string()))?
    }

    async fn update(&self, job_id: &str, mutate: impl FnOnce(&mut ExportJob)) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            mutate(job);
        }
    }
}
