//! Generation task manager.
//!
//! Submits image/video jobs upstream, answers status polls and finalizes
//! finished jobs into durable storage. A task leaves `Pending` exactly once:
//! every terminal write is a compare-and-set on the stored status, and the
//! loser of a race re-reads the task instead of repeating side effects.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use dashmap::DashMap;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, info_span, warn};

use aichat_types::config::AppConfig;
use aichat_types::error::{MediaError, RepositoryError, StorageError};
use aichat_types::generation::{
    GenerationRequest, GenerationTask, ImageRequest, ImageSize, KindFilter, TaskKind, TaskResult,
    TaskStatus, TaskView, VideoRequest, WorkItem, WorkPage, WorkQuery,
};
use aichat_types::llm::{CONNECTION_ERROR_CODE, UNKNOWN_ERROR_CODE, UpstreamCallError};

use crate::generation::private_host::is_private_url;
use crate::generation::repository::TaskRepository;
use crate::llm::client::{CompletionClient, ResourceFetcher};
use crate::llm::translate::translate;
use crate::storage::media::MediaProcessor;
use crate::storage::object_store::StorageDriver;

pub const TASK_NOT_FOUND_MESSAGE: &str = "任务不存在";
pub const WATERMARK_PENDING_MESSAGE: &str = "水印正在生成中";
pub const WATERMARK_FAILED_MESSAGE: &str = "水印添加失败";

/// Errors surfaced by the generation task manager.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    Validation(String),

    #[error("generation task not found")]
    NotFound,

    /// The task is in the video post-processing sub-state.
    #[error("watermark step in progress")]
    Conflict,

    #[error("upstream rejected the request with code '{code}'")]
    Upstream { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream response is missing {0}")]
    MissingResult(String),

    #[error(transparent)]
    ExternalTool(#[from] MediaError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GenerationError {
    /// The message shown to callers. Never a raw provider code.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Validation(message) => message.clone(),
            GenerationError::NotFound => TASK_NOT_FOUND_MESSAGE.to_string(),
            GenerationError::Conflict => WATERMARK_PENDING_MESSAGE.to_string(),
            GenerationError::Upstream { message, .. } => message.clone(),
            GenerationError::Transport(_) => translate(CONNECTION_ERROR_CODE).to_string(),
            GenerationError::ExternalTool(_) => WATERMARK_FAILED_MESSAGE.to_string(),
            GenerationError::MissingResult(_)
            | GenerationError::Repository(_)
            | GenerationError::Storage(_) => translate(UNKNOWN_ERROR_CODE).to_string(),
        }
    }

    /// Untranslated cause kept in failed task records.
    fn raw(&self) -> Value {
        match self {
            GenerationError::ExternalTool(MediaError::ExternalTool { stderr, .. }) => {
                Value::String(stderr.clone())
            }
            other => Value::String(other.to_string()),
        }
    }
}

impl From<UpstreamCallError> for GenerationError {
    fn from(e: UpstreamCallError) -> Self {
        match e {
            UpstreamCallError::Transport(reason) => GenerationError::Transport(reason),
            other => {
                let code = other.code().to_string();
                GenerationError::Upstream {
                    message: translate(&code).to_string(),
                    code,
                }
            }
        }
    }
}

/// Storage layout and limits used by the task manager.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub image_prefix: String,
    pub video_prefix: String,
    pub image_public_base: String,
    pub video_public_base: String,
    /// Object key substituted for images that could not be persisted.
    pub placeholder_image: String,
    pub default_acl: String,
    pub temp_dir: PathBuf,
    pub inline_timeout: Duration,
    pub works_page_size: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_prefix: config.storage.image_prefix.trim_end_matches('/').to_string(),
            video_prefix: config.storage.video_prefix.trim_end_matches('/').to_string(),
            image_public_base: config.storage.image_public_base.clone(),
            video_public_base: config.storage.video_public_base.clone(),
            placeholder_image: config.storage.placeholder_image.clone(),
            default_acl: config.storage.default_acl.clone(),
            temp_dir: PathBuf::from(&config.storage.temp_dir),
            inline_timeout: Duration::from_secs(config.upstream.inline_fetch_timeout_secs),
            works_page_size: config.works_page_size.max(1),
        }
    }
}

/// Upstream model name for an image tier.
fn image_model(tier: u8) -> Result<&'static str, GenerationError> {
    match tier {
        1 => Ok("wanx2.1-t2i-turbo"),
        2 => Ok("wanx2.1-t2i-plus"),
        other => Err(GenerationError::Validation(format!(
            "unknown image model tier: {other}"
        ))),
    }
}

/// Build the upstream payload and the stored params for an image request.
fn image_submission(request: &ImageRequest) -> Result<(Value, Value), GenerationError> {
    let model = image_model(request.model)?;
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationError::Validation("prompt must not be empty".into()));
    }
    let size = ImageSize::parse(&request.size).map_err(GenerationError::Validation)?;
    if !(1..=4).contains(&request.n) {
        return Err(GenerationError::Validation(
            "image count must be within 1-4".into(),
        ));
    }

    let payload = json!({
        "model": model,
        "input": { "prompt": prompt },
        "parameters": {
            "size": size.upstream_value(),
            "n": request.n,
            "watermark": request.watermark,
        },
    });
    let params = json!({
        "model": request.model,
        "prompt": prompt,
        "size": [size.width, size.height],
        "n": request.n,
        "watermark": request.watermark,
    });
    Ok((payload, params))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// View of a task that no longer needs the upstream, if any.
fn settled_view(task: &GenerationTask) -> Result<Option<TaskView>, GenerationError> {
    match (task.status, &task.result) {
        (TaskStatus::Pending, _) => Ok(None),
        (TaskStatus::PostProcessing, _) => Err(GenerationError::Conflict),
        (TaskStatus::Succeeded, Some(TaskResult::Urls(urls))) => Ok(Some(TaskView::Succeeded {
            results: urls.clone(),
        })),
        (TaskStatus::Succeeded, _) => Ok(Some(TaskView::Succeeded {
            results: Vec::new(),
        })),
        (TaskStatus::Failed, Some(TaskResult::Failure(failure))) => Ok(Some(TaskView::Failed {
            message: failure.error.clone(),
        })),
        (TaskStatus::Failed, _) => Ok(Some(TaskView::Failed {
            message: translate(UNKNOWN_ERROR_CODE).to_string(),
        })),
    }
}

async fn remove_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove temporary file");
        }
    }
}

/// Creates, polls and finalizes generation tasks.
pub struct GenerationService<T, U, F, S, M>
where
    T: TaskRepository,
    U: CompletionClient,
    F: ResourceFetcher,
    S: StorageDriver,
    M: MediaProcessor,
{
    tasks: T,
    client: U,
    fetcher: F,
    storage: S,
    media: M,
    settings: GenerationSettings,
    /// Serializes image finalization per task id.
    image_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<T, U, F, S, M> GenerationService<T, U, F, S, M>
where
    T: TaskRepository,
    U: CompletionClient,
    F: ResourceFetcher,
    S: StorageDriver,
    M: MediaProcessor,
{
    pub fn new(
        tasks: T,
        client: U,
        fetcher: F,
        storage: S,
        media: M,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            tasks,
            client,
            fetcher,
            storage,
            media,
            settings,
            image_locks: DashMap::new(),
        }
    }

    /// Access the task repository.
    pub fn tasks(&self) -> &T {
        &self.tasks
    }

    /// Validate `request`, submit it upstream and record a pending task.
    ///
    /// Returns the upstream task id.
    pub async fn submit(
        &self,
        owner_id: &str,
        request: GenerationRequest,
    ) -> Result<String, GenerationError> {
        let kind = request.kind();
        let (payload, params) = match &request {
            GenerationRequest::Image(image) => image_submission(image)?,
            GenerationRequest::Video(video) => self.video_submission(video).await?,
        };

        let task_id = self
            .client
            .submit_generation(kind, &payload)
            .await
            .map_err(|e| {
                warn!(owner = %owner_id, %kind, error = %e, "generation submission rejected");
                GenerationError::from(e)
            })?;

        self.tasks
            .create(&GenerationTask::pending(&task_id, owner_id, kind, params))
            .await?;

        info!(task_id = %task_id, owner = %owner_id, %kind, "generation task submitted");
        Ok(task_id)
    }

    async fn video_submission(
        &self,
        request: &VideoRequest,
    ) -> Result<(Value, Value), GenerationError> {
        let prompt = non_empty(request.prompt.as_deref());
        let img_url = non_empty(request.img_url.as_deref());

        let model = match request.to {
            1 if img_url.is_none() => {
                return Err(GenerationError::Validation(
                    "an image url is required to animate an image".into(),
                ));
            }
            1 => "wanx2.1-i2v-plus",
            2 if prompt.is_none() => {
                return Err(GenerationError::Validation("prompt must not be empty".into()));
            }
            2 => "wanx2.1-t2v-turbo",
            other => {
                return Err(GenerationError::Validation(format!(
                    "unknown video variant: {other}"
                )));
            }
        };

        let mut input = Map::new();
        if let Some(prompt) = prompt {
            input.insert("prompt".into(), Value::String(prompt.to_string()));
        }
        if let Some(url) = img_url {
            let upstream_url = if is_private_url(url) {
                self.inline_image(url).await?
            } else {
                url.to_string()
            };
            input.insert("img_url".into(), Value::String(upstream_url));
        }

        let payload = json!({ "model": model, "input": input });
        let params = json!({ "to": request.to, "prompt": prompt, "img_url": img_url });
        Ok((payload, params))
    }

    /// Fetch an image the upstream cannot reach and encode it as a data URL.
    async fn inline_image(&self, url: &str) -> Result<String, GenerationError> {
        let resource = self
            .fetcher
            .fetch(url, Some(self.settings.inline_timeout))
            .await?;
        debug!(url, bytes = resource.bytes.len(), mime = %resource.mime, "inlined private image");
        Ok(format!(
            "data:{};base64,{}",
            resource.mime,
            BASE64.encode(&resource.bytes)
        ))
    }

    /// Load an owned task of the given kind; other owners and kinds read as missing.
    async fn load(
        &self,
        owner_id: &str,
        kind: TaskKind,
        task_id: &str,
    ) -> Result<GenerationTask, GenerationError> {
        self.tasks
            .find(task_id, owner_id)
            .await?
            .filter(|task| task.kind == kind)
            .ok_or(GenerationError::NotFound)
    }

    /// Report a task's status, polling and finalizing it when still pending.
    pub async fn get_status(
        &self,
        owner_id: &str,
        kind: TaskKind,
        task_id: &str,
    ) -> Result<TaskView, GenerationError> {
        let span = info_span!("generation_status", task_id = %task_id, owner = %owner_id, ?kind);
        self.poll_and_settle(owner_id, kind, task_id)
            .instrument(span)
            .await
    }

    async fn poll_and_settle(
        &self,
        owner_id: &str,
        kind: TaskKind,
        task_id: &str,
    ) -> Result<TaskView, GenerationError> {
        let task = self.load(owner_id, kind, task_id).await?;
        if let Some(view) = settled_view(&task)? {
            return Ok(view);
        }

        let document = match self.client.poll_task(task_id).await {
            Ok(document) => document,
            Err(e) => {
                let raw = e.raw();
                let err = GenerationError::from(e);
                return self.fail(&task, TaskStatus::Pending, err.user_message(), raw).await;
            }
        };

        let output = document.get("output").cloned().unwrap_or(Value::Null);
        let upstream_status = output
            .get("task_status")
            .and_then(Value::as_str)
            .unwrap_or_default();
        debug!(upstream_status, "polled upstream task");

        match upstream_status {
            "SUCCEEDED" => match task.kind {
                TaskKind::Image => self.finalize_image(&task, &output).await,
                TaskKind::Video => self.finalize_video(&task, &output).await,
            },
            "FAILED" => {
                let message = match non_empty(output.get("code").and_then(Value::as_str)) {
                    Some(code) => translate(code).to_string(),
                    None => non_empty(output.get("message").and_then(Value::as_str))
                        .map(str::to_string)
                        .unwrap_or_else(|| translate(UNKNOWN_ERROR_CODE).to_string()),
                };
                self.fail(&task, TaskStatus::Pending, message, output).await
            }
            "RUNNING" | "PENDING" | "SUSPENDED" => Ok(TaskView::Pending {
                task_id: task.task_id.clone(),
            }),
            "UNKNOWN" => {
                self.fail(&task, TaskStatus::Pending, TASK_NOT_FOUND_MESSAGE.to_string(), output)
                    .await
            }
            other => Err(GenerationError::MissingResult(format!(
                "a known task status (got '{other}')"
            ))),
        }
    }

    /// Mark a task failed from `from`, or report whoever settled it first.
    async fn fail(
        &self,
        task: &GenerationTask,
        from: TaskStatus,
        message: String,
        raw: Value,
    ) -> Result<TaskView, GenerationError> {
        let result = TaskResult::failure(&message, Some(raw));
        if self
            .tasks
            .transition(&task.task_id, from, TaskStatus::Failed, Some(&result))
            .await?
        {
            warn!(task_id = %task.task_id, %message, "generation task failed");
            Ok(TaskView::Failed { message })
        } else {
            self.reread(task).await
        }
    }

    async fn reread(&self, task: &GenerationTask) -> Result<TaskView, GenerationError> {
        let current = self.load(&task.owner_id, task.kind, &task.task_id).await?;
        Ok(settled_view(&current)?.unwrap_or(TaskView::Pending {
            task_id: current.task_id,
        }))
    }

    async fn finalize_image(
        &self,
        task: &GenerationTask,
        output: &Value,
    ) -> Result<TaskView, GenerationError> {
        let lock = self
            .image_locks
            .entry(task.task_id.clone())
            .or_default()
            .value()
            .clone();
        let guard = lock.lock().await;
        let view = self.finalize_image_locked(task, output).await;
        drop(guard);

        if view.is_ok() {
            self.image_locks.remove(&task.task_id);
        }
        view
    }

    async fn finalize_image_locked(
        &self,
        task: &GenerationTask,
        output: &Value,
    ) -> Result<TaskView, GenerationError> {
        // Another poll may have finalized while this one waited for the lock.
        let current = self.load(&task.owner_id, task.kind, &task.task_id).await?;
        if let Some(view) = settled_view(&current)? {
            return Ok(view);
        }

        let items = output
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut urls = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let remote = format!(
                "{}/{}_{}.png",
                self.settings.image_prefix,
                task.task_id,
                index + 1
            );
            let source = non_empty(item.get("url").and_then(Value::as_str));
            let path = match source {
                Some(source) => match self.persist_image(source, &remote).await {
                    Ok(()) => remote,
                    Err(e) => {
                        warn!(task_id = %task.task_id, index, error = %e, "image degraded to placeholder");
                        self.settings.placeholder_image.clone()
                    }
                },
                None => self.settings.placeholder_image.clone(),
            };
            urls.push(format!("{}{}", self.settings.image_public_base, path));
        }

        let result = TaskResult::Urls(urls.clone());
        if self
            .tasks
            .transition(
                &task.task_id,
                TaskStatus::Pending,
                TaskStatus::Succeeded,
                Some(&result),
            )
            .await?
        {
            info!(task_id = %task.task_id, images = urls.len(), "image task finalized");
            Ok(TaskView::Succeeded { results: urls })
        } else {
            self.reread(task).await
        }
    }

    /// Download one generated image and store it under `remote`.
    async fn persist_image(&self, source: &str, remote: &str) -> Result<(), GenerationError> {
        let file_name = remote.rsplit('/').next().unwrap_or(remote);
        let local = self.settings.temp_dir.join(file_name);

        let stored = async {
            self.fetcher.download(source, &local).await?;
            self.storage.upload(&local, remote).await?;
            self.storage
                .set_acl(remote, &self.settings.default_acl)
                .await?;
            Ok::<_, GenerationError>(())
        }
        .await;

        remove_temp(&local).await;
        stored
    }

    async fn finalize_video(
        &self,
        task: &GenerationTask,
        output: &Value,
    ) -> Result<TaskView, GenerationError> {
        let source = non_empty(output.get("video_url").and_then(Value::as_str))
            .or_else(|| non_empty(output.pointer("/results/video_url").and_then(Value::as_str)));
        let Some(source) = source else {
            let err = GenerationError::MissingResult("output.video_url".into());
            self.fail(task, TaskStatus::Pending, err.user_message(), output.clone())
                .await?;
            return Err(err);
        };

        // Claim the task; a concurrent poll now observes the conflict state.
        if !self
            .tasks
            .transition(
                &task.task_id,
                TaskStatus::Pending,
                TaskStatus::PostProcessing,
                None,
            )
            .await?
        {
            return self.reread(task).await;
        }

        let input = self.settings.temp_dir.join(format!("{}.mp4", task.task_id));
        let watermarked = self
            .settings
            .temp_dir
            .join(format!("{}_watermarked.mp4", task.task_id));
        let remote = format!("{}/{}.mp4", self.settings.video_prefix, task.task_id);

        let processed = self
            .process_video(source, &input, &watermarked, &remote)
            .await;
        remove_temp(&input).await;
        remove_temp(&watermarked).await;

        match processed {
            Ok(()) => {
                let url = format!("{}{}", self.settings.video_public_base, remote);
                let result = TaskResult::Urls(vec![url.clone()]);
                if self
                    .tasks
                    .transition(
                        &task.task_id,
                        TaskStatus::PostProcessing,
                        TaskStatus::Succeeded,
                        Some(&result),
                    )
                    .await?
                {
                    info!(task_id = %task.task_id, "video task finalized");
                    Ok(TaskView::Succeeded { results: vec![url] })
                } else {
                    self.reread(task).await
                }
            }
            Err(e) => {
                error!(task_id = %task.task_id, error = %e, "video post-processing failed");
                self.fail(task, TaskStatus::PostProcessing, e.user_message(), e.raw())
                    .await?;
                Err(e)
            }
        }
    }

    async fn process_video(
        &self,
        source: &str,
        input: &Path,
        watermarked: &Path,
        remote: &str,
    ) -> Result<(), GenerationError> {
        self.fetcher.download(source, input).await?;
        self.media.watermark(input, watermarked).await?;
        self.storage.upload(watermarked, remote).await?;
        self.storage
            .set_acl(remote, &self.settings.default_acl)
            .await?;
        Ok(())
    }

    /// One page of the owner's pending and succeeded works, newest first.
    pub async fn list_works(
        &self,
        owner_id: &str,
        kind: KindFilter,
        page: u32,
        hide_personal_uploads: bool,
    ) -> Result<WorkPage, GenerationError> {
        let query = WorkQuery {
            kind,
            page: page.max(1),
            page_size: self.settings.works_page_size,
            hide_personal_uploads,
        };
        let (tasks, total) = self.tasks.list_works(owner_id, &query).await?;

        Ok(WorkPage {
            page: query.page,
            page_count: total.div_ceil(u64::from(query.page_size)),
            total,
            list: tasks.iter().map(WorkItem::from).collect(),
        })
    }
}
