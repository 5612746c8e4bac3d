//! Application state wiring all services together.
//!
//! The services are generic over their ports; AppState pins them to the
//! concrete infra implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::SecretString;

use aichat_core::chat::orchestrator::ChatOrchestrator;
use aichat_core::generation::service::{GenerationService, GenerationSettings};
use aichat_core::llm::profile::ModelProfiles;
use aichat_infra::audit::JsonlErrorAuditLog;
use aichat_infra::config::{data_dir, load_app_config};
use aichat_infra::llm::dashscope::DashScopeClient;
use aichat_infra::llm::fetch::HttpFetcher;
use aichat_infra::media::ffmpeg::FfmpegWatermarker;
use aichat_infra::sqlite::conversation::SqliteConversationRepository;
use aichat_infra::sqlite::pool::{DatabasePool, database_path};
use aichat_infra::sqlite::task::SqliteTaskRepository;
use aichat_infra::storage::local::LocalStorageDriver;
use aichat_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteChatOrchestrator =
    ChatOrchestrator<SqliteConversationRepository, DashScopeClient, JsonlErrorAuditLog>;

pub type ConcreteGenerationService = GenerationService<
    SqliteTaskRepository,
    DashScopeClient,
    HttpFetcher,
    LocalStorageDriver,
    FfmpegWatermarker,
>;

/// Shared application state, used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ConcreteChatOrchestrator>,
    pub generation: Arc<ConcreteGenerationService>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
}

/// Resolve `path` against `base` unless it is already absolute.
fn resolve(base: &Path, path: &str) -> PathBuf {
    base.join(path)
}

impl AppState {
    /// Initialize the application state: load config, connect to the DB,
    /// wire services.
    ///
    /// Without an API key the state is still usable for local queries; every
    /// upstream call will be rejected by the provider.
    pub async fn init(api_key: Option<SecretString>) -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut config = load_app_config(&data_dir).await;
        let storage_root = resolve(&data_dir, &config.storage.root_dir);
        let temp_dir = resolve(&data_dir, &config.storage.temp_dir);
        tokio::fs::create_dir_all(&storage_root).await?;
        tokio::fs::create_dir_all(&temp_dir).await?;
        config.storage.temp_dir = temp_dir.display().to_string();

        let db_pool = DatabasePool::open(&database_path(&data_dir)).await?;

        let api_key = api_key.unwrap_or_else(|| {
            tracing::warn!("AICHAT_API_KEY is not set; upstream calls will be rejected");
            SecretString::from("")
        });
        let key_text = secrecy::ExposeSecret::expose_secret(&api_key);

        let audit = JsonlErrorAuditLog::open(resolve(&data_dir, &config.error_log)).await?;
        let chat = ChatOrchestrator::new(
            SqliteConversationRepository::new(db_pool.clone()),
            DashScopeClient::new(SecretString::from(key_text), &config.upstream)?,
            audit,
            ModelProfiles::new(config.upstream.chat_url.clone()),
        );

        let generation = GenerationService::new(
            SqliteTaskRepository::new(db_pool),
            DashScopeClient::new(SecretString::from(key_text), &config.upstream)?,
            HttpFetcher::new(),
            LocalStorageDriver::new(storage_root),
            FfmpegWatermarker::from_config(&config.media, &data_dir),
            GenerationSettings::from_config(&config),
        );

        tracing::debug!(data_dir = %data_dir.display(), "application state initialized");

        Ok(Self {
            chat: Arc::new(chat),
            generation: Arc::new(generation),
            config: Arc::new(config),
            data_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Path::new("/data");
        assert_eq!(resolve(base, "error.txt"), PathBuf::from("/data/error.txt"));
        assert_eq!(resolve(base, "/var/log/err.txt"), PathBuf::from("/var/log/err.txt"));
    }
}
