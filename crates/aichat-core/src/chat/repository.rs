//! ConversationRepository trait definition.

use aichat_types::chat::{Conversation, Message};
use aichat_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for conversation persistence.
///
/// Implementations live in aichat-infra (e.g., `SqliteConversationRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationRepository: Send + Sync {
    /// Persist a new conversation.
    fn create(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<Conversation, RepositoryError>> + Send;

    /// Find a conversation owned by `owner_id` under model selector `model`.
    fn find(
        &self,
        id: &Uuid,
        owner_id: &str,
        model: u8,
    ) -> impl std::future::Future<Output = Result<Option<Conversation>, RepositoryError>> + Send;

    /// Replace the stored transcript.
    fn save_messages(
        &self,
        id: &Uuid,
        messages: &[Message],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
