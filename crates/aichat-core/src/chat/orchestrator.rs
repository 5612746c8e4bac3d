//! Chat streaming orchestrator.
//!
//! Drives one request end to end: resolve the conversation, build the
//! outbound message list, relay the upstream stream to the caller as it
//! arrives, and persist the reconstructed answer.
//!
//! Each invocation owns a [`StreamContext`] holding the reasoning/answer
//! buffers and the terminal state. Every exit path funnels into
//! [`ChatOrchestrator::close`], which persists at most once per context.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use aichat_types::chat::{ChatRequest, Conversation, Message};
use aichat_types::error::RepositoryError;
use aichat_types::llm::ModelProfile;

use crate::audit::{AuditRecord, ErrorAuditLog};
use crate::chat::frame::{Delta, Frame, parse_frame};
use crate::chat::relay::{RelayEvent, escape_for_display};
use crate::chat::repository::ConversationRepository;
use crate::llm::client::CompletionClient;
use crate::llm::profile::ModelProfiles;
use crate::llm::translate::translate;

/// Errors raised before streaming starts.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation not found")]
    SessionNotFound,

    #[error("nothing to regenerate: the conversation has no messages")]
    NothingToRegenerate,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Lifecycle of one stream invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Init,
    Streaming,
    /// Upstream finished, or the caller left after receiving data.
    Closed,
    /// The caller left before any data was relayed.
    Aborted,
    /// The upstream reported an error; nothing is persisted.
    Errored,
}

/// Output of the INIT phase, ready to be streamed.
#[derive(Debug, Clone)]
pub struct PreparedChat {
    /// Conversation whose `messages` already hold the transcript to persist
    /// ahead of the new answer.
    pub conversation: Conversation,
    pub profile: ModelProfile,
    /// `[directive, ...transcript]` as sent upstream.
    pub outbound: Vec<Message>,
    /// The prompt being answered, recorded in error audits.
    pub prompt: String,
}

/// Per-invocation stream state.
#[derive(Debug)]
pub struct StreamContext {
    conversation: Conversation,
    reasoning: String,
    answer: String,
    relayed: usize,
    state: StreamState,
    closed: AtomicBool,
}

impl StreamContext {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            reasoning: String::new(),
            answer: String::new(),
            relayed: 0,
            state: StreamState::Init,
            closed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    fn push(&mut self, delta: &Delta) {
        match delta {
            Delta::Reasoning(text) => self.reasoning.push_str(text),
            Delta::Answer(text) => self.answer.push_str(text),
        }
        self.relayed += 1;
    }
}

/// Summary of a finished stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub session_id: Uuid,
    pub state: StreamState,
}

/// Build the outbound message list and the transcript to persist.
///
/// Returns `(outbound, transcript)` where `outbound` is
/// `[system directive, ...transcript]`. With `restart` the last stored
/// message is dropped instead of appending `user_message`.
pub fn build_messages(
    directive: &str,
    stored: &[Message],
    user_message: &str,
    restart: bool,
) -> Result<(Vec<Message>, Vec<Message>), ChatError> {
    let mut transcript = stored.to_vec();
    if restart {
        if transcript.pop().is_none() {
            return Err(ChatError::NothingToRegenerate);
        }
    } else {
        transcript.push(Message::user(user_message));
    }

    let mut outbound = Vec::with_capacity(transcript.len() + 1);
    outbound.push(Message::system(directive));
    outbound.extend(transcript.iter().cloned());

    Ok((outbound, transcript))
}

/// Streams chat completions and keeps conversations in sync.
///
/// Generic over its ports so aichat-core never depends on aichat-infra.
pub struct ChatOrchestrator<C: ConversationRepository, U: CompletionClient, A: ErrorAuditLog> {
    conversations: C,
    client: U,
    audit: A,
    profiles: ModelProfiles,
}

impl<C: ConversationRepository, U: CompletionClient, A: ErrorAuditLog> ChatOrchestrator<C, U, A> {
    pub fn new(conversations: C, client: U, audit: A, profiles: ModelProfiles) -> Self {
        Self {
            conversations,
            client,
            audit,
            profiles,
        }
    }

    /// Access the conversation repository.
    pub fn conversations(&self) -> &C {
        &self.conversations
    }

    /// Access the audit log.
    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// INIT: resolve or create the conversation and build the message lists.
    pub async fn prepare(&self, request: ChatRequest) -> Result<PreparedChat, ChatError> {
        let existing = match request.session_id {
            Some(id) => Some(
                self.conversations
                    .find(&id, &request.owner_id, request.model)
                    .await?
                    .ok_or(ChatError::SessionNotFound)?,
            ),
            None => None,
        };

        let profile = self
            .profiles
            .resolve(request.model, request.deep_reflection);

        let stored = existing
            .as_ref()
            .map(|c| c.messages.as_slice())
            .unwrap_or_default();
        let (outbound, transcript) =
            build_messages(&profile.directive, stored, &request.message, request.restart)?;

        let mut conversation = match existing {
            Some(conversation) => conversation,
            None => {
                let created = self
                    .conversations
                    .create(&Conversation::new(&request.owner_id, request.model))
                    .await?;
                info!(session_id = %created.id, owner = %request.owner_id, "conversation created");
                created
            }
        };
        conversation.messages = transcript;

        Ok(PreparedChat {
            conversation,
            profile,
            outbound,
            prompt: request.message,
        })
    }

    /// STREAMING through a terminal state.
    ///
    /// Frames are relayed in arrival order. The caller is considered gone
    /// once `relay` is closed; this is checked before every frame read.
    pub async fn run(
        &self,
        prepared: PreparedChat,
        relay: mpsc::Sender<RelayEvent>,
    ) -> StreamOutcome {
        let span = info_span!(
            "gen_ai.chat_stream",
            gen_ai.request.model = %prepared.profile.model,
            gen_ai.request.stream = true,
            session_id = %prepared.conversation.id,
            search = prepared.profile.search,
        );
        self.drive(prepared, relay).instrument(span).await
    }

    async fn drive(&self, prepared: PreparedChat, relay: mpsc::Sender<RelayEvent>) -> StreamOutcome {
        let PreparedChat {
            conversation,
            profile,
            outbound,
            prompt,
        } = prepared;
        let mut ctx = StreamContext::new(conversation);

        let mut frames = match self.client.send_chat_stream(&profile, &outbound).await {
            Ok(frames) => frames,
            Err(e) => {
                self.fail(&mut ctx, &prompt, e.code(), e.raw(), &relay).await;
                return self.outcome(&ctx);
            }
        };
        ctx.state = StreamState::Streaming;

        loop {
            if relay.is_closed() {
                ctx.state = if ctx.relayed == 0 {
                    StreamState::Aborted
                } else {
                    StreamState::Closed
                };
                debug!(relayed = ctx.relayed, "caller disconnected");
                self.close_logged(&ctx).await;
                break;
            }

            let raw = match frames.next().await {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    self.fail(&mut ctx, &prompt, e.code(), e.raw(), &relay).await;
                    return self.outcome(&ctx);
                }
                None => {
                    ctx.state = StreamState::Closed;
                    break;
                }
            };

            match parse_frame(&raw) {
                Frame::Delta(delta) => {
                    let event = match &delta {
                        Delta::Reasoning(text) => RelayEvent::Reasoning(escape_for_display(text)),
                        Delta::Answer(text) => RelayEvent::Answer(escape_for_display(text)),
                    };
                    ctx.push(&delta);
                    // A send failure means the caller left; the next
                    // iteration observes the closed channel.
                    let _ = relay.send(event).await;
                }
                Frame::Done | Frame::Continue => {
                    debug!("upstream signalled end of answer");
                }
                Frame::Empty => {}
                Frame::UpstreamError { code, raw } => {
                    self.fail(&mut ctx, &prompt, &code, raw, &relay).await;
                    return self.outcome(&ctx);
                }
            }
        }

        self.close_logged(&ctx).await;

        let _ = relay.send(RelayEvent::LogId(ctx.conversation.id)).await;
        let _ = relay.send(RelayEvent::Done).await;

        info!(
            state = ?ctx.state,
            answer_chars = ctx.answer.chars().count(),
            reasoning_chars = ctx.reasoning.chars().count(),
            "chat stream finished"
        );
        self.outcome(&ctx)
    }

    /// Persist the buffered answer as one assistant message.
    ///
    /// Returns `Ok(false)` without touching storage when the context already
    /// closed or ended in error.
    pub async fn close(&self, ctx: &StreamContext) -> Result<bool, RepositoryError> {
        if ctx.state == StreamState::Errored {
            return Ok(false);
        }
        if ctx.closed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }

        let mut messages = ctx.conversation.messages.clone();
        messages.push(Message::assistant(&ctx.answer, &ctx.reasoning));
        self.conversations
            .save_messages(&ctx.conversation.id, &messages)
            .await?;

        Ok(true)
    }

    async fn close_logged(&self, ctx: &StreamContext) {
        if let Err(e) = self.close(ctx).await {
            error!(session_id = %ctx.conversation.id, error = %e, "failed to persist conversation");
        }
    }

    /// ERRORED: relay the translated message and leave an audit record.
    async fn fail(
        &self,
        ctx: &mut StreamContext,
        prompt: &str,
        code: &str,
        raw: Value,
        relay: &mpsc::Sender<RelayEvent>,
    ) {
        ctx.state = StreamState::Errored;
        warn!(session_id = %ctx.conversation.id, code, "upstream error ended chat stream");

        let record = AuditRecord::new(&ctx.conversation.owner_id, prompt, raw);
        if let Err(e) = self.audit.append(&record).await {
            error!(error = %e, "failed to write error audit record");
        }

        let _ = relay.send(RelayEvent::Error(translate(code).to_string())).await;
        let _ = relay.send(RelayEvent::Exception).await;
    }

    fn outcome(&self, ctx: &StreamContext) -> StreamOutcome {
        StreamOutcome {
            session_id: ctx.conversation.id,
            state: ctx.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use aichat_types::chat::MessageRole;
    use aichat_types::error::AuditError;
    use aichat_types::generation::TaskKind;
    use aichat_types::llm::UpstreamCallError;

    use crate::llm::client::FrameStream;

    // --- Fakes ---

    #[derive(Default)]
    struct MemoryConversations {
        rows: Mutex<HashMap<Uuid, Conversation>>,
        saves: AtomicUsize,
    }

    impl MemoryConversations {
        fn seed(&self, conversation: Conversation) {
            self.rows.lock().unwrap().insert(conversation.id, conversation);
        }

        fn messages(&self, id: &Uuid) -> Vec<Message> {
            self.rows.lock().unwrap()[id].messages.clone()
        }

        fn count(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    impl ConversationRepository for MemoryConversations {
        fn create(
            &self,
            conversation: &Conversation,
        ) -> impl Future<Output = Result<Conversation, RepositoryError>> + Send {
            self.seed(conversation.clone());
            let created = conversation.clone();
            async move { Ok(created) }
        }

        fn find(
            &self,
            id: &Uuid,
            owner_id: &str,
            model: u8,
        ) -> impl Future<Output = Result<Option<Conversation>, RepositoryError>> + Send {
            let found = self
                .rows
                .lock()
                .unwrap()
                .get(id)
                .filter(|c| c.owner_id == owner_id && c.model == model)
                .cloned();
            async move { Ok(found) }
        }

        fn save_messages(
            &self,
            id: &Uuid,
            messages: &[Message],
        ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
            self.saves.fetch_add(1, Ordering::SeqCst);
            let result = match self.rows.lock().unwrap().get_mut(id) {
                Some(row) => {
                    row.messages = messages.to_vec();
                    Ok(())
                }
                None => Err(RepositoryError::NotFound),
            };
            async move { result }
        }
    }

    struct ScriptedClient {
        stream: Mutex<Option<Result<FrameStream, UpstreamCallError>>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedClient {
        fn frames(frames: Vec<&str>) -> Self {
            let items: Vec<Result<String, UpstreamCallError>> =
                frames.into_iter().map(|f| Ok(f.to_string())).collect();
            Self::with_stream(Box::pin(futures_util::stream::iter(items)))
        }

        fn with_stream(stream: FrameStream) -> Self {
            Self {
                stream: Mutex::new(Some(Ok(stream))),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: UpstreamCallError) -> Self {
            Self {
                stream: Mutex::new(Some(Err(error))),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        fn send_chat_stream(
            &self,
            _profile: &ModelProfile,
            messages: &[Message],
        ) -> impl Future<Output = Result<FrameStream, UpstreamCallError>> + Send {
            self.seen.lock().unwrap().push(messages.to_vec());
            let next = self
                .stream
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(UpstreamCallError::Transport("stream already used".into())));
            async move { next }
        }

        fn submit_generation(
            &self,
            _kind: TaskKind,
            _payload: &Value,
        ) -> impl Future<Output = Result<String, UpstreamCallError>> + Send {
            async { Err(UpstreamCallError::Decode("not scripted".into())) }
        }

        fn poll_task(
            &self,
            _task_id: &str,
        ) -> impl Future<Output = Result<Value, UpstreamCallError>> + Send {
            async { Err(UpstreamCallError::Decode("not scripted".into())) }
        }
    }

    #[derive(Default)]
    struct MemoryAudit {
        records: Mutex<Vec<AuditRecord>>,
    }

    impl ErrorAuditLog for MemoryAudit {
        fn append(&self, record: &AuditRecord) -> impl Future<Output = Result<(), AuditError>> + Send {
            self.records.lock().unwrap().push(record.clone());
            async { Ok(()) }
        }
    }

    // --- Helpers ---

    type TestOrchestrator = ChatOrchestrator<MemoryConversations, ScriptedClient, MemoryAudit>;

    fn orchestrator(client: ScriptedClient) -> TestOrchestrator {
        ChatOrchestrator::new(
            MemoryConversations::default(),
            client,
            MemoryAudit::default(),
            ModelProfiles::new("https://upstream.test/chat"),
        )
    }

    fn request(session_id: Option<Uuid>, message: &str, restart: bool) -> ChatRequest {
        ChatRequest {
            owner_id: "owner-1".into(),
            model: 0,
            session_id,
            message: message.into(),
            restart,
            deep_reflection: false,
        }
    }

    fn answer(text: &str) -> String {
        serde_json::json!({"choices": [{"delta": {"content": text}, "finish_reason": null}]})
            .to_string()
            .replacen('{', "data: {", 1)
    }

    fn reasoning(text: &str) -> String {
        serde_json::json!({"choices": [{"delta": {"content": "", "reasoning_content": text}}]})
            .to_string()
            .replacen('{', "data: {", 1)
    }

    const STOP: &str = r#"data: {"choices":[{"delta":{"content":""},"finish_reason":"stop"}]}"#;

    async fn collect(mut rx: mpsc::Receiver<RelayEvent>) -> Vec<RelayEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    // --- Tests ---

    #[test]
    fn test_build_messages_appends_user_turn() {
        let stored = vec![Message::user("u1"), Message::assistant("a1", "")];
        let (outbound, transcript) = build_messages("sys", &stored, "u2", false).unwrap();
        assert_eq!(outbound.len(), 4);
        assert_eq!(outbound[0], Message::system("sys"));
        assert_eq!(transcript, outbound[1..].to_vec());
        assert_eq!(transcript.last().unwrap(), &Message::user("u2"));
    }

    #[test]
    fn test_build_messages_restart_on_empty_transcript() {
        let err = build_messages("sys", &[], "ignored", true).unwrap_err();
        assert!(matches!(err, ChatError::NothingToRegenerate));
    }

    #[tokio::test]
    async fn test_persisted_answer_is_concatenation_of_raw_deltas() {
        let frames = vec![
            reasoning("step one, "),
            reasoning("step two"),
            answer("Hello world\n"),
            answer("second line"),
            STOP.to_string(),
        ];
        let orch = orchestrator(ScriptedClient::frames(frames.iter().map(String::as_str).collect()));
        let prepared = orch.prepare(request(None, "hi", false)).await.unwrap();
        let id = prepared.conversation.id;

        let (tx, rx) = mpsc::channel(64);
        let outcome = orch.run(prepared, tx).await;
        let events = collect(rx).await;

        assert_eq!(outcome.state, StreamState::Closed);
        let stored = orch.conversations().messages(&id);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], Message::user("hi"));
        assert_eq!(stored[1].role, MessageRole::Assistant);
        assert_eq!(stored[1].content, "Hello world\nsecond line");
        assert_eq!(stored[1].reasoning_content.as_deref(), Some("step one, step two"));

        assert_eq!(
            events,
            vec![
                RelayEvent::Reasoning("step&nbsp;one,&nbsp;".into()),
                RelayEvent::Reasoning("step&nbsp;two".into()),
                RelayEvent::Answer("Hello&nbsp;world<br/>".into()),
                RelayEvent::Answer("second&nbsp;line".into()),
                RelayEvent::LogId(id),
                RelayEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_restart_regenerates_last_answer_in_place() {
        let orch = orchestrator(ScriptedClient::frames(vec![&answer("a2'"), STOP]));
        let mut existing = Conversation::new("owner-1", 0);
        existing.messages = vec![
            Message::user("u1"),
            Message::assistant("a1", ""),
            Message::user("u2"),
            Message::assistant("a2", ""),
        ];
        let id = existing.id;
        orch.conversations().seed(existing);

        let prepared = orch.prepare(request(Some(id), "", true)).await.unwrap();
        let (tx, rx) = mpsc::channel(64);
        orch.run(prepared, tx).await;
        drop(collect(rx).await);

        let seen = orch.client.seen.lock().unwrap()[0].clone();
        let roles_and_text: Vec<(MessageRole, String)> =
            seen.iter().map(|m| (m.role, m.content.clone())).collect();
        assert_eq!(roles_and_text[0].0, MessageRole::System);
        assert_eq!(
            roles_and_text[1..].iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>(),
            vec!["u1", "a1", "u2"]
        );

        let stored = orch.conversations().messages(&id);
        let texts: Vec<&str> = stored.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["u1", "a1", "u2", "a2'"]);
    }

    #[tokio::test]
    async fn test_close_twice_persists_once() {
        let orch = orchestrator(ScriptedClient::frames(vec![]));
        let mut conversation = Conversation::new("owner-1", 0);
        conversation.messages = vec![Message::user("q")];
        let id = conversation.id;
        orch.conversations().seed(conversation.clone());

        let mut ctx = StreamContext::new(conversation);
        ctx.push(&Delta::Answer("partial".into()));

        assert!(orch.close(&ctx).await.unwrap());
        assert!(!orch.close(&ctx).await.unwrap());

        assert_eq!(orch.conversations().saves.load(Ordering::SeqCst), 1);
        let stored = orch.conversations().messages(&id);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].content, "partial");
    }

    #[tokio::test]
    async fn test_upstream_error_frame_persists_nothing_and_audits() {
        let error_frame =
            r#"data: {"error":{"code":"DataInspectionFailed","message":"unsafe"}}"#;
        let orch = orchestrator(ScriptedClient::frames(vec![
            &answer("partial"),
            error_frame,
            &answer("never read"),
        ]));
        let prepared = orch.prepare(request(None, "bad prompt", false)).await.unwrap();
        let id = prepared.conversation.id;

        let (tx, rx) = mpsc::channel(64);
        let outcome = orch.run(prepared, tx).await;
        let events = collect(rx).await;

        assert_eq!(outcome.state, StreamState::Errored);
        assert_eq!(orch.conversations().saves.load(Ordering::SeqCst), 0);
        assert!(orch.conversations().messages(&id).is_empty());

        assert_eq!(
            &events[1..],
            &[
                RelayEvent::Error("敏感内容，生成失败".into()),
                RelayEvent::Exception
            ]
        );

        let records = orch.audit().records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "owner-1");
        assert_eq!(records[0].msg, "bad prompt");
        assert_eq!(records[0].error["error"]["code"], "DataInspectionFailed");
    }

    #[tokio::test]
    async fn test_transport_failure_on_open_is_translated() {
        let orch = orchestrator(ScriptedClient::failing(UpstreamCallError::Transport(
            "connection refused".into(),
        )));
        let prepared = orch.prepare(request(None, "hi", false)).await.unwrap();

        let (tx, rx) = mpsc::channel(8);
        let outcome = orch.run(prepared, tx).await;
        let events = collect(rx).await;

        assert_eq!(outcome.state, StreamState::Errored);
        assert_eq!(
            events,
            vec![
                RelayEvent::Error("AiChat AI服务器网络出错，请稍后再试".into()),
                RelayEvent::Exception
            ]
        );
        assert_eq!(orch.audit().records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_before_data_still_persists() {
        let orch = orchestrator(ScriptedClient::frames(vec![&answer("unseen"), STOP]));
        let prepared = orch.prepare(request(None, "hi", false)).await.unwrap();
        let id = prepared.conversation.id;

        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let outcome = orch.run(prepared, tx).await;

        assert_eq!(outcome.state, StreamState::Aborted);
        let stored = orch.conversations().messages(&id);
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].content, "");
        assert_eq!(orch.conversations().saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect_mid_stream_stops_reading() {
        let (tx, rx) = mpsc::channel(8);
        let first = answer("first ");
        let second = answer("second");
        let third = answer("third");
        let stream = async_stream::stream! {
            let rx = rx;
            yield Ok::<_, UpstreamCallError>(first);
            // The caller goes away while the second frame is in flight.
            drop(rx);
            yield Ok(second);
            yield Ok(third);
        };
        let orch = orchestrator(ScriptedClient::with_stream(Box::pin(stream)));
        let prepared = orch.prepare(request(None, "hi", false)).await.unwrap();
        let id = prepared.conversation.id;

        let outcome = orch.run(prepared, tx).await;

        assert_eq!(outcome.state, StreamState::Closed);
        let stored = orch.conversations().messages(&id);
        assert_eq!(stored[1].content, "first second");
        assert_eq!(orch.conversations().saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_rejected() {
        let orch = orchestrator(ScriptedClient::frames(vec![]));
        let err = orch
            .prepare(request(Some(Uuid::now_v7()), "hi", false))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_session_of_other_owner_is_not_found() {
        let orch = orchestrator(ScriptedClient::frames(vec![]));
        let foreign = Conversation::new("someone-else", 0);
        let id = foreign.id;
        orch.conversations().seed(foreign);

        let err = orch.prepare(request(Some(id), "hi", false)).await.unwrap_err();
        assert!(matches!(err, ChatError::SessionNotFound));
    }

    #[tokio::test]
    async fn test_restart_without_session_creates_nothing() {
        let orch = orchestrator(ScriptedClient::frames(vec![]));
        let err = orch.prepare(request(None, "", true)).await.unwrap_err();
        assert!(matches!(err, ChatError::NothingToRegenerate));
        assert_eq!(orch.conversations().count(), 0);
    }

    #[tokio::test]
    async fn test_continue_signal_does_not_alter_buffers() {
        let length = r#"data: {"choices":[{"delta":{"content":""},"finish_reason":"length"}]}"#;
        let orch = orchestrator(ScriptedClient::frames(vec![&answer("abc"), length]));
        let prepared = orch.prepare(request(None, "hi", false)).await.unwrap();
        let id = prepared.conversation.id;

        let (tx, rx) = mpsc::channel(8);
        let outcome = orch.run(prepared, tx).await;
        drop(collect(rx).await);

        assert_eq!(outcome.state, StreamState::Closed);
        assert_eq!(orch.conversations().messages(&id)[1].content, "abc");
    }
}
