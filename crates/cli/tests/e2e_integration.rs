//! End-to-end integration tests for the quill assistant.
//!
//! These tests exercise the full pipeline from a pending session query to a
//! persisted answer: session log parsing, context assembly, provider
//! dispatch, and interaction recall. No network access is needed; providers
//! and embedders are scripted mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quill_config::{AppConfig, ModelConfig, ProviderKind};
use quill_context::{ContextAssembler, SearchResolver};
use quill_core::error::ProviderError;
use quill_core::message::{Content, Message, Role};
use quill_core::provider::{
    Embedder, Provider, ProviderRequest, ProviderResponse, Usage,
};
use quill_providers::ProviderRouter;
use quill_recall::{InteractionStore, SearchService};
use quill_session::{SessionMeta, SessionRegistry, BLOCK_DELIMITER, ROLE_DELIMITER};

// ── Mocks ────────────────────────────────────────────────────────────────

/// A provider that always answers with the same scripted text.
struct ScriptedProvider {
    answer: String,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderResponse {
            content: self.answer.clone(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

/// Deterministic embedder: simple character statistics, so similar texts get
/// similar vectors without any model behind them.
struct StubEmbedder;

#[async_trait::async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let lower = text.to_lowercase();
        Ok(vec![
            lower.matches("rust").count() as f32,
            lower.matches("python").count() as f32,
            lower.len() as f32 / 100.0,
        ])
    }
}

/// Search resolver that answers every term without going anywhere.
struct CannedResolver;

#[async_trait::async_trait]
impl SearchResolver for CannedResolver {
    async fn resolve(&self, term: &str) -> Result<String, ProviderError> {
        Ok(format!("canned result for {term}"))
    }
}

fn write_pending_query(path: &std::path::Path, query: &str) {
    let mut content = std::fs::read_to_string(path).unwrap();
    content.push_str(query);
    content.push('\n');
    std::fs::write(path, content).unwrap();
}

// ── E2E: Session Lifecycle ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_session_query_to_persisted_answer() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::open(dir.path()).unwrap();

    let meta = SessionMeta::fresh("maths", "flash", None);
    registry.create("maths", &meta).unwrap();
    assert_eq!(registry.list().unwrap(), vec!["maths".to_string()]);

    // The user types a question at the bottom of the markdown file.
    write_pending_query(&registry.markdown_path("maths"), "What is 2+2?");

    let log = registry.load("maths").unwrap();
    assert_eq!(log.latest_query, "What is 2+2?");
    assert!(log.chat_history.is_empty());
    assert_eq!(log.meta.llm_config, "flash");

    // Assemble messages and ask the (scripted) model.
    let assembler = ContextAssembler::new(&log.latest_query)
        .with_history(log.chat_history.clone())
        .with_session_dir(registry.session_dir("maths"));
    let messages = assembler.get_messages(&CannedResolver).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].content.text().contains("What is 2+2?"));

    let provider = ScriptedProvider::new("4");
    let response = provider
        .complete(ProviderRequest {
            model: "mock".into(),
            messages,
            temperature: 0.5,
            max_tokens: None,
            stream: false,
        })
        .await
        .unwrap();

    log.append_response(&response.content).unwrap();

    // Reload: the exchange is now history, with no pending query left.
    let reloaded = registry.load("maths").unwrap();
    assert_eq!(reloaded.chat_history.len(), 2);
    assert_eq!(reloaded.chat_history[0].role, Role::User);
    assert!(reloaded.chat_history[0].content.contains("2+2"));
    assert_eq!(reloaded.chat_history[1].role, Role::Assistant);
    assert_eq!(reloaded.chat_history[1].content, "4");
    assert!(reloaded.latest_query.is_empty());

    // The on-disk format keeps the delimiters a user edits around.
    let raw = std::fs::read_to_string(registry.markdown_path("maths")).unwrap();
    assert!(raw.contains(ROLE_DELIMITER));
    assert!(raw.trim_end().ends_with(BLOCK_DELIMITER));

    registry.delete("maths").unwrap();
    assert!(registry.list().unwrap().is_empty());
}

#[tokio::test]
async fn e2e_multi_turn_history_accumulates() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::open(dir.path()).unwrap();
    registry
        .create("chat", &SessionMeta::fresh("chat", "flash", None))
        .unwrap();

    let provider = ScriptedProvider::new("echo");

    for turn in ["first question", "second question", "third question"] {
        write_pending_query(&registry.markdown_path("chat"), turn);
        let log = registry.load("chat").unwrap();
        assert_eq!(log.latest_query, turn);
        log.append_response("echo").unwrap();
        let _ = provider
            .complete(ProviderRequest {
                model: "mock".into(),
                messages: vec![Message::user(turn)],
                temperature: 0.5,
                max_tokens: None,
                stream: false,
            })
            .await
            .unwrap();
    }

    assert_eq!(provider.calls(), 3);
    let log = registry.load("chat").unwrap();
    assert_eq!(log.chat_history.len(), 6);
    assert!(log.chat_history[4].content.contains("third question"));
}

// ── E2E: Context Assembly ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_file_and_search_context_reach_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let registry = SessionRegistry::open(dir.path().join("sessions")).unwrap();
    registry
        .create("review", &SessionMeta::fresh("review", "flash", None))
        .unwrap();

    let notes = dir.path().join("notes.md");
    std::fs::write(&notes, "Rust uses ownership for memory safety.").unwrap();

    let assembler = ContextAssembler::new("summarize my notes")
        .with_files(vec![notes.display().to_string()])
        .with_search(vec!["rust ownership".into()])
        .with_session_dir(registry.session_dir("review"));

    let messages = assembler.get_messages(&CannedResolver).await.unwrap();
    let text = messages.last().unwrap().content.text();

    assert!(text.contains("<query>\nsummarize my notes\n</query>"));
    assert!(text.contains("ownership for memory safety"));
    assert!(text.contains("canned result for rust ownership"));

    // Both the file content and the search result are cached in the
    // session directory for the next run.
    let session_dir = registry.session_dir("review");
    assert!(session_dir.join("files").read_dir().unwrap().next().is_some());
    assert!(session_dir.join("search").read_dir().unwrap().next().is_some());
}

#[tokio::test]
async fn e2e_single_text_part_collapses_to_plain_string() {
    let assembler = ContextAssembler::new("just a question");
    let messages = assembler.get_messages(&CannedResolver).await.unwrap();

    assert_eq!(messages.len(), 1);
    match &messages[0].content {
        Content::Text(text) => assert!(text.contains("just a question")),
        Content::Parts(_) => panic!("text-only bundle should collapse to a plain string"),
    }
}

// ── E2E: Recall ─────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_record_then_search_interactions() {
    let dir = tempfile::tempdir().unwrap();
    let store = InteractionStore::open(
        dir.path().join("records.jsonl"),
        Arc::new(StubEmbedder),
        None,
    );

    store
        .add(
            "how does rust handle memory",
            "Rust uses ownership and borrowing.",
            "flash",
            "question",
            None,
        )
        .await
        .unwrap();
    store
        .add(
            "best python web framework",
            "Many people use FastAPI or Django.",
            "flash",
            "question",
            None,
        )
        .await
        .unwrap();

    let service = SearchService::new(store);
    let results = service.search("rust memory rust", 5, 0.3).await.unwrap();

    assert!(!results.is_empty());
    assert!(results[0].record.query.contains("rust"));

    let formatted = SearchService::format_results(&results, false);
    assert!(formatted.contains("RELEVANT PAST INTERACTIONS"));
    assert!(formatted.contains("Model: flash"));
}

#[tokio::test]
async fn e2e_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.jsonl");

    {
        let store = InteractionStore::open(path.clone(), Arc::new(StubEmbedder), None);
        store
            .add("persisted query", "persisted answer", "flash", "question", None)
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
    }

    let store = InteractionStore::open(path, Arc::new(StubEmbedder), None);
    assert_eq!(store.len().await, 1);
    let results = store.search("persisted query", 1).await.unwrap();
    assert_eq!(results[0].record.response, "persisted answer");
}

// ── E2E: Provider Routing ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_router_availability_follows_api_keys() {
    let mut config = AppConfig::default();
    config.models.insert(
        "keyed".into(),
        ModelConfig {
            provider: ProviderKind::OpenaiCompat,
            model_name: "test-model".into(),
            base_url: Some("http://localhost:9".into()),
            api_key: Some("sk-test".into()),
            api_key_env: None,
            temperature: 0.5,
            max_tokens: 100,
            system_prompt: None,
        },
    );

    let router = ProviderRouter::from_config(&config);

    assert!(router.is_available("keyed"));
    let (provider, model_config) = router.resolve("keyed").unwrap();
    assert_eq!(provider.name(), "keyed");
    assert_eq!(model_config.model_name, "test-model");

    // Registry entries without a resolvable key are listed but unavailable.
    assert!(router.model_keys().contains(&"keyed"));
    match router.resolve("no-such-model") {
        Err(ProviderError::ModelNotFound(_)) => {}
        Err(e) => panic!("expected ModelNotFound, got {e:?}"),
        Ok(_) => panic!("expected ModelNotFound, got a provider"),
    }
}

#[tokio::test]
async fn e2e_default_stream_wraps_complete() {
    let provider = ScriptedProvider::new("streamed answer");
    let mut rx = provider
        .stream(ProviderRequest {
            model: "mock".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.5,
            max_tokens: None,
            stream: true,
        })
        .await
        .unwrap();

    let chunk = rx.recv().await.unwrap().unwrap();
    assert_eq!(chunk.content.as_deref(), Some("streamed answer"));
    assert!(chunk.done);
    assert!(rx.recv().await.is_none());
}
