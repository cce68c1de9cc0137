use super::*;
use crate::clock::FixedClock;
use crate::event_bus::{EventBus, UsageEvent};
use crate::interceptor::{InterceptScope, RequestInterceptor};
use crate::ledger::UsageLedger;
use crate::settings::MemorySettings;
use crate::usage::UsageBucket;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tokentally_llm::{PromptMessage, TokenCounter, Tokenizer};

/// One token per whitespace-separated word
struct WordTokenizer;

#[async_trait]
impl Tokenizer for WordTokenizer {
    fn name(&self) -> &str {
        "words"
    }

    async fn count(&self, text: &str) -> tokentally_llm::Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

struct FailingTokenizer;

#[async_trait]
impl Tokenizer for FailingTokenizer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn count(&self, _text: &str) -> tokentally_llm::Result<usize> {
        Err(tokentally_llm::Error::Tokenizer("offline".to_string()))
    }
}

#[derive(Default)]
struct ChatState {
    chat_id: Option<String>,
    model: Option<String>,
    messages: Vec<ChatMessage>,
    streaming: Option<String>,
}

/// Chat whose contents the test scripts step by step
#[derive(Default)]
struct ScriptedChat {
    state: Mutex<ChatState>,
}

impl ScriptedChat {
    fn new(chat_id: &str, model: &str) -> Self {
        Self {
            state: Mutex::new(ChatState {
                chat_id: Some(chat_id.to_string()),
                model: Some(model.to_string()),
                ..ChatState::default()
            }),
        }
    }

    fn push(&self, message: ChatMessage) -> usize {
        let mut state = self.state.lock().unwrap();
        state.messages.push(message);
        state.messages.len() - 1
    }

    fn stream(&self, text: &str) {
        self.state.lock().unwrap().streaming = Some(text.to_string());
    }

    fn switch_to(&self, chat_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.chat_id = Some(chat_id.to_string());
        state.messages.clear();
        state.streaming = None;
    }
}

impl ChatContext for ScriptedChat {
    fn chat_id(&self) -> Option<String> {
        self.state.lock().unwrap().chat_id.clone()
    }

    fn current_model(&self) -> Option<String> {
        self.state.lock().unwrap().model.clone()
    }

    fn message(&self, index: usize) -> Option<ChatMessage> {
        self.state.lock().unwrap().messages.get(index).cloned()
    }

    fn last_message(&self) -> Option<ChatMessage> {
        self.state.lock().unwrap().messages.last().cloned()
    }

    fn streaming_text(&self) -> Option<String> {
        self.state.lock().unwrap().streaming.clone()
    }
}

struct Harness {
    tracker: LifecycleTracker,
    ledger: Arc<UsageLedger>,
    chat: Arc<ScriptedChat>,
    scope: InterceptScope,
}

impl Harness {
    fn new() -> Self {
        Self::with_tokenizer(Arc::new(WordTokenizer))
    }

    fn with_tokenizer(tokenizer: Arc<dyn Tokenizer>) -> Self {
        let now = NaiveDate::from_ymd_opt(2026, 2, 14)
            .unwrap()
            .and_hms_opt(21, 15, 0)
            .unwrap();
        let ledger = Arc::new(
            UsageLedger::open(
                Arc::new(MemorySettings::new()),
                EventBus::new(64),
                Arc::new(FixedClock::new(now)),
            )
            .unwrap(),
        );
        let chat = Arc::new(ScriptedChat::new("chat1", "gpt-4o"));
        let scope = InterceptScope::new();
        let tracker = LifecycleTracker::new(
            TokenCounter::new(tokenizer),
            ledger.clone(),
            chat.clone(),
            scope,
        );
        Self {
            tracker,
            ledger,
            chat,
            scope,
        }
    }

    async fn all_time(&self) -> UsageBucket {
        self.ledger.read(|s| s.usage.all_time).await
    }

    async fn start(&self, kind: GenerationKind) {
        self.tracker
            .handle(HostEvent::GenerationStarted {
                kind,
                dry_run: false,
            })
            .await;
    }

    async fn request(&self, prompt: &str) {
        self.tracker
            .handle(HostEvent::RequestReady {
                payload: PromptPayload::from(prompt),
                dry_run: false,
            })
            .await;
    }

    async fn receive(&self, message: ChatMessage) {
        let index = self.chat.push(message);
        self.tracker
            .handle(HostEvent::MessageReceived {
                index,
                source: MessageSource::Generation,
            })
            .await;
    }
}

fn words(n: usize) -> String {
    vec!["tok"; n].join(" ")
}

#[tokio::test]
async fn test_normal_generation_records_once() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.request(&words(12)).await;
    assert!(h.tracker.is_awaiting().await);

    h.receive(ChatMessage::text(words(5))).await;

    assert!(!h.tracker.is_awaiting().await);
    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output, all_time.message_count), (12, 5, 1));

    let usage = h.ledger.read(|s| s.usage.clone()).await;
    assert_eq!(usage.by_chat["chat1"].total, 17);
    assert_eq!(usage.by_model["gpt-4o"].total, 17);
    assert_eq!(usage.by_day["2026-02-14"].models["gpt-4o"].total, 17);
}

#[tokio::test]
async fn test_structured_prompt_counts_overheads() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.tracker
        .handle(HostEvent::RequestReady {
            payload: PromptPayload::from(vec![
                PromptMessage::system("be brief"),
                PromptMessage::user("hello there friend"),
            ]),
            dry_run: false,
        })
        .await;
    h.receive(ChatMessage::text("hi")).await;

    // (3 + 1 + 2) + (3 + 1 + 3)
    assert_eq!(h.all_time().await.input, 13);
}

#[tokio::test]
async fn test_stopped_generation_records_partial_output() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.request(&words(40)).await;
    h.chat.stream(&words(10));

    h.tracker.handle(HostEvent::GenerationStopped).await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output), (40, 10));
    assert_eq!(all_time.message_count, 1);
}

#[tokio::test]
async fn test_stopped_with_empty_stream_still_records_input() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.request(&words(7)).await;

    h.tracker.handle(HostEvent::GenerationStopped).await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output), (7, 0));
}

#[tokio::test]
async fn test_chat_change_discards_pending() {
    let h = Harness::new();
    let mut rx = h.ledger.bus().subscribe();

    h.start(GenerationKind::Normal).await;
    h.request(&words(20)).await;
    h.chat.switch_to("chat2");
    h.tracker
        .handle(HostEvent::ChatChanged {
            chat_id: Some("chat2".to_string()),
        })
        .await;

    assert!(!h.tracker.is_awaiting().await);
    h.receive(ChatMessage::text(words(3))).await;

    assert!(h.all_time().await.is_empty());
    assert_eq!(
        rx.recv().await.unwrap(),
        UsageEvent::ChatChanged {
            chat_id: Some("chat2".to_string())
        }
    );
}

#[tokio::test]
async fn test_quiet_generation_flushed_by_next_start() {
    let h = Harness::new();
    h.start(GenerationKind::Quiet).await;
    h.request(&words(6)).await;
    h.chat.stream(&words(2));

    // the quiet generation never reports a result
    h.start(GenerationKind::Normal).await;

    let flushed = h.all_time().await;
    assert_eq!((flushed.input, flushed.output, flushed.message_count), (6, 2, 1));
    assert!(!h.tracker.is_awaiting().await);

    h.chat.stream("");
    h.request(&words(9)).await;
    h.receive(ChatMessage::text(words(4))).await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output, all_time.message_count), (15, 6, 2));
}

#[tokio::test]
async fn test_quiet_generation_flushed_by_chat_change() {
    let h = Harness::new();
    h.start(GenerationKind::Quiet).await;
    h.request(&words(6)).await;

    h.tracker
        .handle(HostEvent::ChatChanged {
            chat_id: Some("chat2".to_string()),
        })
        .await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.message_count), (6, 1));
    // attributed to the chat it started in
    assert_eq!(h.ledger.read(|s| s.usage.by_chat["chat1"].total).await, 6);
}

#[tokio::test]
async fn test_continue_records_only_new_tokens() {
    let h = Harness::new();
    h.chat.push(ChatMessage {
        text: words(30),
        reasoning: None,
        token_count: Some(30),
    });

    h.start(GenerationKind::Continue).await;
    h.request(&words(50)).await;
    h.receive(ChatMessage {
        text: words(45),
        reasoning: None,
        token_count: Some(45),
    })
    .await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output), (50, 15));
}

#[tokio::test]
async fn test_continue_delta_floors_at_zero() {
    let h = Harness::new();
    h.chat.push(ChatMessage::text(words(30)));

    h.start(GenerationKind::Continue).await;
    h.request(&words(1)).await;
    h.receive(ChatMessage::text(words(20))).await;

    assert_eq!(h.all_time().await.output, 0);
}

#[tokio::test]
async fn test_baseline_cleared_after_continue() {
    let h = Harness::new();
    h.chat.push(ChatMessage::text(words(30)));
    h.start(GenerationKind::Continue).await;
    h.request(&words(1)).await;
    h.receive(ChatMessage::text(words(35))).await;

    h.start(GenerationKind::Normal).await;
    h.request(&words(1)).await;
    h.receive(ChatMessage::text(words(8))).await;

    assert_eq!(h.all_time().await.output, 5 + 8);
}

#[tokio::test]
async fn test_output_prefers_precomputed_then_reasoning() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.request("a").await;
    h.receive(ChatMessage {
        text: words(3),
        reasoning: Some(words(100)),
        token_count: Some(7),
    })
    .await;
    assert_eq!(h.all_time().await.output, 7);

    h.start(GenerationKind::Normal).await;
    h.request("a").await;
    h.receive(ChatMessage {
        text: words(3),
        reasoning: Some(words(4)),
        token_count: None,
    })
    .await;
    assert_eq!(h.all_time().await.output, 7 + 7);
}

#[tokio::test]
async fn test_dry_runs_are_ignored() {
    let h = Harness::new();
    h.tracker
        .handle(HostEvent::GenerationStarted {
            kind: GenerationKind::Continue,
            dry_run: true,
        })
        .await;
    h.tracker
        .handle(HostEvent::RequestReady {
            payload: PromptPayload::from(words(10)),
            dry_run: true,
        })
        .await;

    assert!(!h.tracker.is_awaiting().await);
    h.receive(ChatMessage::text(words(3))).await;
    assert!(h.all_time().await.is_empty());
}

#[tokio::test]
async fn test_synthetic_messages_do_not_consume_pending() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.request(&words(10)).await;

    for source in [
        MessageSource::SlashCommand,
        MessageSource::FirstMessage,
        MessageSource::Extension,
    ] {
        let index = h.chat.push(ChatMessage::text(words(99)));
        h.tracker
            .handle(HostEvent::MessageReceived { index, source })
            .await;
    }

    assert!(h.tracker.is_awaiting().await);
    assert!(h.all_time().await.is_empty());

    h.receive(ChatMessage::text(words(2))).await;
    assert_eq!(h.all_time().await.total, 12);
}

#[tokio::test]
async fn test_results_without_pending_are_ignored() {
    let h = Harness::new();
    h.receive(ChatMessage::text(words(3))).await;
    h.tracker.handle(HostEvent::GenerationStopped).await;
    h.tracker
        .handle(HostEvent::ImpersonationReady {
            text: words(4),
        })
        .await;

    assert!(h.all_time().await.is_empty());
}

#[tokio::test]
async fn test_impersonation_recorded() {
    let h = Harness::new();
    h.start(GenerationKind::Impersonate).await;
    h.request(&words(11)).await;
    h.tracker
        .handle(HostEvent::ImpersonationReady {
            text: words(6),
        })
        .await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output), (11, 6));
}

#[tokio::test]
async fn test_second_request_replaces_pending() {
    let h = Harness::new();
    h.start(GenerationKind::Normal).await;
    h.request(&words(100)).await;
    h.request(&words(8)).await;
    h.receive(ChatMessage::text(words(1))).await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output, all_time.message_count), (8, 1, 1));
}

#[tokio::test]
async fn test_request_inside_interception_is_ignored() {
    let h = Harness::new();
    h.scope
        .run(async {
            h.start(GenerationKind::Normal).await;
            h.request(&words(10)).await;
            assert!(!h.tracker.is_awaiting().await);
        })
        .await;

    h.request(&words(10)).await;
    assert!(h.tracker.is_awaiting().await);
}

#[tokio::test]
async fn test_generation_overlapping_background_request_is_recorded() {
    let h = Harness::new();
    let interceptor = RequestInterceptor::new(
        TokenCounter::new(Arc::new(WordTokenizer)),
        h.ledger.clone(),
        h.chat.clone(),
        h.scope,
    );
    let background_prompt = words(6);
    let payload = PromptPayload::from(background_prompt.as_str());
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let background = interceptor.intercept(Some("ext-model"), &payload, async {
        release_rx.await.ok();
        Ok::<_, String>(words(2))
    });
    let user_turn = async {
        h.start(GenerationKind::Normal).await;
        h.request(&words(12)).await;
        assert!(h.tracker.is_awaiting().await);
        h.receive(ChatMessage::text(words(5))).await;
        release_tx.send(()).ok();
    };
    let (result, ()) = tokio::join!(background, user_turn);

    assert!(result.is_ok());
    let usage = h.ledger.read(|s| s.usage.clone()).await;
    assert_eq!(usage.all_time.message_count, 2);
    assert_eq!(usage.by_model["gpt-4o"].total, 17);
    assert_eq!(usage.by_model["ext-model"].total, 8);
}

#[tokio::test]
async fn test_failing_tokenizer_falls_back_to_estimate() {
    let h = Harness::with_tokenizer(Arc::new(FailingTokenizer));
    h.start(GenerationKind::Normal).await;
    // 16 chars at 4 chars per token
    h.request("abcdefghijklmnop").await;
    h.receive(ChatMessage::text("abcdefgh")).await;

    let all_time = h.all_time().await;
    assert_eq!((all_time.input, all_time.output), (4, 2));
}

#[test]
fn test_host_event_wire_format() {
    let event: HostEvent = serde_json::from_str(
        r#"{"event": "generation_started", "kind": "continue"}"#,
    )
    .unwrap();
    assert_eq!(
        event,
        HostEvent::GenerationStarted {
            kind: GenerationKind::Continue,
            dry_run: false
        }
    );

    let event: HostEvent =
        serde_json::from_str(r#"{"event": "generation_started", "kind": "something_new"}"#)
            .unwrap();
    assert!(matches!(
        event,
        HostEvent::GenerationStarted {
            kind: GenerationKind::Other,
            ..
        }
    ));

    let event: HostEvent =
        serde_json::from_str(r#"{"event": "request_ready", "payload": "hello"}"#).unwrap();
    assert!(matches!(event, HostEvent::RequestReady { dry_run: false, .. }));
}
