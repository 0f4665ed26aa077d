//! Event dispatch across registered matchers.
//!
//! The [`Dispatcher`] owns one bot's matcher list. For each decoded event
//! it computes the [`MatchResult`] -- the accepting matchers in ascending
//! priority order, cut off at the first blocking matcher -- and then runs
//! every handler of that result as an independent task:
//!
//! - each handler gets its own execution timeout;
//! - a handler that fails, times out or panics is logged and attributed,
//!   and never affects its siblings or the webhook reply;
//! - handler start order is deterministic (priority, then registration
//!   order), completion order is not.
//!
//! Matcher lists are append-only during setup and immutable while serving,
//! so matching takes no locks.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Level, debug, error, span, trace, warn};

use crate::context::Context;
use crate::matcher::Matcher;

/// Default per-handler execution timeout.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// MatchResult
// ============================================================================

/// The ordered set of matchers that accepted an event.
///
/// Ordered by ascending priority (ties keep registration order) and
/// truncated at the first blocking matcher, inclusive.
#[derive(Clone, Default)]
pub struct MatchResult {
    matchers: Vec<Matcher>,
}

impl MatchResult {
    /// The matched matchers, in execution order.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Number of matched matchers.
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Names of the matched matchers, for logs and assertions.
    pub fn names(&self) -> Vec<&str> {
        self.matchers
            .iter()
            .map(|m| m.get_name().unwrap_or("unnamed"))
            .collect()
    }
}

impl std::fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchResult")
            .field("matchers", &self.names())
            .finish()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes decoded events to the handlers of one bot.
#[derive(Clone)]
pub struct Dispatcher {
    /// Matchers kept sorted by ascending priority; insertion is stable, so
    /// same-priority matchers stay in registration order.
    matchers: Vec<Matcher>,
    handler_timeout: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher with the default handler timeout.
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Sets the per-handler execution timeout.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// The configured per-handler timeout.
    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    /// Adds a matcher, keeping the list sorted by ascending priority.
    ///
    /// Matchers with equal priority keep their registration order, so
    /// execution order is reproducible from configuration alone.
    pub fn add(&mut self, matcher: Matcher) {
        let pos = self
            .matchers
            .partition_point(|m| m.get_priority() <= matcher.get_priority());
        self.matchers.insert(pos, matcher);
    }

    /// Adds a matcher (builder style).
    pub fn with(mut self, matcher: Matcher) -> Self {
        self.add(matcher);
        self
    }

    /// Adds several matchers at once.
    pub fn extend(&mut self, matchers: impl IntoIterator<Item = Matcher>) {
        for matcher in matchers {
            self.add(matcher);
        }
    }

    /// Number of registered matchers.
    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }

    /// Computes which matchers run for an event.
    ///
    /// Pure and deterministic: the same (event, matcher list) pair always
    /// yields the same ordered result.
    pub fn match_event(&self, ctx: &Context) -> MatchResult {
        let mut matched = Vec::new();
        for matcher in &self.matchers {
            if matcher.matches(ctx) {
                let blocking = matcher.is_blocking();
                matched.push(matcher.clone());
                if blocking {
                    debug!(
                        matcher = matcher.get_name().unwrap_or("unnamed"),
                        "blocking matcher accepted, truncating match result"
                    );
                    break;
                }
            }
        }
        MatchResult { matchers: matched }
    }

    /// Dispatches one event: matches, then runs every matched handler as
    /// its own task with a per-handler timeout.
    ///
    /// Returns `true` if any matcher accepted the event. Completion of the
    /// returned future means every handler has finished, failed, or been
    /// abandoned at its timeout.
    pub async fn dispatch(&self, ctx: Arc<Context>) -> bool {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            event = ctx.event().name(),
            bot_id = ctx.event().bot_id()
        );
        let _enter = span.enter();

        let result = self.match_event(&ctx);
        if result.is_empty() {
            trace!("no matcher accepted the event");
            return false;
        }

        debug!(matchers = ?result.names(), "executing matched handlers");

        let mut tasks = Vec::new();
        for matcher in result.matchers() {
            let matcher_name = matcher.get_name().unwrap_or("unnamed").to_string();
            for (index, handler) in matcher.handlers().iter().enumerate() {
                let fut = (handler)(Arc::clone(&ctx));
                let name = matcher_name.clone();
                let timeout = self.handler_timeout;
                tasks.push(tokio::spawn(async move {
                    match tokio::time::timeout(timeout, fut).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!(matcher = %name, handler_index = index, error = %e, "handler failed");
                        }
                        Err(_) => {
                            // Best-effort cancellation: we stop waiting; any
                            // in-flight network call may still complete.
                            warn!(matcher = %name, handler_index = index, "handler timed out");
                        }
                    }
                }));
            }
        }

        for task in tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("handler panicked");
                }
            }
        }

        true
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("matcher_count", &self.matchers.len())
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{Bot, BoxedBot};
    use crate::error::{ApiError, ApiResult};
    use crate::event::{
        Event, EventHeader, EventKind, Robot, SendMessageEvent, Template,
    };
    use crate::matcher_builders::{on_keyword, on_message};
    use crate::message::{
        Message, MessageContent, MessageContentInfo, TextContent,
    };
    use async_trait::async_trait;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockBot;

    #[async_trait]
    impl Bot for MockBot {
        fn id(&self) -> &str {
            "bot_test"
        }

        async fn send_message(
            &self,
            _villa_id: u64,
            _room_id: u64,
            _object_name: &str,
            _msg_content: &MessageContentInfo,
        ) -> ApiResult<String> {
            Ok("bot-msg-1".to_string())
        }

        async fn send(&self, event: &Event, message: Message) -> ApiResult<String> {
            let (villa_id, room_id) = event.reply_target().ok_or(ApiError::MissingSession)?;
            let info = message.to_content_info()?;
            self.send_message(villa_id, room_id, info.content.object_name(), &info)
                .await
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn mock_bot() -> BoxedBot {
        Arc::new(MockBot)
    }

    fn message_event(text: &str) -> Event {
        let content = MessageContentInfo {
            content: MessageContent::Text(TextContent {
                text: text.to_string(),
                entities: Vec::new(),
                images: None,
                preview_link: None,
                badge: None,
            }),
            mentioned_info: None,
            quote: None,
        };
        let message = content.to_message(Some(100));
        Event {
            header: EventHeader {
                robot: Robot {
                    villa_id: 100,
                    template: Template {
                        id: "bot_test".to_string(),
                        name: "Test".to_string(),
                        desc: None,
                        icon: String::new(),
                        commands: None,
                    },
                },
                id: "event-1".to_string(),
                created_at: 0,
                send_at: 0,
            },
            kind: EventKind::SendMessage(Box::new(SendMessageEvent {
                content,
                from_user_id: 42,
                send_at: 0,
                room_id: 7,
                object_name: 1,
                nickname: "tester".to_string(),
                msg_uid: "msg-1".to_string(),
                bot_msg_id: None,
                villa_id: 100,
                bot_id: "bot_test".to_string(),
                message,
            })),
        }
    }

    fn ctx(text: &str) -> Arc<Context> {
        Arc::new(Context::new(Arc::new(message_event(text)), mock_bot()))
    }

    fn counting_matcher(name: &str, counter: &Arc<AtomicUsize>, step: usize) -> Matcher {
        let counter = Arc::clone(counter);
        on_message().name(name).handler(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(step, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn dispatch_without_matchers_matches_nothing() {
        let dispatcher = Dispatcher::new();
        assert!(!dispatcher.dispatch(ctx("hi")).await);
    }

    #[tokio::test]
    async fn dispatch_runs_matching_handlers() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(counting_matcher("count", &counter, 1));

        assert!(dispatcher.dispatch(ctx("hi")).await);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blocking_matcher_truncates_the_match() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(counting_matcher("first", &counter, 1).block(true));
        dispatcher.add(counting_matcher("second", &counter, 10));

        dispatcher.dispatch(ctx("hi")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_blocking_matchers_all_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(counting_matcher("first", &counter, 1));
        dispatcher.add(counting_matcher("second", &counter, 10));

        dispatcher.dispatch(ctx("hi")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn match_result_is_priority_ordered_and_truncated() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(on_message().name("c").priority(3));
        dispatcher.add(on_message().name("a").priority(1));
        dispatcher.add(on_message().name("b").priority(2).block(true));

        let ctx = ctx("hi");
        let result = dispatcher.match_event(&ctx);
        assert_eq!(result.names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn match_result_is_deterministic() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(on_message().name("a"));
        dispatcher.add(on_keyword(["hello"]).name("kw"));
        dispatcher.add(on_message().name("b").priority(2));

        let ctx = ctx("hello there");
        let first = dispatcher.match_event(&ctx);
        let second = dispatcher.match_event(&ctx);
        assert_eq!(first.names(), second.names());
        assert_eq!(first.names(), vec!["a", "kw", "b"]);
    }

    #[tokio::test]
    async fn equal_priority_keeps_registration_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(on_message().name("first").priority(5));
        dispatcher.add(on_message().name("second").priority(5));
        dispatcher.add(on_message().name("third").priority(5));

        let ctx = ctx("hi");
        assert_eq!(
            dispatcher.match_event(&ctx).names(),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn non_matching_rules_are_skipped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hit = Arc::clone(&counter);
        let mut dispatcher = Dispatcher::new();
        dispatcher.add(on_keyword(["absent"]).handler({
            let hit = Arc::clone(&hit);
            move || {
                let hit = Arc::clone(&hit);
                async move {
                    hit.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));

        assert!(!dispatcher.dispatch(ctx("hello")).await);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_siblings() {
        let counter = Arc::new(AtomicUsize::new(0));
        let sibling = Arc::clone(&counter);

        let mut dispatcher = Dispatcher::new();
        dispatcher.add(
            on_message()
                .name("mixed")
                .handler(|| async { Err::<(), _>("deliberate failure") })
                .handler(move || {
                    let sibling = Arc::clone(&sibling);
                    async move {
                        sibling.fetch_add(1, Ordering::SeqCst);
                    }
                }),
        );

        assert!(dispatcher.dispatch(ctx("hi")).await);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_handler_is_abandoned_at_the_timeout() {
        let finished = Arc::new(AtomicUsize::new(0));
        let slow = Arc::clone(&finished);
        let fast = Arc::new(AtomicUsize::new(0));
        let fast_clone = Arc::clone(&fast);

        let mut dispatcher = Dispatcher::new().with_handler_timeout(Duration::from_millis(50));
        dispatcher.add(
            on_message()
                .name("slow")
                .handler(move || {
                    let slow = Arc::clone(&slow);
                    async move {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        slow.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .handler(move || {
                    let fast = Arc::clone(&fast_clone);
                    async move {
                        fast.fetch_add(1, Ordering::SeqCst);
                    }
                }),
        );

        let started = std::time::Instant::now();
        assert!(dispatcher.dispatch(ctx("hi")).await);
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert_eq!(fast.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn string_response_replies_through_the_bot() {
        struct RecordingBot {
            sent: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait]
        impl Bot for RecordingBot {
            fn id(&self) -> &str {
                "bot_test"
            }

            async fn send_message(
                &self,
                _villa_id: u64,
                _room_id: u64,
                _object_name: &str,
                msg_content: &MessageContentInfo,
            ) -> ApiResult<String> {
                if let MessageContent::Text(text) = &msg_content.content {
                    self.sent.lock().unwrap().push(text.text.clone());
                }
                Ok("bot-msg-1".to_string())
            }

            async fn send(&self, event: &Event, message: Message) -> ApiResult<String> {
                let (villa_id, room_id) =
                    event.reply_target().ok_or(ApiError::MissingSession)?;
                let info = message.to_content_info()?;
                self.send_message(villa_id, room_id, info.content.object_name(), &info)
                    .await
            }

            fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
                self
            }
        }

        let bot = Arc::new(RecordingBot {
            sent: std::sync::Mutex::new(Vec::new()),
        });
        let boxed: BoxedBot = bot.clone();
        let ctx = Arc::new(Context::new(Arc::new(message_event("hello")), boxed));

        let mut dispatcher = Dispatcher::new();
        dispatcher.add(on_keyword(["hello"]).handler(|| async { "world".to_string() }));

        assert!(dispatcher.dispatch(ctx).await);
        assert_eq!(*bot.sent.lock().unwrap(), vec!["world".to_string()]);
    }
}
