use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::ReaderConfig;
use crate::error::ReaderError;
use crate::models::{Comment, CommentId, StoryDetail, StoryId};

/// Shared flag that makes a pending comment fetch irrelevant once the panel
/// it was meant for has moved on.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One completed request. Every request made through a [`DataGateway`]
/// produces exactly one of these, except comment fetches whose token was
/// cancelled before they finished.
#[derive(Debug)]
pub enum GatewayEvent {
    TopStories(Result<Vec<StoryId>, ReaderError>),
    Story {
        id: StoryId,
        result: Result<StoryDetail, ReaderError>,
    },
    Comment {
        id: CommentId,
        cancel: CancelToken,
        result: Result<Comment, ReaderError>,
    },
}

/// Where stories come from. Requests return immediately; results arrive on
/// the channel the gateway was built with, in whatever order they finish.
pub trait DataGateway {
    fn top_stories(&self);
    fn story_by_id(&self, id: StoryId);
    fn story_comment(&self, id: CommentId, cancel: CancelToken);
}

pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Gateway backed by the Hacker News Firebase API.
pub struct HttpGateway {
    runtime: Runtime,
    client: Client,
    api_base: Arc<str>,
    events: Sender<GatewayEvent>,
    waker: Option<Waker>,
}

impl HttpGateway {
    pub fn new(config: &ReaderConfig, events: Sender<GatewayEvent>) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("hn-gateway")
            .enable_all()
            .build()?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            runtime,
            client,
            api_base: Arc::from(config.api_base()),
            events,
            waker: None,
        })
    }

    /// Called after every delivered event, so the UI can wake up and pump.
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    fn spawn_fetch<T, F>(&self, what: String, url: String, wrap: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, ReaderError>) -> Option<GatewayEvent> + Send + 'static,
    {
        let client = self.client.clone();
        let events = self.events.clone();
        let waker = self.waker.clone();

        self.runtime.spawn(async move {
            let result = fetch_json::<T>(&client, &url).await.map_err(|e| {
                tracing::warn!(%what, error = %e, "request failed");
                ReaderError::fetch(what, e)
            });

            if let Some(event) = wrap(result) {
                // The receiver is gone once the window closes
                if events.send(event).is_ok() {
                    if let Some(waker) = waker {
                        waker();
                    }
                }
            }
        });
    }
}

async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> anyhow::Result<T> {
    let response = client.get(url).send().await?.error_for_status()?;
    // Deleted or unknown items come back as a literal `null`
    let item: Option<T> = response.json().await?;
    item.ok_or_else(|| anyhow::anyhow!("item not found"))
}

impl DataGateway for HttpGateway {
    fn top_stories(&self) {
        let url = format!("{}/topstories.json", self.api_base);
        self.spawn_fetch("top stories".to_string(), url, |result| {
            Some(GatewayEvent::TopStories(result))
        });
    }

    fn story_by_id(&self, id: StoryId) {
        let url = format!("{}/item/{}.json", self.api_base, id);
        self.spawn_fetch(format!("story {id}"), url, move |result| {
            Some(GatewayEvent::Story { id, result })
        });
    }

    fn story_comment(&self, id: CommentId, cancel: CancelToken) {
        if cancel.is_cancelled() {
            return;
        }
        let url = format!("{}/item/{}.json", self.api_base, id);
        self.spawn_fetch(format!("comment {id}"), url, move |result| {
            if cancel.is_cancelled() {
                tracing::debug!(%id, "dropping comment for a closed panel");
                return None;
            }
            Some(GatewayEvent::Comment { id, cancel, result })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WAIT: Duration = Duration::from_secs(5);

    // The gateway owns its own runtime, so the mock server gets a separate one
    // and the tests stay synchronous.
    struct MockApi {
        server: MockServer,
        runtime: Runtime,
    }

    impl MockApi {
        fn start() -> Self {
            let runtime = Runtime::new().unwrap();
            let server = runtime.block_on(MockServer::start());
            Self { server, runtime }
        }

        fn respond(&self, route: &str, response: ResponseTemplate, expected: Option<u64>) {
            let mock = Mock::given(method("GET"))
                .and(path(route))
                .respond_with(response);
            let mock = match expected {
                Some(n) => mock.expect(n),
                None => mock,
            };
            self.runtime.block_on(mock.mount(&self.server));
        }

        fn verify(&self) {
            self.runtime.block_on(self.server.verify());
        }

        fn gateway(&self) -> (HttpGateway, Receiver<GatewayEvent>, Receiver<()>) {
            let config = ReaderConfig {
                api_base: self.server.uri(),
                request_timeout_secs: 5,
                ..ReaderConfig::default()
            };
            let (tx, rx) = mpsc::channel();
            let mut gateway = HttpGateway::new(&config, tx).unwrap();

            let (wake_tx, wakes) = mpsc::channel();
            gateway.set_waker(Arc::new(move || {
                wake_tx.send(()).ok();
            }));
            (gateway, rx, wakes)
        }
    }

    #[test]
    fn top_stories_keep_their_order_and_wake_the_ui() {
        let api = MockApi::start();
        api.respond("/topstories.json", ResponseTemplate::new(200).set_body_json(json!([3, 1, 2])), None);
        let (gateway, rx, wakes) = api.gateway();

        gateway.top_stories();

        match rx.recv_timeout(WAIT).unwrap() {
            GatewayEvent::TopStories(Ok(ids)) => {
                assert_eq!(ids, vec![StoryId(3), StoryId(1), StoryId(2)])
            }
            other => panic!("unexpected event {other:?}"),
        }
        wakes.recv_timeout(WAIT).unwrap();
    }

    #[test]
    fn story_is_decoded() {
        let api = MockApi::start();
        api.respond(
            "/item/8.json",
            ResponseTemplate::new(200).set_body_json(json!({
                "id": 8,
                "title": "Show HN: a reader",
                "score": 42,
                "by": "pg",
                "time": 1000,
                "url": "https://example.com/",
                "kids": [80, 81],
            })),
            None,
        );
        let (gateway, rx, _wakes) = api.gateway();

        gateway.story_by_id(StoryId(8));

        match rx.recv_timeout(WAIT).unwrap() {
            GatewayEvent::Story { id, result } => {
                assert_eq!(id, StoryId(8));
                let detail = result.unwrap();
                assert_eq!(detail.title, "Show HN: a reader");
                assert_eq!(detail.comment_ids(), &[CommentId(80), CommentId(81)]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn null_item_is_a_fetch_failure() {
        let api = MockApi::start();
        api.respond("/item/7.json", ResponseTemplate::new(200).set_body_string("null"), None);
        let (gateway, rx, _wakes) = api.gateway();

        gateway.story_by_id(StoryId(7));

        match rx.recv_timeout(WAIT).unwrap() {
            GatewayEvent::Story {
                id,
                result: Err(ReaderError::FetchFailure { what, .. }),
            } => {
                assert_eq!(id, StoryId(7));
                assert_eq!(what, "story 7");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn server_error_is_a_fetch_failure() {
        let api = MockApi::start();
        api.respond("/topstories.json", ResponseTemplate::new(500), None);
        let (gateway, rx, wakes) = api.gateway();

        gateway.top_stories();

        assert!(matches!(
            rx.recv_timeout(WAIT).unwrap(),
            GatewayEvent::TopStories(Err(ReaderError::FetchFailure { .. }))
        ));
        // Failures are delivered like any other result
        wakes.recv_timeout(WAIT).unwrap();
    }

    #[test]
    fn live_comment_is_delivered_with_its_token() {
        let api = MockApi::start();
        api.respond(
            "/item/100.json",
            ResponseTemplate::new(200).set_body_json(json!({
                "id": 100,
                "by": "dang",
                "text": "hello",
                "time": 5,
            })),
            None,
        );
        let (gateway, rx, _wakes) = api.gateway();
        let token = CancelToken::new();

        gateway.story_comment(CommentId(100), token.clone());

        match rx.recv_timeout(WAIT).unwrap() {
            GatewayEvent::Comment { id, cancel, result } => {
                assert_eq!(id, CommentId(100));
                assert!(!cancel.is_cancelled());
                assert_eq!(result.unwrap().text, "hello");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn comment_cancelled_in_flight_produces_no_event() {
        let api = MockApi::start();
        api.respond(
            "/item/100.json",
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 100, "by": "a", "text": "late", "time": 1}))
                .set_delay(Duration::from_millis(300)),
            Some(1),
        );
        let (gateway, rx, wakes) = api.gateway();
        let token = CancelToken::new();

        gateway.story_comment(CommentId(100), token.clone());
        token.cancel();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap_err(),
            RecvTimeoutError::Timeout
        );
        assert!(wakes.try_recv().is_err());
        api.verify();
    }

    #[test]
    fn comment_cancelled_up_front_is_never_requested() {
        let api = MockApi::start();
        api.respond("/item/100.json", ResponseTemplate::new(200).set_body_string("null"), Some(0));
        let (gateway, rx, _wakes) = api.gateway();
        let token = CancelToken::new();
        token.cancel();

        gateway.story_comment(CommentId(100), token);

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(300)).unwrap_err(),
            RecvTimeoutError::Timeout
        );
        api.verify();
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn fresh_tokens_are_independent() {
        let first = CancelToken::new();
        let second = CancelToken::new();
        first.cancel();
        assert!(!second.is_cancelled());
    }
}
