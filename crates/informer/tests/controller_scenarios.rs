//! End-to-end controller behavior against the scripted resource client.
//!
//! Time-driven scenarios run on a paused tokio clock, so resync and backoff
//! delays elapse instantly but in the right order.

use informer::{Controller, ControllerState, InformerError, InformerMetrics, ResourceHandler};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ObjectMeta;
use resource_client::{ClientError, MockCall, MockResourceClient, WatchEvent, WatchScript};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

fn cm(name: &str, rv: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            resource_version: Some(rv.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn tag(obj: &ConfigMap) -> String {
    format!(
        "{}@{}",
        obj.metadata.name.as_deref().unwrap_or_default(),
        obj.metadata.resource_version.as_deref().unwrap_or_default()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Add(String),
    Update(String, String),
    Delete(String),
}

fn add(t: &str) -> Seen {
    Seen::Add(t.to_string())
}

fn update(old: &str, new: &str) -> Seen {
    Seen::Update(old.to_string(), new.to_string())
}

fn delete(t: &str) -> Seen {
    Seen::Delete(t.to_string())
}

/// Records every callback; fails on objects named `bad`, panics on `boom`.
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, seen: Seen, obj: &ConfigMap) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(seen);
        match obj.metadata.name.as_deref() {
            Some("bad") => anyhow::bail!("refusing {}", tag(obj)),
            Some("boom") => panic!("handler blew up on {}", tag(obj)),
            _ => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ResourceHandler<ConfigMap> for Recorder {
    async fn on_add(&self, obj: Arc<ConfigMap>) -> anyhow::Result<()> {
        self.record(Seen::Add(tag(&obj)), &obj)
    }

    async fn on_update(&self, old: Arc<ConfigMap>, new: Arc<ConfigMap>) -> anyhow::Result<()> {
        self.record(Seen::Update(tag(&old), tag(&new)), &new)
    }

    async fn on_delete(&self, obj: Arc<ConfigMap>) -> anyhow::Result<()> {
        self.record(Seen::Delete(tag(&obj)), &obj)
    }
}

struct Harness {
    client: MockResourceClient<ConfigMap>,
    recorder: Arc<Recorder>,
    controller: Arc<Controller<ConfigMap>>,
    cancel: CancellationToken,
}

impl Harness {
    fn new(resync: Duration) -> Self {
        let client = MockResourceClient::new("configmaps");
        let recorder = Arc::new(Recorder::default());
        let controller = Controller::new(
            Arc::new(client.clone()),
            None,
            resync,
            Arc::clone(&recorder) as Arc<dyn ResourceHandler<ConfigMap>>,
        );
        Self {
            client,
            recorder,
            controller: Arc::new(controller),
            cancel: CancellationToken::new(),
        }
    }

    fn start(&self) -> JoinHandle<Result<(), InformerError>> {
        let controller = Arc::clone(&self.controller);
        let cancel = self.cancel.clone();
        tokio::spawn(async move { controller.run(cancel).await })
    }

    async fn stop(self, handle: JoinHandle<Result<(), InformerError>>) {
        self.cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(self.controller.state(), ControllerState::Stopped);
    }
}

fn watch_since(since: &str) -> MockCall {
    MockCall::Watch {
        since: since.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_add_modify_delete_scenario() {
    let h = Harness::new(Duration::from_secs(60));
    h.client.push_list(vec![cm("a", "1")], "1");
    h.client.push_watch(WatchScript::Hangs(vec![
        Ok(WatchEvent::Modified(cm("a", "2"))),
        Ok(WatchEvent::Deleted(cm("a", "3"))),
    ]));

    let handle = h.start();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        h.recorder.seen(),
        vec![add("a@1"), update("a@1", "a@2"), delete("a@2")]
    );
    assert!(h.controller.reader().is_empty());
    assert_eq!(h.client.calls(), vec![MockCall::List, watch_since("1")]);

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_ended_watch_does_not_relist_before_deadline() {
    let start = Instant::now();
    let h = Harness::new(Duration::from_secs(10));
    h.client.push_list(vec![cm("a", "1")], "1");
    h.client.push_watch(WatchScript::EndsAfter(Duration::from_secs(3), vec![]));
    h.client.push_list(vec![cm("a", "1")], "1");

    let handle = h.start();
    sleep(Duration::from_secs(15)).await;

    let calls = h.client.timed_calls();
    let lists: Vec<Duration> = calls
        .iter()
        .filter(|(call, _)| *call == MockCall::List)
        .map(|(_, at)| *at - start)
        .collect();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0], Duration::ZERO);
    assert!(lists[1] >= Duration::from_secs(10), "relisted at {:?}", lists[1]);

    // Ended at 3s, resumed from the same cursor after backoff
    assert_eq!(
        h.client.calls(),
        vec![
            MockCall::List,
            watch_since("1"),
            watch_since("1"),
            MockCall::List,
            watch_since("1"),
        ]
    );
    let second_watch = calls[2].1 - start;
    assert!(second_watch > Duration::from_secs(3) && second_watch < Duration::from_secs(10));

    // Resync re-delivers unchanged objects as updates
    assert_eq!(h.recorder.seen(), vec![add("a@1"), update("a@1", "a@1")]);

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_resync_delivers_delta() {
    let h = Harness::new(Duration::from_secs(10));
    h.client.push_list(vec![cm("a", "1"), cm("b", "1")], "1");
    h.client.push_list(vec![cm("b", "2"), cm("c", "1")], "4");

    let handle = h.start();
    sleep(Duration::from_secs(11)).await;

    assert_eq!(
        h.recorder.seen(),
        vec![
            add("a@1"),
            add("b@1"),
            update("b@1", "b@2"),
            add("c@1"),
            delete("a@1"),
        ]
    );
    assert_eq!(h.controller.reader().len(), 2);
    assert_eq!(h.client.calls().last(), Some(&watch_since("4")));

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_cursor_expired_relists_before_next_watch() {
    let h = Harness::new(Duration::from_secs(10));
    h.client.push_list(vec![cm("a", "1")], "1");
    h.client.push_watch(WatchScript::Ends(vec![Ok(WatchEvent::Error(
        ClientError::CursorExpired("too old resource version".to_string()),
    ))]));
    h.client.push_list(vec![cm("a", "5")], "5");

    let handle = h.start();
    sleep(Duration::from_secs(12)).await;

    assert_eq!(
        h.client.calls(),
        vec![MockCall::List, watch_since("1"), MockCall::List, watch_since("5")]
    );
    assert_eq!(h.recorder.seen(), vec![add("a@1"), update("a@1", "a@5")]);

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_expired_cursor_on_open_relists() {
    let h = Harness::new(Duration::from_secs(5));
    h.client.push_list(vec![], "1");
    h.client
        .push_watch(WatchScript::Fails(ClientError::from_status(410, "Gone")));
    h.client.push_list(vec![cm("a", "2")], "2");

    let handle = h.start();
    sleep(Duration::from_secs(6)).await;

    assert_eq!(
        h.client.calls(),
        vec![MockCall::List, watch_since("1"), MockCall::List, watch_since("2")]
    );

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_retry_with_same_cursor() {
    let h = Harness::new(Duration::from_secs(60));
    h.client
        .push_list_error(ClientError::Unavailable("connection refused".to_string()));
    h.client.push_list(vec![cm("a", "1")], "1");
    h.client.push_watch(WatchScript::Fails(ClientError::Unavailable(
        "connection reset".to_string(),
    )));
    h.client.push_watch(WatchScript::Ends(vec![Ok(WatchEvent::Error(
        ClientError::from_status(500, "internal error"),
    ))]));

    let handle = h.start();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(
        h.client.calls(),
        vec![
            MockCall::List,
            MockCall::List,
            watch_since("1"),
            watch_since("1"),
            watch_since("1"),
        ]
    );
    assert_eq!(h.client.list_count(), 2);
    assert_eq!(h.recorder.seen(), vec![add("a@1")]);

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_events_and_bookmarks_advance_cursor() {
    let h = Harness::new(Duration::from_secs(60));
    h.client.push_list(vec![cm("a", "1")], "1");
    h.client.push_watch(WatchScript::Ends(vec![Ok(WatchEvent::Modified(cm("a", "3")))]));
    h.client.push_watch(WatchScript::Ends(vec![Ok(WatchEvent::Bookmark("9".to_string()))]));

    let handle = h.start();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(
        h.client.calls(),
        vec![
            MockCall::List,
            watch_since("1"),
            watch_since("3"),
            watch_since("9"),
        ]
    );
    // Bookmarks never reach handlers
    assert_eq!(h.recorder.seen(), vec![add("a@1"), update("a@1", "a@3")]);

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_and_unknown_events_are_dropped() {
    let h = Harness::new(Duration::from_secs(60));
    h.client.push_list(vec![cm("a", "5")], "5");
    h.client.push_watch(WatchScript::Hangs(vec![
        Ok(WatchEvent::Modified(cm("a", "4"))),
        Ok(WatchEvent::Deleted(cm("ghost", "6"))),
        Ok(WatchEvent::Added(cm("b", "7"))),
    ]));

    let handle = h.start();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(h.recorder.seen(), vec![add("a@5"), add("b@7")]);
    assert_eq!(h.controller.reader().len(), 2);

    h.stop(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_skipped_stale_event_still_moves_cursor_forward() {
    let h = Harness::new(Duration::from_secs(60));
    h.client.push_list(vec![cm("a", "5")], "3");
    // a@4 is older than the stored a@5 but newer than the list cursor
    h.client.push_watch(WatchScript::Ends(vec![Ok(WatchEvent::Modified(cm("a", "4")))]));
    // a@2 is older than both; the cursor must not move back
    h.client.push_watch(WatchScript::Ends(vec![Ok(WatchEvent::Modified(cm("a", "2")))]));

    let handle = h.start();
    sleep(Duration::from_secs(5)).await;

    assert_eq!(
        h.client.calls(),
        vec![
            MockCall::List,
            watch_since("3"),
            watch_since("4"),
            watch_since("4"),
        ]
    );
    assert_eq!(h.recorder.seen(), vec![add("a@5")]);

    h.stop(handle).await;
}

#[test]
fn test_controller_debug_names_collection() {
    let h = Harness::new(Duration::from_secs(30));
    let rendered = format!("{:?}", h.controller);
    assert!(rendered.contains("configmaps"), "{rendered}");
    assert!(rendered.contains("NotStarted"), "{rendered}");
}

#[tokio::test(start_paused = true)]
async fn test_handler_failures_do_not_stop_delivery() {
    let registry = prometheus::Registry::new();
    let metrics = InformerMetrics::register(&registry).unwrap();

    let client = MockResourceClient::new("configmaps");
    let recorder = Arc::new(Recorder::default());
    let controller = Arc::new(
        Controller::new(
            Arc::new(client.clone()),
            None,
            Duration::from_secs(60),
            Arc::clone(&recorder) as Arc<dyn ResourceHandler<ConfigMap>>,
        )
        .with_metrics(metrics),
    );
    client.push_list(vec![cm("bad", "1"), cm("boom", "1"), cm("good", "1")], "1");
    client.push_watch(WatchScript::Hangs(vec![Ok(WatchEvent::Modified(cm("good", "2")))]));

    let cancel = CancellationToken::new();
    let handle = {
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        tokio::spawn(async move { controller.run(cancel).await })
    };
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        recorder.seen(),
        vec![add("bad@1"), add("boom@1"), add("good@1"), update("good@1", "good@2")]
    );
    assert_eq!(controller.reader().len(), 3);

    let text = prometheus::TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap();
    assert!(text.contains("informer_handler_failures_total{collection=\"configmaps\"} 2"));
    assert!(text.contains("informer_notifications_total{collection=\"configmaps\",kind=\"add\"} 3"));
    assert!(text.contains("informer_store_objects{collection=\"configmaps\"} 3"));

    cancel.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_run() {
    let h = Harness::new(Duration::from_secs(60));
    h.client.push_list(vec![cm("a", "1")], "1");
    assert_eq!(h.controller.state(), ControllerState::NotStarted);

    let handle = h.start();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(h.controller.state(), ControllerState::Running);

    let controller = Arc::clone(&h.controller);
    h.stop(handle).await;

    let again = controller.run(CancellationToken::new()).await;
    assert!(matches!(again, Err(InformerError::AlreadyStarted(name)) if name == "configmaps"));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff() {
    let h = Harness::new(Duration::from_secs(60));
    let controller = Arc::clone(&h.controller);
    let handle = h.start();
    // Every list fails, so the reflector sits in backoff
    sleep(Duration::from_secs(2)).await;
    assert!(h.client.list_count() >= 2);

    h.stop(handle).await;
    assert_eq!(controller.state(), ControllerState::Stopped);
    assert!(controller.reader().is_empty());
}
