//! Dispatch scenario tests on a single process bus
//!
//! Run with: cargo test -p integration-tests --test bus_tests

use hookbus_core::{args, channels, BusConfig, BusError, EventArgs, EventBus, Handler};
use hookbus_node::{ItemCounters, UserCache};
use integration_tests::{unique_channel, with_timeout, Recorder};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::oneshot;

// ============================================================================
// Item lifecycle
// ============================================================================

#[tokio::test]
async fn test_item_created_notify_and_count() {
    let bus = EventBus::default();
    let recorder = Recorder::new();
    let counters = Arc::new(ItemCounters::new());
    bus.subscribe(channels::ITEM_CREATED, "notify", recorder.handler("notify", Value::Null));
    counters.register(&bus);

    bus.fan_out(channels::ITEM_CREATED, args![42]).await.unwrap();

    assert_eq!(recorder.calls()[0].args, vec![json!(42)]);
    assert_eq!(counters.created(), 1);
}

#[tokio::test]
async fn test_item_created_failure_does_not_roll_back_siblings() {
    let bus = EventBus::default();
    let counters = Arc::new(ItemCounters::new());
    let (release, released) = oneshot::channel::<()>();
    let released = Arc::new(parking_lot::Mutex::new(Some(released)));

    // Slow notifier fails only after the counter has run
    bus.subscribe(
        channels::ITEM_CREATED,
        "notify",
        Handler::new(move |_| {
            let released = released.lock().take();
            async move {
                if let Some(released) = released {
                    released.await.ok();
                }
                Err::<Value, _>(anyhow::anyhow!("mail server unavailable"))
            }
        }),
    );
    counters.register(&bus);

    let dispatch = bus.fan_out(channels::ITEM_CREATED, args![42]);
    tokio::pin!(dispatch);

    // Counter completes while the notifier is still blocked
    tokio::select! {
        biased;
        _ = &mut dispatch => panic!("fan-out finished before the notifier failed"),
        () = async {
            while counters.created() == 0 {
                tokio::task::yield_now().await;
            }
        } => {}
    }
    release.send(()).unwrap();

    let err = with_timeout(dispatch).await.unwrap().unwrap_err();
    assert_eq!(err.label(), "notify");
    assert_eq!(err.channel(), channels::ITEM_CREATED);
    assert_eq!(counters.created(), 1);
}

#[tokio::test]
async fn test_before_create_veto_stops_later_checks() {
    let bus = EventBus::default();
    let recorder = Recorder::new();
    bus.subscribe(
        channels::ITEM_BEFORE_CREATE,
        "quota",
        recorder.failing("quota", "quota exceeded"),
    );
    bus.subscribe(
        channels::ITEM_BEFORE_CREATE,
        "spam-check",
        recorder.handler("spam-check", Value::Null),
    );

    let err = bus
        .sequential(channels::ITEM_BEFORE_CREATE, args!["system", json!({"title": "A+B"})])
        .await
        .unwrap_err();

    assert!(matches!(err, BusError::SubscriberFailure { .. }));
    assert_eq!(err.handler_error().unwrap().to_string(), "quota exceeded");
    assert_eq!(recorder.labels(), vec!["quota"]);
}

// ============================================================================
// Bail
// ============================================================================

#[tokio::test]
async fn test_visibility_first_present_answer_wins() {
    let bus = EventBus::default();
    let recorder = Recorder::new();
    bus.subscribe(channels::ITEM_VISIBILITY, "no-opinion", recorder.handler("no-opinion", Value::Null));
    bus.subscribe(channels::ITEM_VISIBILITY, "declines", recorder.handler("declines", json!(false)));
    bus.subscribe(channels::ITEM_VISIBILITY, "hidden", recorder.handler("hidden", json!("hidden")));
    bus.subscribe(channels::ITEM_VISIBILITY, "public", recorder.handler("public", json!("public")));

    let answer = bus
        .bail(channels::ITEM_VISIBILITY, args![json!({"id": 1}), 7])
        .await
        .unwrap();

    assert_eq!(answer, Some(json!("hidden")));
    assert_eq!(recorder.labels(), vec!["no-opinion", "declines", "hidden"]);
}

#[tokio::test]
async fn test_priority_subscriber_overrides_visibility() {
    let bus = EventBus::default();
    let recorder = Recorder::new();
    bus.subscribe(channels::ITEM_VISIBILITY, "default", recorder.handler("default", json!("public")));
    bus.subscribe_priority(channels::ITEM_VISIBILITY, "admin", recorder.handler("admin", json!("admin")));

    let answer = bus.bail(channels::ITEM_VISIBILITY, args![json!({"id": 1}), 1]).await.unwrap();

    assert_eq!(answer, Some(json!("admin")));
    assert_eq!(recorder.labels(), vec!["admin"]);
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_startup_hooks_run_once() {
    let bus = EventBus::default();
    let recorder = Recorder::new();
    bus.subscribe_once(channels::APP_STARTED, "ensure-indexes", recorder.handler("ensure-indexes", Value::Null));
    bus.subscribe_once(channels::APP_STARTED, "load-settings", recorder.handler("load-settings", Value::Null));

    bus.fan_out(channels::APP_STARTED, EventArgs::empty()).await.unwrap();
    bus.fan_out(channels::APP_STARTED, EventArgs::empty()).await.unwrap();

    assert_eq!(recorder.len(), 2);
    assert_eq!(recorder.count("ensure-indexes"), 1);
    assert_eq!(bus.subscriber_count(channels::APP_STARTED), 0);
}

#[tokio::test]
async fn test_leak_threshold_is_configurable() {
    let bus = EventBus::new(BusConfig::default().with_high_water_mark(4));
    let channel = unique_channel("leak");
    let recorder = Recorder::new();
    for _ in 0..6 {
        bus.subscribe(&channel, "listener", recorder.handler("listener", Value::Null));
    }

    assert_eq!(bus.subscriber_count(&channel), 6);
    bus.sequential(&channel, EventArgs::empty()).await.unwrap();
    assert_eq!(recorder.len(), 6);
}

// ============================================================================
// Broadcast without a relay
// ============================================================================

#[tokio::test]
async fn test_local_broadcast_evicts_user_cache() {
    let bus = EventBus::default();
    let cache = Arc::new(UserCache::new());
    cache.register(&bus);
    cache.insert("id/1/system", json!({"uname": "root"}));
    cache.insert("name/root/system", json!({"uname": "root"}));
    cache.insert("id/2/system", json!({"uname": "guest"}));

    hookbus_node::delete_user_cache(&bus, json!({"_id": 1, "uname": "Root", "mail": "root@localhost"}))
        .await
        .unwrap();

    assert_eq!(cache.len(), 1);
    assert!(cache.get("id/2/system").is_some());
}

#[tokio::test]
async fn test_local_broadcast_reports_subscriber_failure() {
    let bus = EventBus::default();
    let recorder = Recorder::new();
    bus.subscribe(channels::SYSTEM_SETTING, "reload", recorder.failing("reload", "bad setting"));

    let err = bus
        .broadcast(channels::SYSTEM_SETTING, args![json!({"lang": "en"})])
        .await
        .unwrap_err();

    assert_eq!(err.label(), "reload");
    assert_eq!(recorder.calls()[0].args, vec![json!({"lang": "en"})]);
}
