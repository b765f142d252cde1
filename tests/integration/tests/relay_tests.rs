//! Cross-process broadcast tests
//!
//! In-memory tests simulate several processes inside one test. Redis tests
//! require a running Redis instance and `REDIS_URL`; they are skipped
//! otherwise.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use hookbus_core::{args, channels, BusConfig, EventArgs, EventBus};
use hookbus_relay::{RedisPool, RedisPoolConfig, RedisTransport};
use integration_tests::{
    check_redis_env, settle, unique_channel, wait_until, Recorder, TestCluster,
};
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// In-memory relay
// ============================================================================

#[tokio::test]
async fn test_sender_and_sibling_each_see_one_delivery() {
    let cluster = TestCluster::memory(2);
    let sender = Recorder::new();
    let sibling = Recorder::new();
    cluster
        .node(0)
        .bus
        .subscribe(channels::USER_DELCACHE, "evict", sender.handler("evict", Value::Null));
    cluster
        .node(1)
        .bus
        .subscribe(channels::USER_DELCACHE, "evict", sibling.handler("evict", Value::Null));

    cluster
        .node(0)
        .bus
        .broadcast(channels::USER_DELCACHE, args!["system"])
        .await
        .unwrap();

    wait_until(|| sender.len() == 1 && sibling.len() == 1).await.unwrap();
    settle().await;

    assert_eq!(sender.len(), 1);
    assert_eq!(sibling.len(), 1);
    assert_eq!(sibling.calls()[0].args, vec![json!("system")]);

    cluster.stop().await;
}

#[tokio::test]
async fn test_plain_fan_out_stays_local() {
    let cluster = TestCluster::memory(2);
    let channel = unique_channel("local");
    let sibling = Recorder::new();
    cluster
        .node(1)
        .bus
        .subscribe(&channel, "observer", sibling.handler("observer", Value::Null));

    cluster.node(0).bus.fan_out(&channel, EventArgs::empty()).await.unwrap();
    settle().await;

    assert!(sibling.is_empty());
    assert_eq!(cluster.node(1).relay.stats().received, 0);

    cluster.stop().await;
}

#[tokio::test]
async fn test_sibling_failure_is_not_reported_to_sender() {
    let cluster = TestCluster::memory(3);
    let channel = unique_channel("failing");
    let healthy = Recorder::new();
    cluster
        .node(1)
        .bus
        .subscribe(&channel, "broken", healthy.failing("broken", "boom"));
    cluster
        .node(2)
        .bus
        .subscribe(&channel, "healthy", healthy.handler("healthy", Value::Null));

    cluster
        .node(0)
        .bus
        .broadcast(&channel, args![1, 2])
        .await
        .unwrap();

    wait_until(|| cluster.node(1).relay.stats().failed == 1).await.unwrap();
    wait_until(|| healthy.count("healthy") == 1).await.unwrap();
    assert_eq!(cluster.node(0).relay.stats().received, 1);

    cluster.stop().await;
}

#[tokio::test]
async fn test_once_subscriber_across_repeated_broadcasts() {
    let cluster = TestCluster::memory(2);
    let channel = unique_channel("once");
    let recorder = Recorder::new();
    cluster
        .node(1)
        .bus
        .subscribe_once(&channel, "first-only", recorder.handler("first-only", Value::Null));

    for n in 0..3 {
        cluster.node(0).bus.broadcast(&channel, args![n]).await.unwrap();
    }

    wait_until(|| cluster.node(1).relay.stats().delivered == 3).await.unwrap();
    assert_eq!(recorder.len(), 1);
    assert_eq!(cluster.node(1).bus.subscriber_count(&channel), 0);

    cluster.stop().await;
}

// ============================================================================
// Redis relay
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_redis_broadcast_reaches_both_nodes() {
    let Some(url) = check_redis_env().await else {
        return;
    };

    let relay_channel = unique_channel("hookbus-test");
    let cluster = TestCluster::redis(&url, &relay_channel, 2).await.unwrap();
    let sender = Recorder::new();
    let sibling = Recorder::new();
    cluster
        .node(0)
        .bus
        .subscribe(channels::CACHE_INVALIDATE, "evict", sender.handler("evict", Value::Null));
    cluster
        .node(1)
        .bus
        .subscribe(channels::CACHE_INVALIDATE, "evict", sibling.handler("evict", Value::Null));

    cluster
        .node(0)
        .bus
        .broadcast(channels::CACHE_INVALIDATE, args!["user/1"])
        .await
        .unwrap();

    wait_until(|| sender.len() == 1 && sibling.len() == 1).await.unwrap();
    settle().await;
    assert_eq!(sender.len(), 1);
    assert_eq!(sibling.calls()[0].args, vec![json!("user/1")]);

    cluster.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_redis_publish_without_listeners_falls_back_to_local() {
    let Some(url) = check_redis_env().await else {
        return;
    };

    // No listener is subscribed to this relay channel
    let pool = RedisPool::new(RedisPoolConfig {
        url,
        max_connections: 2,
    })
    .unwrap();
    let transport = Arc::new(RedisTransport::new(pool, unique_channel("hookbus-unheard")));
    let bus = EventBus::with_transport(BusConfig::default(), transport);
    let recorder = Recorder::new();
    bus.subscribe(channels::USER_DELCACHE, "evict", recorder.handler("evict", Value::Null));

    bus.broadcast(channels::USER_DELCACHE, args!["system"]).await.unwrap();

    assert_eq!(recorder.len(), 1);
    assert_eq!(recorder.calls()[0].args, vec![json!("system")]);
}
