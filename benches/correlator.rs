//! Performance benchmarks for codebolt-sdk
//!
//! Run with: cargo bench

use codebolt_sdk::modules::agent_event_queue::{AgentEvent, LocalEventCache};
use codebolt_sdk::{ClientConfig, MemoryTransport, MessageManager, Operation, Request, Response};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

const PING: Operation = Operation::new("ping", "pingResponse");

fn echo_manager(rt: &tokio::runtime::Runtime) -> Arc<MessageManager> {
    let transport = Arc::new(MemoryTransport::with_responder(|msg| {
        Some(serde_json::json!({
            "type": "pingResponse",
            "requestId": msg["requestId"],
            "success": true,
            "data": {"pong": true}
        }))
    }));
    let _guard = rt.enter();
    Arc::new(MessageManager::new(transport, &ClientConfig::default()).unwrap())
}

fn event(i: usize) -> AgentEvent {
    serde_json::from_value(serde_json::json!({
        "eventId": format!("evt-{}", i),
        "priority": "normal",
        "payload": {"i": i}
    }))
    .unwrap()
}

fn bench_envelopes(c: &mut Criterion) {
    c.bench_function("Request build", |b| {
        b.iter(|| PING.request(serde_json::json!({"n": 1})).unwrap());
    });

    let raw = serde_json::json!({
        "type": "agentEventQueue.getPendingEvents",
        "requestId": "r-1",
        "success": true,
        "data": {"events": [{"eventId": "e1"}, {"eventId": "e2"}]},
        "extra": 1
    })
    .to_string();
    c.bench_function("Response parse", |b| {
        b.iter(|| serde_json::from_str::<Response>(&raw).unwrap());
    });

    let request = Request::new("ping");
    c.bench_function("Request serialize", |b| {
        b.iter(|| serde_json::to_string(&request).unwrap());
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let manager = echo_manager(&rt);

    c.bench_function("call round trip", |b| {
        b.to_async(&rt)
            .iter(|| async { manager.call(&PING, serde_json::json!({})).await.unwrap() });
    });

    let mut group = c.benchmark_group("concurrent_calls");
    for count in [10, 100] {
        group.bench_function(format!("{} calls", count), |b| {
            b.to_async(&rt).iter(|| async {
                let calls = (0..count).map(|_| manager.call(&PING, serde_json::json!({})));
                for response in futures::future::join_all(calls).await {
                    response.unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_push_drain");
    for count in [10, 100, 1000] {
        let events: Vec<AgentEvent> = (0..count).map(event).collect();
        group.bench_function(format!("{} events", count), |b| {
            b.iter(|| {
                let cache = LocalEventCache::new(count);
                for event in &events {
                    cache.push(event.clone());
                }
                cache.drain(None)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_envelopes, bench_round_trip, bench_cache);
criterion_main!(benches);
