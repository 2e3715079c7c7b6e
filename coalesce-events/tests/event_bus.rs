use coalesce_events::{EventBus, Handler, HandlerError};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Calls = Arc<Mutex<Vec<Value>>>;

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn record(bus: &EventBus, topic: &str) -> (String, Calls) {
    let calls: Calls = Arc::default();
    let sink = calls.clone();
    let token = bus.subscribe(topic, move |payload: Arc<Value>| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push((*payload).clone());
        }
    });
    (token, calls)
}

fn calls(calls: &Calls) -> Vec<Value> {
    calls.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_returns_generated_token() {
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    let bus: EventBus = EventBus::builder()
        .token_generator(move || format!("tok-{}", c.fetch_add(1, Ordering::SeqCst)))
        .build();

    assert_eq!(bus.subscribe("t", |_: Arc<Value>| async {}), "tok-0");
    assert_eq!(bus.subscribe("t", |_: Arc<Value>| async {}), "tok-1");
    assert_eq!(bus.subscriber_count("t"), 2);
    assert!(bus.is_subscribed("t", "tok-1"));
    assert!(!bus.is_subscribed("other", "tok-1"));
}

#[tokio::test(start_paused = true)]
async fn test_stored_handler_is_the_same_reference() {
    let bus: EventBus = EventBus::new();
    let handler: Arc<dyn Handler<Value>> = Arc::new(|_: Arc<Value>| async {});

    let token = bus.subscribe_shared("t", handler.clone());
    let stored = bus.handler("t", &token).unwrap();
    assert!(Arc::ptr_eq(&stored, &handler));
    assert!(bus.handler("t", "missing").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_default_tokens_are_random() {
    let bus: EventBus = EventBus::new();
    let a = bus.subscribe("t", |_: Arc<Value>| async {});
    let b = bus.subscribe("t", |_: Arc<Value>| async {});
    assert_eq!(a.len(), 16);
    assert_ne!(a, b);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_only_handler_removes_topic() {
    let bus: EventBus = EventBus::new();
    let (token, _) = record(&bus, "t");
    assert_eq!(bus.active_topics(), vec!["t"]);

    assert!(bus.unsubscribe("t", &token));
    assert!(bus.active_topics().is_empty());
    assert!(!bus.unsubscribe("t", &token));
    assert!(!bus.unsubscribe("unknown", "x"));
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_one_of_several_keeps_the_rest() {
    let bus: EventBus = EventBus::new();
    let (first, first_calls) = record(&bus, "t");
    let (second, second_calls) = record(&bus, "t");

    bus.unsubscribe("t", &first);
    assert_eq!(bus.active_topics(), vec!["t"]);
    assert!(bus.is_subscribed("t", &second));

    bus.publish("t", json!({"n": 1}));
    sleep_ms(250).await;
    assert!(calls(&first_calls).is_empty());
    assert_eq!(calls(&second_calls), vec![json!({"n": 1})]);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_all_silences_topic() {
    let bus: EventBus = EventBus::new();
    let (_, a) = record(&bus, "t2");
    let (_, b) = record(&bus, "t2");
    record(&bus, "kept");

    assert!(bus.unsubscribe_all("t2"));
    assert!(!bus.unsubscribe_all("t2"));
    bus.publish("t2", json!({"x": 1}));
    sleep_ms(500).await;

    assert!(calls(&a).is_empty());
    assert!(calls(&b).is_empty());
    assert_eq!(bus.active_topics(), vec!["kept"]);
}

#[tokio::test(start_paused = true)]
async fn test_remove_all_topics_empties_registry() {
    let bus: EventBus = EventBus::new();
    for topic in ["a", "b", "c"] {
        record(&bus, topic);
        record(&bus, topic);
    }
    assert_eq!(bus.active_topics(), vec!["a", "b", "c"]);

    bus.remove_all_topics();
    assert!(bus.active_topics().is_empty());
    assert_eq!(bus.subscriber_count("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_topic_name_is_valid() {
    let bus: EventBus = EventBus::new();
    let (_, calls_) = record(&bus, "");
    bus.publish("", json!(1));
    sleep_ms(250).await;
    assert_eq!(calls(&calls_), vec![json!(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_publish_without_subscribers_is_silent() {
    let reports = Arc::new(AtomicUsize::new(0));
    let r = reports.clone();
    let bus: EventBus = EventBus::builder()
        .on_publish_error(move |_: &HandlerError, _: &Value| {
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let (_, other) = record(&bus, "other");

    bus.publish("nobody", json!({"a": 1}));
    sleep_ms(500).await;

    assert_eq!(reports.load(Ordering::SeqCst), 0);
    assert!(calls(&other).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_zero_window_delivers_once() {
    let bus: EventBus = EventBus::builder().max_batch_time(Duration::ZERO).build();
    let (_, calls_) = record(&bus, "t");

    bus.publish("t", json!({"z": 1}));
    sleep_ms(1).await;
    assert_eq!(calls(&calls_), vec![json!({"z": 1})]);

    sleep_ms(500).await;
    assert_eq!(calls(&calls_).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_publish_delivers_after_window() {
    let bus: EventBus = EventBus::new();
    let (_, calls_) = record(&bus, "t");

    bus.publish("t", json!({"a": 1}));
    assert!(calls(&calls_).is_empty(), "publish must not run handlers inline");

    sleep_ms(250).await;
    assert_eq!(calls(&calls_), vec![json!({"a": 1})]);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reported_with_payload_and_sibling_runs() {
    let reports: Arc<Mutex<Vec<(String, bool, Value)>>> = Arc::default();
    let sink = reports.clone();
    let bus: EventBus = EventBus::builder()
        .max_batch_time(Duration::ZERO)
        .on_publish_error(move |err: &HandlerError, payload: &Value| {
            sink.lock()
                .unwrap()
                .push((err.topic().to_string(), err.is_panic(), payload.clone()));
        })
        .build();

    bus.subscribe("t", |_: Arc<Value>| async { Err::<(), _>("boom") });
    let (_, sibling) = record(&bus, "t");

    bus.publish("t", json!({"a": 1}));
    sleep_ms(1).await;

    assert_eq!(calls(&sibling), vec![json!({"a": 1})]);
    assert_eq!(
        *reports.lock().unwrap(),
        vec![("t".to_string(), false, json!({"a": 1}))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_handler_is_contained() {
    let reports: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = reports.clone();
    let bus: EventBus = EventBus::builder()
        .max_batch_time(Duration::ZERO)
        .on_publish_error(move |err: &HandlerError, payload: &Value| {
            assert_eq!(payload, &json!({"p": 1}));
            sink.lock().unwrap().push(err.to_string());
        })
        .build();

    bus.subscribe("t", |payload: Arc<Value>| async move {
        assert!(payload.is_null(), "kaboom");
    });
    let (_, sibling) = record(&bus, "t");

    bus.publish("t", json!({"p": 1}));
    sleep_ms(1).await;

    assert_eq!(calls(&sibling).len(), 1);
    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].contains("panicked"));
    assert!(reports[0].contains("kaboom"));
}

#[tokio::test(start_paused = true)]
async fn test_bus_survives_failing_rounds() {
    let bus: EventBus = EventBus::builder()
        .max_batch_time(Duration::ZERO)
        .on_publish_error(|_: &HandlerError, _: &Value| {})
        .build();
    bus.subscribe("t", |_: Arc<Value>| async { Err::<(), _>("always") });
    let (_, calls_) = record(&bus, "t");

    for n in 0..3 {
        bus.publish("t", json!(n));
        sleep_ms(1).await;
    }
    assert_eq!(calls(&calls_), vec![json!(0), json!(1), json!(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_clones_share_state() {
    let bus: EventBus = EventBus::builder().max_batch_time(Duration::ZERO).build();
    let clone = bus.clone();
    let (_, calls_) = record(&clone, "t");

    assert_eq!(bus.active_topics(), vec!["t"]);
    bus.publish("t", json!("hi"));
    sleep_ms(1).await;
    assert_eq!(calls(&calls_), vec![json!("hi")]);
}

#[derive(Serialize)]
struct Order {
    id: u32,
    item: &'static str,
}

#[tokio::test(start_paused = true)]
async fn test_publish_json_serializes_payload() {
    let bus: EventBus = EventBus::builder().max_batch_time(Duration::ZERO).build();
    let (_, calls_) = record(&bus, "orders");

    bus.publish_json("orders", &Order { id: 7, item: "tea" }).unwrap();
    sleep_ms(1).await;
    assert_eq!(calls(&calls_), vec![json!({"id": 7, "item": "tea"})]);
}

#[tokio::test(start_paused = true)]
async fn test_publish_json_error_leaves_bus_untouched() {
    let bus: EventBus = EventBus::builder().max_batch_time(Duration::ZERO).build();
    let (_, calls_) = record(&bus, "t");

    let mut bad = BTreeMap::new();
    bad.insert(vec![1u8], 1u8);
    assert!(bus.publish_json("t", &bad).is_err());

    sleep_ms(10).await;
    assert!(calls(&calls_).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_typed_payloads() {
    #[derive(Debug, PartialEq)]
    struct Tick(u64);

    let bus: EventBus<Tick> = EventBus::builder().max_batch_time(Duration::ZERO).build();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe("ticks", move |tick: Arc<Tick>| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push(tick.0);
        }
    });

    bus.publish("ticks", Tick(3));
    sleep_ms(1).await;
    assert_eq!(*seen.lock().unwrap(), vec![3]);
}
