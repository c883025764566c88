#![forbid(unsafe_code)]

//! Structured logging emitted by the lifecycle.
//!
//! A capture layer records every event with its fields so the tests can
//! assert on lifecycle milestones without a formatter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use slotpage_runtime::{
    BufferSurface, Container, ContainerConfig, ContainerRegistry, Contents, OpenOutcome, Task,
    TickScheduler, ViewerId,
};

use tracing_subscriber::layer::SubscriberExt;

// ============================================================================
// Test Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: String,
    fields: HashMap<String, String>,
}

impl CapturedEvent {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor {
            message: String::new(),
            fields: HashMap::new(),
        };
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

fn with_captured_events(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: Arc::clone(&events),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn find<'a>(events: &'a [CapturedEvent], message: &str) -> Vec<&'a CapturedEvent> {
    events.iter().filter(|e| e.message == message).collect()
}

const ALICE: ViewerId = ViewerId(7);

fn filled(count: usize) -> Container<String> {
    Container::builder()
        .config(ContainerConfig::default().with_rows(1))
        .provider(move |_viewer: ViewerId, contents: &mut Contents<String>| {
            contents.extend_items((0..count).map(|n| format!("entry {n}")));
        })
        .build()
        .unwrap()
}

fn registry() -> ContainerRegistry<String, BufferSurface<String>, TickScheduler> {
    ContainerRegistry::new(BufferSurface::new(), TickScheduler::new())
}

// ============================================================================
// Lifecycle milestones
// ============================================================================

#[test]
fn open_and_close_are_logged_with_viewer_and_container() {
    let events = with_captured_events(|| {
        let mut reg = registry();
        reg.open(ALICE, &filled(3)).unwrap();
        reg.close(ALICE).unwrap();
    });

    let opened = find(&events, "container opened");
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].level, tracing::Level::DEBUG);
    assert_eq!(opened[0].field("viewer"), Some("viewer-7"));
    assert_eq!(opened[0].field("container"), Some("container-0"));
    assert_eq!(opened[0].field("page"), Some("0"));

    let closed = find(&events, "container closed");
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].field("state"), Some("Closed"));
}

#[test]
fn page_changes_record_both_pages() {
    let events = with_captured_events(|| {
        let mut reg = registry();
        reg.open(ALICE, &filled(20)).unwrap();
        reg.next_page(ALICE).unwrap();
        reg.next_page(ALICE).unwrap();
    });

    let changes = find(&events, "page changed");
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].field("from_page"), Some("0"));
    assert_eq!(changes[0].field("to_page"), Some("1"));
    assert_eq!(changes[1].field("from_page"), Some("1"));
    assert_eq!(changes[1].field("to_page"), Some("2"));
}

#[test]
fn failed_open_warns_with_the_error() {
    let events = with_captured_events(|| {
        let mut reg = registry();
        assert!(reg.open_page(ALICE, &filled(3), 5).is_err());
    });

    let rolled_back = find(&events, "open rolled back");
    assert_eq!(rolled_back.len(), 1);
    assert_eq!(rolled_back[0].level, tracing::Level::WARN);
    assert_eq!(rolled_back[0].field("page"), Some("5"));
    assert!(
        rolled_back[0]
            .field("error")
            .is_some_and(|e| e.contains("page 5")),
        "error field: {:?}",
        rolled_back[0].field("error")
    );
    assert!(find(&events, "container opened").is_empty());
}

#[test]
fn superseded_tasks_are_traced_and_ignored() {
    let events = with_captured_events(|| {
        let mut reg = registry();
        let OpenOutcome::Opened(id) = reg.open(ALICE, &filled(1)).unwrap() else {
            panic!("expected open");
        };
        reg.close(ALICE).unwrap();
        assert!(!reg.dispatch(Task::Update {
            viewer: ALICE,
            container: id,
        }));
    });

    let ignored = find(&events, "ignoring task for superseded container");
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].level, tracing::Level::TRACE);
    assert_eq!(ignored[0].field("task"), Some("update"));
    assert_eq!(ignored[0].field("viewer"), Some("viewer-7"));
}

#[test]
fn placement_pass_reports_new_items() {
    let events = with_captured_events(|| {
        let mut reg = registry();
        reg.open(ALICE, &filled(2)).unwrap();
        reg.update_contents(ALICE, |contents| {
            contents.add_item("late arrival".to_string());
        })
        .unwrap();
    });

    let prepared = find(&events, "container prepared");
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared[0].field("placed"), Some("2"));

    let placed = find(&events, "placed new items");
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].field("placed"), Some("1"));
}
