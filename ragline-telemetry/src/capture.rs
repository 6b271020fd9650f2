//! In-memory capture of spans and events.
//!
//! [`SpanCapture`] records every closed span and every event into shared
//! storage so tests can assert on what the pipeline logged.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::subscriber::DefaultGuard;
use tracing::{Id, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

/// A span that has closed.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedSpan {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub fields: HashMap<String, Value>,
    pub duration: Duration,
}

/// A single log event.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedEvent {
    pub level: String,
    pub target: String,
    /// Name of the innermost span the event was emitted in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<String>,
    pub fields: HashMap<String, Value>,
}

impl CapturedEvent {
    /// The event's `message` field, if any.
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }
}

#[derive(Debug, Default)]
struct Storage {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
}

/// Shared storage for captured spans and events.
///
/// Cloning is cheap; all clones see the same records.
#[derive(Debug, Clone, Default)]
pub struct SpanCapture {
    storage: Arc<RwLock<Storage>>,
}

impl SpanCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that writes into this capture.
    pub fn layer(&self) -> SpanCaptureLayer {
        SpanCaptureLayer { capture: self.clone() }
    }

    /// Install a subscriber recording into this capture for the current
    /// thread, until the guard is dropped.
    pub fn install_default(&self) -> DefaultGuard {
        let subscriber = Registry::default().with(self.layer());
        tracing::subscriber::set_default(subscriber)
    }

    /// Closed spans, in closing order.
    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner).spans.clone()
    }

    /// Closed spans with the given name.
    pub fn spans_named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans().into_iter().filter(|s| s.name == name).collect()
    }

    /// Events, in emission order.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner).events.clone()
    }

    /// Events at the given level (`"ERROR"`, `"INFO"`, ...).
    pub fn events_at(&self, level: &str) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.level == level).collect()
    }

    pub fn clear(&self) {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        storage.spans.clear();
        storage.events.clear();
    }
}

/// The [`Layer`] half of a [`SpanCapture`].
pub struct SpanCaptureLayer {
    capture: SpanCapture,
}

#[derive(Clone)]
struct SpanFields(HashMap<String, Value>);

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);

        let mut extensions = span.extensions_mut();
        extensions.insert(Instant::now());
        extensions.insert(SpanFields(visitor.0));
    }

    fn on_record(&self, id: &Id, values: &tracing::span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            let mut visitor = JsonVisitor::default();
            values.record(&mut visitor);
            fields.0.extend(visitor.0);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();

        let captured = CapturedEvent {
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            span: ctx.event_span(event).map(|s| s.name().to_string()),
            fields: visitor.0,
        };
        self.capture.storage.write().unwrap_or_else(PoisonError::into_inner).events.push(captured);
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(&id) else { return };
        let extensions = span.extensions();
        let duration = extensions.get::<Instant>().map(Instant::elapsed).unwrap_or_default();
        let fields = extensions.get::<SpanFields>().map(|f| f.0.clone()).unwrap_or_default();

        let captured = CapturedSpan {
            name: span.name().to_string(),
            parent: span.parent().map(|p| p.name().to_string()),
            fields,
            duration,
        };
        self.capture.storage.write().unwrap_or_else(PoisonError::into_inner).spans.push(captured);
    }
}

#[derive(Default)]
struct JsonVisitor(HashMap<String, Value>);

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }
}
