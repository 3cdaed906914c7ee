use actix_web::{http::header, HttpResponse};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, TextEncoder};

pub static ONLINE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new(
        "realtime_chat_online_connections",
        "Users with a live connection",
    )
    .expect("failed to create realtime_chat_online_connections");
    prometheus::default_registry()
        .register(Box::new(gauge.clone()))
        .expect("failed to register realtime_chat_online_connections");
    gauge
});

static EVENTS_ROUTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "realtime_chat_events_routed_total",
            "Server events routed to connections",
        ),
        &["event", "outcome"],
    )
    .expect("failed to create realtime_chat_events_routed_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register realtime_chat_events_routed_total");
    counter
});

static MESSAGES_SENT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "realtime_chat_messages_sent_total",
            "Messages persisted by the send pipeline",
        ),
        &["type"],
    )
    .expect("failed to create realtime_chat_messages_sent_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register realtime_chat_messages_sent_total");
    counter
});

static PUSH_NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "realtime_chat_push_notifications_total",
            "Push notifications handed to the push collaborator",
        ),
        &["outcome"],
    )
    .expect("failed to create realtime_chat_push_notifications_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register realtime_chat_push_notifications_total");
    counter
});

/// `outcome` is one of `delivered` or `offline`.
pub fn record_event_routed(event: &str, outcome: &str) {
    EVENTS_ROUTED_TOTAL
        .with_label_values(&[event, outcome])
        .inc();
}

pub fn record_message_sent(message_type: &str) {
    MESSAGES_SENT_TOTAL.with_label_values(&[message_type]).inc();
}

pub fn record_push(outcome: &str) {
    PUSH_NOTIFICATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, encoder.format_type().to_string()))
        .body(buffer)
}
