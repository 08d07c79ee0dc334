//! Forwards an application's own `tracing` events to a [`ShipperHandle`].

use crate::shipper::ShipperHandle;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::{self, Write};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Crates whose events would feed back into the shipper itself.
const IGNORED_CRATES: [&str; 10] = [
    "cwlogs",
    "cwlogs_aws",
    "h2",
    "hyper",
    "hyper_util",
    "reqwest",
    "rustls",
    "tokio",
    "tokio_util",
    "tower",
];
const IGNORED_CRATE_FAMILIES: [&str; 1] = ["aws_"];

/// Renders each event as `<time> <LEVEL> <target>: <message> k=v ...` and
/// queues it with the event's wall-clock time.
#[derive(Clone)]
pub struct ShipperLayer {
    handle: ShipperHandle,
}

impl ShipperLayer {
    pub fn new(handle: ShipperHandle) -> Self {
        Self { handle }
    }
}

// Matched on the crate segment of the target, so `tokio_jobs::..` is kept.
fn is_ignored(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    IGNORED_CRATES.contains(&krate)
        || IGNORED_CRATE_FAMILIES
            .iter()
            .any(|family| krate.starts_with(family))
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: String,
}

impl FieldVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        let _ = write!(self.fields, " {}={}", name, value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}

pub(crate) fn render(
    time: DateTime<Utc>,
    level: &tracing::Level,
    target: &str,
    message: &str,
    fields: &str,
) -> String {
    format!(
        "{} {} {}: {}{}",
        time.to_rfc3339_opts(SecondsFormat::Millis, true),
        level,
        target,
        message,
        fields
    )
}

impl<S> Layer<S> for ShipperLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_ignored(metadata.target()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let now = Utc::now();
        let line = render(
            now,
            metadata.level(),
            metadata.target(),
            &visitor.message,
            &visitor.fields,
        );
        self.handle.submit(now.timestamp_millis(), line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shipper::EventQueue;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_render_format() {
        let time = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let line = render(time, &tracing::Level::WARN, "app::db", "slow query", " ms=812");
        assert_eq!(line, "2023-11-14T22:13:20.123Z WARN app::db: slow query ms=812");
    }

    #[rstest]
    #[case("cwlogs::shipper", true)]
    #[case("cwlogs_aws::aws_metadata", true)]
    #[case("aws_smithy_runtime", true)]
    #[case("aws_sdk_cloudwatchlogs::client", true)]
    #[case("hyper_util::client", true)]
    #[case("reqwest::connect", true)]
    #[case("tokio", true)]
    #[case("tokio_util::codec", true)]
    #[case("h2o_app::handlers", false)]
    #[case("tokio_jobs::worker", false)]
    #[case("cwlogs_dashboard", false)]
    #[case("my_app::handlers", false)]
    #[case("app", false)]
    fn test_ignored_targets(#[case] target: &str, #[case] ignored: bool) {
        assert_eq!(is_ignored(target), ignored);
    }

    #[tokio::test]
    async fn test_events_are_queued_with_fields() {
        let queue = Arc::new(EventQueue::new(16));
        let layer = ShipperLayer::new(ShipperHandle::new(Arc::clone(&queue)));
        let subscriber = tracing_subscriber::registry().with(layer);

        let before = Utc::now().timestamp_millis();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "my_app", user = "ana", attempts = 3, "signed in");
            tracing::error!(target: "cwlogs::shipper", "internal noise");
            tracing::warn!(target: "tokio_jobs::worker", "job retried");
            tracing::debug!(target: "my_app::cache", "miss");
        });
        let after = Utc::now().timestamp_millis();

        let events = queue.drain(16).await;
        assert_eq!(events.len(), 3);

        assert!(events[0]
            .message
            .ends_with(" INFO my_app: signed in user=\"ana\" attempts=3"));
        assert!(events[0].timestamp >= before && events[0].timestamp <= after);
        assert!(events[1]
            .message
            .ends_with(" WARN tokio_jobs::worker: job retried"));
        assert!(events[2].message.ends_with(" DEBUG my_app::cache: miss"));
    }
}
