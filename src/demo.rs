//! Sample data for `--demo`, served by the in-memory gateway.

use bellwire::gateway::InMemoryGateway;
use bellwire::model::{Notification, NotificationId, NotificationKind};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

/// How often the demo server "receives" a new notification.
const ARRIVAL_INTERVAL: Duration = Duration::from_secs(45);

fn sample(
    id: &str,
    kind: NotificationKind,
    title: &str,
    message: &str,
    is_read: bool,
    action_url: Option<&str>,
    minutes_ago: i64,
) -> Notification {
    Notification {
        id: NotificationId::from(id),
        kind,
        title: Arc::from(title),
        message: Arc::from(message),
        is_read,
        action_url: action_url.map(str::to_string),
        created_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
    }
}

pub fn seeded_gateway() -> Arc<InMemoryGateway> {
    Arc::new(InMemoryGateway::with_notifications(vec![
        sample(
            "demo-1",
            NotificationKind::Interview,
            "Interview scheduled with Northwind",
            "Thursday 10:00, video call. Check your calendar invite.",
            false,
            Some("/applications/northwind"),
            4,
        ),
        sample(
            "demo-2",
            NotificationKind::Application,
            "Application received",
            "Contoso Labs received your application for Backend Intern.",
            false,
            Some("/applications/contoso"),
            95,
        ),
        sample(
            "demo-3",
            NotificationKind::Offer,
            "You have an offer!",
            "Fabrikam sent you an offer for Summer Data Intern.",
            false,
            Some("/offers/fabrikam"),
            60 * 26,
        ),
        sample(
            "demo-4",
            NotificationKind::Rejection,
            "Update on your application",
            "Globex has decided to move forward with other candidates.",
            true,
            None,
            60 * 24 * 3,
        ),
        sample(
            "demo-5",
            NotificationKind::System,
            "Profile 80% complete",
            "Add your portfolio link to stand out to recruiters.",
            true,
            Some("/profile"),
            60 * 24 * 12,
        ),
    ]))
}

/// Push a fresh notification into the demo server every so often, so the
/// count poll has something to pick up.
pub fn spawn_arrivals(gateway: Arc<InMemoryGateway>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + ARRIVAL_INTERVAL,
            ARRIVAL_INTERVAL,
        );
        for n in 1u32.. {
            ticker.tick().await;
            let id = format!("demo-new-{}", n);
            tracing::debug!(id = %id, "Demo server received a notification");
            gateway.push(sample(
                &id,
                NotificationKind::Message,
                "New message from a recruiter",
                "A recruiter replied to your message.",
                false,
                None,
                0,
            ));
        }
    })
}
