//! End-to-end demo: wires the engine to the in-memory store, a tokio timer
//! alarm port, and a logging notification port, then walks one reminder
//! through fire -> snooze -> fire -> complete.
//!
//! Run with `RUST_LOG=debug cargo run --bin chime-demo`.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chime::store::MemoryStore;
use chime::{
    ActionEvent, AlarmPort, AlertAction, EngineConfig, NotificationPort, Reminder, ReminderEngine,
    UserAction,
};

/// A fire delivered by the timer port.
struct FireEvent {
    key: String,
    payload: Vec<u8>,
}

/// Alarm port backed by tokio timers. Each registration arms a sleep task
/// that emits a `FireEvent` at the trigger instant; cancelling aborts the
/// task.
struct TimerAlarmPort {
    fires: mpsc::UnboundedSender<FireEvent>,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl TimerAlarmPort {
    fn new(fires: mpsc::UnboundedSender<FireEvent>) -> Self {
        TimerAlarmPort {
            fires,
            tasks: DashMap::new(),
        }
    }
}

impl AlarmPort for TimerAlarmPort {
    fn schedule_at(&self, key: &str, at: DateTime<Utc>, payload: Vec<u8>) -> Result<()> {
        if let Some((_, prior)) = self.tasks.remove(key) {
            prior.abort();
        }
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let fires = self.fires.clone();
        let fire_key = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fires.send(FireEvent {
                key: fire_key,
                payload,
            });
        });
        self.tasks.insert(key.to_string(), handle);
        Ok(())
    }

    fn cancel(&self, key: &str) -> Result<()> {
        if let Some((_, task)) = self.tasks.remove(key) {
            task.abort();
        }
        Ok(())
    }

    fn can_schedule_exact(&self) -> bool {
        true
    }
}

/// Notification port that renders alerts to the log.
struct LogNotificationPort;

impl NotificationPort for LogNotificationPort {
    fn present(
        &self,
        occurrence_key: &str,
        title: &str,
        detail: Option<&str>,
        actions: &[AlertAction],
    ) -> Result<()> {
        match detail {
            Some(detail) => info!("🔔 [{occurrence_key}] {title}: {detail} {actions:?}"),
            None => info!("🔔 [{occurrence_key}] {title} {actions:?}"),
        }
        Ok(())
    }

    fn withdraw(&self, occurrence_key: &str) {
        info!("🔕 [{occurrence_key}] alert withdrawn");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = EngineConfig::from_env();
    let (fire_tx, mut fire_rx) = mpsc::unbounded_channel();

    let store = Arc::new(MemoryStore::new());
    let alarms = Arc::new(TimerAlarmPort::new(fire_tx));
    let notifications = Arc::new(LogNotificationPort);
    let engine = Arc::new(ReminderEngine::new(
        config,
        store,
        alarms,
        notifications,
    ));

    let mut reminder = Reminder::new("demo-user", "Stand-up meeting", Utc::now() + ChronoDuration::seconds(2));
    reminder.description = "Share yesterday's progress".to_string();
    reminder.category = "Work".to_string();
    reminder.lead_time_minutes = 0;
    let report = engine.save_reminder(reminder).await?;
    info!("scheduled demo reminder ({} alarms registered)", report.registered);

    // First fire: snooze it for a moment
    let fire = fire_rx
        .recv()
        .await
        .ok_or_else(|| anyhow::anyhow!("fire channel closed"))?;
    engine.handle_fire(&fire.key, &fire.payload).await;
    let occurrence_key = decoded_occurrence(&fire.payload);
    let outcome = engine
        .handle_action(ActionEvent::new(
            &occurrence_key,
            UserAction::Snooze { minutes: 1 },
        ))
        .await?;
    info!("snooze outcome: {outcome:?}");

    // For the demo, pull the snoozed copy forward instead of waiting a minute
    let snoozed = engine
        .reminders("demo-user")
        .await
        .into_iter()
        .find(|r| r.id != occurrence_key)
        .ok_or_else(|| anyhow::anyhow!("snoozed copy not found"))?;
    let mut hurried = snoozed.clone();
    hurried.due_at = Utc::now() + ChronoDuration::seconds(2);
    engine.save_reminder(hurried).await?;

    // Second fire: mark it done
    let fire = fire_rx
        .recv()
        .await
        .ok_or_else(|| anyhow::anyhow!("fire channel closed"))?;
    engine.handle_fire(&fire.key, &fire.payload).await;
    let occurrence_key = decoded_occurrence(&fire.payload);
    let outcome = engine
        .handle_action(ActionEvent::new(&occurrence_key, UserAction::Complete))
        .await?;
    info!("complete outcome: {outcome:?}");

    let buckets = engine.buckets("demo-user").await;
    info!(
        "final state: {} soon, {} future, {} previous",
        buckets.soon.len(),
        buckets.future.len(),
        buckets.previous.len()
    );
    Ok(())
}

fn decoded_occurrence(payload: &[u8]) -> String {
    serde_json::from_slice::<chime::FirePayload>(payload)
        .map(|p| p.occurrence_key)
        .unwrap_or_default()
}
