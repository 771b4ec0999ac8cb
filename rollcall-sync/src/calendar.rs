//! Calendar repository: the school-period singleton and school events.
//!
//! The period singleton is reconciled by the sync pass; events stay
//! device-local (their `synced` column is kept for forward compatibility).

use std::sync::Arc;

use tokio::sync::watch;

use rollcall_store::{
    live, LocalStore, SchoolEvent, SchoolPeriodConfig, EVENT_ACTIVITY, EVENT_HOLIDAY,
    EVENT_SUSPENSION,
};

use crate::error::SyncResult;

pub struct CalendarRepository {
    store: Arc<LocalStore>,
}

/// Parse of a free-form daily status label ("Suspended (Typhoon)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStatus {
    pub title: String,
    pub event_type: String,
    pub description: Option<String>,
    pub is_no_class: bool,
    pub is_class_day: bool,
}

impl DailyStatus {
    pub fn parse(status: &str) -> Self {
        let lowered = status.to_lowercase();
        let is_class_day = lowered.contains("class day");

        let event_type = if lowered.contains("suspended") {
            EVENT_SUSPENSION
        } else if lowered.contains("holiday") || lowered.contains("no class") {
            EVENT_HOLIDAY
        } else {
            EVENT_ACTIVITY
        };

        let description = status
            .split_once('(')
            .and_then(|(_, rest)| rest.split_once(')'))
            .map(|(inner, _)| inner.trim().to_string())
            .filter(|s| !s.is_empty());

        let title = match status.split_once('(') {
            Some((before, _)) => before.trim().to_string(),
            None => status.trim().to_string(),
        };

        let is_no_class = lowered.contains("suspended")
            || lowered.contains("holiday")
            || lowered.contains("cancelled")
            || lowered.contains("no class");

        Self {
            title,
            event_type: event_type.to_string(),
            description,
            is_no_class,
            is_class_day,
        }
    }
}

impl CalendarRepository {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub async fn period_config(&self) -> SyncResult<Option<SchoolPeriodConfig>> {
        Ok(self.store.school_period().await?)
    }

    /// Overwrite the local singleton; the next sync pass pushes it.
    pub async fn set_period_config(&self, config: &SchoolPeriodConfig) -> SyncResult<()> {
        Ok(self.store.set_school_period(config).await?)
    }

    pub async fn events(&self) -> SyncResult<Vec<SchoolEvent>> {
        Ok(self.store.all_events().await?)
    }

    pub async fn event_on(&self, date: i64) -> SyncResult<Option<SchoolEvent>> {
        Ok(self.store.event_on(date).await?)
    }

    pub async fn add_event(&self, event: &SchoolEvent) -> SyncResult<i64> {
        Ok(self.store.upsert_event(event).await?)
    }

    pub async fn delete_event(&self, id: i64) -> SyncResult<()> {
        Ok(self.store.delete_event(id).await?)
    }

    pub async fn is_no_class_day(&self, date: i64) -> SyncResult<bool> {
        Ok(self
            .store
            .event_on(date)
            .await?
            .map(|event| event.is_no_class)
            .unwrap_or(false))
    }

    /// Apply a free-form daily status to one day-truncated date. "Class Day"
    /// removes the day's event; anything else upserts one. Returns whether
    /// the day ended up a no-class day, so callers can run the
    /// Not-Applicable sweep for their class.
    pub async fn set_daily_status(&self, date: i64, status: &str) -> SyncResult<bool> {
        let parsed = DailyStatus::parse(status);
        let existing = self.store.event_on(date).await?;

        if parsed.is_class_day {
            if let Some(event) = existing {
                self.store.delete_event(event.id).await?;
            }
            return Ok(false);
        }

        let event = SchoolEvent {
            id: existing.map(|e| e.id).unwrap_or(0),
            date,
            title: parsed.title,
            event_type: parsed.event_type,
            description: parsed.description,
            is_no_class: true,
            synced: false,
        };
        self.store.upsert_event(&event).await?;

        Ok(parsed.is_no_class)
    }

    /// Live snapshot of the event calendar.
    pub fn watch_events(&self) -> watch::Receiver<Vec<SchoolEvent>> {
        live::watch_events(Arc::clone(&self.store))
    }
}
