//! Live-updating snapshots over the local store.
//!
//! Every mutation publishes its table on a broadcast bus; a watcher task
//! re-queries the table and re-emits the full current snapshot into a watch
//! channel. Dropping the receiver unsubscribes with no further side effects.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::error::StoreResult;
use crate::models::{SchoolEvent, Student, Teacher};
use crate::LocalStore;

/// Table identifier carried on the change bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Students,
    Teachers,
    Attendance,
    Periods,
    Events,
}

/// Live snapshot of every student row.
pub fn watch_students(store: Arc<LocalStore>) -> watch::Receiver<Vec<Student>> {
    watch_snapshot(store, Table::Students, |s| async move { s.all_students().await })
}

/// Live snapshot of every teacher row.
pub fn watch_teachers(store: Arc<LocalStore>) -> watch::Receiver<Vec<Teacher>> {
    watch_snapshot(store, Table::Teachers, |s| async move { s.all_teachers().await })
}

/// Live snapshot of the school-event calendar.
pub fn watch_events(store: Arc<LocalStore>) -> watch::Receiver<Vec<SchoolEvent>> {
    watch_snapshot(store, Table::Events, |s| async move { s.all_events().await })
}

/// Live count of attendance rows still awaiting push.
pub fn watch_unsynced_count(store: Arc<LocalStore>) -> watch::Receiver<i64> {
    watch_snapshot(store, Table::Attendance, |s| async move {
        s.count_unsynced_attendance().await
    })
}

fn watch_snapshot<T, F, Fut>(
    store: Arc<LocalStore>,
    table: Table,
    load: F,
) -> watch::Receiver<T>
where
    T: Clone + Default + Send + Sync + 'static,
    F: Fn(Arc<LocalStore>) -> Fut + Send + 'static,
    Fut: Future<Output = StoreResult<T>> + Send,
{
    let (tx, rx) = watch::channel(T::default());
    // Subscribe before the initial load so no change slips in between.
    let mut changes = store.subscribe();

    tokio::spawn(async move {
        match load(Arc::clone(&store)).await {
            Ok(snapshot) => {
                if tx.send(snapshot).is_err() {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, ?table, "failed to load initial snapshot");
            }
        }

        loop {
            match changes.recv().await {
                Ok(changed) if changed == table => {}
                Ok(_) => continue,
                // Missed notifications collapse into one refresh.
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }

            match load(Arc::clone(&store)).await {
                Ok(snapshot) => {
                    if tx.send(snapshot).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, ?table, "failed to refresh live snapshot");
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::models::{AttendanceRecord, RecordKind, Student, STATUS_PRESENT};
    use crate::test_util::open_temp_store;

    fn student(id: &str) -> Student {
        Student {
            id: id.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Reyes".to_string(),
            grade: "8".to_string(),
            section: "A".to_string(),
            username: None,
            password: None,
            has_changed_credentials: false,
            is_archived: false,
        }
    }

    #[tokio::test]
    async fn students_snapshot_reemits_on_mutation() {
        let (store, _guard) = open_temp_store().await;
        let store = Arc::new(store);

        let mut rx = super::watch_students(Arc::clone(&store));

        // Initial (empty) snapshot.
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(rx.borrow_and_update().is_empty());

        store.insert_student(&student("S1")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        store.insert_student(&student("S2")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow_and_update().len(), 2);
    }

    #[tokio::test]
    async fn unsynced_count_tracks_attendance_mutations() {
        let (store, _guard) = open_temp_store().await;
        let store = Arc::new(store);

        let mut rx = super::watch_unsynced_count(Arc::clone(&store));
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), 0);

        let record = AttendanceRecord::new(
            "S1",
            1_000,
            STATUS_PRESENT,
            RecordKind::Homeroom,
            None,
            "Q1",
        );
        let id = store.record_attendance(&record).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        store.mark_attendance_synced(&[id]).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*rx.borrow_and_update(), 0);
    }

    #[tokio::test]
    async fn unrelated_tables_do_not_wake_watchers() {
        let (store, _guard) = open_temp_store().await;
        let store = Arc::new(store);

        let mut rx = super::watch_students(Arc::clone(&store));
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        rx.borrow_and_update();

        // An attendance mutation must not publish a student snapshot.
        store
            .record_attendance(&AttendanceRecord::new(
                "S1",
                1_000,
                STATUS_PRESENT,
                RecordKind::Homeroom,
                None,
                "Q1",
            ))
            .await
            .unwrap();

        let woke = tokio::time::timeout(Duration::from_millis(200), rx.changed()).await;
        assert!(woke.is_err(), "student watcher woke on attendance change");
    }
}
