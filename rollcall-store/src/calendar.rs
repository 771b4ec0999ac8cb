//! School-period singleton and school-event operations.

use crate::error::StoreResult;
use crate::live::Table;
use crate::models::{SchoolEvent, SchoolPeriodConfig, PERIOD_CONFIG_ID};
use crate::LocalStore;

impl LocalStore {
    /// The singleton calendar row, if configured.
    pub async fn school_period(&self) -> StoreResult<Option<SchoolPeriodConfig>> {
        let config =
            sqlx::query_as::<_, SchoolPeriodConfig>("SELECT * FROM school_period WHERE id = ?")
                .bind(PERIOD_CONFIG_ID)
                .fetch_optional(self.pool())
                .await?;
        Ok(config)
    }

    /// Overwrite the singleton calendar row.
    pub async fn set_school_period(&self, config: &SchoolPeriodConfig) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO school_period (
                id, school_year,
                q1_start, q1_end, q2_start, q2_end,
                q3_start, q3_end, q4_start, q4_end,
                shs_q1_start, shs_q1_end, shs_q2_start, shs_q2_end,
                shs_q3_start, shs_q3_end, shs_q4_start, shs_q4_end
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(PERIOD_CONFIG_ID)
        .bind(&config.school_year)
        .bind(config.q1_start)
        .bind(config.q1_end)
        .bind(config.q2_start)
        .bind(config.q2_end)
        .bind(config.q3_start)
        .bind(config.q3_end)
        .bind(config.q4_start)
        .bind(config.q4_end)
        .bind(config.shs_q1_start)
        .bind(config.shs_q1_end)
        .bind(config.shs_q2_start)
        .bind(config.shs_q2_end)
        .bind(config.shs_q3_start)
        .bind(config.shs_q3_end)
        .bind(config.shs_q4_start)
        .bind(config.shs_q4_end)
        .execute(self.pool())
        .await?;

        self.notify(Table::Periods);
        Ok(())
    }

    /// Insert (id 0) or replace a school event; returns the rowid.
    pub async fn upsert_event(&self, event: &SchoolEvent) -> StoreResult<i64> {
        let rowid = if event.id == 0 {
            let result = sqlx::query(
                r#"
                INSERT INTO school_events (date, title, event_type, description, is_no_class, synced)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.date)
            .bind(&event.title)
            .bind(&event.event_type)
            .bind(&event.description)
            .bind(event.is_no_class)
            .bind(event.synced)
            .execute(self.pool())
            .await?;
            result.last_insert_rowid()
        } else {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO school_events (
                    id, date, title, event_type, description, is_no_class, synced
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.id)
            .bind(event.date)
            .bind(&event.title)
            .bind(&event.event_type)
            .bind(&event.description)
            .bind(event.is_no_class)
            .bind(event.synced)
            .execute(self.pool())
            .await?;
            event.id
        };

        self.notify(Table::Events);
        Ok(rowid)
    }

    /// The event stored for one day-truncated date, if any.
    pub async fn event_on(&self, date: i64) -> StoreResult<Option<SchoolEvent>> {
        let event =
            sqlx::query_as::<_, SchoolEvent>("SELECT * FROM school_events WHERE date = ? LIMIT 1")
                .bind(date)
                .fetch_optional(self.pool())
                .await?;
        Ok(event)
    }

    pub async fn all_events(&self) -> StoreResult<Vec<SchoolEvent>> {
        let events = sqlx::query_as::<_, SchoolEvent>("SELECT * FROM school_events ORDER BY date")
            .fetch_all(self.pool())
            .await?;
        Ok(events)
    }

    pub async fn delete_event(&self, id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM school_events WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        self.notify(Table::Events);
        Ok(())
    }
}
