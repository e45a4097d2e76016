use crate::domain::{models::event::Event, ports::EventRepository, services::inventory};
use crate::error::AppError;
use crate::infra::repositories::rows::{collect, to_count, EventRow};
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteEventRepo {
    pool: SqlitePool,
}

impl SqliteEventRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, EventRow>(
            r#"INSERT INTO events (
                id, title, description, category, start_time, end_time,
                location, virtual_mode, virtual_url, max_attendees, stream_key, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&event.id)
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.category)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(&event.location)
            .bind(event.virtual_mode.as_str())
            .bind(&event.virtual_url)
            .bind(event.max_attendees.map(i64::from))
            .bind(&event.stream_key)
            .bind(event.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?
            .try_into()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Event>, AppError> {
        sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(Event::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let rows = sqlx::query_as::<_, EventRow>("SELECT * FROM events ORDER BY start_time ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        // A single write statement holds the database write lock while the allocation
        // subquery runs, so a concurrent category insert cannot slip past the new ceiling.
        let updated = sqlx::query_as::<_, EventRow>(
            r#"UPDATE events SET
                title=?, description=?, category=?, start_time=?, end_time=?,
                location=?, virtual_mode=?, virtual_url=?, max_attendees=?
               WHERE id=? AND (
                   ? IS NULL
                   OR (SELECT COALESCE(SUM(quantity), 0) FROM ticket_categories WHERE event_id = ?) <= ?
               )
               RETURNING *"#
        )
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.category)
            .bind(event.start_time)
            .bind(event.end_time)
            .bind(&event.location)
            .bind(event.virtual_mode.as_str())
            .bind(&event.virtual_url)
            .bind(event.max_attendees.map(i64::from))
            .bind(&event.id)
            .bind(event.max_attendees.map(i64::from))
            .bind(&event.id)
            .bind(event.max_attendees.map(i64::from))
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if let Some(row) = updated {
            return row.try_into();
        }

        if self.find_by_id(&event.id).await?.is_none() {
            return Err(AppError::NotFound("Event not found".into()));
        }
        let allocated: i64 = sqlx::query_scalar(
            "SELECT CAST(COALESCE(SUM(quantity), 0) AS BIGINT) FROM ticket_categories WHERE event_id = ?",
        )
            .bind(&event.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Err(inventory::ceiling_below_allocation_error(to_count(allocated)))
    }
}
