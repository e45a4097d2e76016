use crate::domain::{models::event::Event, ports::EventRepository, services::inventory};
use crate::error::AppError;
use crate::infra::repositories::rows::{collect, to_count, EventRow};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

pub struct PostgresEventRepo {
    pool: PgPool,
}

impl PostgresEventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row-locks the event so allocation changes for it run one at a time.
/// Returns false when the event does not exist.
pub(crate) async fn lock_event(tx: &mut Transaction<'_, Postgres>, event_id: &str) -> Result<bool, AppError> {
    let locked: Option<String> = sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?;
    Ok(locked.is_some())
}

/// Tickets allocated to the event's categories, leaving out `replacing`.
pub(crate) async fn allocated_quantity(
    tx: &mut Transaction<'_, Postgres>,
    event_id: &str,
    replacing: Option<&str>,
) -> Result<u64, AppError> {
    let allocated: i64 = sqlx::query_scalar(
        r#"SELECT CAST(COALESCE(SUM(quantity), 0) AS BIGINT) FROM ticket_categories
           WHERE event_id = $1 AND id <> $2"#,
    )
        .bind(event_id)
        .bind(replacing.unwrap_or(""))
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;
    Ok(to_count(allocated))
}

#[async_trait]
impl EventRepository for PostgresEventRepo {
    async fn create(&self, event: &Event) -> Result<Event, AppError> {
        sqlx::query_as::<_, EventRow>(
            r#"INSERT INTO events (
                id, title, description, category, start_time, end_time,
                location, virtual_mode, virtual_url, max_attendees, stream_key, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
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
        sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(Event::try_from)
            .transpose()
    }

    async fn list(&self) -> Result<Vec<Event>, AppError> {
        let rows = sqlx::query_as::<_, EventRow>("SELECT * FROM events ORDER BY start_time ASC, seq ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn update(&self, event: &Event) -> Result<Event, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        if !lock_event(&mut tx, &event.id).await? {
            return Err(AppError::NotFound("Event not found".into()));
        }

        let updated = sqlx::query_as::<_, EventRow>(
            r#"UPDATE events SET
                title=$1, description=$2, category=$3, start_time=$4, end_time=$5,
                location=$6, virtual_mode=$7, virtual_url=$8, max_attendees=$9
               WHERE id=$10 AND (
                   $9::BIGINT IS NULL
                   OR (SELECT COALESCE(SUM(quantity), 0) FROM ticket_categories WHERE event_id = $10) <= $9
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
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(row) = updated else {
            let allocated = allocated_quantity(&mut tx, &event.id, None).await?;
            return Err(inventory::ceiling_below_allocation_error(allocated));
        };
        tx.commit().await.map_err(AppError::Database)?;
        row.try_into()
    }
}
