use crate::domain::{models::ticket_category::TicketCategory, ports::TicketCategoryRepository, services::inventory};
use crate::error::AppError;
use crate::infra::repositories::postgres_event_repo::{allocated_quantity, lock_event};
use crate::infra::repositories::rows::{collect, to_count, TicketCategoryRow};
use async_trait::async_trait;
use sqlx::{Postgres, PgPool, Transaction};

pub struct PostgresTicketCategoryRepo {
    pool: PgPool,
}

impl PostgresTicketCategoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Runs inside the caller's transaction after the event row is locked.
async fn allocation_failure(
    tx: &mut Transaction<'_, Postgres>,
    event_id: &str,
    replacing: Option<&str>,
) -> Result<AppError, AppError> {
    let max_attendees: Option<i64> = sqlx::query_scalar("SELECT max_attendees FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(AppError::Database)?;
    let allocated = allocated_quantity(tx, event_id, replacing).await?;
    Ok(inventory::allocation_error(max_attendees.map_or(u64::MAX, to_count), allocated))
}

/// Conditional increment shared with the purchase transaction. The `WHERE` clause is the
/// capacity check, so two writers can never both take the last seat.
pub(crate) async fn increment_sold(
    tx: &mut Transaction<'_, Postgres>,
    category_id: &str,
    quantity: u32,
) -> Result<TicketCategory, AppError> {
    if quantity == 0 {
        return Err(AppError::validation("quantity", "Quantity must be positive"));
    }

    let updated = sqlx::query_as::<_, TicketCategoryRow>(
        r#"UPDATE ticket_categories
           SET sold_quantity = sold_quantity + $1
           WHERE id = $2 AND sold_quantity + $3 <= quantity
           RETURNING *"#
    )
        .bind(i64::from(quantity))
        .bind(category_id)
        .bind(i64::from(quantity))
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?;

    if let Some(row) = updated {
        return row.try_into();
    }

    let current = sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))?;
    let current = TicketCategory::try_from(current)?;

    Err(AppError::CapacityExceeded {
        category_id: current.id.clone(),
        requested: quantity,
        available: current.available(),
    })
}

#[async_trait]
impl TicketCategoryRepository for PostgresTicketCategoryRepo {
    async fn create(&self, category: &TicketCategory) -> Result<TicketCategory, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        if !lock_event(&mut tx, &category.event_id).await? {
            return Err(AppError::NotFound("Event not found".into()));
        }

        let created = sqlx::query_as::<_, TicketCategoryRow>(
            r#"INSERT INTO ticket_categories (
                id, event_id, name, ticket_type, price, quantity, sold_quantity, created_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE (SELECT COALESCE(SUM(quantity), 0) FROM ticket_categories WHERE event_id = $2) + $6
                  <= COALESCE((SELECT max_attendees FROM events WHERE id = $2), 9223372036854775807)
            RETURNING *"#
        )
            .bind(&category.id)
            .bind(&category.event_id)
            .bind(&category.name)
            .bind(category.ticket_type.as_str())
            .bind(category.price)
            .bind(i64::from(category.quantity))
            .bind(i64::from(category.sold_quantity))
            .bind(category.created_at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(row) = created else {
            return Err(allocation_failure(&mut tx, &category.event_id, None).await?);
        };
        tx.commit().await.map_err(AppError::Database)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TicketCategory>, AppError> {
        sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(TicketCategory::try_from)
            .transpose()
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<TicketCategory>, AppError> {
        let rows = sqlx::query_as::<_, TicketCategoryRow>(
            "SELECT * FROM ticket_categories WHERE event_id = $1 ORDER BY created_at ASC, seq ASC",
        )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn list(&self) -> Result<Vec<TicketCategory>, AppError> {
        let rows = sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories ORDER BY created_at ASC, seq ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn update(&self, category: &TicketCategory) -> Result<TicketCategory, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        if !lock_event(&mut tx, &category.event_id).await? {
            return Err(AppError::NotFound("Event not found".into()));
        }

        // Guarded against a sale or a sibling resize landing between the caller's read and this write.
        let updated = sqlx::query_as::<_, TicketCategoryRow>(
            r#"UPDATE ticket_categories SET name=$1, price=$2, quantity=$3
               WHERE id=$4 AND sold_quantity <= $3
                 AND (SELECT COALESCE(SUM(quantity), 0) FROM ticket_categories WHERE event_id = $5 AND id <> $4) + $3
                     <= COALESCE((SELECT max_attendees FROM events WHERE id = $5), 9223372036854775807)
               RETURNING *"#
        )
            .bind(&category.name)
            .bind(category.price)
            .bind(i64::from(category.quantity))
            .bind(&category.id)
            .bind(&category.event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        if let Some(row) = updated {
            tx.commit().await.map_err(AppError::Database)?;
            return row.try_into();
        }

        let current = sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories WHERE id = $1")
            .bind(&category.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))?;
        let current = TicketCategory::try_from(current)?;
        if current.sold_quantity > category.quantity {
            return Err(AppError::validation(
                "quantity",
                format!("Quantity cannot drop below the {} tickets already sold", current.sold_quantity),
            ));
        }
        Err(allocation_failure(&mut tx, &current.event_id, Some(current.id.as_str())).await?)
    }

    async fn record_sale(&self, category_id: &str, quantity: u32) -> Result<TicketCategory, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let updated = increment_sold(&mut tx, category_id, quantity).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }
}
