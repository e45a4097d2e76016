use crate::domain::{models::ticket_category::TicketCategory, ports::TicketCategoryRepository, services::inventory};
use crate::error::AppError;
use crate::infra::repositories::rows::{collect, to_count, TicketCategoryRow};
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

pub struct SqliteTicketCategoryRepo {
    pool: SqlitePool,
}

impl SqliteTicketCategoryRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Explains why a guarded write matched no row: a missing event or a full allocation.
    async fn allocation_failure(&self, event_id: &str, replacing: Option<&str>) -> Result<AppError, AppError> {
        let max_attendees: Option<Option<i64>> = sqlx::query_scalar("SELECT max_attendees FROM events WHERE id = ?")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;
        let Some(max_attendees) = max_attendees else {
            return Ok(AppError::NotFound("Event not found".into()));
        };

        let allocated: i64 = sqlx::query_scalar(
            r#"SELECT CAST(COALESCE(SUM(quantity), 0) AS BIGINT) FROM ticket_categories
               WHERE event_id = ? AND id <> ?"#,
        )
            .bind(event_id)
            .bind(replacing.unwrap_or(""))
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let max_attendees = max_attendees.map_or(u64::MAX, to_count);
        Ok(inventory::allocation_error(max_attendees, to_count(allocated)))
    }
}

/// Conditional increment shared with the purchase transaction. The `WHERE` clause is the
/// capacity check, so two writers can never both take the last seat.
pub(crate) async fn increment_sold(
    tx: &mut Transaction<'_, Sqlite>,
    category_id: &str,
    quantity: u32,
) -> Result<TicketCategory, AppError> {
    if quantity == 0 {
        return Err(AppError::validation("quantity", "Quantity must be positive"));
    }

    let updated = sqlx::query_as::<_, TicketCategoryRow>(
        r#"UPDATE ticket_categories
           SET sold_quantity = sold_quantity + ?
           WHERE id = ? AND sold_quantity + ? <= quantity
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

    let current = sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories WHERE id = ?")
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
impl TicketCategoryRepository for SqliteTicketCategoryRepo {
    async fn create(&self, category: &TicketCategory) -> Result<TicketCategory, AppError> {
        // One statement, so the allocation sum is read under the write lock.
        let created = sqlx::query_as::<_, TicketCategoryRow>(
            r#"INSERT INTO ticket_categories (
                id, event_id, name, ticket_type, price, quantity, sold_quantity, created_at
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM events WHERE id = ?)
              AND (SELECT COALESCE(SUM(quantity), 0) FROM ticket_categories WHERE event_id = ?) + ?
                  <= COALESCE((SELECT max_attendees FROM events WHERE id = ?), 9223372036854775807)
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
            .bind(&category.event_id)
            .bind(&category.event_id)
            .bind(i64::from(category.quantity))
            .bind(&category.event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        match created {
            Some(row) => row.try_into(),
            None => Err(self.allocation_failure(&category.event_id, None).await?),
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<TicketCategory>, AppError> {
        sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(TicketCategory::try_from)
            .transpose()
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<TicketCategory>, AppError> {
        let rows = sqlx::query_as::<_, TicketCategoryRow>(
            "SELECT * FROM ticket_categories WHERE event_id = ? ORDER BY created_at ASC, rowid ASC",
        )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn list(&self) -> Result<Vec<TicketCategory>, AppError> {
        let rows = sqlx::query_as::<_, TicketCategoryRow>("SELECT * FROM ticket_categories ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn update(&self, category: &TicketCategory) -> Result<TicketCategory, AppError> {
        // Guarded against a sale or a sibling resize landing between the caller's read and this write.
        let updated = sqlx::query_as::<_, TicketCategoryRow>(
            r#"UPDATE ticket_categories SET name=?, price=?, quantity=?
               WHERE id=? AND sold_quantity <= ?
                 AND (SELECT COALESCE(SUM(quantity), 0) FROM ticket_categories WHERE event_id = ? AND id <> ?) + ?
                     <= COALESCE((SELECT max_attendees FROM events WHERE id = ?), 9223372036854775807)
               RETURNING *"#
        )
            .bind(&category.name)
            .bind(category.price)
            .bind(i64::from(category.quantity))
            .bind(&category.id)
            .bind(i64::from(category.quantity))
            .bind(&category.event_id)
            .bind(&category.id)
            .bind(i64::from(category.quantity))
            .bind(&category.event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if let Some(row) = updated {
            return row.try_into();
        }

        let current = self
            .find_by_id(&category.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket category not found".into()))?;
        if current.sold_quantity > category.quantity {
            return Err(AppError::validation(
                "quantity",
                format!("Quantity cannot drop below the {} tickets already sold", current.sold_quantity),
            ));
        }
        Err(self.allocation_failure(&current.event_id, Some(current.id.as_str())).await?)
    }

    async fn record_sale(&self, category_id: &str, quantity: u32) -> Result<TicketCategory, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let updated = increment_sold(&mut tx, category_id, quantity).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }
}
