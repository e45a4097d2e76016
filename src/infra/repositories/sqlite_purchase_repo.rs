use crate::domain::{
    models::{purchase::{PaymentStatus, Purchase}, ticket_category::TicketCategory},
    ports::PurchaseRepository,
};
use crate::error::AppError;
use crate::infra::repositories::rows::{collect, encode_seats, PurchaseRow};
use crate::infra::repositories::sqlite_ticket_category_repo::increment_sold;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqlitePurchaseRepo {
    pool: SqlitePool,
}

impl SqlitePurchaseRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRepository for SqlitePurchaseRepo {
    async fn create_with_sale(&self, purchase: &Purchase) -> Result<(Purchase, TicketCategory), AppError> {
        let seats = encode_seats(purchase)?;
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let category = increment_sold(&mut tx, &purchase.ticket_category_id, purchase.quantity).await?;

        let saved: Purchase = sqlx::query_as::<_, PurchaseRow>(
            r#"INSERT INTO purchases (
                id, event_id, ticket_category_id, buyer_name, buyer_email, buyer_phone,
                quantity, total_amount, purchased_at, payment_status, seat_numbers
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#
        )
            .bind(&purchase.id)
            .bind(&purchase.event_id)
            .bind(&purchase.ticket_category_id)
            .bind(&purchase.buyer_name)
            .bind(&purchase.buyer_email)
            .bind(&purchase.buyer_phone)
            .bind(i64::from(purchase.quantity))
            .bind(purchase.total_amount)
            .bind(purchase.purchased_at)
            .bind(purchase.payment_status.as_str())
            .bind(seats)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .try_into()?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok((saved, category))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Purchase>, AppError> {
        sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .map(Purchase::try_from)
            .transpose()
    }

    async fn list_by_event(&self, event_id: &str) -> Result<Vec<Purchase>, AppError> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            "SELECT * FROM purchases WHERE event_id = ? ORDER BY purchased_at ASC, rowid ASC",
        )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn list(&self) -> Result<Vec<Purchase>, AppError> {
        let rows = sqlx::query_as::<_, PurchaseRow>("SELECT * FROM purchases ORDER BY purchased_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;
        collect(rows)
    }

    async fn update_status(&self, id: &str, expected: PaymentStatus, status: PaymentStatus) -> Result<Purchase, AppError> {
        let updated = sqlx::query_as::<_, PurchaseRow>(
            "UPDATE purchases SET payment_status = ? WHERE id = ? AND payment_status = ? RETURNING *",
        )
            .bind(status.as_str())
            .bind(id)
            .bind(expected.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?;

        match updated {
            Some(row) => row.try_into(),
            None => match self.find_by_id(id).await? {
                Some(current) => Err(AppError::InvalidStateTransition { from: current.payment_status, to: status }),
                None => Err(AppError::NotFound("Purchase not found".into())),
            },
        }
    }
}
