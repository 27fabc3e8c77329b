use sqlx::Row;

use stairbooks_core::domain::quote::{Quote, QuoteId};

use super::{decode, encode, QuoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query("SELECT data FROM quote WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(decode(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query("SELECT data FROM quote ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                decode(&data)
            })
            .collect()
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let data = encode(&quote)?;
        sqlx::query(
            "INSERT INTO quote (id, client_name, created_at, data) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET client_name = excluded.client_name, \
             created_at = excluded.created_at, data = excluded.data",
        )
        .bind(&quote.id.0)
        .bind(&quote.client.name)
        .bind(quote.created_at.to_rfc3339())
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &QuoteId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM quote WHERE id = ?1").bind(&id.0).execute(&self.pool).await?;
        Ok(())
    }
}
