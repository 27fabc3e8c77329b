use sqlx::Row;

use stairbooks_core::domain::contact::{Contact, ContactId};

use super::{decode, encode, ContactRepository, RepositoryError};
use crate::DbPool;

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query("SELECT data FROM contact WHERE id = ?1")
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

    async fn list(&self) -> Result<Vec<(ContactId, Contact)>, RepositoryError> {
        let rows = sqlx::query("SELECT id, data FROM contact ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let data: String = row.try_get("data")?;
                Ok((ContactId(id), decode(&data)?))
            })
            .collect()
    }

    async fn save(&self, id: &ContactId, contact: Contact) -> Result<(), RepositoryError> {
        let data = encode(&contact)?;
        sqlx::query(
            "INSERT INTO contact (id, name, data) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, data = excluded.data",
        )
        .bind(&id.0)
        .bind(&contact.name)
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &ContactId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM contact WHERE id = ?1").bind(&id.0).execute(&self.pool).await?;
        Ok(())
    }
}
