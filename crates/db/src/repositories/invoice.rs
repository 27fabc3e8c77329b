use sqlx::Row;
use uuid::Uuid;

use stairbooks_core::domain::invoice::{CisRecord, CisRecordId, Invoice, InvoiceId};

use super::{decode, encode, CisLedger, InvoiceRepository, RepositoryError};
use crate::cis::{ApplyCisCommand, UndoCisCommand};
use crate::DbPool;

pub struct SqlInvoiceRepository {
    pool: DbPool,
}

impl SqlInvoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn write_invoice(&self, invoice: &Invoice, id: &InvoiceId) -> Result<(), RepositoryError> {
        let data = encode(invoice)?;
        sqlx::query(
            "INSERT INTO invoice (id, invoice_number, quote_id, cis_applied, amount, data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET invoice_number = excluded.invoice_number, \
             quote_id = excluded.quote_id, cis_applied = excluded.cis_applied, \
             amount = excluded.amount, data = excluded.data",
        )
        .bind(&id.0)
        .bind(&invoice.invoice_number)
        .bind(invoice.quote_id.as_ref().map(|quote_id| quote_id.0.clone()))
        .bind(invoice.cis_applied)
        .bind(invoice.amount.to_string())
        .bind(&data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn require_id(invoice: &Invoice, operation: &str) -> Result<InvoiceId, RepositoryError> {
    invoice.id.clone().ok_or_else(|| {
        RepositoryError::InvalidCommand(format!("{operation} requires a saved invoice"))
    })
}

fn require_consistent(invoice: &Invoice) -> Result<(), RepositoryError> {
    if invoice.cis_state_consistent() {
        Ok(())
    } else {
        Err(RepositoryError::InvalidCommand(
            "invoice CIS bookkeeping fields are inconsistent".to_string(),
        ))
    }
}

#[async_trait::async_trait]
impl InvoiceRepository for SqlInvoiceRepository {
    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        let row = sqlx::query("SELECT data FROM invoice WHERE id = ?1")
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

    async fn list(&self) -> Result<Vec<Invoice>, RepositoryError> {
        let rows = sqlx::query("SELECT data FROM invoice ORDER BY invoice_number, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                decode(&data)
            })
            .collect()
    }

    async fn save(&self, mut invoice: Invoice) -> Result<Invoice, RepositoryError> {
        require_consistent(&invoice)?;
        let id =
            invoice.id.get_or_insert_with(|| InvoiceId(Uuid::new_v4().to_string())).clone();
        self.write_invoice(&invoice, &id).await?;
        Ok(invoice)
    }

    async fn delete(&self, id: &InvoiceId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM invoice WHERE id = ?1").bind(&id.0).execute(&self.pool).await?;

        // Linked ledger rows go with the invoice; a failure here degrades to
        // a warning rather than undoing the delete.
        if let Err(error) = sqlx::query("DELETE FROM cis_record WHERE invoice_id = ?1")
            .bind(&id.0)
            .execute(&self.pool)
            .await
        {
            tracing::warn!(
                event_name = "persistence.cis_ledger_cascade_failed",
                invoice_id = %id.0,
                error = %error,
                "invoice deleted but its CIS ledger row could not be removed"
            );
        }

        Ok(())
    }

    async fn apply_cis(&self, command: ApplyCisCommand) -> Result<Invoice, RepositoryError> {
        let mut invoice = command.invoice;
        let invoice_id = require_id(&invoice, "apply-cis")?;
        let record_id = CisRecordId(Uuid::new_v4().to_string());
        invoice.cis_record_id = Some(record_id.clone());
        require_consistent(&invoice)?;

        let record = command.application.ledger_record(
            record_id,
            invoice_id.clone(),
            &invoice,
            command.recorded_on,
        );
        let invoice_data = encode(&invoice)?;
        let record_data = encode(&record)?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE invoice SET cis_applied = ?2, amount = ?3, data = ?4 WHERE id = ?1",
        )
        .bind(&invoice_id.0)
        .bind(invoice.cis_applied)
        .bind(invoice.amount.to_string())
        .bind(&invoice_data)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::InvalidCommand(format!(
                "apply-cis targets unknown invoice `{}`",
                invoice_id.0
            )));
        }
        sqlx::query(
            "INSERT INTO cis_record (id, invoice_id, recorded_on, data) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&record.id.0)
        .bind(&invoice_id.0)
        .bind(record.recorded_on.to_string())
        .bind(&record_data)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(invoice)
    }

    async fn undo_cis(&self, command: UndoCisCommand) -> Result<Invoice, RepositoryError> {
        let invoice = command.invoice;
        let invoice_id = require_id(&invoice, "undo-cis")?;
        require_consistent(&invoice)?;
        self.write_invoice(&invoice, &invoice_id).await?;

        if let Some(record_id) = command.cis_record_id {
            if let Err(error) = sqlx::query("DELETE FROM cis_record WHERE id = ?1")
                .bind(&record_id.0)
                .execute(&self.pool)
                .await
            {
                tracing::warn!(
                    event_name = "persistence.cis_ledger_delete_failed",
                    cis_record_id = %record_id.0,
                    error = %error,
                    "CIS reverted on the invoice but the ledger row could not be removed"
                );
            }
        }

        Ok(invoice)
    }
}

pub struct SqlCisLedger {
    pool: DbPool,
}

impl SqlCisLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CisLedger for SqlCisLedger {
    async fn list(&self) -> Result<Vec<CisRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT data FROM cis_record ORDER BY recorded_on, id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.try_get("data")?;
                decode(&data)
            })
            .collect()
    }

    async fn find_for_invoice(
        &self,
        invoice_id: &InvoiceId,
    ) -> Result<Option<CisRecord>, RepositoryError> {
        let row = sqlx::query("SELECT data FROM cis_record WHERE invoice_id = ?1")
            .bind(&invoice_id.0)
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
}
