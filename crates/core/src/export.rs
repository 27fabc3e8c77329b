use std::io;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::invoice::CisRecord;

/// Column layout expected by the bookkeeper's HMRC return spreadsheet.
pub const CIS_EXPORT_HEADER: [&str; 7] = [
    "Date",
    "Invoice Number",
    "Client Name",
    "Client Company",
    "Labor Amount (£)",
    "CIS Rate (%)",
    "CIS Deduction (£)",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV flush error: {0}")]
    Io(#[from] io::Error),
}

/// Writes the CIS ledger as CSV: one row per record, then a TOTAL row
/// summing the deductions. Money is rendered at 2 dp here and nowhere
/// earlier.
pub fn write_cis_csv(records: &[CisRecord], writer: impl io::Write) -> Result<(), ExportError> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(CIS_EXPORT_HEADER)?;

    let mut total = Decimal::ZERO;
    for record in records {
        total += record.deduction;
        csv.write_record(&[
            record.recorded_on.format("%Y-%m-%d").to_string(),
            record.invoice_number.clone(),
            record.client_name.clone(),
            record.client_company.clone(),
            format!("{:.2}", record.labour_amount),
            (record.rate * Decimal::ONE_HUNDRED).normalize().to_string(),
            format!("{:.2}", record.deduction),
        ])?;
    }

    let total_rendered = format!("{total:.2}");
    csv.write_record(["TOTAL", "", "", "", "", "", total_rendered.as_str()])?;
    csv.flush()?;

    Ok(())
}
