//! CSV import of debtors.
//!
//! Expected header: `name,email,debtAmount,paymentDueDate,notes`. Due dates may be a
//! plain `YYYY-MM-DD` date (midnight UTC) or a full RFC 3339 timestamp. Rows are
//! inserted in file order with the same policy as
//! [`import_debtors`](crate::core::debtor::import_debtors): the first bad row stops
//! the import and everything before it stays.

use crate::{
    core::{
        auth::RequestContext,
        debtor::{NewDebtor, import_rows},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvDebtorRow {
    name: String,
    email: String,
    debt_amount: f64,
    payment_due_date: String,
    #[serde(default)]
    notes: Option<String>,
}

/// Parses a due date given as `YYYY-MM-DD` or RFC 3339.
///
/// # Errors
/// Returns [`Error::Validation`] if neither format matches.
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::validation(format!("Invalid payment due date: {input:?}")))
}

impl TryFrom<CsvDebtorRow> for NewDebtor {
    type Error = Error;

    fn try_from(row: CsvDebtorRow) -> Result<Self> {
        Ok(Self {
            name: row.name,
            email: row.email,
            debt_amount: row.debt_amount,
            payment_due_date: parse_due_date(&row.payment_due_date)?,
            notes: row.notes,
        })
    }
}

/// Imports debtors for the caller from CSV data.
///
/// # Errors
/// Returns [`Error::NotAuthenticated`], or [`Error::Import`] naming the first row
/// (1-based, header excluded) that could not be parsed or stored.
pub async fn import_csv<R: Read>(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    reader: R,
) -> Result<Vec<i64>> {
    let owner = ctx.require_user()?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let rows: Vec<Result<NewDebtor>> = rdr
        .deserialize::<CsvDebtorRow>()
        .map(|record| record.map_err(Error::from).and_then(NewDebtor::try_from))
        .collect();
    debug!(rows = rows.len(), "Parsed debtor CSV");

    import_rows(db, owner, rows).await
}

/// Imports debtors for the caller from a CSV file on disk.
///
/// # Errors
/// Returns [`Error::Io`] if the file cannot be opened, otherwise as [`import_csv`].
pub async fn import_csv_file(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    path: impl AsRef<Path>,
) -> Result<Vec<i64>> {
    ctx.require_user()?;
    let file = File::open(path)?;
    import_csv(db, ctx, file).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::debtor::list_debtors, entities::DebtorStatus, test_utils::*};
    use chrono::TimeZone;

    #[test]
    fn test_parse_due_date_formats() -> Result<()> {
        assert_eq!(
            parse_due_date("2025-02-15")?,
            Utc.with_ymd_and_hms(2025, 2, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_due_date("2025-02-15T10:30:00+02:00")?,
            Utc.with_ymd_and_hms(2025, 2, 15, 8, 30, 0).unwrap()
        );
        assert!(matches!(
            parse_due_date("15/02/2025"),
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_import_csv() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let data = "name,email,debtAmount,paymentDueDate,notes\n\
                    Ada , ada@example.com, 120.50, 2000-01-01, first\n\
                    Bob,bob@example.com,80,2999-12-31,\n";

        let ids = import_csv(&db, &ctx, data.as_bytes()).await?;
        assert_eq!(ids.len(), 2);

        let debtors = list_debtors(&db, &ctx, None).await?;
        let ada = debtors.iter().find(|d| d.name == "Ada").unwrap();
        assert_eq!(ada.status, DebtorStatus::Overdue);
        assert_eq!(ada.notes.as_deref(), Some("first"));
        let bob = debtors.iter().find(|d| d.name == "Bob").unwrap();
        assert_eq!(bob.status, DebtorStatus::Pending);
        assert!(bob.notes.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_import_stops_at_malformed_row() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let data = "name,email,debtAmount,paymentDueDate,notes\n\
                    First,first@example.com,10,2025-01-01,\n\
                    Broken,broken@example.com,lots,2025-01-01,\n\
                    Never,never@example.com,30,2025-01-01,\n";

        let result = import_csv(&db, &ctx, data.as_bytes()).await;
        assert!(matches!(
            result,
            Err(Error::Import {
                row: 2,
                imported: 1,
                ..
            })
        ));

        let names: Vec<String> = list_debtors(&db, &ctx, None)
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["First".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_requires_identity() -> Result<()> {
        let db = setup_test_db().await?;
        let result = import_csv(&db, &RequestContext::anonymous(), "".as_bytes()).await;
        assert!(matches!(result, Err(Error::NotAuthenticated)));
        Ok(())
    }

    #[tokio::test]
    async fn test_import_csv_file() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let path = std::env::temp_dir().join(format!(
            "debt-tracker-import-{}-{}.csv",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::write(
            &path,
            "name,email,debtAmount,paymentDueDate,notes\n\
             Cleo,cleo@example.com,42,2025-06-01,from disk\n",
        )?;

        let result = import_csv_file(&db, &ctx, &path).await;
        std::fs::remove_file(&path)?;
        let ids = result?;
        assert_eq!(ids.len(), 1);

        let debtors = list_debtors(&db, &ctx, None).await?;
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].name, "Cleo");
        assert_eq!(debtors[0].notes.as_deref(), Some("from disk"));
        Ok(())
    }

    #[tokio::test]
    async fn test_import_csv_file_missing() -> Result<()> {
        let db = setup_test_db().await?;
        let ctx = owner_ctx();
        let path = std::env::temp_dir().join("debt-tracker-no-such-dir/missing.csv");

        let result = import_csv_file(&db, &ctx, &path).await;
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(list_debtors(&db, &ctx, None).await?.is_empty());
        Ok(())
    }
}
