//! Production domain handlers backed by the resident database

pub mod issues;
pub mod residents;

pub use issues::SqlIssueTracker;
pub use residents::SqlResidentData;

use sqlx::SqlitePool;

/// Create the resident, household, and issue tables if they are missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS household (
            household_id INTEGER PRIMARY KEY AUTOINCREMENT,
            number_kk TEXT NOT NULL,
            address TEXT NOT NULL,
            rt TEXT NOT NULL,
            rw TEXT NOT NULL,
            sub_district TEXT NOT NULL,
            city TEXT NOT NULL,
            province TEXT NOT NULL,
            postal_code TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resident (
            resident_id INTEGER PRIMARY KEY AUTOINCREMENT,
            household_id INTEGER REFERENCES household(household_id),
            nik TEXT NOT NULL,
            full_name TEXT NOT NULL,
            place_of_birth TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            gender TEXT NOT NULL,
            blood_type TEXT NOT NULL,
            religion TEXT NOT NULL,
            marriage_status TEXT NOT NULL,
            nationality TEXT NOT NULL,
            range_income TEXT NOT NULL,
            job TEXT NOT NULL,
            whatsapp_number TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issue_report (
            issue_report_id INTEGER PRIMARY KEY AUTOINCREMENT,
            resident_id INTEGER NOT NULL REFERENCES resident(resident_id),
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            approval_status TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
