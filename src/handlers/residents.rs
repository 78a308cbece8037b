//! Resident and household lookups
//!
//! Replies are formatted the way the operators expect them in the chat
//! client: bold field labels, one field per line, Indonesian labels.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::conversation::SenderId;
use crate::dispatch::{HandlerError, ResidentData};

#[derive(Debug, sqlx::FromRow)]
struct ResidentRow {
    nik: String,
    full_name: String,
    place_of_birth: String,
    date_of_birth: String,
    gender: String,
    blood_type: String,
    religion: String,
    marriage_status: String,
    nationality: String,
    range_income: String,
    job: String,
    whatsapp_number: String,
}

#[derive(Debug, sqlx::FromRow)]
struct HouseholdRow {
    number_kk: String,
    address: String,
    rt: String,
    rw: String,
    sub_district: String,
    city: String,
    province: String,
    postal_code: String,
}

const RESIDENT_COLUMNS: &str = r#"
    nik,
    full_name,
    place_of_birth,
    date_of_birth,
    gender,
    blood_type,
    religion,
    marriage_status,
    nationality,
    range_income,
    job,
    whatsapp_number"#;

pub struct SqlResidentData {
    pool: SqlitePool,
}

impl SqlResidentData {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResidentData for SqlResidentData {
    async fn personal_data(&self, sender: &SenderId) -> Result<String, HandlerError> {
        let row: Option<ResidentRow> = sqlx::query_as(&format!(
            "SELECT {RESIDENT_COLUMNS} FROM resident WHERE whatsapp_number = ?"
        ))
        .bind(sender.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| HandlerError::UnknownResident(sender.clone()))?;
        Ok(format!(
            "*Data kependudukan Anda*:\n{}",
            format_resident(&row)
        ))
    }

    async fn household_data(&self, sender: &SenderId) -> Result<String, HandlerError> {
        let row: Option<HouseholdRow> = sqlx::query_as(
            r#"
            SELECT
                number_kk,
                address,
                rt,
                rw,
                sub_district,
                city,
                province,
                postal_code
            FROM household
            JOIN resident r ON household.household_id = r.household_id
            WHERE r.whatsapp_number = ?
            "#,
        )
        .bind(sender.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| HandlerError::UnknownResident(sender.clone()))?;
        Ok(format!(
            "*Data rumah tangga Anda*:\n\
             *Nomor KK*: {}\n\
             *Alamat*: {}\n\
             *RT*: {}\n\
             *RW*: {}\n\
             *Kelurahan*: {}\n\
             *Kota*: {}\n\
             *Provinsi*: {}\n\
             *Kode Pos*: {}",
            row.number_kk,
            row.address,
            row.rt,
            row.rw,
            row.sub_district,
            row.city,
            row.province,
            row.postal_code
        ))
    }

    async fn household_members(&self, sender: &SenderId) -> Result<String, HandlerError> {
        let rows: Vec<ResidentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RESIDENT_COLUMNS}
            FROM resident
            WHERE household_id IN (SELECT household_id
                                   FROM resident
                                   WHERE whatsapp_number = ?)
            "#
        ))
        .bind(sender.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(HandlerError::UnknownResident(sender.clone()));
        }

        let mut out = String::new();
        for row in &rows {
            out.push_str("*Data kependudukan*:\n");
            out.push_str(&format_resident(row));
            out.push_str("\n\n");
        }
        Ok(out)
    }
}

fn format_resident(row: &ResidentRow) -> String {
    format!(
        "*NIK*: {}\n\
         *Nama Lengkap*: {}\n\
         *Tempat Lahir*: {}\n\
         *Tanggal Lahir*: {}\n\
         *Jenis Kelamin*: {}\n\
         *Golongan Darah*: {}\n\
         *Agama*: {}\n\
         *Status Pernikahan*: {}\n\
         *Kewarganegaraan*: {}\n\
         *Rentang Penghasilan*: {}\n\
         *Pekerjaan*: {}\n\
         *Nomor WhatsApp*: {}",
        row.nik,
        row.full_name,
        row.place_of_birth,
        format_date(&row.date_of_birth),
        row.gender,
        row.blood_type,
        row.religion,
        row.marriage_status,
        row.nationality,
        row.range_income,
        row.job,
        row.whatsapp_number
    )
}

/// Render an ISO date as `02 January 1990`; unparsable values pass through.
fn format_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%d %B %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
