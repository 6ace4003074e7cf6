use anyhow::{anyhow, Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{BookingId, BookingStatus, BookingSummary};

const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Row contents written for a new or replaced booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub mentor: String,
    pub date: String,
    pub time_slot: String,
    pub user_name: String,
    pub company_name: Option<String>,
    pub round: String,
    pub invite_link: String,
    pub unique_code: Option<String>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(BookingId),
    SlotTaken,
    CodeTaken,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to an in-memory database sees its own empty schema.
        let max_connections = if database_url.starts_with(MEMORY_DATABASE_URL) {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(%database_url, "booking store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Claims the slot in a single statement; a taken slot or code is reported, not raised.
    pub async fn insert_booking(&self, booking: &NewBooking) -> Result<InsertOutcome> {
        let inserted = sqlx::query(
            "INSERT INTO bookings
                (mentor, date, time_slot, user_name, company_name, round, invite_link, unique_code, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (mentor, date, time_slot) DO NOTHING
             RETURNING id",
        )
        .bind(&booking.mentor)
        .bind(&booking.date)
        .bind(&booking.time_slot)
        .bind(&booking.user_name)
        .bind(&booking.company_name)
        .bind(&booking.round)
        .bind(&booking.invite_link)
        .bind(&booking.unique_code)
        .bind(booking.status.as_str())
        .fetch_optional(&self.pool)
        .await;

        match inserted {
            Ok(Some(rec)) => Ok(InsertOutcome::Inserted(BookingId(rec.get::<i64, _>(0)))),
            Ok(None) => Ok(InsertOutcome::SlotTaken),
            // The slot key is absorbed by ON CONFLICT, so only the code index can trip here.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(InsertOutcome::CodeTaken)
            }
            Err(err) => Err(err).with_context(|| {
                format!(
                    "failed to insert booking for {} on {} at {}",
                    booking.mentor, booking.date, booking.time_slot
                )
            }),
        }
    }

    /// Overwrites every column of `current` except its slot key, provided its
    /// status and round are still what the caller read. Returns `false` when
    /// the row changed or disappeared in between.
    pub async fn replace_booking(
        &self,
        current: &BookingSummary,
        booking: &NewBooking,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bookings
             SET user_name = ?, company_name = ?, round = ?, invite_link = ?,
                 unique_code = ?, status = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status = ? AND round = ?",
        )
        .bind(&booking.user_name)
        .bind(&booking.company_name)
        .bind(&booking.round)
        .bind(&booking.invite_link)
        .bind(&booking.unique_code)
        .bind(booking.status.as_str())
        .bind(current.booking_id.0)
        .bind(current.status.as_str())
        .bind(&current.round)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to replace booking {}", current.booking_id.0))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_booking_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(booking_id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn booking_for_slot(
        &self,
        mentor: &str,
        date: &str,
        time_slot: &str,
    ) -> Result<Option<BookingSummary>> {
        let row = sqlx::query(
            "SELECT id, mentor, date, time_slot, user_name, company_name, round, invite_link, unique_code, status
             FROM bookings
             WHERE mentor = ? AND date = ? AND time_slot = ?",
        )
        .bind(mentor)
        .bind(date)
        .bind(time_slot)
        .fetch_optional(&self.pool)
        .await?;
        row.map(booking_from_row).transpose()
    }

    pub async fn bookings_for_day(&self, mentor: &str, date: &str) -> Result<Vec<BookingSummary>> {
        let rows = sqlx::query(
            "SELECT id, mentor, date, time_slot, user_name, company_name, round, invite_link, unique_code, status
             FROM bookings
             WHERE mentor = ? AND date = ?
             ORDER BY id ASC",
        )
        .bind(mentor)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(booking_from_row).collect()
    }

    pub async fn list_bookings(&self) -> Result<Vec<BookingSummary>> {
        let rows = sqlx::query(
            "SELECT id, mentor, date, time_slot, user_name, company_name, round, invite_link, unique_code, status
             FROM bookings
             ORDER BY mentor ASC, date ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(booking_from_row).collect()
    }

    pub async fn delete_booking_by_code(&self, unique_code: &str) -> Result<Option<BookingId>> {
        let row = sqlx::query("DELETE FROM bookings WHERE unique_code = ? RETURNING id")
            .bind(unique_code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| BookingId(r.get::<i64, _>(0))))
    }
}

fn booking_from_row(row: SqliteRow) -> Result<BookingSummary> {
    let raw_status: String = row.try_get(9)?;
    let status = BookingStatus::parse(&raw_status)
        .ok_or_else(|| anyhow!("unknown booking status '{raw_status}'"))?;
    Ok(BookingSummary {
        booking_id: BookingId(row.try_get::<i64, _>(0)?),
        mentor: row.try_get(1)?,
        date: row.try_get(2)?,
        time_slot: row.try_get(3)?,
        user_name: row.try_get(4)?,
        company_name: row.try_get(5)?,
        round: row.try_get(6)?,
        invite_link: row.try_get(7)?,
        unique_code: row.try_get(8)?,
        status,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == MEMORY_DATABASE_URL || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
