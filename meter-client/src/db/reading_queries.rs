use sqlx::SqliteConnection;

use crate::domain::MeterKey;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MeterRow {
    pub meter_id: String,
    pub last_reading: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub meter_id: String,
    pub period: String,
    pub reading: i64,
    pub amount: Option<f64>,
}

pub async fn create_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meters (
            meter_id     TEXT PRIMARY KEY,
            last_reading INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings_history (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            meter_id TEXT NOT NULL,
            period   TEXT NOT NULL,
            reading  INTEGER NOT NULL,
            amount   REAL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert each meter with a zero baseline, leaving existing rows untouched.
pub async fn insert_missing_meters(conn: &mut SqliteConnection, keys: &[MeterKey]) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    for key in keys {
        let res = sqlx::query("INSERT OR IGNORE INTO meters (meter_id, last_reading) VALUES ($1, 0)")
            .bind(key.as_str())
            .execute(&mut *conn)
            .await?;
        inserted += res.rows_affected();
    }
    Ok(inserted)
}

pub async fn meters_table_exists(conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'meters'")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

pub async fn count_nonzero_meters(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM meters WHERE last_reading > 0")
        .fetch_one(&mut *conn)
        .await
}

pub async fn last_reading(conn: &mut SqliteConnection, key: MeterKey) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT last_reading FROM meters WHERE meter_id = $1")
        .bind(key.as_str())
        .fetch_optional(&mut *conn)
        .await
}

pub async fn all_meters(conn: &mut SqliteConnection) -> Result<Vec<MeterRow>, sqlx::Error> {
    sqlx::query_as::<_, MeterRow>("SELECT meter_id, last_reading FROM meters ORDER BY meter_id")
        .fetch_all(&mut *conn)
        .await
}

/// Returns the number of rows touched; zero means the meter row is missing.
pub async fn set_last_reading(conn: &mut SqliteConnection, key: MeterKey, value: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE meters SET last_reading = $1 WHERE meter_id = $2")
        .bind(value)
        .bind(key.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected())
}

pub async fn append_history(
    conn: &mut SqliteConnection,
    key: MeterKey,
    period: &str,
    reading: i64,
    amount: Option<f64>,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO readings_history (meter_id, period, reading, amount) VALUES ($1, $2, $3, $4)")
        .bind(key.as_str())
        .bind(period)
        .bind(reading)
        .bind(amount)
        .execute(&mut *conn)
        .await?;
    Ok(res.last_insert_rowid())
}

/// History of one meter, oldest first.
pub async fn meter_history(conn: &mut SqliteConnection, key: MeterKey) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT id, meter_id, period, reading, amount
        FROM readings_history
        WHERE meter_id = $1
        ORDER BY id
        "#,
    )
    .bind(key.as_str())
    .fetch_all(&mut *conn)
    .await
}

pub async fn full_history(conn: &mut SqliteConnection) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT id, meter_id, period, reading, amount
        FROM readings_history
        ORDER BY id
        "#,
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn drop_schema(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DROP TABLE IF EXISTS readings_history")
        .execute(&mut *conn)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS meters").execute(&mut *conn).await?;
    Ok(())
}
