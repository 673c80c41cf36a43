use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::{Date, PrimitiveDateTime};

use crate::domain::{quality::count_from_db, ConsumptionReading, DailyConsumption, RowError};

#[derive(Debug, Clone, sqlx::FromRow)]
struct DailyConsumptionRow {
    entity_code: String,
    day: Date,
    mean_mw: Decimal,
    valid_count: i64,
    quality: String,
}

impl TryFrom<DailyConsumptionRow> for DailyConsumption {
    type Error = RowError;

    fn try_from(r: DailyConsumptionRow) -> Result<Self, Self::Error> {
        Ok(DailyConsumption {
            entity_code: r.entity_code,
            day: r.day,
            mean_mw: r.mean_mw,
            valid_count: count_from_db(r.valid_count)?,
            quality: r.quality.parse()?,
        })
    }
}

/// Fetch the readings of a region with `start <= ts <= end`, oldest first.
///
/// `value_mw` is cast to NUMERIC so callers never see a binary float,
/// whatever the physical column type is.
pub async fn readings_in_range(
    pool: &PgPool,
    entity_code: &str,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<Vec<ConsumptionReading>> {
    let rows = sqlx::query_as::<_, ConsumptionReading>(
        r#"
        SELECT
            entity_code,
            ts,
            CAST(value_mw AS NUMERIC) AS value_mw
        FROM consumption_reading
        WHERE entity_code = $1
          AND ts >= $2
          AND ts <= $3
        ORDER BY ts
        "#,
    )
    .bind(entity_code)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn count_readings_in_range(
    pool: &PgPool,
    entity_code: &str,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM consumption_reading
        WHERE entity_code = $1
          AND ts >= $2
          AND ts <= $3
        "#,
    )
    .bind(entity_code)
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Delete the daily rows of a region for `start <= day <= end`.
pub async fn delete_daily_in_range(
    conn: &mut PgConnection,
    entity_code: &str,
    start: Date,
    end: Date,
) -> Result<u64> {
    let res = sqlx::query(
        r#"
        DELETE FROM daily_consumption
        WHERE entity_code = $1
          AND day >= $2
          AND day <= $3
        "#,
    )
    .bind(entity_code)
    .bind(start)
    .bind(end)
    .execute(&mut *conn)
    .await?;

    Ok(res.rows_affected())
}

/// Insert all rows in a single multi-row statement.
pub async fn insert_daily_batch(conn: &mut PgConnection, rows: &[DailyConsumption]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO daily_consumption (entity_code, day, mean_mw, valid_count, quality) ",
    );
    builder.push_values(rows, |mut b, r| {
        b.push_bind(&r.entity_code)
            .push_bind(r.day)
            .push_bind(r.mean_mw)
            .push_bind(i64::from(r.valid_count))
            .push_bind(r.quality.as_str());
    });

    let res = builder.build().execute(&mut *conn).await?;
    Ok(res.rows_affected())
}

/// Stored daily rows of a region for `start <= day <= end`, by day.
pub async fn daily_in_range(
    pool: &PgPool,
    entity_code: &str,
    start: Date,
    end: Date,
) -> Result<Vec<DailyConsumption>> {
    let rows = sqlx::query_as::<_, DailyConsumptionRow>(
        r#"
        SELECT entity_code, day, mean_mw, valid_count, quality
        FROM daily_consumption
        WHERE entity_code = $1
          AND day >= $2
          AND day <= $3
        ORDER BY day
        "#,
    )
    .bind(entity_code)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let days = rows
        .into_iter()
        .map(DailyConsumption::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(days)
}
