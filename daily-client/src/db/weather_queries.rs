use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use time::{Date, PrimitiveDateTime};

use crate::domain::{quality::count_from_db, DailyWeather, RowError, WeatherObservation};

#[derive(Debug, Clone, sqlx::FromRow)]
struct DailyWeatherRow {
    entity_code: String,
    day: Date,
    mean_temperature_c: Option<Decimal>,
    mean_humidity_pct: Option<Decimal>,
    total_precipitation_mm: Decimal,
    mean_wind_speed_ms: Option<Decimal>,
    valid_count: i64,
    station_count: i64,
    quality: String,
}

impl TryFrom<DailyWeatherRow> for DailyWeather {
    type Error = RowError;

    fn try_from(r: DailyWeatherRow) -> Result<Self, Self::Error> {
        Ok(DailyWeather {
            entity_code: r.entity_code,
            day: r.day,
            mean_temperature_c: r.mean_temperature_c,
            mean_humidity_pct: r.mean_humidity_pct,
            total_precipitation_mm: r.total_precipitation_mm,
            mean_wind_speed_ms: r.mean_wind_speed_ms,
            valid_count: count_from_db(r.valid_count)?,
            station_count: count_from_db(r.station_count)?,
            quality: r.quality.parse()?,
        })
    }
}

/// Fetch the observations of a department with `start <= ts <= end`, oldest first.
pub async fn observations_in_range(
    pool: &PgPool,
    entity_code: &str,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<Vec<WeatherObservation>> {
    let rows = sqlx::query_as::<_, WeatherObservation>(
        r#"
        SELECT
            entity_code,
            station_id,
            ts,
            CAST(temperature_c AS NUMERIC)    AS temperature_c,
            CAST(humidity_pct AS NUMERIC)     AS humidity_pct,
            CAST(precipitation_mm AS NUMERIC) AS precipitation_mm,
            CAST(wind_speed_ms AS NUMERIC)    AS wind_speed_ms
        FROM weather_observation
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

/// Count observations of a department in the same range `observations_in_range` reads.
pub async fn count_observations_in_range(
    pool: &PgPool,
    entity_code: &str,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM weather_observation
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

pub async fn delete_daily_in_range(
    conn: &mut PgConnection,
    entity_code: &str,
    start: Date,
    end: Date,
) -> Result<u64> {
    let res = sqlx::query(
        r#"
        DELETE FROM daily_weather
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

pub async fn insert_daily_batch(conn: &mut PgConnection, rows: &[DailyWeather]) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO daily_weather (entity_code, day, mean_temperature_c, mean_humidity_pct, \
         total_precipitation_mm, mean_wind_speed_ms, valid_count, station_count, quality) ",
    );
    builder.push_values(rows, |mut b, r| {
        b.push_bind(&r.entity_code)
            .push_bind(r.day)
            .push_bind(r.mean_temperature_c)
            .push_bind(r.mean_humidity_pct)
            .push_bind(r.total_precipitation_mm)
            .push_bind(r.mean_wind_speed_ms)
            .push_bind(i64::from(r.valid_count))
            .push_bind(i64::from(r.station_count))
            .push_bind(r.quality.as_str());
    });

    let res = builder.build().execute(&mut *conn).await?;
    Ok(res.rows_affected())
}

pub async fn daily_in_range(
    pool: &PgPool,
    entity_code: &str,
    start: Date,
    end: Date,
) -> Result<Vec<DailyWeather>> {
    let rows = sqlx::query_as::<_, DailyWeatherRow>(
        r#"
        SELECT
            entity_code,
            day,
            mean_temperature_c,
            mean_humidity_pct,
            total_precipitation_mm,
            mean_wind_speed_ms,
            valid_count,
            station_count,
            quality
        FROM daily_weather
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
        .map(DailyWeather::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(days)
}
