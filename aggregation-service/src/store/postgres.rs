use std::marker::PhantomData;

use async_trait::async_trait;
use daily_client::{
    db::{consumption_queries, weather_queries},
    ConsumptionReading, DailyConsumption, DailyWeather, WeatherObservation,
};
use sqlx::{postgres::PgPool, Postgres, Transaction};
use time::{Date, PrimitiveDateTime};

use super::{DailyStore, WindowWriter};
use crate::pipeline::AggregationError;

/// PostgreSQL-backed store; the SQL lives in `daily_client::db`.
pub struct PgDailyStore<R, A> {
    pool: PgPool,
    _marker: PhantomData<fn() -> (R, A)>,
}

impl<R, A> PgDailyStore<R, A> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    async fn begin_tx(&self) -> Result<PgWindowTx<A>, AggregationError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AggregationError::Transaction(format!("failed to begin: {e}")))?;
        Ok(PgWindowTx {
            tx: Some(tx),
            _marker: PhantomData,
        })
    }
}

/// An open PostgreSQL transaction. Dropping it uncommitted rolls it back.
pub struct PgWindowTx<A> {
    tx: Option<Transaction<'static, Postgres>>,
    _marker: PhantomData<fn() -> A>,
}

impl<A> PgWindowTx<A> {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>, AggregationError> {
        self.tx
            .as_mut()
            .ok_or_else(|| AggregationError::Transaction("transaction already finished".to_string()))
    }

    async fn finish(&mut self, commit: bool) -> Result<(), AggregationError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AggregationError::Transaction("transaction already finished".to_string()))?;
        let res = if commit { tx.commit().await } else { tx.rollback().await };
        res.map_err(|e| AggregationError::Transaction(e.to_string()))
    }
}

pub type PgConsumptionStore = PgDailyStore<ConsumptionReading, DailyConsumption>;
pub type PgWeatherStore = PgDailyStore<WeatherObservation, DailyWeather>;

#[async_trait]
impl DailyStore<ConsumptionReading, DailyConsumption> for PgConsumptionStore {
    async fn fetch_raw_in_range(
        &self,
        entity_code: &str,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<ConsumptionReading>, AggregationError> {
        consumption_queries::readings_in_range(&self.pool, entity_code, start, end)
            .await
            .map_err(|e| AggregationError::Fetch(e.to_string()))
    }

    async fn begin(&self) -> Result<Box<dyn WindowWriter<DailyConsumption>>, AggregationError> {
        Ok(Box::new(self.begin_tx().await?))
    }

    async fn list_aggregates_in_range(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<DailyConsumption>, AggregationError> {
        consumption_queries::daily_in_range(&self.pool, entity_code, start, end)
            .await
            .map_err(|e| AggregationError::Fetch(e.to_string()))
    }
}

#[async_trait]
impl WindowWriter<DailyConsumption> for PgWindowTx<DailyConsumption> {
    async fn delete_aggregates_in_range(
        &mut self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<u64, AggregationError> {
        let tx = self.conn()?;
        consumption_queries::delete_daily_in_range(tx, entity_code, start, end)
            .await
            .map_err(|e| AggregationError::Delete(e.to_string()))
    }

    async fn bulk_insert_aggregates(&mut self, rows: &[DailyConsumption]) -> Result<u64, AggregationError> {
        let tx = self.conn()?;
        consumption_queries::insert_daily_batch(tx, rows)
            .await
            .map_err(|e| AggregationError::Insert(e.to_string()))
    }

    async fn commit(&mut self) -> Result<(), AggregationError> {
        self.finish(true).await
    }

    async fn rollback(&mut self) -> Result<(), AggregationError> {
        self.finish(false).await
    }
}

#[async_trait]
impl DailyStore<WeatherObservation, DailyWeather> for PgWeatherStore {
    async fn fetch_raw_in_range(
        &self,
        entity_code: &str,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<WeatherObservation>, AggregationError> {
        weather_queries::observations_in_range(&self.pool, entity_code, start, end)
            .await
            .map_err(|e| AggregationError::Fetch(e.to_string()))
    }

    async fn begin(&self) -> Result<Box<dyn WindowWriter<DailyWeather>>, AggregationError> {
        Ok(Box::new(self.begin_tx().await?))
    }

    async fn list_aggregates_in_range(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<DailyWeather>, AggregationError> {
        weather_queries::daily_in_range(&self.pool, entity_code, start, end)
            .await
            .map_err(|e| AggregationError::Fetch(e.to_string()))
    }
}

#[async_trait]
impl WindowWriter<DailyWeather> for PgWindowTx<DailyWeather> {
    async fn delete_aggregates_in_range(
        &mut self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<u64, AggregationError> {
        let tx = self.conn()?;
        weather_queries::delete_daily_in_range(tx, entity_code, start, end)
            .await
            .map_err(|e| AggregationError::Delete(e.to_string()))
    }

    async fn bulk_insert_aggregates(&mut self, rows: &[DailyWeather]) -> Result<u64, AggregationError> {
        let tx = self.conn()?;
        weather_queries::insert_daily_batch(tx, rows)
            .await
            .map_err(|e| AggregationError::Insert(e.to_string()))
    }

    async fn commit(&mut self) -> Result<(), AggregationError> {
        self.finish(true).await
    }

    async fn rollback(&mut self) -> Result<(), AggregationError> {
        self.finish(false).await
    }
}
