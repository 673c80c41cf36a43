use async_trait::async_trait;
use time::{Date, PrimitiveDateTime};

use crate::pipeline::AggregationError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgConsumptionStore, PgWeatherStore};

/// Storage for one entity kind: raw rows `R` read-only, daily aggregates `A`
/// owned by the aggregator.
#[async_trait]
pub trait DailyStore<R, A>: Send + Sync
where
    R: Send + 'static,
    A: Send + Sync + 'static,
{
    /// Raw rows of an entity with `start <= ts <= end`, ascending by timestamp.
    async fn fetch_raw_in_range(
        &self,
        entity_code: &str,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<R>, AggregationError>;

    /// Open the transaction that replaces one aggregation window.
    async fn begin(&self) -> Result<Box<dyn WindowWriter<A>>, AggregationError>;

    /// Stored aggregates of an entity with `start <= day <= end`, ascending by day.
    async fn list_aggregates_in_range(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<A>, AggregationError>;
}

/// Write side of one transaction.
///
/// Nothing is visible to readers before `commit`. A writer dropped without
/// `commit` discards its pending changes.
#[async_trait]
pub trait WindowWriter<A>: Send
where
    A: Send + Sync + 'static,
{
    /// Delete aggregates of an entity with `start <= day <= end`.
    async fn delete_aggregates_in_range(
        &mut self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<u64, AggregationError>;

    async fn bulk_insert_aggregates(&mut self, rows: &[A]) -> Result<u64, AggregationError>;

    async fn commit(&mut self) -> Result<(), AggregationError>;

    async fn rollback(&mut self) -> Result<(), AggregationError>;
}
