//! In-memory store, used by tests and local runs without a database.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use daily_client::{DailyKeyed, Measured};
use time::{Date, PrimitiveDateTime};
use tokio::sync::RwLock;

use super::{DailyStore, WindowWriter};
use crate::pipeline::AggregationError;

/// Raw rows and daily aggregates held behind `RwLock`s.
///
/// A transaction buffers its deletes and inserts and applies them in one
/// step at commit, after checking the `(entity, day)` uniqueness constraint.
pub struct MemoryStore<R, A> {
    raw: Arc<RwLock<Vec<R>>>,
    daily: Arc<RwLock<Vec<A>>>,
    fail_inserts: Arc<AtomicBool>,
}

impl<R, A> Default for MemoryStore<R, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, A> MemoryStore<R, A> {
    pub fn new() -> Self {
        Self {
            raw: Arc::new(RwLock::new(Vec::new())),
            daily: Arc::new(RwLock::new(Vec::new())),
            fail_inserts: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn push_raw(&self, rows: impl IntoIterator<Item = R>) {
        self.raw.write().await.extend(rows);
    }

    /// Store aggregates directly, bypassing any transaction.
    pub async fn seed_daily(&self, rows: impl IntoIterator<Item = A>) {
        self.daily.write().await.extend(rows);
    }

    /// Make every following bulk insert fail, to exercise rollback.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }
}

impl<R, A: Clone> MemoryStore<R, A> {
    /// Snapshot of the committed aggregates in storage order.
    pub async fn daily_rows(&self) -> Vec<A> {
        self.daily.read().await.clone()
    }
}

fn in_window<A: DailyKeyed>(row: &A, entity_code: &str, start: Date, end: Date) -> bool {
    row.entity_code() == entity_code && row.day() >= start && row.day() <= end
}

#[async_trait]
impl<R, A> DailyStore<R, A> for MemoryStore<R, A>
where
    R: Measured + Clone + Send + Sync + 'static,
    A: DailyKeyed + Clone + Send + Sync + 'static,
{
    async fn fetch_raw_in_range(
        &self,
        entity_code: &str,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<R>, AggregationError> {
        let raw = self.raw.read().await;
        let mut rows: Vec<R> = raw
            .iter()
            .filter(|r| r.entity_code() == entity_code && r.ts() >= start && r.ts() <= end)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.ts());
        Ok(rows)
    }

    async fn begin(&self) -> Result<Box<dyn WindowWriter<A>>, AggregationError> {
        Ok(Box::new(MemoryWindowTx {
            daily: self.daily.clone(),
            fail_inserts: self.fail_inserts.load(Ordering::SeqCst),
            deletes: Vec::new(),
            inserts: Vec::new(),
        }))
    }

    async fn list_aggregates_in_range(
        &self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<Vec<A>, AggregationError> {
        let daily = self.daily.read().await;
        let mut rows: Vec<A> = daily
            .iter()
            .filter(|r| in_window(*r, entity_code, start, end))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.day());
        Ok(rows)
    }
}

struct MemoryWindowTx<A> {
    daily: Arc<RwLock<Vec<A>>>,
    fail_inserts: bool,
    deletes: Vec<(String, Date, Date)>,
    inserts: Vec<A>,
}

#[async_trait]
impl<A> WindowWriter<A> for MemoryWindowTx<A>
where
    A: DailyKeyed + Clone + Send + Sync + 'static,
{
    async fn delete_aggregates_in_range(
        &mut self,
        entity_code: &str,
        start: Date,
        end: Date,
    ) -> Result<u64, AggregationError> {
        let matched = self
            .daily
            .read()
            .await
            .iter()
            .filter(|r| in_window(*r, entity_code, start, end))
            .count();
        self.deletes.push((entity_code.to_string(), start, end));
        Ok(matched as u64)
    }

    async fn bulk_insert_aggregates(&mut self, rows: &[A]) -> Result<u64, AggregationError> {
        if self.fail_inserts {
            return Err(AggregationError::Insert("insert rejected by memory store".to_string()));
        }
        self.inserts.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn commit(&mut self) -> Result<(), AggregationError> {
        let mut daily = self.daily.write().await;

        let mut next: Vec<A> = daily
            .iter()
            .filter(|r| {
                !self
                    .deletes
                    .iter()
                    .any(|(code, start, end)| in_window(*r, code, *start, *end))
            })
            .cloned()
            .collect();
        next.extend(self.inserts.drain(..));

        let mut keys = HashSet::with_capacity(next.len());
        for row in &next {
            if !keys.insert((row.entity_code().to_string(), row.day())) {
                return Err(AggregationError::Insert(format!(
                    "duplicate key ({}, {})",
                    row.entity_code(),
                    row.day()
                )));
            }
        }

        *daily = next;
        self.deletes.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), AggregationError> {
        self.deletes.clear();
        self.inserts.clear();
        Ok(())
    }
}
