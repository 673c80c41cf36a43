use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime};

use super::{DailyKeyed, Measured, QualityIndicator};

/// One power-consumption reading for a region, nominally every 30 minutes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConsumptionReading {
    pub entity_code: String,
    pub ts: PrimitiveDateTime,
    pub value_mw: Option<Decimal>,
}

impl Measured for ConsumptionReading {
    fn entity_code(&self) -> &str {
        &self.entity_code
    }

    fn ts(&self) -> PrimitiveDateTime {
        self.ts
    }
}

/// Daily mean consumption of a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyConsumption {
    pub entity_code: String,
    pub day: Date,
    /// Mean of the strictly positive readings, scale 4.
    pub mean_mw: Decimal,
    pub valid_count: u32,
    pub quality: QualityIndicator,
}

impl DailyKeyed for DailyConsumption {
    fn entity_code(&self) -> &str {
        &self.entity_code
    }

    fn day(&self) -> Date {
        self.day
    }
}
