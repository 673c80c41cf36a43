use rust_decimal::{Decimal, RoundingStrategy};

/// Round half away from zero to `scale` places and pad to exactly that scale,
/// so `20` renders as `20.0000` at scale 4.
pub fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Arithmetic mean rounded with [`round_half_up`]; `None` for no values.
pub fn mean<I>(values: I, scale: u32) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        return None;
    }
    Some(round_half_up(sum / Decimal::from(count), scale))
}

/// Sum rounded with [`round_half_up`]; zero for no values.
pub fn total<I>(values: I, scale: u32) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round_half_up(values.into_iter().sum(), scale)
}
