use rust_decimal::Decimal;

use crate::types::Money;

/// Distribute `cash` across tranches in priority order.
///
/// `capacities[i]` is what tranche `i` can still absorb (its balance after
/// mandatory amortisation). Each tranche is filled before the next one sees any
/// cash. Returns the amount applied per tranche; the sum never exceeds `cash`
/// and no entry exceeds its capacity.
pub fn allocate_sweep(cash: Money, capacities: &[Money]) -> Vec<Money> {
    let mut remaining = cash.max(Decimal::ZERO);
    capacities
        .iter()
        .map(|capacity| {
            let applied = remaining.min((*capacity).max(Decimal::ZERO));
            remaining -= applied;
            applied
        })
        .collect()
}
