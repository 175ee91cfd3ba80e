/// Round to two decimal places with banker's rounding (round half to even),
/// so repeated splits do not drift in one direction.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round_ties_even() / 100.0
}

/// Even split of the pool across the winners. A zero-winner game keeps the
/// divisor at 1 so the value stays finite.
pub fn split_prize(prize_pool: f64, winner_count: usize) -> f64 {
    round2(prize_pool / winner_count.max(1) as f64)
}
