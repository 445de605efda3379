//! Adaptive parameter estimation for Golomb-Rice codes.

use crate::bio::sizeof_golomb_rice;

/// Symbols coded between two re-estimations of `k`.
pub const RESET_INTERVAL: u64 = 256;

/// Largest `k` with `count << k <= sum`, or 0 without evidence.
pub fn optimal_k(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    let mut k = 1u32;
    while k < 64 && count.checked_shl(k).is_some_and(|c| c >> k == count && c <= sum) {
        k += 1;
    }
    (k - 1).min(32)
}

/// Running mean of coded magnitudes and the parameter derived from it.
///
/// A fixed model keeps its initial `k` forever and ignores updates. A ranked
/// model is fixed at `k = 0` and codes each symbol as its rank in a table,
/// so the table reads as a list of unary code lengths minus one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GolombRiceModel {
    k: u32,
    sum: u64,
    count: u64,
    adaptive: bool,
    ranks: Option<&'static [u32]>,
}

impl GolombRiceModel {
    /// Adaptive model seeded with `k`.
    pub fn new(k: u32) -> Self {
        Self {
            k,
            sum: 0,
            count: 0,
            adaptive: true,
            ranks: None,
        }
    }

    /// Model that always codes with `k`.
    pub fn fixed(k: u32) -> Self {
        Self {
            adaptive: false,
            ..Self::new(k)
        }
    }

    /// Unary code over `ranks`, indexed by symbol.
    pub fn ranked(ranks: &'static [u32]) -> Self {
        debug_assert!(
            ranks.iter().enumerate().all(|(i, r)| !ranks[..i].contains(r)),
            "ranks must be distinct"
        );
        Self {
            ranks: Some(ranks),
            ..Self::fixed(0)
        }
    }

    /// Value actually written for `symbol`.
    pub fn code_of(&self, symbol: usize) -> u32 {
        match self.ranks {
            Some(ranks) => ranks[symbol],
            None => u32::try_from(symbol).unwrap_or(u32::MAX),
        }
    }

    /// Inverse of [`code_of`](Self::code_of); `None` for a value no symbol
    /// is written as.
    pub fn symbol_of(&self, code: u32) -> Option<usize> {
        match self.ranks {
            Some(ranks) => ranks.iter().position(|&r| r == code),
            None => Some(code as usize),
        }
    }

    /// Last computed parameter.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Sum of values in the current window.
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Number of values in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Parameter the next value is coded with; what `recalc_k` would store.
    /// An empty window keeps the last `k`, so a seed holds until the first
    /// value arrives.
    pub fn parameter(&self) -> u32 {
        if self.adaptive && self.count > 0 {
            optimal_k(self.sum, self.count)
        } else {
            self.k
        }
    }

    /// Re-derives `k` from the running statistics.
    pub fn recalc_k(&mut self) -> u32 {
        self.k = self.parameter();
        self.k
    }

    /// Accumulates one value.
    pub fn update(&mut self, value: u64) {
        self.sum += value;
        self.count += 1;
    }

    /// Accumulates one value, restarting the window every
    /// [`RESET_INTERVAL`] values.
    pub fn update_model(&mut self, value: u64) {
        if !self.adaptive {
            return;
        }
        if self.count == RESET_INTERVAL {
            self.recalc_k();
            self.sum = 0;
            self.count = 0;
        }
        self.update(value);
    }

    /// Code length of `value` under the current parameter.
    pub fn sizeof(&self, value: u32) -> u64 {
        sizeof_golomb_rice(self.parameter(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimal_k_is_floor_of_log_mean() {
        assert_eq!(optimal_k(0, 0), 0);
        assert_eq!(optimal_k(0, 10), 0);
        assert_eq!(optimal_k(10, 10), 0);
        assert_eq!(optimal_k(20, 10), 1);
        assert_eq!(optimal_k(39, 10), 1);
        assert_eq!(optimal_k(40, 10), 2);
        assert_eq!(optimal_k(6, 1), 2);
    }

    #[test]
    fn window_resets_after_interval() {
        let mut gr = GolombRiceModel::new(0);
        for _ in 0..RESET_INTERVAL {
            gr.update_model(16);
        }
        assert_eq!(gr.count(), RESET_INTERVAL);
        assert_eq!(gr.parameter(), 4);

        gr.update_model(0);
        assert_eq!(gr.k(), 4);
        assert_eq!(gr.count(), 1);
        assert_eq!(gr.sum(), 0);
        assert_eq!(gr.parameter(), 0);
    }

    #[test]
    fn seed_holds_until_first_value() {
        let mut gr = GolombRiceModel::new(6);
        assert_eq!(gr.parameter(), 6);
        assert_eq!(gr.sizeof(0), 7);
        assert_eq!(gr.recalc_k(), 6);

        gr.update_model(1);
        assert_eq!(gr.parameter(), 0);
        assert_eq!(gr.recalc_k(), 0);
    }

    #[test]
    fn ranked_model_codes_ranks() {
        static RANKS: [u32; 3] = [2, 0, 1];
        let mut gr = GolombRiceModel::ranked(&RANKS);
        gr.update_model(40);
        assert_eq!(gr.parameter(), 0);
        assert_eq!(gr.code_of(0), 2);
        assert_eq!(gr.sizeof(gr.code_of(1)), 1);
        assert_eq!(gr.symbol_of(2), Some(0));
        assert_eq!(gr.symbol_of(3), None);
    }

    #[test]
    fn fixed_model_never_moves() {
        let mut gr = GolombRiceModel::fixed(8);
        for v in 0..1000 {
            gr.update_model(v);
        }
        assert_eq!(gr.parameter(), 8);
        assert_eq!(gr.sizeof(255), 9);
    }
}
