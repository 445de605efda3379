//! Adaptive frequency tables for the arithmetic coder.

/// Totals stop growing through increments beyond this point.
pub const FREQUENCY_LIMIT: u32 = 1 << 28;

/// Hard ceiling on a model total; keeps every coded interval non-empty.
pub const MAX_TOTAL: u32 = 1 << 29;

/// One row of a frequency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Symbol identity.
    pub id: usize,
    /// Occurrence count, never below 1.
    pub freq: u32,
    /// Sum of the frequencies of all preceding rows.
    pub cum_freq: u32,
}

impl Symbol {
    /// Upper end of this symbol's cumulative range.
    #[inline]
    pub fn high(&self) -> u32 {
        self.cum_freq + self.freq
    }
}

/// Symbol table with frequencies that only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyModel {
    symbols: Vec<Symbol>,
    total: u32,
}

impl FrequencyModel {
    /// `count` symbols with ids `0..count`, each of frequency 1.
    pub fn new(count: usize) -> Self {
        assert!(count < MAX_TOTAL as usize, "alphabet too large");
        let symbols = (0..count)
            .map(|id| Symbol {
                id,
                freq: 1,
                cum_freq: id as u32,
            })
            .collect();
        Self {
            symbols,
            total: count as u32,
        }
    }

    /// One symbol per entry of `freqs`, ids in order, starting at those counts.
    pub fn with_frequencies(freqs: &[u32]) -> Self {
        let mut total = 0u32;
        let symbols = freqs
            .iter()
            .enumerate()
            .map(|(id, &freq)| {
                assert!(freq >= 1, "zero frequency");
                let s = Symbol {
                    id,
                    freq,
                    cum_freq: total,
                };
                total = total.saturating_add(freq);
                s
            })
            .collect();
        assert!(total <= FREQUENCY_LIMIT, "initial frequencies too large");
        Self { symbols, total }
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// `true` without symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Sum of all frequencies.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Rows in order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Row of `symbol`.
    pub fn get(&self, symbol: usize) -> Option<&Symbol> {
        self.symbols.get(symbol)
    }

    /// Row whose cumulative range contains `target`.
    pub fn find(&self, target: u32) -> Option<&Symbol> {
        self.symbols
            .iter()
            .find(|s| s.cum_freq <= target && target < s.high())
    }

    /// Estimated probability of `symbol`; does not touch the model.
    pub fn probability(&self, symbol: usize) -> f64 {
        match self.symbols.get(symbol) {
            Some(s) => f64::from(s.freq) / f64::from(self.total),
            None => 0.0,
        }
    }

    /// Information content of `symbol` in bits.
    pub fn cost(&self, symbol: usize) -> f64 {
        -self.probability(symbol).log2()
    }

    /// Counts one more occurrence of `symbol`.
    pub fn increment(&mut self, symbol: usize) {
        assert!(symbol < self.symbols.len(), "symbol outside the alphabet");
        if self.total >= FREQUENCY_LIMIT {
            return;
        }
        self.symbols[symbol].freq += 1;
        for s in &mut self.symbols[symbol + 1..] {
            s.cum_freq += 1;
        }
        self.total += 1;
    }

    /// Appends the next symbol id with frequency 1.
    pub fn enlarge(&mut self) {
        assert!(self.total < MAX_TOTAL, "frequency model exhausted");
        let id = self.symbols.len();
        self.symbols.push(Symbol {
            id,
            freq: 1,
            cum_freq: self.total,
        });
        self.total += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consistent(m: &FrequencyModel) -> bool {
        let mut cum = 0;
        for s in m.symbols() {
            if s.cum_freq != cum {
                return false;
            }
            cum += s.freq;
        }
        cum == m.total()
    }

    #[test]
    fn create_is_uniform() {
        let m = FrequencyModel::new(4);
        assert_eq!(m.total(), 4);
        assert!(consistent(&m));
        assert_eq!(m.probability(2), 0.25);
        assert_eq!(m.cost(3), 2.0);
    }

    #[test]
    fn seeded_frequencies() {
        let m = FrequencyModel::with_frequencies(&[4, 2, 1, 1]);
        assert_eq!(m.total(), 8);
        assert!(consistent(&m));
        assert_eq!(m.cost(0), 1.0);
        assert_eq!(m.cost(3), 3.0);
        assert_eq!(m.find(6).map(|s| s.id), Some(2));
    }

    #[test]
    fn increment_and_enlarge_keep_prefix_sums() {
        let mut m = FrequencyModel::new(0);
        assert!(m.is_empty());
        m.enlarge();
        m.enlarge();
        m.increment(0);
        m.increment(0);
        m.enlarge();
        m.increment(2);
        assert!(consistent(&m));
        assert_eq!(m.total(), 6);
        assert_eq!(m.get(0).map(|s| s.freq), Some(3));
        assert_eq!(m.find(3).map(|s| s.id), Some(1));
        assert_eq!(m.find(4).map(|s| s.id), Some(2));
        assert_eq!(m.find(6), None);
    }
}
