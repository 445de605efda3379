//! Encoder tuning knobs.

use crate::{X3Error, X3Result};

/// Forward window scanned by the match finder, in bytes.
pub const DEFAULT_FORWARD_WINDOW: usize = 8 * 1024;
/// Repeat count threshold the match finder starts from.
pub const DEFAULT_MAX_MATCH_COUNT: u32 = 15;
/// Worker threads for the match finder.
pub const DEFAULT_NUM_THREADS: usize = 1;

/// Settings that shape compression. Decompression needs none of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bytes ahead of the cursor the match finder looks at.
    pub forward_window: usize,
    /// Highest repeat count a span is tested against.
    pub max_match_count: u32,
    /// Threads for the match finder; never changes the output.
    pub num_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forward_window: DEFAULT_FORWARD_WINDOW,
            max_match_count: DEFAULT_MAX_MATCH_COUNT,
            num_threads: DEFAULT_NUM_THREADS,
        }
    }
}

impl Config {
    /// Sets the forward window in bytes.
    pub fn with_forward_window(mut self, bytes: usize) -> Self {
        self.forward_window = bytes;
        self
    }

    /// Sets the forward window in KiB.
    pub fn with_forward_window_kib(self, kib: usize) -> Self {
        self.with_forward_window(kib.saturating_mul(1024))
    }

    /// Sets the repeat count threshold.
    pub fn with_max_match_count(mut self, count: u32) -> Self {
        self.max_match_count = count;
        self
    }

    /// Sets the match finder thread count.
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Rejects settings the match finder cannot work with.
    pub fn validate(&self) -> X3Result<()> {
        if self.forward_window == 0 {
            return Err(X3Error::ConfigError("forward window must not be empty"));
        }
        if self.num_threads == 0 {
            return Err(X3Error::ConfigError("at least one thread is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_validation() {
        let cfg = Config::default()
            .with_forward_window_kib(64)
            .with_max_match_count(3)
            .with_num_threads(4);
        assert_eq!(cfg.forward_window, 65536);
        assert!(cfg.validate().is_ok());

        assert!(matches!(
            Config::default().with_forward_window(0).validate(),
            Err(X3Error::ConfigError(_))
        ));
        assert!(Config::default().with_num_threads(0).validate().is_err());
    }
}
