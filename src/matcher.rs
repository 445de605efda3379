//! Decides how long a fresh literal run should be.
//!
//! A span at the cursor is worth a dictionary entry when it repeats often
//! enough inside the forward window. For every candidate position the common
//! prefix with the cursor is measured once; the histogram of those lengths
//! gives the repeat count of every candidate length at the same time.

use rayon::prelude::*;

use crate::config::Config;
use crate::dict::MAX_MATCH_LEN;
use crate::X3Result;

type Histogram = [u64; MAX_MATCH_LEN + 1];

/// Spans shorter than this are scanned on the calling thread.
const PARALLEL_MIN_SPAN: usize = 16 * 1024;

/// Repeat-count heuristic over a bounded forward window.
#[derive(Debug)]
pub struct MatchFinder {
    window: usize,
    max_match_count: u32,
    pool: Option<rayon::ThreadPool>,
}

impl MatchFinder {
    /// Finder for `config`; spawns a pool when more than one thread is asked for.
    pub fn new(config: &Config) -> X3Result<Self> {
        config.validate()?;
        let pool = if config.num_threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.num_threads)
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self {
            window: config.forward_window,
            max_match_count: config.max_match_count,
            pool,
        })
    }

    /// Recommended length, in `1..=min(MAX_MATCH_LEN, input.len() - p)`, of
    /// the span starting at `p`.
    ///
    /// Thresholds are tried from `max_match_count` down to 1; the first length
    /// (longest first) that repeats more often than the threshold wins.
    pub fn best_match(&self, input: &[u8], p: usize) -> usize {
        assert!(p < input.len(), "cursor past the end of input");
        let longest = MAX_MATCH_LEN.min(input.len() - p);
        if longest == 1 {
            return 1;
        }
        let end = p.saturating_add(self.window).min(input.len());
        let hist = self.histogram(input, p, end, longest);

        // repeats of each length; non-increasing in the length
        let mut counts = [0u64; MAX_MATCH_LEN + 2];
        for len in (1..=longest).rev() {
            counts[len] = counts[len + 1] + hist[len];
        }

        // no threshold above counts[1] - 1 can be met
        let tc = u64::from(self.max_match_count).min(counts[1].saturating_sub(1));
        if tc == 0 {
            return 1;
        }
        (1..=longest)
            .rev()
            .find(|&len| counts[len] > tc)
            .unwrap_or(1)
    }

    fn histogram(&self, input: &[u8], p: usize, end: usize, longest: usize) -> Histogram {
        let head = &input[p..p + longest];
        let measure = |mut hist: Histogram, s: usize| {
            // non-overlapping and inside the window
            let cap = longest.min(s - p).min(end - s);
            let lcp = head[..cap]
                .iter()
                .zip(&input[s..s + cap])
                .take_while(|(a, b)| a == b)
                .count();
            hist[lcp] += 1;
            hist
        };

        let candidates = p + 1..end;
        match &self.pool {
            Some(pool) if candidates.len() >= PARALLEL_MIN_SPAN => pool.install(|| {
                candidates
                    .into_par_iter()
                    .fold(|| [0; MAX_MATCH_LEN + 1], measure)
                    .reduce(|| [0; MAX_MATCH_LEN + 1], merge)
            }),
            _ => candidates.fold([0; MAX_MATCH_LEN + 1], measure),
        }
    }
}

fn merge(mut a: Histogram, b: Histogram) -> Histogram {
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
    a
}
