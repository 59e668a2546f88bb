//! Height-Bounded Splitter: finds the longest text prefix that fits a height limit.
//!
//! Rendered height is only observable through a `MeasurementOracle`, which is async and
//! may run a full layout pass per call. The search is a binary search over prefix length,
//! so a text of `N` characters costs at most `ceil(log2(N + 1))` oracle calls.
//!
//! # Precondition
//! Height must be non-decreasing in prefix length for a fixed column width (longer
//! prefixes never render shorter). Top-aligned auto-height text flow satisfies this.
//!
//! # Probing
//! Probes are strictly sequential: each one narrows the window based on the last result.
//! A settle pause precedes every measurement so the host can finish layout before the
//! height is read. The empty prefix is the fallback answer and is never measured.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Pause before each measurement, matching the host's layout settle time.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(5);

// ────────────────────────────────────────────────────────────────────────────
// Oracle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("measurement failed: {0}")]
    Failed(String),

    #[error("invalid height {height} for a prefix of {prefix_len} characters")]
    InvalidHeight { prefix_len: usize, height: f64 },
}

/// Measures the rendered height of the first `prefix_len` characters of a fixed text.
#[async_trait]
pub trait MeasurementOracle: Send + Sync {
    async fn measure(&self, prefix_len: usize, column_width: f64) -> Result<f64, OracleError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Options and results
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Pause before each measurement. Zero yields to the scheduler instead of sleeping.
    pub settle: Duration,
    /// Abort once this many probes have been issued.
    pub max_probes: Option<u32>,
    /// Abort if the whole search takes longer than this.
    pub deadline: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            settle: DEFAULT_SETTLE,
            max_probes: None,
            deadline: None,
        }
    }
}

/// Outcome of a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// Prefix length in characters, `0..=N`.
    pub index: usize,
    /// Measured height of the chosen prefix. `None` when the prefix is empty.
    pub fitted_height: Option<f64>,
    /// Oracle calls issued.
    pub probes: u32,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("search cancelled after {probes} probes")]
    Cancelled { probes: u32 },

    #[error("search did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("search hit the probe limit of {limit}")]
    ProbeLimit { limit: u32 },
}

/// Upper bound on oracle calls for a text of `len` characters: `ceil(log2(len + 1))`.
pub fn probe_bound(len: usize) -> u32 {
    usize::BITS - len.leading_zeros()
}

// ────────────────────────────────────────────────────────────────────────────
// Search
// ────────────────────────────────────────────────────────────────────────────

/// Finds the longest prefix of a `len`-character text whose height at `column_width`
/// is `<= height_limit`. Returns `index = 0` if no non-empty prefix fits.
pub async fn find_split<O>(
    len: usize,
    column_width: f64,
    height_limit: f64,
    oracle: &O,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> Result<Split, SplitError>
where
    O: MeasurementOracle + ?Sized,
{
    let pending = search(len, column_width, height_limit, oracle, options, cancel);
    let split = match options.deadline {
        Some(deadline) => tokio::time::timeout(deadline, pending)
            .await
            .map_err(|_| SplitError::DeadlineExceeded(deadline))??,
        None => pending.await?,
    };

    debug!(
        len,
        split_index = split.index,
        probes = split.probes,
        bound = probe_bound(len),
        "Split resolved"
    );
    Ok(split)
}

async fn search<O>(
    len: usize,
    column_width: f64,
    height_limit: f64,
    oracle: &O,
    options: &SearchOptions,
    cancel: &CancellationToken,
) -> Result<Split, SplitError>
where
    O: MeasurementOracle + ?Sized,
{
    let mut low = 1usize;
    let mut high = len;
    let mut best = Split {
        index: 0,
        fitted_height: None,
        probes: 0,
    };
    let mut probes = 0u32;

    while low <= high {
        if let Some(limit) = options.max_probes {
            if probes >= limit {
                return Err(SplitError::ProbeLimit { limit });
            }
        }
        if !settle(options.settle, cancel).await {
            return Err(SplitError::Cancelled { probes });
        }

        let mid = low + (high - low) / 2;
        let height = oracle.measure(mid, column_width).await?;
        probes += 1;

        if !height.is_finite() || height < 0.0 {
            return Err(OracleError::InvalidHeight {
                prefix_len: mid,
                height,
            }
            .into());
        }
        trace!(mid, height, height_limit, "Probe");

        if height <= height_limit {
            best.index = mid;
            best.fitted_height = Some(height);
            low = mid + 1;
        } else {
            // mid >= low >= 1
            high = mid - 1;
        }
    }

    best.probes = probes;
    Ok(best)
}

/// Waits out the settle pause. Returns false if cancelled first.
async fn settle(pause: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if pause.is_zero() {
        tokio::task::yield_now().await;
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
