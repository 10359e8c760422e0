//! Display pacing: a smoothed estimate of how fast text is arriving and an
//! animator that reveals it at roughly that speed.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const INITIAL_RATE: f64 = 52.0;

const MIN_ESTIMATED_RATE: f64 = 8.0;
const MAX_ESTIMATED_RATE: f64 = 260.0;
const MIN_INTERVAL_SECS: f64 = 0.03;
const SMOOTHING_KEEP: f64 = 0.72;
const SMOOTHING_NEW: f64 = 0.28;

const MIN_ANIMATION_RATE: f64 = 10.0;
const MAX_ANIMATION_RATE: f64 = 260.0;
const MAX_CHUNK_DELAY: Duration = Duration::from_millis(32);

/// Exponentially smoothed characters-per-second of a growing stream
#[derive(Debug, Clone)]
pub struct RateEstimator {
    rate: f64,
    last_arrival: Option<Instant>,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateEstimator {
    pub fn new() -> Self {
        Self {
            rate: INITIAL_RATE,
            last_arrival: None,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Record that the text grew from `previous_len` to `next_len` chars at `now`
    pub fn observe(&mut self, previous_len: usize, next_len: usize, now: Instant) -> f64 {
        let appended = next_len.saturating_sub(previous_len).max(1) as f64;

        if let Some(last) = self.last_arrival {
            let elapsed = now
                .saturating_duration_since(last)
                .as_secs_f64()
                .max(MIN_INTERVAL_SECS);
            let instant = (appended / elapsed).clamp(MIN_ESTIMATED_RATE, MAX_ESTIMATED_RATE);
            self.rate = SMOOTHING_KEEP * self.rate + SMOOTHING_NEW * instant;
        }

        self.last_arrival = Some(now);
        self.rate
    }
}

fn animation_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(MIN_ANIMATION_RATE, MAX_ANIMATION_RATE)
    } else {
        INITIAL_RATE
    }
}

/// Characters revealed per animation step at `rate`
pub fn chunk_size_for_rate(rate: f64) -> usize {
    let rate = animation_rate(rate);
    if rate < 28.0 {
        1
    } else if rate < 64.0 {
        2
    } else if rate < 120.0 {
        3
    } else if rate < 190.0 {
        5
    } else {
        7
    }
}

/// Pause between animation steps, capped so bursts never lag far behind
pub fn chunk_delay(chunk: usize, rate: f64) -> Duration {
    let secs = (chunk as f64 / animation_rate(rate)).max(0.0);
    Duration::from_secs_f64(secs).min(MAX_CHUNK_DELAY)
}

/// Byte length of the longest common prefix, on a char boundary
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((idx, _), _)| idx)
        .unwrap_or_else(|| a.len().min(b.len()))
}

/// Animate `rendered` toward `target`, calling `on_update` with each
/// intermediate text.
///
/// `rendered` is first cut back to its common prefix with `target`, so it is
/// always a prefix of `target` afterwards. Returns `false` if `cancel` fired,
/// leaving whatever had been revealed so far.
pub async fn animate<F>(
    rendered: &mut String,
    target: &str,
    rate: f64,
    cancel: &CancellationToken,
    mut on_update: F,
) -> bool
where
    F: FnMut(&str),
{
    if target.is_empty() {
        if !rendered.is_empty() {
            rendered.clear();
            on_update(rendered);
        }
        return true;
    }

    let prefix_len = common_prefix_len(rendered, target);
    if prefix_len < rendered.len() {
        rendered.truncate(prefix_len);
        on_update(rendered);
    }

    let chunk = chunk_size_for_rate(rate);
    let delay = chunk_delay(chunk, rate);
    let mut remaining = target[prefix_len..].chars().peekable();
    let mut pending = 0;

    while let Some(ch) = remaining.next() {
        if cancel.is_cancelled() {
            if pending > 0 {
                on_update(rendered);
            }
            return false;
        }

        rendered.push(ch);
        pending += 1;

        if pending >= chunk || ch == '\n' {
            on_update(rendered);
            pending = 0;

            if remaining.peek().is_some() && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return false,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    if pending > 0 {
        on_update(rendered);
    }
    true
}
