// src/checker/retry.rs
// =============================================================================
// Second pass over links that only failed with HTTP 429.
//
// Retries run serially with exponential backoff; hammering a rate limiter
// concurrently would compound the problem. The delay schedule is a pure
// function of the attempt number so it can be tested without timers; the
// driver injects the jitter.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use rand::Rng;

use super::http::{HttpProbe, ProbeOutcome};
use super::report::{relative_to, BrokenLink};

/// Backoff parameters for the rate-limit retry pass.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(2000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

/// Delay before the given 1-based attempt: the base delay doubles per
/// attempt, jitter is added, and the result is capped at `max_delay`.
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32, jitter: Duration) -> Duration {
    let doubled = policy
        .initial_delay
        .saturating_mul(1 << attempt.saturating_sub(1).min(31));
    (doubled + jitter).min(policy.max_delay)
}

fn random_jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..1000))
}

/// Outcome of the retry pass.
pub struct RetryOutcome {
    pub still_broken: Vec<BrokenLink>,
    pub recovered: usize,
}

/// Re-checks every rate-limited entry serially. A link that recovers leaves
/// the broken set; one that exhausts its retries is converted into a
/// confirmed broken entry carrying the last observed reason.
pub async fn retry_rate_limited<P: HttpProbe>(
    probe: &P,
    policy: &RetryPolicy,
    broken_links: Vec<BrokenLink>,
    src_dir: &Path,
) -> RetryOutcome {
    let (rate_limited, mut still_broken): (Vec<_>, Vec<_>) =
        broken_links.into_iter().partition(|l| l.rate_limited);

    if rate_limited.is_empty() {
        return RetryOutcome {
            still_broken,
            recovered: 0,
        };
    }

    println!("\n{}", "-".repeat(80));
    println!(
        "🔄 RETRYING {} RATE-LIMITED LINKS (with delays)",
        rate_limited.len()
    );
    println!("{}\n", "-".repeat(80));

    let total = rate_limited.len();
    let carried_over = still_broken.len();
    let mut recovered = 0;

    for (index, entry) in rate_limited.into_iter().enumerate() {
        let relative = relative_to(&entry.file, src_dir);
        let mut last_reason = entry.reason.clone();
        let mut success = false;

        for attempt in 1..=policy.max_retries {
            print!(
                "  [{}/{}] {}:{} (attempt {}/{})...",
                index + 1,
                total,
                relative,
                entry.line,
                attempt,
                policy.max_retries
            );
            // The progress line has to show while the backoff sleeps.
            let _ = std::io::stdout().flush();

            tokio::time::sleep(backoff_delay(policy, attempt, random_jitter())).await;

            match probe.check_url(&entry.link).await {
                ProbeOutcome::Ok => {
                    println!(" ✓ recovered");
                    success = true;
                    recovered += 1;
                    break;
                }
                ProbeOutcome::Broken { reason, .. } => {
                    last_reason = reason;
                    if attempt < policy.max_retries {
                        println!(" ❌ {}, retrying...", last_reason);
                    } else {
                        println!(" ❌ {}", last_reason);
                    }
                }
            }
        }

        if !success {
            still_broken.push(BrokenLink {
                reason: last_reason,
                rate_limited: false,
                ..entry
            });
        }
    }

    println!(
        "\n✅ Recovered: {}  ❌ Still broken: {}",
        recovered,
        still_broken.len() - carried_over
    );

    RetryOutcome {
        still_broken,
        recovered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::http::ProbeOutcome;
    use std::cell::Cell;
    use std::path::PathBuf;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        let none = Duration::ZERO;
        assert_eq!(backoff_delay(&policy, 1, none), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&policy, 2, none), Duration::from_millis(4000));
        assert_eq!(backoff_delay(&policy, 3, none), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(
            backoff_delay(&policy, 4, Duration::ZERO),
            Duration::from_millis(10_000)
        );
        // Jitter can't push past the cap either.
        assert_eq!(
            backoff_delay(&policy, 3, Duration::from_millis(5000)),
            Duration::from_millis(10_000)
        );
    }

    #[test]
    fn test_backoff_includes_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(
            backoff_delay(&policy, 1, Duration::from_millis(250)),
            Duration::from_millis(2250)
        );
    }

    fn broken(link: &str, rate_limited: bool) -> BrokenLink {
        BrokenLink {
            file: PathBuf::from("src/ch01.md"),
            line: 1,
            link: link.to_string(),
            reason: "HTTP 429".to_string(),
            rate_limited,
        }
    }

    /// Fails a fixed number of times before succeeding.
    struct FlakyProbe {
        failures_left: Cell<u32>,
    }

    impl HttpProbe for FlakyProbe {
        async fn check_url(&self, _url: &str) -> ProbeOutcome {
            let left = self.failures_left.get();
            if left > 0 {
                self.failures_left.set(left - 1);
                ProbeOutcome::rate_limited("HTTP 429")
            } else {
                ProbeOutcome::Ok
            }
        }
    }

    struct AlwaysNotFound;

    impl HttpProbe for AlwaysNotFound {
        async fn check_url(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::broken("HTTP 404")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovered_link_leaves_broken_set() {
        let probe = FlakyProbe {
            failures_left: Cell::new(1),
        };
        let outcome = retry_rate_limited(
            &probe,
            &RetryPolicy::default(),
            vec![broken("https://example.com", true)],
            Path::new("src"),
        )
        .await;

        assert_eq!(outcome.recovered, 1);
        assert!(outcome.still_broken.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_confirm_breakage() {
        let outcome = retry_rate_limited(
            &AlwaysNotFound,
            &RetryPolicy::default(),
            vec![
                broken("https://example.com/a", true),
                broken("https://example.com/b", false),
            ],
            Path::new("src"),
        )
        .await;

        assert_eq!(outcome.recovered, 0);
        assert_eq!(outcome.still_broken.len(), 2);
        // The retried entry is confirmed broken with the last reason.
        let retried = outcome
            .still_broken
            .iter()
            .find(|l| l.link.ends_with("/a"))
            .unwrap();
        assert!(!retried.rate_limited);
        assert_eq!(retried.reason, "HTTP 404");
    }
}
