use anyhow::Error;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::core::resolver::refresh_window_opens;

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Seconds from `now` until the next daily run at the refresh window opening (00:05 UTC).
pub fn seconds_until_next_run(now: DateTime<Utc>) -> u64 {
    let today_run = now.date_naive().and_time(refresh_window_opens()).and_utc();
    let next_run = if now < today_run {
        today_run
    } else {
        today_run + ChronoDuration::days(1)
    };
    // rounded up, so a wake-up never lands before the window opens
    (next_run - now)
        .to_std()
        .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seconds_until_next_run() {
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(seconds_until_next_run(before), 300);

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap();
        assert_eq!(seconds_until_next_run(at), 86_400);

        let evening = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(seconds_until_next_run(evening), 3_900);
    }

    #[test]
    fn test_seconds_until_next_run_rounds_up_sub_second_remainder() {
        let almost = Utc.with_ymd_and_hms(2024, 3, 1, 0, 4, 59).unwrap();
        assert_eq!(seconds_until_next_run(almost), 1);

        let half = almost + ChronoDuration::milliseconds(500);
        assert_eq!(seconds_until_next_run(half), 1);

        let micro = almost + ChronoDuration::microseconds(999_999);
        assert_eq!(seconds_until_next_run(micro), 1);

        let after = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap()
            + ChronoDuration::milliseconds(300);
        assert_eq!(seconds_until_next_run(after), 86_400);
    }
}
