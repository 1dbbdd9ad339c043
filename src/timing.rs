use std::future::Future;
use std::time::{Duration, Instant};

/// A value together with the wall-clock window that produced it.
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub value: T,
    pub started_at: Instant,
    pub finished_at: Instant,
}

impl<T> Timed<T> {
    pub fn elapsed(&self) -> Duration {
        self.finished_at.saturating_duration_since(self.started_at)
    }

    pub fn elapsed_ms(&self) -> u64 {
        millis(self.elapsed())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed {
            value: f(self.value),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

impl<T, E> Timed<Result<T, E>> {
    pub fn transpose(self) -> Result<Timed<T>, E> {
        let Self {
            value,
            started_at,
            finished_at,
        } = self;
        value.map(|value| Timed {
            value,
            started_at,
            finished_at,
        })
    }
}

/// Awaits `fut`, recording when it started and finished.
pub async fn timed<F: Future>(fut: F) -> Timed<F::Output> {
    let started_at = Instant::now();
    let value = fut.await;
    Timed {
        value,
        started_at,
        finished_at: Instant::now(),
    }
}

#[allow(clippy::cast_possible_truncation)]
pub fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn measures_the_awaited_work() {
        let result = timed(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            42
        })
        .await;

        assert_eq!(result.value, 42);
        assert!(result.elapsed_ms() >= 20);
        assert!(result.finished_at >= result.started_at);
    }

    #[tokio::test]
    async fn transpose_keeps_window() {
        let ok: Timed<Result<u8, String>> = timed(async { Ok(1) }).await;
        let window = ok.elapsed();
        let ok = ok.transpose().unwrap();
        assert_eq!(ok.value, 1);
        assert_eq!(ok.elapsed(), window);

        let err: Timed<Result<u8, String>> = timed(async { Err("boom".to_string()) }).await;
        assert_eq!(err.transpose().unwrap_err(), "boom");
    }

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
