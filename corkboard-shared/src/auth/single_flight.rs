/// At-most-one-in-flight deduplication for auth-sensitive refreshes
///
/// When several concurrent requests discover the same expired credential,
/// only one refresh should hit the backend; the rest must await that
/// refresh's outcome instead of racing their own. This is modeled as an
/// explicit single-slot pending future rather than a shared mutable
/// variable: the slot either holds the in-flight shared future or is
/// empty, and the mutex guards only the slot, never the work itself.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

/// Single-slot flight deduplicator
///
/// `T` is the flight's outcome, cloned out to every waiter. For fallible
/// work use a `Result` with a cloneable error.
pub struct SingleFlight<T: Clone> {
    slot: Mutex<Option<(u64, Shared<BoxFuture<'static, T>>)>>,
    next_flight: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            next_flight: AtomicU64::new(0),
        }
    }

    /// Joins the in-flight operation, or starts one if the slot is empty
    ///
    /// `start` is only invoked by the caller that finds the slot empty.
    /// Every caller receives a clone of the same outcome. Once the flight
    /// completes, the slot is cleared so the next call starts fresh.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (flight_id, shared, is_leader) = {
            let mut slot = self.slot.lock().await;

            if let Some((id, shared)) = slot.as_ref() {
                (*id, shared.clone(), false)
            } else {
                let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                let shared = start().boxed().shared();
                *slot = Some((id, shared.clone()));
                (id, shared, true)
            }
        };

        let value = shared.await;

        if is_leader {
            let mut slot = self.slot.lock().await;
            // Only clear our own flight; a successor may already occupy
            // the slot
            if matches!(slot.as_ref(), Some((id, _)) if *id == flight_id) {
                *slot = None;
            }
        }

        value
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_flight() {
        let flight = Arc::new(SingleFlight::new());
        let launches = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Notify::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = Arc::clone(&flight);
            let launches = Arc::clone(&launches);
            let release = Arc::clone(&release);

            handles.push(tokio::spawn(async move {
                flight
                    .run(move || async move {
                        launches.fetch_add(1, Ordering::SeqCst);
                        release.notified().await;
                        42u32
                    })
                    .await
            }));
        }

        // Let every task join the flight before releasing it
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        assert_eq!(launches.load(Ordering::SeqCst), 1);

        release.notify_one();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_next_call_starts_a_new_flight() {
        let flight = SingleFlight::new();
        let launches = AtomicUsize::new(0);

        let first = flight
            .run(|| {
                launches.fetch_add(1, Ordering::SeqCst);
                async { 1u32 }
            })
            .await;
        let second = flight
            .run(|| {
                launches.fetch_add(1, Ordering::SeqCst);
                async { 2u32 }
            })
            .await;

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(launches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_result_outcomes_are_shared() {
        let flight: SingleFlight<Result<u32, String>> = SingleFlight::new();

        let outcome = flight.run(|| async { Err::<u32, _>("backend down".to_string()) }).await;
        assert_eq!(outcome, Err("backend down".to_string()));

        // The failed flight cleared the slot; a retry runs fresh
        let outcome = flight.run(|| async { Ok::<_, String>(7) }).await;
        assert_eq!(outcome, Ok(7));
    }
}
