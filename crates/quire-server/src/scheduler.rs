//! Rebuild scheduling.
//!
//! A single worker owns rebuilds and drains a one-slot queue. A request made
//! while a pass is running fills the slot, so exactly one more pass follows;
//! requests made while the slot is already full are merged into it. Two
//! passes never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Outcome of a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// A pass will run for this request
    Queued,
    /// A pass was already pending and will cover this request
    Coalesced,
    /// The scheduler has shut down
    Closed,
}

/// Cloneable way to ask for a rebuild.
#[derive(Debug, Clone)]
pub struct RebuildHandle {
    tx: mpsc::Sender<()>,
}

impl RebuildHandle {
    pub fn request(&self) -> Request {
        match self.tx.try_send(()) {
            Ok(()) => Request::Queued,
            Err(TrySendError::Full(())) => Request::Coalesced,
            Err(TrySendError::Closed(())) => Request::Closed,
        }
    }
}

/// Single-flight rebuild worker.
pub struct RebuildScheduler {
    handle: RebuildHandle,
    worker: JoinHandle<()>,
}

impl RebuildScheduler {
    /// Spawn the worker. `rebuild` runs on the blocking pool, one call at a
    /// time, to completion.
    pub fn spawn<F>(rebuild: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let rebuild = Arc::new(rebuild);

        let worker = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                let job = Arc::clone(&rebuild);
                if let Err(e) = tokio::task::spawn_blocking(move || job()).await {
                    tracing::error!("Rebuild task failed: {}", e);
                }
            }
            tracing::debug!("Rebuild worker stopped");
        });

        Self {
            handle: RebuildHandle { tx },
            worker,
        }
    }

    pub fn handle(&self) -> RebuildHandle {
        self.handle.clone()
    }

    pub fn request(&self) -> Request {
        self.handle.request()
    }

    /// Stop accepting requests and wait for queued passes to finish.
    ///
    /// Handles cloned elsewhere keep the worker alive until they drop.
    pub async fn shutdown(self) {
        drop(self.handle);
        if let Err(e) = self.worker.await {
            tracing::error!("Rebuild worker failed: {}", e);
        }
    }
}

/// Wait for a burst of events to settle.
///
/// Blocks until the first event, then keeps collecting until `quiet` passes
/// with nothing new; every event restarts the window. Returns `None` once
/// the channel is closed and drained.
pub async fn debounce<T>(events: &mut mpsc::Receiver<T>, quiet: Duration) -> Option<Vec<T>> {
    let first = events.recv().await?;
    let mut batch = vec![first];

    loop {
        match tokio::time::timeout(quiet, events.recv()).await {
            Ok(Some(event)) => batch.push(event),
            Ok(None) | Err(_) => return Some(batch),
        }
    }
}

/// Turn settled bursts of events into rebuild requests until either side
/// closes.
pub async fn watch_and_rebuild<T: std::fmt::Debug>(
    mut events: mpsc::Receiver<T>,
    quiet: Duration,
    handle: RebuildHandle,
) {
    while let Some(batch) = debounce(&mut events, quiet).await {
        tracing::debug!("{} changes settled, first {:?}", batch.len(), batch[0]);
        match handle.request() {
            Request::Queued => tracing::info!("Change detected, rebuilding"),
            Request::Coalesced => tracing::debug!("Rebuild already pending"),
            Request::Closed => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn burst_settles_after_quiet_window() {
        let (tx, mut rx) = mpsc::channel(16);
        let quiet = Duration::from_millis(1000);
        let start = Instant::now();

        tokio::spawn(async move {
            for i in 0..3 {
                tx.send(i).await.unwrap();
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.send(10).await.unwrap();
        });

        let first = debounce(&mut rx, quiet).await.unwrap();
        assert_eq!(first, vec![0, 1, 2]);
        // Last event at 600ms, then a full quiet window.
        assert!(start.elapsed() >= Duration::from_millis(1600));
        assert!(start.elapsed() < Duration::from_millis(2000));

        let second = debounce(&mut rx, quiet).await.unwrap();
        assert_eq!(second, vec![10]);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_channel_ends_debounce() {
        let (tx, mut rx) = mpsc::channel::<u8>(4);
        tx.send(1).await.unwrap();
        drop(tx);

        assert_eq!(debounce(&mut rx, Duration::from_secs(1)).await, Some(vec![1]));
        assert_eq!(debounce(&mut rx, Duration::from_secs(1)).await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn requests_during_a_pass_coalesce_into_one_more() {
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let runs = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));

        let scheduler = {
            let runs = Arc::clone(&runs);
            let in_flight = Arc::clone(&in_flight);
            let overlapped = Arc::clone(&overlapped);
            RebuildScheduler::spawn(move || {
                if in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    overlapped.fetch_add(1, Ordering::SeqCst);
                }
                runs.fetch_add(1, Ordering::SeqCst);
                started_tx.send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
        };

        assert_eq!(scheduler.request(), Request::Queued);
        started_rx.recv().unwrap();

        // First pass is running and the slot is empty again.
        assert_eq!(scheduler.request(), Request::Queued);
        assert_eq!(scheduler.request(), Request::Coalesced);
        assert_eq!(scheduler.request(), Request::Coalesced);

        release_tx.send(()).unwrap();
        started_rx.recv().unwrap();
        release_tx.send(()).unwrap();
        scheduler.shutdown().await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(overlapped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stopped_worker_reports_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = RebuildHandle { tx };

        assert_eq!(handle.request(), Request::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_bursts_trigger_rebuilds() {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (handle_tx, mut handle_rx) = mpsc::channel(1);
        let handle = RebuildHandle { tx: handle_tx };

        let watch = tokio::spawn(watch_and_rebuild(
            events_rx,
            Duration::from_millis(500),
            handle,
        ));

        for _ in 0..5 {
            events_tx.send("a.md").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        drop(events_tx);
        watch.await.unwrap();

        assert_eq!(handle_rx.recv().await, Some(()));
        assert_eq!(handle_rx.recv().await, None);
    }
}
