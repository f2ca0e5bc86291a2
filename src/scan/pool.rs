use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ScanError;

pub type EntityResult<R> = Result<Option<R>, ScanError>;

/// What a pool run produced. Every input item lands in exactly one of the two
/// vectors.
pub struct PoolRun<T, R> {
    pub completed: Vec<(T, EntityResult<R>)>,
    /// Items never handed to a worker because a fatal result stopped dispatch.
    pub undispatched: Vec<T>,
}

/// Run `work` over `items` with at most `concurrency` in flight.
///
/// Workers claim the next index from a shared counter and report over a
/// channel to the calling task, which invokes `on_result` as each item
/// finishes. A panic inside `work` becomes `ScanError::Worker` for that item
/// only. A fatal error stops further dispatch; in-flight items still drain.
pub async fn run<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    work: F,
    mut on_result: impl FnMut(&T, &EntityResult<R>),
) -> PoolRun<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EntityResult<R>> + Send + 'static,
{
    if items.is_empty() {
        return PoolRun {
            completed: Vec::new(),
            undispatched: Vec::new(),
        };
    }

    let items = Arc::new(items);
    let next = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let work = Arc::new(work);
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, EntityResult<R>)>();

    let workers = concurrency.min(items.len()).max(1);
    let mut handles = Vec::with_capacity(workers);

    for worker in 0..workers {
        let items = Arc::clone(&items);
        let next = Arc::clone(&next);
        let stop = Arc::clone(&stop);
        let work = Arc::clone(&work);
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= items.len() {
                    break;
                }
                let item = items[i].clone();
                let work = Arc::clone(&work);

                let result = match AssertUnwindSafe(async move { (*work)(item).await })
                    .catch_unwind()
                    .await
                {
                    Ok(r) => r,
                    Err(payload) => Err(ScanError::Worker(panic_message(&*payload))),
                };
                if matches!(&result, Err(e) if e.is_fatal()) {
                    stop.store(true, Ordering::Release);
                }
                if tx.send((i, result)).is_err() {
                    break;
                }
            }
            debug!(worker, "worker finished");
        }));
    }
    drop(tx); // collector is the sole receiver now

    let mut reported = vec![false; items.len()];
    let mut completed = Vec::with_capacity(items.len());

    while let Some((i, result)) = rx.recv().await {
        reported[i] = true;
        on_result(&items[i], &result);
        completed.push((items[i].clone(), result));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("scan worker ended abnormally: {e}");
        }
    }

    let stopped = stop.load(Ordering::Acquire);
    let mut undispatched = Vec::new();
    for (i, done) in reported.into_iter().enumerate() {
        if done {
            continue;
        }
        if stopped {
            undispatched.push(items[i].clone());
        } else {
            // Workers ended early without a stop; never drop an item silently.
            let result = Err(ScanError::Worker(
                "worker exited before processing entity".to_string(),
            ));
            on_result(&items[i], &result);
            completed.push((items[i].clone(), result));
        }
    }

    PoolRun {
        completed,
        undispatched,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
