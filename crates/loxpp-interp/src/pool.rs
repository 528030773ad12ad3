// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Worker pool for async function bodies and network natives.
//!
//! The pool is elastic: whenever a job is queued and no worker is idle to
//! take it, another worker is spawned. A task blocked in `await` therefore
//! never starves the task it is waiting for. Workers above the initial
//! count exit after sitting idle for `IDLE_TIMEOUT`.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::interp::{RuntimeDiagnostic, RuntimeError};
use crate::value::Value;

const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker bookkeeping. Submitters and retiring workers both hold this
/// lock, so a worker never retires while a job waits for it.
#[derive(Default)]
struct Counts {
    live: usize,
    idle: usize,
    queued: usize,
}

struct Shared {
    receiver: Mutex<mpsc::Receiver<Job>>,
    counts: Mutex<Counts>,
    /// Workers kept alive however long they idle
    core: usize,
    idle_timeout: Duration,
}

pub struct WorkerPool {
    sender: Mutex<mpsc::Sender<Job>>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Create a pool with `initial` workers already running.
    pub fn new(initial: usize) -> Arc<Self> {
        Self::with_idle_timeout(initial, IDLE_TIMEOUT)
    }

    fn with_idle_timeout(initial: usize, idle_timeout: Duration) -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let pool = Arc::new(WorkerPool {
            sender: Mutex::new(tx),
            shared: Arc::new(Shared {
                receiver: Mutex::new(rx),
                counts: Mutex::new(Counts::default()),
                core: initial.max(1),
                idle_timeout,
            }),
        });
        for _ in 0..initial {
            let mut counts = pool.shared.counts.lock();
            pool.spawn_worker(&mut counts);
        }
        pool
    }

    #[cfg(test)]
    fn worker_count(&self) -> usize {
        self.shared.counts.lock().live
    }

    /// Start a worker that counts as idle from the moment it exists.
    fn spawn_worker(&self, counts: &mut Counts) {
        let shared = Arc::clone(&self.shared);
        let id = counts.live;
        let spawned = std::thread::Builder::new()
            .name(format!("loxpp-worker-{id}"))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || worker_loop(&shared));

        match spawned {
            Ok(_) => {
                counts.live += 1;
                counts.idle += 1;
                tracing::trace!(live = counts.live, "spawned pool worker");
            }
            Err(e) => tracing::warn!(error = %e, "failed to spawn pool worker"),
        }
    }

    /// Queue `job`, growing the pool if every worker is busy.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<(), RuntimeError> {
        {
            let mut counts = self.shared.counts.lock();
            counts.queued += 1;
            if counts.queued > counts.idle {
                self.spawn_worker(&mut counts);
            }
        }
        self.sender.lock().send(Box::new(job)).map_err(|_| {
            self.shared.counts.lock().queued -= 1;
            RuntimeError::Generic("The worker pool has shut down.".to_string())
        })
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = shared.receiver.lock().recv_timeout(shared.idle_timeout);
        match job {
            Ok(job) => {
                {
                    let mut counts = shared.counts.lock();
                    counts.idle -= 1;
                    counts.queued -= 1;
                }
                job();
                shared.counts.lock().idle += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                let mut counts = shared.counts.lock();
                if counts.queued == 0 && counts.live > shared.core {
                    counts.live -= 1;
                    counts.idle -= 1;
                    tracing::trace!(live = counts.live, "retired idle pool worker");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                let mut counts = shared.counts.lock();
                counts.live -= 1;
                counts.idle -= 1;
                return;
            }
        }
    }
}

/// Result slot of a task running on the pool. Awaiting blocks until the
/// task finishes; every await sees the same cached result.
pub struct TaskHandle {
    result: Mutex<Option<Result<Value, RuntimeDiagnostic>>>,
    done: Condvar,
}

impl TaskHandle {
    pub fn new() -> Arc<Self> {
        Arc::new(TaskHandle {
            result: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    pub fn complete(&self, result: Result<Value, RuntimeDiagnostic>) {
        let mut slot = self.result.lock();
        if slot.is_none() {
            *slot = Some(result);
        }
        self.done.notify_all();
    }

    pub fn wait(&self) -> Result<Value, RuntimeDiagnostic> {
        let mut slot = self.result.lock();
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut slot);
        }
    }
}

/// Run `work` on the pool and hand back a handle to its result. A panic
/// inside `work` completes the handle with an error instead of leaving
/// awaiters blocked.
pub fn spawn_task<F>(pool: &WorkerPool, work: F) -> Result<Arc<TaskHandle>, RuntimeError>
where
    F: FnOnce() -> Result<Value, RuntimeDiagnostic> + Send + 'static,
{
    let handle = TaskHandle::new();
    let slot = Arc::clone(&handle);
    pool.submit(move || {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(work))
            .unwrap_or_else(|_| {
                Err(RuntimeError::Generic("Async task panicked.".to_string()).into())
            });
        slot.complete(result);
    })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn task_result_is_cached() {
        let pool = WorkerPool::new(1);
        let handle = spawn_task(&pool, || Ok(Value::Number(42.0))).unwrap();
        assert!(matches!(handle.wait(), Ok(Value::Number(n)) if n == 42.0));
        assert!(matches!(handle.wait(), Ok(Value::Number(n)) if n == 42.0));
    }

    #[test]
    fn nested_waits_grow_the_pool() {
        let pool = WorkerPool::new(1);
        let inner_pool = Arc::clone(&pool);
        let outer = spawn_task(&pool, move || {
            let inner = spawn_task(&inner_pool, || Ok(Value::Bool(true)))?;
            inner.wait()
        })
        .unwrap();
        assert!(matches!(outer.wait(), Ok(Value::Bool(true))));
        assert!(pool.worker_count() >= 2);
    }

    #[test]
    fn errors_are_delivered_to_every_waiter() {
        let pool = WorkerPool::new(0);
        let handle = spawn_task(&pool, || {
            Err(RuntimeError::Generic("boom".to_string()).into())
        })
        .unwrap();
        for _ in 0..2 {
            let err = handle.wait().unwrap_err();
            assert_eq!(err.to_string(), "boom");
        }
    }

    #[test]
    fn idle_workers_above_the_core_retire() {
        let pool = WorkerPool::with_idle_timeout(1, Duration::from_millis(20));
        let inner_pool = Arc::clone(&pool);
        let outer = spawn_task(&pool, move || {
            let inner = spawn_task(&inner_pool, || Ok(Value::Null))?;
            inner.wait()
        })
        .unwrap();
        assert!(matches!(outer.wait(), Ok(Value::Null)));

        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.worker_count() > 1 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(pool.worker_count(), 1);

        let again = spawn_task(&pool, || Ok(Value::Bool(true))).unwrap();
        assert!(matches!(again.wait(), Ok(Value::Bool(true))));
    }
}
