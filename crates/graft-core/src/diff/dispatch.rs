use std::marker::PhantomData;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

/// Capability proving the holder is running on the UI/event thread.
///
/// Every document or view mutation takes a `&UiToken`. Tokens are only handed
/// out by the [`EventLoop`] to closures it executes, and the type is `!Send`,
/// so a token cannot leak to another thread. `verify` re-checks the thread id
/// at runtime; a mismatch is an invariant violation, not a recoverable error.
pub struct UiToken {
    thread: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl UiToken {
    fn for_current_thread() -> Self {
        Self {
            thread: thread::current().id(),
            _not_send: PhantomData,
        }
    }

    pub fn verify(&self) {
        let current = thread::current().id();
        if current != self.thread {
            panic!(
                "UiToken used off the UI thread ({:?} != {:?})",
                current, self.thread
            );
        }
    }
}

type UiJob = Box<dyn FnOnce(&UiToken) + Send + 'static>;

/// The single UI/event thread. All document and view mutation is funneled
/// through here; jobs run in FIFO order per loop instance. The thread exits
/// once the loop (and with it the job sender) is dropped.
pub struct EventLoop {
    tx: Sender<UiJob>,
    ui_thread: ThreadId,
}

impl EventLoop {
    pub fn spawn() -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<UiJob>();
        let (id_tx, id_rx) = mpsc::channel::<ThreadId>();

        thread::Builder::new()
            .name("graft-ui".to_string())
            .spawn(move || {
                let _ = id_tx.send(thread::current().id());
                let token = UiToken::for_current_thread();
                while let Ok(job) = rx.recv() {
                    job(&token);
                }
            })
            .unwrap_or_else(|e| panic!("failed to spawn UI thread: {e}"));

        let ui_thread = id_rx
            .recv()
            .unwrap_or_else(|_| panic!("UI thread died during startup"));

        Arc::new(Self { tx, ui_thread })
    }

    /// Queue a job on the UI thread and return immediately.
    pub fn run_in_ui(&self, job: impl FnOnce(&UiToken) + Send + 'static) {
        if self.tx.send(Box::new(job)).is_err() {
            tracing::warn!("UI event loop is gone, dropping scheduled job");
        }
    }

    /// Run a job on the UI thread and wait for its result. Runs inline when
    /// already on the UI thread.
    pub fn invoke_and_wait<R: Send + 'static>(
        &self,
        job: impl FnOnce(&UiToken) -> R + Send + 'static,
    ) -> R {
        if thread::current().id() == self.ui_thread {
            let token = UiToken::for_current_thread();
            return job(&token);
        }

        let (tx, rx) = mpsc::channel();
        self.run_in_ui(move |token| {
            let _ = tx.send(job(token));
        });
        rx.recv()
            .unwrap_or_else(|_| panic!("UI event loop dropped a pending job"))
    }

    /// Wait until every job queued so far has executed.
    pub fn flush(&self) {
        self.invoke_and_wait(|_| {});
    }
}

type PoolJob = Box<dyn FnOnce() + Send + 'static>;

/// Bounded worker pool for recompute-heavy or I/O-bound work triggered off
/// the UI thread.
pub struct WorkerPool {
    tx: Sender<PoolJob>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Arc<Self> {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel::<PoolJob>();
        let rx = Arc::new(Mutex::new(rx));

        for i in 0..size {
            let rx = Arc::clone(&rx);
            let _ = thread::Builder::new()
                .name(format!("graft-worker-{i}"))
                .spawn(move || loop {
                    let job = {
                        let guard = match rx.lock() {
                            Ok(g) => g,
                            Err(_) => return,
                        };
                        guard.recv()
                    };
                    match job {
                        Ok(job) => job(),
                        Err(_) => return,
                    }
                });
        }

        Arc::new(Self { tx })
    }

    pub fn execute(&self, job: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(job)).is_err() {
            tracing::warn!("worker pool is gone, dropping background job");
        }
    }
}
