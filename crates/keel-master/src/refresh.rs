//! Fixed-delay background refresh tasks.
//!
//! Each task runs on its own named thread. Passes execute one after another on
//! that thread, so a slow pass delays the next one instead of overlapping it.
//! Failures inside a pass, including panics, are logged and the loop carries
//! on; only [`RefreshHandle::shutdown`] ends it.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

pub(crate) const REFRESH_TARGET: &str = "keel_master::refresh";

/// Errors raised while managing a refresh task.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The operating system refused to start the thread.
    #[error("failed to spawn refresh task '{name}': {source}")]
    Spawn {
        /// Task name.
        name: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The refresh thread terminated by panicking outside a pass.
    #[error("refresh task '{name}' panicked")]
    ThreadPanic {
        /// Task name.
        name: String,
    },
}

#[derive(Default)]
struct Control {
    stopped: Mutex<bool>,
    wake: Condvar,
    passes: AtomicU64,
}

impl Control {
    fn stop(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.wake.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps for `interval` unless stopped first; returns whether to stop.
    fn pause(&self, interval: Duration) -> bool {
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .wake
            .wait_timeout_while(stopped, interval, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

/// Handle to a running refresh task.
///
/// Dropping the handle detaches the task, which then runs for the rest of the
/// process lifetime.
pub struct RefreshHandle {
    name: String,
    interval: Duration,
    control: Arc<Control>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RefreshHandle {
    /// Task name, also used as the thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Delay between the end of one pass and the start of the next.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of passes run so far, including ones that failed.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.control.passes.load(Ordering::SeqCst)
    }

    /// Returns `true` while the task thread is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Asks the task to stop after the current pass.
    ///
    /// A task waiting between passes wakes immediately.
    pub fn shutdown(&self) {
        self.control.stop();
    }

    /// Waits for the task thread to exit.
    ///
    /// Blocks indefinitely unless [`RefreshHandle::shutdown`] was called.
    pub fn join(mut self) -> Result<(), RefreshError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread.join().map_err(|_| RefreshError::ThreadPanic {
            name: self.name.clone(),
        })
    }
}

impl std::fmt::Debug for RefreshHandle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RefreshHandle")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("passes", &self.passes())
            .finish_non_exhaustive()
    }
}

/// Runs `task` now and then again `interval` after each pass finishes.
pub fn spawn_periodic<F>(
    name: &str,
    interval: Duration,
    task: F,
) -> Result<RefreshHandle, RefreshError>
where
    F: Fn() + Send + 'static,
{
    let control = Arc::new(Control::default());
    let loop_control = Arc::clone(&control);
    let task_name = name.to_owned();
    let thread = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || run_loop(&task_name, interval, &loop_control, task))
        .map_err(|source| RefreshError::Spawn {
            name: name.to_owned(),
            source,
        })?;
    Ok(RefreshHandle {
        name: name.to_owned(),
        interval,
        control,
        thread: Some(thread),
    })
}

fn run_loop<F>(name: &str, interval: Duration, control: &Control, task: F)
where
    F: Fn(),
{
    info!(
        target: REFRESH_TARGET,
        task = name,
        interval_ms = interval.as_millis(),
        "refresh loop active"
    );
    while !control.is_stopped() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&task)) {
            error!(
                target: REFRESH_TARGET,
                task = name,
                panic = %panic_message(payload.as_ref()),
                "refresh pass panicked"
            );
        }
        control.passes.fetch_add(1, Ordering::SeqCst);
        if control.pause(interval) {
            break;
        }
    }
    info!(target: REFRESH_TARGET, task = name, "refresh loop stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn wait_for(handle: &RefreshHandle, passes: u64) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.passes() < passes {
            assert!(Instant::now() < deadline, "timed out waiting for {passes} passes");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[rstest]
    fn first_pass_runs_immediately() {
        let handle = spawn_periodic("first-pass", Duration::from_secs(3600), || {})
            .expect("spawn refresh task");
        wait_for(&handle, 1);
        assert!(handle.is_running());
        handle.shutdown();
        handle.join().expect("join refresh task");
    }

    #[rstest]
    fn panicking_passes_do_not_end_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task_calls = Arc::clone(&calls);
        let handle = spawn_periodic("panicky", Duration::from_millis(1), move || {
            if task_calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                panic!("simulated refresh failure");
            }
        })
        .expect("spawn refresh task");

        wait_for(&handle, 4);
        assert!(handle.is_running());
        handle.shutdown();
        handle.join().expect("join refresh task");
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[rstest]
    fn passes_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let overlapped = Arc::new(AtomicUsize::new(0));
        let (task_active, task_overlapped) = (Arc::clone(&active), Arc::clone(&overlapped));
        let handle = spawn_periodic("sequential", Duration::ZERO, move || {
            if task_active.fetch_add(1, Ordering::SeqCst) > 0 {
                task_overlapped.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(1));
            task_active.fetch_sub(1, Ordering::SeqCst);
        })
        .expect("spawn refresh task");

        wait_for(&handle, 5);
        handle.shutdown();
        handle.join().expect("join refresh task");
        assert_eq!(overlapped.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn shutdown_wakes_a_sleeping_task() {
        let handle = spawn_periodic("sleepy", Duration::from_secs(3600), || {})
            .expect("spawn refresh task");
        wait_for(&handle, 1);

        let started = Instant::now();
        handle.shutdown();
        handle.join().expect("join refresh task");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
