//! Single-use lifecycle of a [`Downloader`](crate::Downloader).

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lifecycle of a downloader. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Built, no batch started yet.
    Ready,
    /// A batch is running.
    Downloading,
    /// The batch ended. The downloader cannot be reused.
    Done,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Ready => "ready",
            State::Downloading => "downloading",
            State::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: Mutex<State>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State::Ready),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current(&self) -> State {
        *self.lock()
    }

    /// Moves `Ready` to `Downloading`; the returned guard moves to `Done` when
    /// dropped.
    ///
    /// # Panics
    ///
    /// If the downloader is not `Ready`. Running a second batch on the same
    /// instance is a programming error.
    pub(crate) fn begin(&self) -> Finish<'_> {
        let current = {
            let mut state = self.lock();
            if *state == State::Ready {
                *state = State::Downloading;
                return Finish { lifecycle: self };
            }
            *state
        };
        panic!("downloader has already started or finished (state: {current})");
    }
}

/// Marks the lifecycle `Done` on every exit path of a batch.
pub(crate) struct Finish<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        *self.lifecycle.lock() = State::Done;
    }
}
