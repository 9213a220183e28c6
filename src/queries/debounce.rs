//! Timer-based coalescing between raw input and committed values.
//!
//! Rapid edits (keystrokes in the search box) are held back until the input
//! has been quiet for the configured window; each new edit cancels the
//! pending timer, so only the last value of a burst is committed
//! (last-key-wins). Committed values are observable through a watch channel.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

pub struct DebouncedInput<T> {
    window: Duration,
    committed: watch::Sender<T>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> DebouncedInput<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Must be created and used inside a tokio runtime; the pending commit
    /// runs as a spawned timer task.
    pub fn new(initial: T, window: Duration) -> Self {
        let (committed, _) = watch::channel(initial);
        Self {
            window,
            committed,
            pending: Mutex::new(None),
        }
    }

    /// Replace the pending edit. The value is committed once the window
    /// passes without another edit.
    pub fn submit(&self, value: T) {
        let sender = self.committed.clone();
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            sender.send_replace(value);
        });
        self.replace_pending(Some(handle));
    }

    /// Commit immediately, cancelling any pending edit.
    pub fn commit_now(&self, value: T) {
        self.replace_pending(None);
        self.committed.send_replace(value);
    }

    /// The last committed value.
    pub fn current(&self) -> T {
        self.committed.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.committed.subscribe()
    }

    /// Committed values as a `Stream`, starting from the current one.
    pub fn stream(&self) -> WatchStream<T> {
        WatchStream::new(self.subscribe())
    }

    fn replace_pending(&self, handle: Option<JoinHandle<()>>) {
        let mut pending = self.pending.lock().expect("pending timer lock poisoned");
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = handle;
    }
}

impl<T> Drop for DebouncedInput<T> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().expect("pending timer lock poisoned").take() {
            pending.abort();
        }
    }
}
