use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

/// Runs an iterator on a worker thread, keeping up to `depth` items ready.
pub struct Prefetcher<T: Send + 'static> {
    receiver: Option<Receiver<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Prefetcher<T> {
    pub fn spawn<I>(source: I, depth: usize) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(depth.max(1));

        let worker = thread::spawn(move || {
            for item in source {
                // Receiver dropped: the consumer stopped early.
                if sender.send(item).is_err() {
                    break;
                }
            }
        });

        Self {
            receiver: Some(receiver),
            worker: Some(worker),
        }
    }
}

impl<T: Send + 'static> Iterator for Prefetcher<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl<T: Send + 'static> Drop for Prefetcher<T> {
    fn drop(&mut self) {
        // Unblock a worker waiting on a full channel before joining it.
        drop(self.receiver.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("prefetch worker panicked");
            }
        }
    }
}
