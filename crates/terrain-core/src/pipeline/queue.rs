//! Completion queues between worker threads and the consumer thread.
use std::sync::mpsc::{self, Receiver, Sender};

/// Completion callback. Runs exactly once, on the thread that drains.
pub type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;

type Completion<T> = (T, Callback<T>);

/// One unbounded channel of `(result, callback)` pairs.
pub(crate) struct ResultQueue<T> {
    tx: Sender<Completion<T>>,
    rx: Receiver<Completion<T>>,
}

impl<T: Send + 'static> ResultQueue<T> {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub(crate) fn sender(&self) -> Sender<Completion<T>> {
        self.tx.clone()
    }

    /// Run every queued callback; returns how many ran.
    pub(crate) fn drain(&self) -> usize {
        let mut ran = 0;
        while let Ok((result, callback)) = self.rx.try_recv() {
            callback(result);
            ran += 1;
        }
        ran
    }
}
