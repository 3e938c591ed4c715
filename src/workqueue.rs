//! A bounded worker pool with a dispatcher thread.
//!
//! Workers advertise themselves on an idle channel; the dispatcher hands
//! each queued unit of work to the next idle worker. `execute` returns a
//! completion receiver, so a caller that wants a barrier simply blocks on
//! it before submitting the next unit.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;

type Work = Box<dyn FnOnce() + Send + 'static>;

enum MessageToWorker {
    Work(Work),
    Halt,
}

enum MessageToDispatcher {
    Dispatch(Work),
    HaltAll,
}

pub struct WorkQueue {
    dispatcher: Sender<MessageToDispatcher>,
    dispatcher_handle: Option<JoinHandle<()>>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    /// Spawns `worker_count` workers (clamped to at least one) plus the
    /// dispatcher.
    pub fn new(worker_count: usize) -> WorkQueue {
        let worker_count = worker_count.max(1);
        let (want_work, idle_worker) = channel::<Sender<MessageToWorker>>();
        let (dispatcher, dispatcher_inbox) = channel::<MessageToDispatcher>();

        let mut worker_handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let want_work = want_work.clone();
            worker_handles.push(std::thread::spawn(move || loop {
                let (reply_with_work, get_work_unit) = channel::<MessageToWorker>();
                if want_work.send(reply_with_work).is_err() {
                    return;
                }
                match get_work_unit.recv() {
                    Ok(MessageToWorker::Work(work)) => work(),
                    Ok(MessageToWorker::Halt) | Err(_) => return,
                }
            }));
        }

        let dispatcher_handle = std::thread::spawn(move || {
            let mut live_workers = worker_count;
            while let Ok(message) = dispatcher_inbox.recv() {
                match message {
                    MessageToDispatcher::Dispatch(work) => {
                        let Ok(idle) = idle_worker.recv() else {
                            return;
                        };
                        let _ = idle.send(MessageToWorker::Work(work));
                    }
                    MessageToDispatcher::HaltAll => {
                        while live_workers > 0 {
                            if let Ok(idle) = idle_worker.recv() {
                                let _ = idle.send(MessageToWorker::Halt);
                            }
                            live_workers -= 1;
                        }
                        return;
                    }
                }
            }
        });

        WorkQueue {
            dispatcher,
            dispatcher_handle: Some(dispatcher_handle),
            worker_handles,
        }
    }

    /// Submits one unit of work and returns a receiver for its result.
    ///
    /// Blocking on the receiver right away turns the call into a per-unit
    /// barrier; collecting receivers first runs units in parallel across
    /// the pool.
    pub fn execute<T, F>(&self, work: F) -> Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (reply_with_rv, wait_for_rv) = channel::<T>();
        let work = Box::new(move || {
            // The caller may have dropped the receiver; nothing to do then.
            let _ = reply_with_rv.send(work());
        });
        let _ = self.dispatcher.send(MessageToDispatcher::Dispatch(work));
        wait_for_rv
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        let _ = self.dispatcher.send(MessageToDispatcher::HaltAll);
        if let Some(handle) = self.dispatcher_handle.take() {
            let _ = handle.join();
        }
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkQueue;

    #[test]
    fn test_queue() {
        let queue = WorkQueue::new(3);
        let mut promise_list = Vec::new();
        for c in 0..10 {
            promise_list.push(queue.execute(move || c * 2));
        }
        let return_list: Vec<i32> = promise_list.iter().map(|p| p.recv().unwrap()).collect();
        assert_eq!(return_list, vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]);
    }

    #[test]
    fn test_barrier_usage() {
        let queue = WorkQueue::new(2);
        for c in 0..5 {
            let got = queue.execute(move || c + 1).recv().unwrap();
            assert_eq!(got, c + 1);
        }
    }

    #[test]
    fn test_zero_workers_clamped() {
        let queue = WorkQueue::new(0);
        assert_eq!(queue.execute(|| 41 + 1).recv().unwrap(), 42);
    }
}
