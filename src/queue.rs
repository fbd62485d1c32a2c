// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Shared FIFO feeding a fixed pool of async workers.
///
/// Workers may enqueue follow-up tasks while handling one. The queue closes
/// only when it is empty and no worker holds a task, which is checked under
/// the same lock that guards the pending tasks.
use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use tokio::sync::Notify;

#[derive(Debug,)]
pub struct WorkQueue<T,>
{
    pending:   Mutex<VecDeque<T,>,>,
    in_flight: AtomicUsize,
    closed:    AtomicBool,
    notify:    Notify,
}

impl<T,> Default for WorkQueue<T,>
{
    fn default() -> Self
    {
        Self {
            pending:   Mutex::new(VecDeque::new(),),
            in_flight: AtomicUsize::new(0,),
            closed:    AtomicBool::new(false,),
            notify:    Notify::new(),
        }
    }
}

impl<T,> WorkQueue<T,>
{
    pub fn new() -> Self
    {
        Self::default()
    }

    fn lock(&self,) -> MutexGuard<'_, VecDeque<T,>,>
    {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner,)
    }

    pub fn push(&self, task: T,)
    {
        self.lock().push_back(task,);
        self.notify.notify_one();
    }

    /// Waits for the next task; `None` once all work is done.
    ///
    /// Every task handed out must be acknowledged with
    /// [`WorkQueue::task_done`].
    pub async fn next(&self,) -> Option<T,>
    {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut pending = self.lock();
                if let Some(task,) = pending.pop_front() {
                    self.in_flight.fetch_add(1, Ordering::SeqCst,);
                    return Some(task,);
                }
                if self.closed.load(Ordering::SeqCst,) {
                    return None;
                }
                if self.in_flight.load(Ordering::SeqCst,) == 0 {
                    self.closed.store(true, Ordering::SeqCst,);
                    drop(pending,);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks a task handed out by [`WorkQueue::next`] as finished.
    pub fn task_done(&self,)
    {
        let pending = self.lock();
        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst,).saturating_sub(1,);
        if remaining == 0 && pending.is_empty() {
            self.closed.store(true, Ordering::SeqCst,);
            drop(pending,);
            self.notify.notify_waiters();
        }
    }

    pub fn pending(&self,) -> usize
    {
        self.lock().len()
    }

    pub fn in_flight(&self,) -> usize
    {
        self.in_flight.load(Ordering::SeqCst,)
    }

    pub fn is_closed(&self,) -> bool
    {
        self.closed.load(Ordering::SeqCst,)
    }
}

#[cfg(test)]
mod tests
{
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use super::WorkQueue;

    #[tokio::test]
    async fn empty_queue_closes_immediately()
    {
        let queue: WorkQueue<u32,> = WorkQueue::new();
        assert_eq!(queue.next().await, None);
        assert!(queue.is_closed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn workers_drain_tasks_that_spawn_more_work()
    {
        let queue = Arc::new(WorkQueue::new(),);
        let processed = Arc::new(AtomicUsize::new(0,),);
        queue.push(0u32,);

        let mut workers = Vec::new();
        for _ in 0..8 {
            let queue = Arc::clone(&queue,);
            let processed = Arc::clone(&processed,);
            workers.push(tokio::spawn(async move {
                while let Some(depth,) = queue.next().await {
                    tokio::time::sleep(Duration::from_millis(1,),).await;
                    if depth < 6 {
                        queue.push(depth + 1,);
                        queue.push(depth + 1,);
                    }
                    processed.fetch_add(1, Ordering::SeqCst,);
                    queue.task_done();
                }
            },),);
        }

        for worker in workers {
            worker.await.expect("worker finished",);
        }

        assert_eq!(processed.load(Ordering::SeqCst), 127);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.in_flight(), 0);
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn idle_worker_waits_for_busy_one()
    {
        let queue = Arc::new(WorkQueue::new(),);
        queue.push("seed",);

        let first = queue.next().await;
        assert_eq!(first, Some("seed"));

        let waiter = {
            let queue = Arc::clone(&queue,);
            tokio::spawn(async move { queue.next().await },)
        };
        tokio::time::sleep(Duration::from_millis(20,),).await;
        assert!(!waiter.is_finished());

        queue.push("follow-up",);
        queue.task_done();
        assert_eq!(waiter.await.expect("waiter finished"), Some("follow-up"));
    }
}
