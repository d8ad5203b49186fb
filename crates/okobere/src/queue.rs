//! Inbound message queues.
//!
//! The router pushes decoded messages into one of two [`MessageQueue`]s:
//! async game events for the processor, and everything else for whoever
//! is waiting on a reply. Waiters scan the queue for the command they
//! expect and remove only that message, so replies that arrive out of
//! order (or that belong to another waiter) stay where they are.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use okobere_protocol::Message;
use tokio::sync::Notify;
use tokio::time;

/// A FIFO of messages that several tasks can wait on.
///
/// The lock is a `std::sync::Mutex`: it is never held across an `.await`,
/// only for the few instructions it takes to push or scan.
pub struct MessageQueue {
    messages: Mutex<VecDeque<Message>>,
    pushed: Notify,
    recheck: Duration,
    /// Callers currently expecting a reply; see [`MessageQueue::claim`].
    claims: AtomicUsize,
}

/// Marks a reply as awaited for as long as it lives.
#[must_use = "the claim ends when dropped"]
pub struct ReplyClaim<'a> {
    queue: &'a MessageQueue,
}

impl Drop for ReplyClaim<'_> {
    fn drop(&mut self) {
        self.queue.claims.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MessageQueue {
    /// `recheck` bounds how long a waiter sleeps between scans even if no
    /// push wakes it.
    pub fn new(recheck: Duration) -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            pushed: Notify::new(),
            recheck,
            claims: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, msg: Message) {
        self.lock().push_back(msg);
        self.pushed.notify_waiters();
    }

    pub fn try_pop(&self) -> Option<Message> {
        self.lock().pop_front()
    }

    /// Removes the oldest message, waiting for one if the queue is empty.
    pub async fn pop(&self) -> Message {
        self.wait_until(|_| true).await
    }

    /// Waits for the first message that is either `expected` or `ERROR`
    /// and removes it. Everything else stays queued in order.
    ///
    /// Returns `None` if `timeout` passes first; `None` as the timeout
    /// waits forever.
    ///
    /// The caller holds a [`ReplyClaim`] while it waits.
    pub async fn wait_for(&self, expected: &str, timeout: Option<Duration>) -> Option<Message> {
        let _claim = self.claim();
        let wait = self.wait_until(|msg| msg.is(expected) || msg.is_error());
        match timeout {
            Some(limit) => time::timeout(limit, wait).await.ok(),
            None => Some(wait.await),
        }
    }

    /// Waits forever for `expected`, or for an `ERROR` that arrives while
    /// no reply is claimed. An `ERROR` someone is waiting for is left to
    /// them.
    pub async fn wait_for_unclaimed(&self, expected: &str) -> Message {
        self.wait_until(|msg| {
            msg.is(expected) || (msg.is_error() && self.claims.load(Ordering::SeqCst) == 0)
        })
        .await
    }

    /// Marks a reply as awaited until the claim drops. Take it before
    /// sending a request so its `ERROR` can't be taken as unclaimed.
    pub fn claim(&self) -> ReplyClaim<'_> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        ReplyClaim { queue: self }
    }

    /// Drops every queued message with `command`.
    pub fn remove_all(&self, command: &str) {
        self.lock().retain(|msg| !msg.is(command));
    }

    /// `true` if a message with `command` is queued. Nothing is removed.
    pub fn contains(&self, command: &str) -> bool {
        self.lock().iter().any(|msg| msg.is(command))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    async fn wait_until(&self, matches: impl Fn(&Message) -> bool) -> Message {
        loop {
            // Registered before the scan so a push in between isn't missed.
            let pushed = self.pushed.notified();
            if let Some(msg) = self.take_first(&matches) {
                return msg;
            }
            let _ = time::timeout(self.recheck, pushed).await;
        }
    }

    fn take_first(&self, matches: impl Fn(&Message) -> bool) -> Option<Message> {
        let mut messages = self.lock();
        let index = messages.iter().position(matches)?;
        messages.remove(index)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        // A panic while holding the lock can't leave the deque half-updated.
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
