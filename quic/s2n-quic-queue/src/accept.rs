// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! An unbounded queue of accepted items, e.g. incoming streams of a session
//!
//! The queue is paired with a single-slot signal. Every `push` sets the signal, and pushes that
//! happen before anyone waits coalesce into one wake-up. The signal is only a hint: consumers
//! always go back to [`Queue::pop`] after being woken, since another consumer may have already
//! taken the item.
//!
//! ```ignore
//! loop {
//!     if let Some(stream) = queue.pop() {
//!         return Ok(stream);
//!     }
//!
//!     tokio::select! {
//!         _ = queue.notified() => continue,
//!         cause = session.cancelled() => return Err(cause),
//!     }
//! }
//! ```

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tokio::sync::{futures::Notified, Notify};
use tracing::debug;

#[derive(Debug)]
pub struct Queue<T> {
    // There's no explicit limit to the length of the queue; it's bounded by the stream flow
    // control of the transport.
    items: Mutex<VecDeque<T>>,
    // Holds at most one permit so a `push` between a consumer's `pop` and its wait isn't lost.
    signal: Notify,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            signal: Notify::new(),
        }
    }

    /// Appends an item and sets the signal
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        self.signal.notify_one();
    }

    /// Removes the oldest item, returning `None` without blocking if the queue is empty
    pub fn pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Returns a future which resolves once the signal is set, consuming it
    ///
    /// Resolves immediately if an item was pushed since the signal was last consumed.
    pub fn notified(&self) -> Notified<'_> {
        self.signal.notified()
    }

    /// Waits for an item and removes it
    pub async fn accept(&self) -> T {
        loop {
            {
                let mut items = self.lock();
                if let Some(item) = items.pop_front() {
                    let remaining = items.len();
                    drop(items);

                    // hand the signal on so other waiting consumers see the items we left behind
                    if remaining > 0 {
                        debug!(remaining, "re-arming accept signal");
                        self.signal.notify_one();
                    }

                    return item;
                }
            }

            self.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // the queue is never left in an inconsistent state so a poisoned lock is still usable
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolero::check;
    use core::time::Duration;
    use futures::FutureExt;
    use std::{collections::HashSet, sync::Arc};
    use tokio::time::timeout;

    #[test]
    fn scenario() {
        let queue = Queue::new();
        assert_eq!(queue.pop(), None);

        queue.push("s1");
        queue.push("s2");
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop(), Some("s1"));
        assert_eq!(queue.pop(), Some("s2"));
        assert_eq!(queue.pop(), None);

        // both pushes coalesced into a single signal
        assert!(queue.notified().now_or_never().is_some());
        assert!(queue.notified().now_or_never().is_none());
    }

    #[test]
    fn empty_pop_is_idempotent() {
        let queue = Queue::<u64>::default();
        for _ in 0..16 {
            assert_eq!(queue.pop(), None);
        }
        assert!(queue.is_empty());
        assert!(queue.notified().now_or_never().is_none());
    }

    #[test]
    fn fifo_test() {
        check!().with_type::<Vec<u32>>().for_each(|items| {
            let queue = Queue::new();

            for item in items.iter().copied() {
                queue.push(item);
            }

            let mut actual = vec![];
            while let Some(item) = queue.pop() {
                actual.push(item);
            }

            assert_eq!(&actual, items);
        });
    }

    #[test]
    fn push_between_pop_and_wait_is_not_lost() {
        let queue = Queue::new();

        // the consumer finds nothing...
        assert_eq!(queue.pop(), None);

        // ...the producer pushes before the consumer starts waiting...
        queue.push(1u8);

        // ...and the wait still returns right away
        assert!(queue.notified().now_or_never().is_some());
        assert_eq!(queue.pop(), Some(1));
    }

    #[test]
    fn accept_rearms_signal_for_remaining_items() {
        let queue = Queue::new();
        queue.push(1u8);
        queue.push(2u8);

        // a raw consumer takes the single coalesced signal without popping
        assert!(queue.notified().now_or_never().is_some());

        assert_eq!(queue.accept().now_or_never(), Some(1));
        assert!(queue.notified().now_or_never().is_some());
        assert_eq!(queue.accept().now_or_never(), Some(2));
        assert!(queue.notified().now_or_never().is_none());
    }

    #[tokio::test]
    async fn accept_waits_for_push() {
        let queue = Arc::new(Queue::new());

        let consumer = tokio::spawn({
            let queue = queue.clone();
            async move { queue.accept().await }
        });

        tokio::task::yield_now().await;
        queue.push("stream");

        let accepted = timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer should be woken")
            .unwrap();
        assert_eq!(accepted, "stream");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_receive_every_item() {
        const CONSUMERS: usize = 4;
        const COUNT: usize = 1000;

        let queue = Arc::new(Queue::new());

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let mut accepted = vec![];
                    for _ in 0..COUNT / CONSUMERS {
                        accepted.push(queue.accept().await);
                    }
                    accepted
                })
            })
            .collect();

        let producer = tokio::spawn({
            let queue = queue.clone();
            async move {
                for id in 0..COUNT {
                    queue.push(id);
                    if id % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }
        });

        producer.await.unwrap();

        let mut seen = HashSet::new();
        for consumer in consumers {
            let accepted = timeout(Duration::from_secs(10), consumer)
                .await
                .expect("consumers should drain the queue")
                .unwrap();

            // each consumer observes items in acceptance order
            assert!(accepted.windows(2).all(|w| w[0] < w[1]));
            seen.extend(accepted);
        }

        assert_eq!(seen.len(), COUNT);
        assert!(queue.is_empty());
    }
}
