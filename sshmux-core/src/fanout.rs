// Copyright 2026 The sshmux Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic per-session set of live subscribers. Used both for
//! terminal-output observers and for command-history subscribers -- the
//! core treats both as a capability set `{on_item}` that cannot throw
//! past it.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

pub type SubscriberId = u64;

pub struct Fanout<T> {
    next_id: SubscriberId,
    subscribers: Vec<(SubscriberId, Box<dyn Fn(&T) -> anyhow::Result<()> + Send>)>,
}

impl<T> Fanout<T> {
    pub fn new() -> Self {
        Fanout { next_id: 0, subscribers: Vec::new() }
    }

    /// Registers a callback, returning an id that can later be passed to
    /// `unsubscribe`.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: Fn(&T) -> anyhow::Result<()> + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscriber. Silently a no-op if `id` is not present.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Delivers `item` to every subscriber exactly once, in registration
    /// order. A subscriber that errors or panics is logged and skipped;
    /// it never affects its peers or aborts delivery.
    pub fn broadcast(&self, item: &T) {
        for (id, callback) in &self.subscribers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(item)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(subscriber_id = id, error = %err, "observer callback failed"),
                Err(_) => warn!(subscriber_id = id, "observer callback panicked"),
            }
        }
    }
}

impl<T> Default for Fanout<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn delivers_to_all_subscribers_in_order() {
        let mut fanout: Fanout<i32> = Fanout::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        for tag in 0..3 {
            let seen = Arc::clone(&seen);
            fanout.subscribe(move |item: &i32| {
                seen.lock().unwrap().push((tag, *item));
                Ok(())
            });
        }

        fanout.broadcast(&42);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(_, v)| *v == 42));
    }

    #[test]
    fn failing_subscriber_does_not_block_peers() {
        let mut fanout: Fanout<i32> = Fanout::new();
        let hits = Arc::new(AtomicUsize::new(0));

        fanout.subscribe(|_: &i32| anyhow::bail!("boom"));
        let hits2 = Arc::clone(&hits);
        fanout.subscribe(move |_: &i32| {
            hits2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        fanout.broadcast(&1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_does_not_block_peers() {
        let mut fanout: Fanout<i32> = Fanout::new();
        let hits = Arc::new(AtomicUsize::new(0));

        fanout.subscribe(|_: &i32| panic!("kaboom"));
        let hits2 = Arc::clone(&hits);
        fanout.subscribe(move |_: &i32| {
            hits2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        fanout.broadcast(&1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_is_noop_for_unknown_id() {
        let mut fanout: Fanout<i32> = Fanout::new();
        fanout.unsubscribe(999);
        assert_eq!(fanout.len(), 0);
    }

    #[test]
    fn unsubscribe_removes_the_right_subscriber() {
        let mut fanout: Fanout<i32> = Fanout::new();
        let id = fanout.subscribe(|_: &i32| Ok(()));
        fanout.subscribe(|_: &i32| Ok(()));
        fanout.unsubscribe(id);
        assert_eq!(fanout.len(), 1);
    }
}
