use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result};

/// Fixed-capacity circular queue.
///
/// Pushing into a full buffer evicts the oldest entry. Draining yields
/// entries oldest first.
#[derive(Debug, Clone)]
pub struct EventBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    dropped: u64,
}

impl<T> EventBuffer<T> {
    /// Fails with [`Error::InvalidArgument`] for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("event buffer capacity must be non-zero"));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Entries evicted so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Appends `item`, returning the evicted oldest entry if the buffer was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.dropped += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Removes and returns everything, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

/// Cloneable, thread-safe handle to one [`EventBuffer`].
///
/// The platform side pushes, the frame loop drains.
#[derive(Debug)]
pub struct SharedEventBuffer<T> {
    inner: Arc<Mutex<EventBuffer<T>>>,
}

impl<T> Clone for SharedEventBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedEventBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(EventBuffer::new(capacity)?)),
        })
    }

    pub fn push(&self, item: T) {
        let mut buf = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if buf.push(item).is_some() {
            log::trace!("event buffer full; dropped oldest event");
        }
    }

    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).drain()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
