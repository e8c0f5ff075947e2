//! Bounded byte queue between the replay reader and the playback stream
//!
//! The reader thread pushes whole chunks and blocks while more than
//! `threshold` bytes are queued. The playback callback blocks until it can
//! fill its buffer or the queue is closed.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Clone)]
pub struct HandoffQueue {
    inner: Arc<HandoffInner>,
}

struct HandoffInner {
    state: Mutex<QueueState>,
    /// Signalled when bytes are added or the queue closes
    readable: Condvar,
    /// Signalled when bytes are removed or the queue closes
    writable: Condvar,
    threshold: usize,
}

struct QueueState {
    bytes: VecDeque<u8>,
    closed: bool,
}

impl HandoffQueue {
    /// Create a queue whose producer pauses above `threshold` queued bytes
    pub fn new(threshold: usize) -> Self {
        Self {
            inner: Arc::new(HandoffInner {
                state: Mutex::new(QueueState {
                    bytes: VecDeque::with_capacity(threshold * 2),
                    closed: false,
                }),
                readable: Condvar::new(),
                writable: Condvar::new(),
                threshold,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `bytes`, waiting while the queue is above the threshold.
    ///
    /// Returns `false` if the queue has been closed; nothing is appended.
    pub fn push(&self, bytes: &[u8]) -> bool {
        let mut state = self.lock();
        while !state.closed && state.bytes.len() > self.inner.threshold {
            state = self
                .inner
                .writable
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        if state.closed {
            return false;
        }

        state.bytes.extend(bytes.iter().copied());
        drop(state);
        self.inner.readable.notify_all();
        true
    }

    /// Fill `out` from the front of the queue.
    ///
    /// Waits until `out.len()` bytes are available or the queue is closed.
    /// Returns the number of bytes copied, which is less than `out.len()`
    /// only after close, and 0 once the queue is closed and drained.
    /// An empty `out` returns 0 at once without waiting, so 0 only means
    /// drained when something was asked for.
    pub fn pop_into(&self, out: &mut [u8]) -> usize {
        if out.is_empty() {
            return 0;
        }
        let mut state = self.lock();
        while !state.closed && state.bytes.len() < out.len() {
            state = self
                .inner
                .readable
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }

        let n = out.len().min(state.bytes.len());
        for (dst, src) in out.iter_mut().zip(state.bytes.drain(..n)) {
            *dst = src;
        }
        drop(state);
        self.inner.writable.notify_all();
        n
    }

    /// Close the queue and wake every waiter
    pub fn close(&self) {
        self.lock().closed = true;
        self.inner.readable.notify_all();
        self.inner.writable.notify_all();
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_push_then_pop() {
        let queue = HandoffQueue::new(8);
        assert!(queue.push(&[1, 2, 3, 4]));

        let mut out = [0u8; 3];
        assert_eq!(queue.pop_into(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_after_close_drains_remainder() {
        let queue = HandoffQueue::new(8);
        queue.push(&[7, 8]);
        queue.close();

        let mut out = [0u8; 4];
        assert_eq!(queue.pop_into(&mut out), 2);
        assert_eq!(&out[..2], &[7, 8]);
        assert_eq!(queue.pop_into(&mut out), 0);
    }

    #[test]
    fn test_push_after_close_is_rejected() {
        let queue = HandoffQueue::new(8);
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.push(&[1]));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_pop_waits_for_enough_bytes() {
        let queue = HandoffQueue::new(4);
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || {
                let mut out = [0u8; 4];
                let n = queue.pop_into(&mut out);
                (n, out)
            })
        };

        queue.push(&[1, 2]);
        thread::sleep(Duration::from_millis(20));
        queue.push(&[3, 4]);

        let (n, out) = consumer.join().unwrap();
        assert_eq!(n, 4);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_producer_throttles_above_threshold() {
        let queue = HandoffQueue::new(4);
        assert!(queue.push(&[0; 5]));

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(&[1; 4]))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.len(), 5, "producer must wait while above threshold");

        let mut out = [0u8; 5];
        assert_eq!(queue.pop_into(&mut out), 5);
        assert!(producer.join().unwrap());
        assert_eq!(queue.len(), 4);
    }

    #[test]
    fn test_close_unblocks_waiting_producer() {
        let queue = HandoffQueue::new(1);
        queue.push(&[0; 2]);

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.push(&[1]))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();

        assert!(!producer.join().unwrap());
    }

    #[test]
    fn test_bytes_arrive_in_order_across_threads() {
        let queue = HandoffQueue::new(16);
        let expected: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let producer = {
            let queue = queue.clone();
            let data = expected.clone();
            thread::spawn(move || {
                for chunk in data.chunks(16) {
                    assert!(queue.push(chunk));
                }
                queue.close();
            })
        };

        let mut received = Vec::new();
        let mut buf = [0u8; 10];
        loop {
            let n = queue.pop_into(&mut buf);
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        producer.join().unwrap();
        assert_eq!(received, expected);
    }

    #[test]
    fn test_empty_pop_leaves_open_queue_alone() {
        let queue = HandoffQueue::new(8);
        assert!(queue.push(&[1, 2, 3, 4]));

        assert_eq!(queue.pop_into(&mut []), 0);
        assert!(!queue.is_closed());
        assert_eq!(queue.len(), 4);

        let mut out = [0u8; 4];
        assert_eq!(queue.pop_into(&mut out), 4);
        assert_eq!(out, [1, 2, 3, 4]);
    }
}
