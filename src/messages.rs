//! Bounded queue of user-facing notices for the web UI.
//!
//! The control loop pushes short notices (preset loaded, sensor fault,
//! heat timer expired) and the web layer drains them on poll. The queue
//! holds at most [`MESSAGE_CAPACITY`] entries, silently dropping pushes
//! once full, and collapses consecutive pushes of identical text so a
//! fault that repeats every tick occupies one slot.

use heapless::Deque;

pub const MESSAGE_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
}

#[derive(Default)]
pub struct MessageQueue {
    queue: Deque<Message, MESSAGE_CAPACITY>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Enqueue a notice. A push whose text matches the newest queued entry
    /// is dropped; a push against a full queue is dropped silently rather
    /// than displacing an undelivered notice.
    pub fn push(&mut self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        if let Some(newest) = self.queue.back() {
            if newest.text == text {
                return;
            }
        }
        let _ = self.queue.push_back(Message { severity, text });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Severity::Info, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Severity::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Severity::Error, text);
    }

    /// Remove and return the oldest notice.
    pub fn pop(&mut self) -> Option<Message> {
        self.queue.pop_front()
    }

    /// Drain every queued notice, oldest first.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.queue.len());
        while let Some(msg) = self.queue.pop_front() {
            out.push(msg);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_in_fifo_order() {
        let mut q = MessageQueue::new();
        q.info("first");
        q.warning("second");

        assert_eq!(q.pop().unwrap().text, "first");
        let second = q.pop().unwrap();
        assert_eq!(second.text, "second");
        assert_eq!(second.severity, Severity::Warning);
        assert!(q.pop().is_none());
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut q = MessageQueue::new();
        q.error("sensor read failed");
        q.error("sensor read failed");
        q.error("sensor read failed");
        assert_eq!(q.len(), 1);

        // Non-adjacent repeats are kept.
        q.info("heater on");
        q.error("sensor read failed");
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn overflow_drops_new_pushes() {
        let mut q = MessageQueue::new();
        for i in 0..MESSAGE_CAPACITY + 3 {
            q.info(format!("notice {i}"));
        }
        assert_eq!(q.len(), MESSAGE_CAPACITY);
        // Undelivered notices keep their slots; the overflow is dropped.
        assert_eq!(q.pop().unwrap().text, "notice 0");

        // A pop frees a slot for the next push.
        q.info("late notice");
        assert_eq!(q.len(), MESSAGE_CAPACITY);
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut q = MessageQueue::new();
        q.info("a");
        q.info("b");
        let drained = q.drain();
        assert_eq!(drained.len(), 2);
        assert!(q.is_empty());
    }
}
