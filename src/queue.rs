use std::ptr;

use log::trace;

use crate::task::Task;

/// A block of task slots in the ready queue.
///
/// Elements `[0, offset)` have already been popped; `[offset, slots.len())`
/// are live. The segment never shrinks its `slots` vector; popped entries are
/// replaced with `None` so their `Box<dyn Task>` drops immediately rather
/// than waiting for the whole segment to be released.
struct Segment {
    slots: Vec<Option<Box<dyn Task>>>,
    offset: usize,
    next: Option<Box<Segment>>,
    capacity: usize,
}

impl Segment {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            offset: 0,
            next: None,
            capacity,
        }
    }

    fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }
}

/// Segmented FIFO of ready tasks.
///
/// Push is amortised O(1): a full tail segment is replaced by a freshly
/// allocated one. Pop is O(1) and never memmoves: it only ever touches the
/// head segment, releasing it once fully drained.
///
/// Not synchronised on its own; callers reach it only through [`Gate`](crate::gate::Gate),
/// which guards it with a mutex.
pub(crate) struct ReadyQueue {
    head: Option<Box<Segment>>,
    tail: *mut Segment,
    segment_capacity: usize,
}

// `tail` is a raw pointer into a `Box<Segment>` owned by this same struct (or
// by a chain reachable from `head`); it is only ever read and dereferenced
// from behind the queue's owning mutex, never shared. The only non-auto-Send
// field is this pointer, and nothing this struct touches is thread-specific.
unsafe impl Send for ReadyQueue {}

impl ReadyQueue {
    pub(crate) fn new(segment_capacity: usize) -> Self {
        Self {
            head: None,
            tail: ptr::null_mut(),
            segment_capacity,
        }
    }

    pub(crate) fn push(&mut self, task: Box<dyn Task>) {
        let needs_new_segment = self.tail.is_null() || unsafe { (*self.tail).is_full() };
        if needs_new_segment {
            let mut new_segment = Box::new(Segment::new(self.segment_capacity));
            let new_tail: *mut Segment = &mut *new_segment;
            match self.head {
                None => self.head = Some(new_segment),
                Some(_) => unsafe { (*self.tail).next = Some(new_segment) },
            }
            self.tail = new_tail;
            trace!("ready queue: allocated new segment");
        }

        // Safety: `self.tail` was just established to be non-null and to
        // point at a live segment owned by this queue.
        unsafe { (*self.tail).slots.push(Some(task)) };
    }

    pub(crate) fn pop(&mut self) -> Option<Box<dyn Task>> {
        let head = self.head.as_mut()?;
        let task = head.slots[head.offset].take();
        head.offset += 1;

        if head.offset == head.slots.len() {
            let old_head = self.head.take().expect("head checked Some above");
            self.head = old_head.next;
            if self.head.is_none() {
                self.tail = ptr::null_mut();
            }
            trace!("ready queue: released segment");
        }

        task
    }

    /// Number of tasks currently queued, summed across all live segments.
    ///
    /// Only used for diagnostics (logging on drop, tests); not on any hot
    /// path.
    pub(crate) fn len(&self) -> usize {
        let mut total = 0;
        let mut current = self.head.as_deref();
        while let Some(segment) = current {
            total += segment.slots.len() - segment.offset;
            current = segment.next.as_deref();
        }
        total
    }

    /// Number of live segments in the chain. Exposed for the segment
    /// rollover test.
    #[cfg(test)]
    pub(crate) fn segment_count(&self) -> usize {
        let mut count = 0;
        let mut current = self.head.as_deref();
        while let Some(segment) = current {
            count += 1;
            current = segment.next.as_deref();
        }
        count
    }

    #[cfg(test)]
    pub(crate) fn is_empty_and_unlinked(&self) -> bool {
        self.head.is_none() && self.tail.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Await;
    use std::sync::{Arc, Mutex};

    struct NoopTask(u32);

    impl Task for NoopTask {
        fn resume(&mut self, _loop_: &crate::EventLoop) -> Await {
            Await::Done
        }
    }

    struct RecordingTask {
        id: u32,
        order: Arc<Mutex<Vec<u32>>>,
    }

    impl Task for RecordingTask {
        fn resume(&mut self, _loop_: &crate::EventLoop) -> Await {
            self.order.lock().unwrap().push(self.id);
            Await::Done
        }
    }

    #[test]
    fn fifo_within_a_segment() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut queue = ReadyQueue::new(4);
        for id in 0..3 {
            queue.push(Box::new(RecordingTask {
                id,
                order: Arc::clone(&order),
            }));
        }

        let loop_ = crate::EventLoop::new().unwrap();
        while let Some(mut task) = queue.pop() {
            task.resume(&loop_);
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn rollover_allocates_and_reclaims_segments() {
        let capacity = 4;
        let mut queue = ReadyQueue::new(capacity);
        for i in 0..(capacity + 1) {
            queue.push(Box::new(NoopTask(i as u32)));
        }
        assert_eq!(queue.segment_count(), 2);
        assert_eq!(queue.len(), capacity + 1);

        for _ in 0..(capacity + 1) {
            assert!(queue.pop().is_some());
        }
        assert!(queue.pop().is_none());
        assert!(queue.is_empty_and_unlinked());
    }

    #[test]
    fn len_tracks_push_and_pop() {
        let mut queue = ReadyQueue::new(2);
        assert_eq!(queue.len(), 0);
        queue.push(Box::new(NoopTask(1)));
        queue.push(Box::new(NoopTask(2)));
        queue.push(Box::new(NoopTask(3)));
        assert_eq!(queue.len(), 3);
        queue.pop();
        assert_eq!(queue.len(), 2);
    }
}
