//! Pending upload queue
//!
//! [`QueueOwner`] is the seam the relay advances through; [`UploadQueue`] is
//! the storage the owner keeps its pending requests in.
//!
//! The head of the queue is the upload currently executing (or about to).
//! Items leave the queue only when their terminal event arrives.

use crate::upload::UploadRequest;
use std::collections::VecDeque;

/// Holder of the pending-uploads queue
///
/// The relay only ever calls these two operations, and only after a terminal
/// event. Neither returns a value; the owner decides what "next" means.
#[cfg_attr(test, mockall::automock)]
pub trait QueueOwner: Send + Sync {
    /// Drop `upload_id` from the queue; unknown ids are ignored
    fn remove_from_queue(&self, upload_id: &str);

    /// Start the head of the queue, if any
    fn start_next_in_queue(&self);
}

/// Ordered storage of queued upload requests keyed by request id
pub trait UploadQueue: Send {
    fn push(&mut self, request: UploadRequest);

    /// Head of the queue; removed only when `remove_it` is set
    fn pop(&mut self, remove_it: bool) -> Option<UploadRequest>;

    /// Remove the first item with this id, returning whether one was found
    fn remove(&mut self, upload_id: &str) -> bool;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in queue order
    fn ids(&self) -> Vec<String>;
}

/// In-memory queue; contents do not survive the process
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: VecDeque<UploadRequest>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UploadQueue for MemoryQueue {
    fn push(&mut self, request: UploadRequest) {
        self.items.push_back(request);
    }

    fn pop(&mut self, remove_it: bool) -> Option<UploadRequest> {
        if remove_it {
            self.items.pop_front()
        } else {
            self.items.front().cloned()
        }
    }

    fn remove(&mut self, upload_id: &str) -> bool {
        match self.items.iter().position(|r| r.id == upload_id) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn ids(&self) -> Vec<String> {
        self.items.iter().map(|r| r.id.clone()).collect()
    }
}
