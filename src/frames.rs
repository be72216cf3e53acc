use std::collections::VecDeque;

use crate::gateway::CancelToken;
use crate::models::{CommentId, StoryDetail, StoryId};

/// Work deferred to the next frame so that DOM writes land together.
#[derive(Debug)]
pub enum FrameTask {
    HydrateStory { id: StoryId, detail: StoryDetail },
    AddComment { id: CommentId, cancel: CancelToken },
}

/// Tasks run in the order they were scheduled, once per frame. Anything
/// scheduled while a frame is running waits for the next one.
#[derive(Debug, Default)]
pub struct FrameQueue {
    pending: VecDeque<FrameTask>,
}

impl FrameQueue {
    pub fn schedule(&mut self, task: FrameTask) {
        self.pending.push_back(task);
    }

    /// Everything due this frame.
    pub fn take(&mut self) -> VecDeque<FrameTask> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: u64) -> FrameTask {
        FrameTask::AddComment {
            id: CommentId(id),
            cancel: CancelToken::new(),
        }
    }

    #[test]
    fn runs_in_schedule_order() {
        let mut queue = FrameQueue::default();
        queue.schedule(comment(1));
        queue.schedule(comment(2));

        let ids: Vec<_> = queue
            .take()
            .into_iter()
            .map(|task| match task {
                FrameTask::AddComment { id, .. } => id.0,
                FrameTask::HydrateStory { .. } => unreachable!(),
            })
            .collect();

        assert_eq!(ids, vec![1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_scheduled_during_a_frame_wait() {
        let mut queue = FrameQueue::default();
        queue.schedule(comment(1));

        let due = queue.take();
        queue.schedule(comment(2));

        assert_eq!(due.len(), 1);
        assert_eq!(queue.len(), 1);
    }
}
