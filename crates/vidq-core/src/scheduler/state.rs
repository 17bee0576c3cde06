//! In-memory queue state guarded by the scheduler mutex.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::QueueCounts;
use crate::task::DownloadTask;

/// A deferred task in the timer heap. Ordered by fire time, then insertion.
#[derive(Debug, Clone)]
pub(super) struct ScheduledEntry {
    pub at: DateTime<Utc>,
    seq: u64,
    pub task: DownloadTask,
}

impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEntry {}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

pub(super) struct QueueState {
    pub max_concurrent: usize,
    pub queue: VecDeque<DownloadTask>,
    pub active: HashMap<String, DownloadTask>,
    pub scheduled: BinaryHeap<Reverse<ScheduledEntry>>,
    pub completed: VecDeque<DownloadTask>,
    pub failed: Vec<DownloadTask>,
    completed_capacity: usize,
    next_seq: u64,
}

/// Point-in-time copy of every collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSnapshot {
    pub active: Vec<DownloadTask>,
    pub queued: Vec<DownloadTask>,
    pub scheduled: Vec<DownloadTask>,
    pub completed: Vec<DownloadTask>,
    pub failed: Vec<DownloadTask>,
}

impl QueueState {
    pub fn new(max_concurrent: usize, completed_capacity: usize) -> Self {
        Self {
            max_concurrent,
            queue: VecDeque::new(),
            active: HashMap::new(),
            scheduled: BinaryHeap::new(),
            completed: VecDeque::new(),
            failed: Vec::new(),
            completed_capacity: completed_capacity.max(1),
            next_seq: 0,
        }
    }

    /// Queued, running, or waiting for its scheduled time.
    pub fn is_live(&self, url: &str) -> bool {
        self.active.contains_key(url)
            || self.queue.iter().any(|t| t.url() == url)
            || self.scheduled.iter().any(|Reverse(e)| e.task.url() == url)
    }

    /// Present in any collection, finished ones included.
    pub fn contains(&self, url: &str) -> bool {
        self.is_live(url)
            || self.completed.iter().any(|t| t.url() == url)
            || self.failed.iter().any(|t| t.url() == url)
    }

    pub fn push_scheduled(&mut self, at: DateTime<Utc>, task: DownloadTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.scheduled.push(Reverse(ScheduledEntry { at, seq, task }));
    }

    /// Fire time of the earliest scheduled entry.
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled.peek().map(|Reverse(e)| e.at)
    }

    /// Pop the earliest scheduled entry if it is due at `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<DownloadTask> {
        if self.next_fire_time()? > now {
            return None;
        }
        self.scheduled.pop().map(|Reverse(e)| e.task)
    }

    /// Remove a task that has not started yet (queued or scheduled).
    pub fn take_pending(&mut self, url: &str) -> Option<DownloadTask> {
        if let Some(pos) = self.queue.iter().position(|t| t.url() == url) {
            return self.queue.remove(pos);
        }
        let mut taken = None;
        self.scheduled.retain(|Reverse(e)| {
            if taken.is_none() && e.task.url() == url {
                taken = Some(e.task.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    /// Append to the completed collection, evicting the oldest beyond capacity.
    pub fn push_completed(&mut self, task: DownloadTask) {
        self.completed.push_back(task);
        while self.completed.len() > self.completed_capacity {
            self.completed.pop_front();
        }
    }

    pub fn counts(&self) -> QueueCounts {
        QueueCounts {
            queued: self.queue.len(),
            active: self.active.len(),
            scheduled: self.scheduled.len(),
            completed: self.completed.len(),
            failed: self.failed.len(),
        }
    }

    /// Active tasks ordered by URL (the map itself is unordered).
    pub fn active_tasks(&self) -> Vec<DownloadTask> {
        let mut tasks: Vec<_> = self.active.values().cloned().collect();
        tasks.sort_by(|a, b| a.url().cmp(b.url()));
        tasks
    }

    /// Scheduled tasks, earliest first.
    pub fn scheduled_tasks(&self) -> Vec<DownloadTask> {
        let mut entries: Vec<_> = self.scheduled.iter().map(|Reverse(e)| e).collect();
        entries.sort();
        entries.into_iter().map(|e| e.task.clone()).collect()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            active: self.active_tasks(),
            queued: self.queue.iter().cloned().collect(),
            scheduled: self.scheduled_tasks(),
            completed: self.completed.iter().cloned().collect(),
            failed: self.failed.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task(url: &str) -> DownloadTask {
        DownloadTask::new(url, "/tmp", "mp4", "720p")
    }

    #[test]
    fn scheduled_pops_in_time_order_and_only_when_due() {
        let now = Utc::now();
        let mut state = QueueState::new(1, 10);
        state.push_scheduled(now + Duration::seconds(30), task("https://youtube.com/late"));
        state.push_scheduled(now - Duration::seconds(1), task("https://youtube.com/due"));
        state.push_scheduled(now + Duration::seconds(5), task("https://youtube.com/soon"));

        assert_eq!(
            state
                .scheduled_tasks()
                .iter()
                .map(|t| t.url().to_string())
                .collect::<Vec<_>>(),
            vec![
                "https://youtube.com/due",
                "https://youtube.com/soon",
                "https://youtube.com/late"
            ]
        );
        assert_eq!(state.pop_due(now).unwrap().url(), "https://youtube.com/due");
        assert!(state.pop_due(now).is_none());
        assert_eq!(state.next_fire_time(), Some(now + Duration::seconds(5)));
    }

    #[test]
    fn equal_fire_times_keep_insertion_order() {
        let at = Utc::now();
        let mut state = QueueState::new(1, 10);
        state.push_scheduled(at, task("https://youtube.com/1"));
        state.push_scheduled(at, task("https://youtube.com/2"));
        assert_eq!(state.pop_due(at).unwrap().url(), "https://youtube.com/1");
        assert_eq!(state.pop_due(at).unwrap().url(), "https://youtube.com/2");
    }

    #[test]
    fn take_pending_from_queue_and_heap() {
        let mut state = QueueState::new(1, 10);
        state.queue.push_back(task("https://youtube.com/q"));
        state.push_scheduled(Utc::now() + Duration::hours(1), task("https://youtube.com/s"));
        assert!(state.is_live("https://youtube.com/s"));

        assert!(state.take_pending("https://youtube.com/q").is_some());
        assert!(state.take_pending("https://youtube.com/s").is_some());
        assert!(state.take_pending("https://youtube.com/s").is_none());
        assert!(!state.is_live("https://youtube.com/q"));
        assert_eq!(state.counts(), QueueCounts::default());
    }

    #[test]
    fn completed_is_bounded() {
        let mut state = QueueState::new(1, 2);
        for i in 0..4 {
            state.push_completed(task(&format!("https://youtube.com/{i}")));
        }
        let urls: Vec<_> = state.completed.iter().map(|t| t.url().to_string()).collect();
        assert_eq!(urls, vec!["https://youtube.com/2", "https://youtube.com/3"]);
        assert!(state.contains("https://youtube.com/3"));
        assert!(!state.is_live("https://youtube.com/3"));
    }
}
