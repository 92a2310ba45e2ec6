// Undo/redo over bounded snapshot stacks.
//
// The history owns the working copy. Undo and redo move between snapshots
// by diffing and applying, the same path every other edit takes.

use std::collections::VecDeque;

use pagedraft_common::diff::diff;
use pagedraft_common::patch::apply_patch;
use pagedraft_common::types::Document;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct UndoHistory {
    current: Document,
    past: VecDeque<Document>,
    future: VecDeque<Document>,
    capacity: usize,
    baseline: Option<Document>,
}

impl UndoHistory {
    pub fn new(current: Document, capacity: usize) -> Self {
        Self { current, past: VecDeque::new(), future: VecDeque::new(), capacity: capacity.max(1), baseline: None }
    }

    pub fn current(&self) -> &Document {
        &self.current
    }

    /// Last published snapshot, if this session published.
    pub fn baseline(&self) -> Option<&Document> {
        self.baseline.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Install `next` as a local edit. Returns `false` if nothing changed.
    pub fn record(&mut self, next: Document) -> bool {
        if next == self.current {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, next);
        push_bounded(&mut self.past, previous, self.capacity);
        self.future.clear();
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(target) = self.past.pop_back() else {
            return false;
        };
        let previous = self.step_to(&target);
        push_bounded(&mut self.future, previous, self.capacity);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(target) = self.future.pop_back() else {
            return false;
        };
        let previous = self.step_to(&target);
        push_bounded(&mut self.past, previous, self.capacity);
        true
    }

    /// Replace the working copy without creating an undo step.
    pub fn rebase(&mut self, doc: Document) {
        self.current = doc;
    }

    /// Replace the working copy and forget all history.
    pub fn reset(&mut self, doc: Document) {
        self.current = doc;
        self.past.clear();
        self.future.clear();
    }

    /// Mark the working copy as published and clear both stacks.
    pub fn publish(&mut self) {
        self.baseline = Some(self.current.clone());
        self.past.clear();
        self.future.clear();
    }

    fn step_to(&mut self, target: &Document) -> Document {
        let ops = diff(&self.current, target);
        let next = apply_patch(&self.current, &ops);
        std::mem::replace(&mut self.current, next)
    }
}

fn push_bounded(stack: &mut VecDeque<Document>, doc: Document, capacity: usize) {
    if stack.len() == capacity {
        stack.pop_front();
    }
    stack.push_back(doc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn title(history: &UndoHistory) -> &str {
        history.current()["seo"]["title"].as_str().unwrap_or_default()
    }

    fn with_title(title: &str) -> Document {
        json!({ "seo": { "title": title } })
    }

    // ── record / undo / redo ───────────────────────────────────────

    #[test]
    fn undo_then_redo_restores_the_edit() {
        let mut history = UndoHistory::new(with_title("a"), DEFAULT_CAPACITY);
        history.record(with_title("b"));
        history.record(with_title("c"));

        assert!(history.undo());
        assert_eq!(title(&history), "b");
        assert!(history.undo());
        assert_eq!(title(&history), "a");
        assert!(!history.undo());

        assert!(history.redo());
        assert!(history.redo());
        assert_eq!(title(&history), "c");
        assert!(!history.redo());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut history = UndoHistory::new(with_title("a"), DEFAULT_CAPACITY);
        history.record(with_title("b"));
        history.undo();
        assert!(history.can_redo());

        history.record(with_title("z"));
        assert!(!history.can_redo());
        assert_eq!(title(&history), "z");
    }

    #[test]
    fn unchanged_record_is_not_an_undo_step() {
        let mut history = UndoHistory::new(with_title("a"), DEFAULT_CAPACITY);
        assert!(!history.record(with_title("a")));
        assert!(!history.can_undo());
    }

    // ── bounds ─────────────────────────────────────────────────────

    #[test]
    fn oldest_snapshot_is_evicted_at_capacity() {
        let mut history = UndoHistory::new(json!({ "n": 0 }), 3);
        for n in 1..=5 {
            history.record(json!({ "n": n }));
        }
        assert_eq!(history.undo_depth(), 3);

        while history.undo() {}
        assert_eq!(history.current(), &json!({ "n": 2 }));
        assert_eq!(history.redo_depth(), 3);
    }

    #[test]
    fn default_capacity_is_fifty() {
        let mut history = UndoHistory::new(json!({ "n": 0 }), DEFAULT_CAPACITY);
        for n in 1..=80 {
            history.record(json!({ "n": n }));
        }
        assert_eq!(history.undo_depth(), 50);
    }

    // ── publish / reset / rebase ───────────────────────────────────

    #[test]
    fn publish_clears_stacks_and_sets_baseline() {
        let mut history = UndoHistory::new(with_title("a"), DEFAULT_CAPACITY);
        history.record(with_title("b"));
        history.record(with_title("c"));
        history.undo();

        history.publish();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.baseline(), Some(&with_title("b")));
    }

    #[test]
    fn rebase_keeps_stacks_and_reset_clears_them() {
        let mut history = UndoHistory::new(with_title("a"), DEFAULT_CAPACITY);
        history.record(with_title("b"));

        history.rebase(with_title("server"));
        assert!(history.can_undo());
        assert_eq!(title(&history), "server");

        history.reset(with_title("fresh"));
        assert!(!history.can_undo());
        assert_eq!(title(&history), "fresh");
    }
}
