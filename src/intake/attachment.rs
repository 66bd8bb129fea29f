use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// One fully read file, ready to travel inside a payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttachmentDescriptor {
    #[serde(rename = "__file_attachment")]
    marker: u8,
    pub filename: String,
    pub dataurl: String,
    #[serde(skip)]
    pub size: u64,
}

impl AttachmentDescriptor {
    pub fn new(filename: impl Into<String>, dataurl: impl Into<String>, size: u64) -> Self {
        Self {
            marker: 1,
            filename: filename.into(),
            dataurl: dataurl.into(),
            size,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Empty,
    Reading,
    Ready,
    Failed,
}

/// Work order for one file read. `slot` is the uid of the file input.
#[derive(Clone, Debug)]
pub struct EncodeJob {
    pub slot: u64,
    pub generation: u64,
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

#[derive(Clone, Debug)]
enum Cell {
    Pending,
    Done(AttachmentDescriptor),
    Failed(String),
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u64,
    cells: Vec<Cell>,
}

impl Slot {
    fn failed(&self) -> bool {
        self.cells.iter().any(|c| matches!(c, Cell::Failed(_)))
    }
}

/// Per-input attachment state. A new selection bumps the slot's generation,
/// so reads started for an older selection can never land in the slot.
#[derive(Debug, Default)]
pub struct AttachmentSlots {
    slots: HashMap<u64, Slot>,
    next_generation: u64,
}

impl AttachmentSlots {
    /// Replace whatever the slot held with `paths`; returns one job per file.
    /// An empty selection just clears the slot.
    pub fn begin_selection(&mut self, slot: u64, paths: Vec<PathBuf>) -> Vec<EncodeJob> {
        if paths.is_empty() {
            self.clear(slot);
            return Vec::new();
        }
        self.next_generation += 1;
        let generation = self.next_generation;
        self.slots.insert(
            slot,
            Slot {
                generation,
                cells: vec![Cell::Pending; paths.len()],
            },
        );
        paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| EncodeJob {
                slot,
                generation,
                index,
                path,
            })
            .collect()
    }

    pub fn complete(
        &mut self,
        slot: u64,
        generation: u64,
        index: usize,
        outcome: Result<AttachmentDescriptor, String>,
    ) -> Completion {
        let Some(s) = self.slots.get_mut(&slot) else {
            return Completion::Stale;
        };
        if s.generation != generation {
            return Completion::Stale;
        }
        let Some(cell) = s.cells.get_mut(index) else {
            return Completion::Stale;
        };
        *cell = match outcome {
            Ok(d) => Cell::Done(d),
            Err(e) => Cell::Failed(e),
        };
        Completion::Applied
    }

    pub fn clear(&mut self, slot: u64) {
        self.slots.remove(&slot);
    }

    pub fn clear_many(&mut self, slots: &[u64]) {
        for s in slots {
            self.slots.remove(s);
        }
    }

    /// Outstanding reads of current selections.
    pub fn in_flight(&self) -> usize {
        self.slots
            .values()
            .flat_map(|s| s.cells.iter())
            .filter(|c| matches!(c, Cell::Pending))
            .count()
    }

    pub fn status(&self, slot: u64) -> SlotStatus {
        match self.slots.get(&slot) {
            None => SlotStatus::Empty,
            Some(s) if s.failed() => SlotStatus::Failed,
            Some(s) if s.cells.iter().any(|c| matches!(c, Cell::Pending)) => SlotStatus::Reading,
            Some(_) => SlotStatus::Ready,
        }
    }

    /// A selection exists and none of its reads failed.
    pub fn has_selection(&self, slot: u64) -> bool {
        matches!(self.status(slot), SlotStatus::Reading | SlotStatus::Ready)
    }

    /// Finished descriptors in selection order. A failed slot yields nothing.
    pub fn descriptors(&self, slot: u64) -> Vec<&AttachmentDescriptor> {
        match self.slots.get(&slot) {
            Some(s) if !s.failed() => s
                .cells
                .iter()
                .filter_map(|c| match c {
                    Cell::Done(d) => Some(d),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn failure(&self, slot: u64) -> Option<&str> {
        self.slots.get(&slot)?.cells.iter().find_map(|c| match c {
            Cell::Failed(e) => Some(e.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(name: &str, size: u64) -> AttachmentDescriptor {
        AttachmentDescriptor::new(name, format!("data:text/plain;base64,{name}"), size)
    }

    #[test]
    fn newest_selection_wins_even_when_old_read_lands_last() {
        let mut slots = AttachmentSlots::default();
        let old = slots.begin_selection(7, vec!["a.pdf".into()]);
        let new = slots.begin_selection(7, vec!["b.pdf".into()]);
        assert_eq!(slots.in_flight(), 1);

        let r = slots.complete(7, new[0].generation, 0, Ok(desc("b.pdf", 3)));
        assert_eq!(r, Completion::Applied);
        let r = slots.complete(7, old[0].generation, 0, Ok(desc("a.pdf", 3)));
        assert_eq!(r, Completion::Stale);

        let names: Vec<&str> = slots
            .descriptors(7)
            .iter()
            .map(|d| d.filename.as_str())
            .collect();
        assert_eq!(names, vec!["b.pdf"]);
        assert_eq!(slots.in_flight(), 0);
        assert_eq!(slots.status(7), SlotStatus::Ready);
    }

    #[test]
    fn descriptors_keep_selection_order_not_arrival_order() {
        let mut slots = AttachmentSlots::default();
        let jobs = slots.begin_selection(1, vec!["one".into(), "two".into(), "three".into()]);
        let g = jobs[0].generation;
        slots.complete(1, g, 2, Ok(desc("three", 1)));
        slots.complete(1, g, 0, Ok(desc("one", 1)));
        assert_eq!(slots.status(1), SlotStatus::Reading);
        slots.complete(1, g, 1, Ok(desc("two", 1)));
        let names: Vec<&str> = slots
            .descriptors(1)
            .iter()
            .map(|d| d.filename.as_str())
            .collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[test]
    fn failed_read_leaves_slot_without_descriptors() {
        let mut slots = AttachmentSlots::default();
        let jobs = slots.begin_selection(2, vec!["ok".into(), "broken".into()]);
        let g = jobs[0].generation;
        slots.complete(2, g, 0, Ok(desc("ok", 1)));
        slots.complete(2, g, 1, Err("permission denied".into()));
        assert_eq!(slots.status(2), SlotStatus::Failed);
        assert!(!slots.has_selection(2));
        assert!(slots.descriptors(2).is_empty());
        assert_eq!(slots.failure(2), Some("permission denied"));
    }

    #[test]
    fn empty_selection_clears_and_drops_pending_reads() {
        let mut slots = AttachmentSlots::default();
        let jobs = slots.begin_selection(3, vec!["x".into()]);
        assert_eq!(slots.in_flight(), 1);
        assert!(slots.begin_selection(3, Vec::new()).is_empty());
        assert_eq!(slots.in_flight(), 0);
        assert_eq!(slots.status(3), SlotStatus::Empty);
        let r = slots.complete(3, jobs[0].generation, 0, Ok(desc("x", 1)));
        assert_eq!(r, Completion::Stale);
    }

    #[test]
    fn descriptor_serializes_with_marker_and_without_size() {
        let d = desc("cv.pdf", 42);
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["__file_attachment"], 1);
        assert_eq!(v["filename"], "cv.pdf");
        assert!(v.get("size").is_none());
    }
}
