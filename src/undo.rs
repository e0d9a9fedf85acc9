use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::Dimensions;
use crate::palette::PaletteIdx;
use crate::sprite::Sprite;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageData {
    Pixels(Vec<u8>),
    Indices {
        indices: Vec<PaletteIdx>,
        paint_index: PaletteIdx,
    },
    Sprites(Vec<Sprite>),
}

/// Flat copy of an image's mutable state. Holds no palette or surface, so
/// it can be stored and restored independently of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub file_name: String,
    pub dimensions: Dimensions,
    pub data: ImageData,
}

/// Linear undo history. `pointer` names the record matching the live image;
/// pushing discards everything after it.
#[derive(Debug)]
pub struct History {
    records: Vec<SnapshotRecord>,
    pointer: Option<usize>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        History::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        History {
            records: vec![],
            pointer: None,
            limit: limit.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    pub fn current(&self) -> Option<&SnapshotRecord> {
        self.records.get(self.pointer?)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.pointer = None;
    }

    pub fn push(&mut self, record: SnapshotRecord) {
        let keep = self.pointer.map_or(0, |p| p + 1);
        self.records.truncate(keep);
        self.records.push(record);
        if self.records.len() > self.limit {
            let excess = self.records.len() - self.limit;
            self.records.drain(..excess);
        }
        self.pointer = Some(self.records.len() - 1);
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.pointer, Some(p) if p >= 1)
    }

    pub fn can_redo(&self) -> bool {
        match self.pointer {
            Some(p) => p + 1 < self.records.len(),
            None => false,
        }
    }

    /// The record an undo would restore, without moving the pointer.
    pub fn peek_undo(&self) -> Result<&SnapshotRecord> {
        match self.pointer {
            Some(p) if p >= 1 => Ok(&self.records[p - 1]),
            _ => {
                debug!("Undo requested at start of history");
                Err(Error::NothingToUndo)
            }
        }
    }

    /// The record a redo would restore, without moving the pointer.
    pub fn peek_redo(&self) -> Result<&SnapshotRecord> {
        match self.pointer {
            Some(p) if p + 1 < self.records.len() => Ok(&self.records[p + 1]),
            _ => {
                debug!("Redo requested at end of history");
                Err(Error::NothingToRedo)
            }
        }
    }

    /// Steps back and returns the record to restore.
    pub fn undo(&mut self) -> Result<&SnapshotRecord> {
        self.peek_undo()?;
        let p = self.pointer.map_or(0, |p| p - 1);
        self.pointer = Some(p);
        Ok(&self.records[p])
    }

    /// Steps forward and returns the record to restore.
    pub fn redo(&mut self) -> Result<&SnapshotRecord> {
        self.peek_redo()?;
        let p = self.pointer.map_or(0, |p| p + 1);
        self.pointer = Some(p);
        Ok(&self.records[p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tag: u8) -> SnapshotRecord {
        SnapshotRecord {
            file_name: format!("{}.png", tag),
            dimensions: Dimensions::new(1, 1).unwrap(),
            data: ImageData::Pixels(vec![tag, tag, tag, 255]),
        }
    }

    #[test]
    fn test_empty_history() {
        let mut h = History::default();
        assert_eq!(h.pointer(), None);
        assert!(h.current().is_none());
        assert_eq!(h.undo(), Err(Error::NothingToUndo));
        assert_eq!(h.redo(), Err(Error::NothingToRedo));
    }

    #[test]
    fn test_undo_redo_linearity() {
        let mut h = History::default();
        h.push(record(1));
        h.push(record(2));
        h.push(record(3));
        h.undo().unwrap();
        assert_eq!(h.undo().unwrap(), &record(1));
        assert_eq!(h.current(), Some(&record(1)));
        assert_eq!(h.undo(), Err(Error::NothingToUndo));

        assert_eq!(h.redo().unwrap(), &record(2));
        h.undo().unwrap();

        h.push(record(4));
        assert_eq!(h.redo(), Err(Error::NothingToRedo));
        assert_eq!(h.len(), 2);
        assert_eq!(h.undo().unwrap(), &record(1));
        assert_eq!(h.redo().unwrap(), &record(4));
    }

    #[test]
    fn test_redo_stops_at_last_record() {
        let mut h = History::default();
        h.push(record(1));
        h.push(record(2));
        h.undo().unwrap();
        h.redo().unwrap();
        assert_eq!(h.pointer(), Some(1));
        assert_eq!(h.redo(), Err(Error::NothingToRedo));
        assert_eq!(h.pointer(), Some(1));
    }

    #[test]
    fn test_peek_leaves_pointer() {
        let mut h = History::default();
        h.push(record(1));
        h.push(record(2));
        assert_eq!(h.peek_undo(), Ok(&record(1)));
        assert_eq!(h.pointer(), Some(1));
        assert_eq!(h.peek_redo(), Err(Error::NothingToRedo));
        h.undo().unwrap();
        assert_eq!(h.peek_redo(), Ok(&record(2)));
        assert_eq!(h.peek_undo(), Err(Error::NothingToUndo));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut h = History::with_limit(3);
        for i in 0..5 {
            h.push(record(i));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.current(), Some(&record(4)));
        h.undo().unwrap();
        assert_eq!(h.undo().unwrap(), &record(2));
        assert!(!h.can_undo());
    }
}
