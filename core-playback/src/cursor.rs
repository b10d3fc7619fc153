//! Playlist cursor: an identifier sequence plus an optional current index.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Ordered track identifiers and the position of the current track in them.
///
/// The index is absent when the current track is not part of the sequence
/// (an ad-hoc play). When present it is always within `[0, len)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistCursor {
    sequence: Vec<String>,
    index: Option<usize>,
}

impl PlaylistCursor {
    /// Cursor over `sequence` positioned at the first occurrence of `current_id`.
    pub fn new(sequence: Vec<String>, current_id: &str) -> Self {
        let index = sequence.iter().position(|id| id == current_id);
        Self { sequence, index }
    }

    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.index
            .and_then(|index| self.sequence.get(index))
            .map(String::as_str)
    }

    /// Index and identifier one step forward.
    ///
    /// # Errors
    /// - `NoActiveSequence` without a current index
    /// - `EndOfPlaylist` on the last entry
    pub fn peek_next(&self) -> Result<(usize, &str)> {
        let index = self.index.ok_or(PlaybackError::NoActiveSequence)?;
        let next = index + 1;
        self.sequence
            .get(next)
            .map(|id| (next, id.as_str()))
            .ok_or(PlaybackError::EndOfPlaylist)
    }

    /// Index and identifier one step back.
    ///
    /// # Errors
    /// - `NoActiveSequence` without a current index
    /// - `BeginningOfPlaylist` on the first entry
    pub fn peek_previous(&self) -> Result<(usize, &str)> {
        let index = self.index.ok_or(PlaybackError::NoActiveSequence)?;
        let previous = index
            .checked_sub(1)
            .ok_or(PlaybackError::BeginningOfPlaylist)?;
        self.sequence
            .get(previous)
            .map(|id| (previous, id.as_str()))
            .ok_or(PlaybackError::BeginningOfPlaylist)
    }

    pub fn has_next(&self) -> bool {
        self.peek_next().is_ok()
    }

    pub fn has_previous(&self) -> bool {
        self.peek_previous().is_ok()
    }

    /// Move to `index`. Out-of-range indices are rejected and leave the cursor unchanged.
    pub fn move_to(&mut self, index: usize) -> bool {
        if index < self.sequence.len() {
            self.index = Some(index);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positioned_at_first_occurrence() {
        let cursor = PlaylistCursor::new(seq(&["a", "b", "a"]), "a");
        assert_eq!(cursor.index(), Some(0));
        assert_eq!(cursor.current_id(), Some("a"));
    }

    #[test]
    fn test_absent_id_leaves_no_index() {
        let cursor = PlaylistCursor::new(seq(&["a", "b"]), "z");
        assert_eq!(cursor.index(), None);
        assert_eq!(cursor.len(), 2);
        assert!(matches!(
            cursor.peek_next(),
            Err(PlaybackError::NoActiveSequence)
        ));
        assert!(matches!(
            cursor.peek_previous(),
            Err(PlaybackError::NoActiveSequence)
        ));
    }

    #[test]
    fn test_boundaries() {
        let cursor = PlaylistCursor::new(seq(&["s1", "s2", "s3"]), "s1");
        assert!(matches!(
            cursor.peek_previous(),
            Err(PlaybackError::BeginningOfPlaylist)
        ));
        assert_eq!(cursor.peek_next().unwrap(), (1, "s2"));

        let cursor = PlaylistCursor::new(seq(&["s1", "s2"]), "s2");
        assert!(matches!(cursor.peek_next(), Err(PlaybackError::EndOfPlaylist)));
        assert_eq!(cursor.peek_previous().unwrap(), (0, "s1"));
    }

    #[test]
    fn test_move_to_rejects_out_of_range() {
        let mut cursor = PlaylistCursor::new(seq(&["a", "b"]), "a");
        assert!(!cursor.move_to(2));
        assert_eq!(cursor.index(), Some(0));
        assert!(cursor.move_to(1));
        assert_eq!(cursor.current_id(), Some("b"));
        assert!(!cursor.has_next());
        assert!(cursor.has_previous());
    }

    #[test]
    fn test_default_is_empty_without_index() {
        let cursor = PlaylistCursor::default();
        assert!(cursor.is_empty());
        assert!(cursor.current_id().is_none());
    }
}
