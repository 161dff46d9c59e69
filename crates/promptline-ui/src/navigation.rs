//! Up/down cursor motion across soft-wrapped rows.
//!
//! The host renderer records where each visual row of the buffer landed on
//! screen ([`RenderProjection`]). Moving up or down picks the neighbouring
//! visual row and keeps the cursor at the same screen column, counting wide
//! glyphs as two cells.

use crate::width::{char_width, display_col_to_char_col};
use promptline_core::{Document, RenderProjection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Buffer index the cursor should move to, or `None` when the host should
/// fall back to its own single-line motion.
pub fn target_index(
    doc: &Document,
    projection: &RenderProjection,
    direction: Direction,
) -> Option<usize> {
    let line_count = doc.line_count();
    if line_count <= 1 {
        return None;
    }
    let (row, _) = doc.cursor_row_col();
    let (cursor_x, cursor_y) = projection.cursor_position;
    let target_y = match direction {
        Direction::Up if row > 0 => cursor_y.checked_sub(1)?,
        Direction::Down if row + 1 < line_count => cursor_y + 1,
        _ => return None,
    };

    let (target_row, start_display_col) = projection.row_start(target_y)?;
    let line = doc.line(target_row)?;
    let start_col = display_col_to_char_col(line, start_display_col);
    let start_x = projection
        .screen_xy(target_row, start_display_col)
        .map_or(projection.x_offset, |(x, _)| x);
    let dx = (cursor_x + projection.x_offset).saturating_sub(start_x);

    let mut col = start_col;
    let mut acc = 0;
    for c in line.chars().skip(start_col) {
        let w = char_width(c);
        if acc + w > dx {
            break;
        }
        acc += w;
        col += 1;
    }
    Some(doc.translate_row_col_to_index(target_row, col))
}

/// Characters a "clear to line start" key should delete.
pub fn alt_backspace_clear_count(doc: &Document) -> usize {
    if doc.line_count() > 1 {
        doc.current_line_before_cursor().chars().count()
    } else {
        doc.cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwrapped(doc: &Document, x_offset: usize) -> RenderProjection {
        let (row, col) = doc.cursor_row_col();
        let line = doc.line(row).unwrap_or_default();
        let x = crate::width::char_col_to_display_col(line, col);
        let mut projection = RenderProjection::new((x, row), x_offset);
        for y in 0..doc.line_count() {
            projection = projection.with_row(y, y, 0, x_offset);
        }
        projection
    }

    #[test]
    fn down_to_shorter_line_clamps_to_end() {
        let doc = Document::new("hello\nhi", 3);
        let projection = unwrapped(&doc, 0);
        assert_eq!(target_index(&doc, &projection, Direction::Down), Some(8));
    }

    #[test]
    fn up_keeps_visual_column() {
        let doc = Document::new("hello\nhi", 7);
        let projection = unwrapped(&doc, 2);
        assert_eq!(target_index(&doc, &projection, Direction::Up), Some(1));
    }

    #[test]
    fn wide_glyphs_preserve_screen_column() {
        let doc = Document::new("abcd\n日本語x", 3);
        let projection = unwrapped(&doc, 0);
        // Column 3 falls inside 本, so the cursor stops before it.
        assert_eq!(target_index(&doc, &projection, Direction::Down), Some(6));

        let doc = Document::new("日本語x\nabcdefgh", 7);
        let projection = unwrapped(&doc, 0);
        assert_eq!(projection.cursor_position, (2, 1));
        assert_eq!(target_index(&doc, &projection, Direction::Up), Some(1));
    }

    #[test]
    fn out_of_bounds_directions_are_absent() {
        let single = Document::new("hello", 2);
        assert_eq!(target_index(&single, &unwrapped(&single, 0), Direction::Down), None);

        let doc = Document::new("one\ntwo", 1);
        assert_eq!(target_index(&doc, &unwrapped(&doc, 0), Direction::Up), None);
        let last = doc.with_cursor(5);
        assert_eq!(target_index(&last, &unwrapped(&last, 0), Direction::Down), None);
    }

    #[test]
    fn missing_visual_row_is_absent() {
        let doc = Document::new("one\ntwo", 1);
        let projection = RenderProjection::new((1, 0), 0).with_row(0, 0, 0, 0);
        assert_eq!(target_index(&doc, &projection, Direction::Down), None);
    }

    #[test]
    fn wrapped_row_starts_mid_line() {
        // "abcdefghij" wraps after five cells.
        let doc = Document::new("abcdefghij\nxyz", 12);
        let projection = RenderProjection::new((1, 2), 0)
            .with_row(0, 0, 0, 0)
            .with_row(1, 0, 5, 0)
            .with_row(2, 1, 0, 0);
        assert_eq!(target_index(&doc, &projection, Direction::Up), Some(6));
    }

    #[test]
    fn clear_count_depends_on_line_count() {
        assert_eq!(alt_backspace_clear_count(&Document::new("hello world", 7)), 7);
        assert_eq!(alt_backspace_clear_count(&Document::new("first\nsecond", 9)), 3);
        assert_eq!(alt_backspace_clear_count(&Document::new("first\n", 6)), 0);
    }
}
