use std::collections::HashMap;

/// Read-only snapshot of the prompt buffer: its text plus a cursor.
///
/// The cursor is a character index (not a byte offset) and always lies in
/// `0..=char_count`. Lines are separated by `\n`; a trailing newline yields a
/// final empty line, the same way the host buffer counts rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    text: String,
    cursor: usize,
}

impl Document {
    pub fn new(text: impl Into<String>, cursor: usize) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self {
            cursor: cursor.min(len),
            text,
        }
    }

    /// Document with the cursor placed after the last character.
    pub fn at_end(text: impl Into<String>) -> Self {
        Self::new(text, usize::MAX)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn with_cursor(&self, cursor: usize) -> Self {
        Self::new(self.text.clone(), cursor)
    }

    pub fn lines(&self) -> Vec<&str> {
        self.text.split('\n').collect()
    }

    pub fn line_count(&self) -> usize {
        self.text.matches('\n').count() + 1
    }

    pub fn line(&self, row: usize) -> Option<&str> {
        self.text.split('\n').nth(row)
    }

    pub fn text_before_cursor(&self) -> &str {
        &self.text[..self.byte_offset(self.cursor)]
    }

    pub fn text_after_cursor(&self) -> &str {
        &self.text[self.byte_offset(self.cursor)..]
    }

    /// The part of the cursor's line that lies before the cursor.
    pub fn current_line_before_cursor(&self) -> &str {
        let before = self.text_before_cursor();
        match before.rfind('\n') {
            Some(idx) => &before[idx + 1..],
            None => before,
        }
    }

    /// Zero-based `(row, col)` of the cursor, col counted in characters.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let before = self.text_before_cursor();
        let row = before.matches('\n').count();
        let col = self.current_line_before_cursor().chars().count();
        (row, col)
    }

    /// Convert a `(row, col)` pair into a character index, clamping the row to
    /// the last line and the column to the end of that line.
    pub fn translate_row_col_to_index(&self, row: usize, col: usize) -> usize {
        let lines = self.lines();
        let row = row.min(lines.len().saturating_sub(1));
        let mut index = 0;
        for line in &lines[..row] {
            index += line.chars().count() + 1;
        }
        let line_len = lines.get(row).map_or(0, |line| line.chars().count());
        index + col.min(line_len)
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(byte, _)| byte)
    }
}

/// Snapshot of where the host renderer placed the buffer on screen during the
/// last redraw. The core never builds one; it only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderProjection {
    /// Visual row (window relative) → buffer `(row, display column)` at which
    /// that visual row starts.
    pub visible_line_to_row_col: HashMap<usize, (usize, usize)>,
    /// Cursor position `(x, y)` relative to the window.
    pub cursor_position: (usize, usize),
    /// Buffer `(row, display column)` → absolute screen `(x, y)`.
    pub rowcol_to_xy: HashMap<(usize, usize), (usize, usize)>,
    /// Screen x coordinate of the window's left edge.
    pub x_offset: usize,
}

impl RenderProjection {
    pub fn new(cursor_position: (usize, usize), x_offset: usize) -> Self {
        Self {
            cursor_position,
            x_offset,
            ..Self::default()
        }
    }

    /// Record that visual row `y` starts at buffer `(row, col)`, drawn at
    /// absolute screen `x`.
    pub fn with_row(mut self, y: usize, row: usize, col: usize, x: usize) -> Self {
        self.visible_line_to_row_col.insert(y, (row, col));
        self.rowcol_to_xy.insert((row, col), (x, y));
        self
    }

    pub fn row_start(&self, visual_row: usize) -> Option<(usize, usize)> {
        self.visible_line_to_row_col.get(&visual_row).copied()
    }

    pub fn screen_xy(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        self.rowcol_to_xy.get(&(row, col)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_cursor_to_text_length() {
        let doc = Document::new("abc", 10);
        assert_eq!(doc.cursor(), 3);
        assert_eq!(doc.text_before_cursor(), "abc");
    }

    #[test]
    fn cursor_is_counted_in_chars() {
        let doc = Document::new("日本語\nab", 5);
        assert_eq!(doc.text_before_cursor(), "日本語\na");
        assert_eq!(doc.cursor_row_col(), (1, 1));
        assert_eq!(doc.current_line_before_cursor(), "a");
        assert_eq!(doc.text_after_cursor(), "b");
    }

    #[test]
    fn trailing_newline_adds_empty_line() {
        let doc = Document::at_end("hello\n");
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.lines(), vec!["hello", ""]);
        assert_eq!(doc.cursor_row_col(), (1, 0));
    }

    #[test]
    fn translates_row_col_with_clamping() {
        let doc = Document::at_end("hello\nhi");
        assert_eq!(doc.translate_row_col_to_index(0, 3), 3);
        assert_eq!(doc.translate_row_col_to_index(1, 1), 7);
        assert_eq!(doc.translate_row_col_to_index(1, 99), 8);
        assert_eq!(doc.translate_row_col_to_index(7, 0), 6);
    }

    #[test]
    fn projection_builder_records_both_maps() {
        let projection = RenderProjection::new((3, 0), 2).with_row(1, 1, 0, 2);
        assert_eq!(projection.row_start(1), Some((1, 0)));
        assert_eq!(projection.screen_xy(1, 0), Some((2, 1)));
        assert_eq!(projection.row_start(5), None);
    }
}
