//! Terminal cell widths for single characters.
//!
//! All column arithmetic in navigation and completion display goes through
//! [`char_width`], so wide CJK glyphs count as two cells and combining marks
//! as none.

use unicode_width::UnicodeWidthChar;

/// Cells occupied by `c`: 2 for wide glyphs, 0 for combining, zero-width and
/// control characters, 1 otherwise.
pub fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Character index in `line` at which display column `display_col` begins.
///
/// Clamps to the line length. A column falling inside a wide glyph maps to
/// that glyph.
pub fn display_col_to_char_col(line: &str, display_col: usize) -> usize {
    if display_col == 0 {
        return 0;
    }
    let mut acc = 0;
    for (idx, c) in line.chars().enumerate() {
        let w = char_width(c);
        if acc + w > display_col {
            return idx;
        }
        acc += w;
        if acc == display_col {
            // Combining marks after the boundary belong to the previous cell.
            return idx + 1 + leading_zero_width(line, idx + 1);
        }
    }
    line.chars().count()
}

/// Display column at which character index `char_col` of `line` starts.
pub fn char_col_to_display_col(line: &str, char_col: usize) -> usize {
    line.chars().take(char_col).map(char_width).sum()
}

fn leading_zero_width(line: &str, from: usize) -> usize {
    line.chars()
        .skip(from)
        .take_while(|c| char_width(*c) == 0)
        .count()
}
