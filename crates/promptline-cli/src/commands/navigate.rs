use crate::output::print_json;
use crate::{DirectionArg, NavigateArgs};
use anyhow::Result;
use promptline_core::{Document, RenderProjection};
use promptline_ui::width::char_width;
use promptline_ui::{Direction, target_index};
use serde_json::json;

pub(crate) fn run_navigate(args: NavigateArgs, json_mode: bool) -> Result<()> {
    let doc = Document::new(args.text, args.cursor);
    let projection = soft_wrap(&doc, args.width, args.x_offset);
    let direction = match args.direction {
        DirectionArg::Up => Direction::Up,
        DirectionArg::Down => Direction::Down,
    };
    let target = target_index(&doc, &projection, direction);

    if json_mode {
        print_json(&json!({
            "cursor": doc.cursor(),
            "target": target,
            "visual_rows": projection.visible_line_to_row_col.len(),
        }))?;
    } else {
        match target {
            Some(index) => println!("{index}"),
            None => println!("no visual move; fall back to line motion"),
        }
    }
    Ok(())
}

/// Lay `doc` out the way a prompt renderer would: each line wrapped at
/// `width` cells, wide glyphs never split across rows.
pub(crate) fn soft_wrap(doc: &Document, width: usize, x_offset: usize) -> RenderProjection {
    let width = width.max(1);
    let (cursor_row, cursor_col) = doc.cursor_row_col();
    let mut rows: Vec<(usize, usize)> = Vec::new();
    let mut cursor_xy = (0, 0);

    for (row, line) in doc.lines().into_iter().enumerate() {
        let mut start = 0;
        let mut acc = 0;
        rows.push((row, 0));
        for (col, c) in line.chars().enumerate() {
            let w = char_width(c);
            if acc > start && acc - start + w > width {
                start = acc;
                rows.push((row, start));
            }
            if row == cursor_row && col == cursor_col {
                cursor_xy = (acc - start, rows.len() - 1);
            }
            acc += w;
        }
        if row == cursor_row && cursor_col >= line.chars().count() {
            cursor_xy = (acc - start, rows.len() - 1);
        }
    }

    let mut projection = RenderProjection::new(cursor_xy, x_offset);
    for (y, (row, col)) in rows.into_iter().enumerate() {
        projection = projection.with_row(y, row, col, x_offset);
    }
    projection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_line_wraps_into_several_rows() {
        let doc = Document::new("abcdefghij\nxy", 7);
        let projection = soft_wrap(&doc, 4, 0);
        assert_eq!(projection.row_start(0), Some((0, 0)));
        assert_eq!(projection.row_start(1), Some((0, 4)));
        assert_eq!(projection.row_start(2), Some((0, 8)));
        assert_eq!(projection.row_start(3), Some((1, 0)));
        assert_eq!(projection.cursor_position, (3, 1));
    }

    #[test]
    fn wide_glyph_moves_to_next_row_whole() {
        let doc = Document::new("ab日", 0);
        let projection = soft_wrap(&doc, 3, 0);
        assert_eq!(projection.row_start(1), Some((0, 2)));
    }

    #[test]
    fn cursor_at_line_end_sits_after_last_cell() {
        let doc = Document::new("hello\nhi", 8);
        let projection = soft_wrap(&doc, 80, 2);
        assert_eq!(projection.cursor_position, (2, 1));
        assert_eq!(projection.screen_xy(1, 0), Some((2, 1)));
    }
}
