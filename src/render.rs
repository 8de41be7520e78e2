//! Plain-text rendering of a sheet.

use cellgraph_core::{Coordinate, Spreadsheet};
use cellgraph_engine::engine::column_name;

const ROW_LABEL_WIDTH: usize = 5;
const COL_DELIMITER: &str = " | ";

/// Render every cell from A1 to the sheet's bounds. Formula cells show their
/// text on the left and their value on the right.
pub fn render_grid(sheet: &Spreadsheet, width: usize) -> String {
    let Some((max_col, max_row)) = sheet.bounds() else {
        return "Empty spreadsheet\n".to_string();
    };

    let margin = " ".repeat(ROW_LABEL_WIDTH + 1);
    let mut out = String::new();

    let header: Vec<String> = (1..=max_col)
        .map(|col| format!("{:>width$}", column_name(col)))
        .collect();
    push_line(&mut out, &format!("{}{}", margin, header.join(COL_DELIMITER)));

    let mut rule = margin.clone();
    for i in 0..max_col {
        rule.push_str(&"-".repeat(width + if i == 0 { 1 } else { 2 }));
        if i + 1 < max_col {
            rule.push('+');
        }
    }
    push_line(&mut out, &rule);

    for row in 1..=max_row {
        let mut line = format!("{:>ROW_LABEL_WIDTH$} ", format!("{}:", row));
        for col in 1..=max_col {
            if col > 1 {
                line.push_str(COL_DELIMITER);
            }
            line.push_str(&cell_text(sheet, col, row, width));
        }
        push_line(&mut out, &line);
    }
    out
}

fn cell_text(sheet: &Spreadsheet, col: u32, row: u32, width: usize) -> String {
    let Some(coord) = Coordinate::new(col, row).ok().filter(|c| sheet.contains(*c)) else {
        return " ".repeat(width);
    };
    let view = sheet.get_cell(coord);
    let text = if view.is_formula {
        split_justify(&format!("`{}`", view.content), &view.value, width)
    } else {
        format!("{:>width$}", view.value)
    };
    truncate(&text, width)
}

/// `left` flush left and `right` flush right in `width` characters, cutting
/// `left` short when both do not fit.
fn split_justify(left: &str, right: &str, width: usize) -> String {
    let right_len = right.chars().count();
    let room = width.saturating_sub(right_len + 1);
    let left = truncate(left, room);
    let gap = width.saturating_sub(left.chars().count() + right_len).max(1);
    format!("{}{}{}", left, " ".repeat(gap), right)
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}
