//! Batch command language.
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! set A1 42
//! set A2 =A1 * 2
//! copy A2 A3:A9
//! insert-rows 2 1
//! print
//! ```

use std::io::Write;

use cellgraph_core::{CellRange, Coordinate, SheetError, Spreadsheet};

use crate::error::{Result, RunnerError};
use crate::render::render_grid;

#[derive(Clone, Debug, PartialEq)]
pub enum CopyTarget {
    Cell(Coordinate),
    Range(CellRange),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Set { coord: Coordinate, input: String },
    Clear(Coordinate),
    Get(Coordinate),
    Move { from: Coordinate, to: Coordinate },
    MoveBy { coord: Coordinate, cols: i64, rows: i64 },
    Copy { from: Coordinate, to: CopyTarget },
    InsertRows { at: u32, count: u32 },
    InsertColumns { at: u32, count: u32 },
    DeleteRows { at: u32, count: u32 },
    DeleteColumns { at: u32, count: u32 },
    MoveRow { from: u32, to: u32 },
    MoveColumn { from: u32, to: u32 },
    CopyRow { from: u32, to: u32 },
    CopyColumn { from: u32, to: u32 },
    Print,
    Check,
}

struct Args<'a> {
    line: usize,
    name: &'a str,
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn error(&self, message: impl Into<String>) -> RunnerError {
        RunnerError::Parse {
            line: self.line,
            message: format!("{}: {}", self.name, message.into()),
        }
    }

    fn next_word(&mut self, what: &str) -> Result<&'a str> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return Err(self.error(format!("missing {}", what)));
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.rest = &rest[end..];
        Ok(&rest[..end])
    }

    fn coord(&mut self) -> Result<Coordinate> {
        let word = self.next_word("coordinate")?;
        Coordinate::parse(word).map_err(|err| self.error(err.to_string()))
    }

    fn number<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let word = self.next_word(what)?;
        word.parse()
            .map_err(|_| self.error(format!("invalid {} `{}`", what, word)))
    }

    fn optional_count(&mut self) -> Result<u32> {
        if self.rest.trim().is_empty() {
            Ok(1)
        } else {
            self.number("count")
        }
    }

    fn finish(&self) -> Result<()> {
        let extra = self.rest.trim();
        if extra.is_empty() {
            Ok(())
        } else {
            Err(self.error(format!("unexpected `{}`", extra)))
        }
    }
}

/// Parse one script line. Blank lines and comments yield `None`.
pub fn parse_line(text: &str, line: usize) -> Result<Option<Command>> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let (name, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let mut args = Args { line, name, rest };

    let command = match name.to_ascii_lowercase().as_str() {
        "set" => {
            let coord = args.coord()?;
            let input = args.rest.trim().to_string();
            args.rest = "";
            Command::Set { coord, input }
        }
        "clear" => Command::Clear(args.coord()?),
        "get" => Command::Get(args.coord()?),
        "move" => Command::Move {
            from: args.coord()?,
            to: args.coord()?,
        },
        "move-by" => Command::MoveBy {
            coord: args.coord()?,
            cols: args.number("column offset")?,
            rows: args.number("row offset")?,
        },
        "copy" => {
            let from = args.coord()?;
            let target = args.next_word("destination")?;
            let to = if target.contains(':') {
                CopyTarget::Range(CellRange::parse(target).map_err(|err| args.error(err.to_string()))?)
            } else {
                CopyTarget::Cell(Coordinate::parse(target).map_err(|err| args.error(err.to_string()))?)
            };
            Command::Copy { from, to }
        }
        "insert-rows" => Command::InsertRows {
            at: args.number("row")?,
            count: args.optional_count()?,
        },
        "insert-cols" => Command::InsertColumns {
            at: args.number("column")?,
            count: args.optional_count()?,
        },
        "delete-rows" => Command::DeleteRows {
            at: args.number("row")?,
            count: args.optional_count()?,
        },
        "delete-cols" => Command::DeleteColumns {
            at: args.number("column")?,
            count: args.optional_count()?,
        },
        "move-row" => Command::MoveRow {
            from: args.number("row")?,
            to: args.number("row")?,
        },
        "move-col" => Command::MoveColumn {
            from: args.number("column")?,
            to: args.number("column")?,
        },
        "copy-row" => Command::CopyRow {
            from: args.number("row")?,
            to: args.number("row")?,
        },
        "copy-col" => Command::CopyColumn {
            from: args.number("column")?,
            to: args.number("column")?,
        },
        "print" => Command::Print,
        "check" => Command::Check,
        _ => return Err(args.error("unknown command")),
    };
    args.finish()?;
    Ok(Some(command))
}

/// Apply a command to the sheet, returning any text it prints.
pub fn execute(
    sheet: &mut Spreadsheet,
    command: &Command,
    column_width: usize,
) -> std::result::Result<Option<String>, SheetError> {
    match command {
        Command::Set { coord, input } => sheet.set(&coord.to_string(), input)?,
        Command::Clear(coord) => sheet.clear_cell(*coord)?,
        Command::Get(coord) => return Ok(Some(sheet.get_cell(*coord).value)),
        Command::Move { from, to } => sheet.move_cell(*from, *to)?,
        Command::MoveBy { coord, cols, rows } => sheet.move_cell_by(*coord, *cols, *rows)?,
        Command::Copy { from, to } => match to {
            CopyTarget::Cell(to) => sheet.copy_cell(*from, *to)?,
            CopyTarget::Range(range) => sheet.copy_cell_to_range(*from, *range)?,
        },
        Command::InsertRows { at, count } => sheet.insert_rows(*at, *count)?,
        Command::InsertColumns { at, count } => sheet.insert_columns(*at, *count)?,
        Command::DeleteRows { at, count } => sheet.delete_rows(*at, *count)?,
        Command::DeleteColumns { at, count } => sheet.delete_columns(*at, *count)?,
        Command::MoveRow { from, to } => sheet.move_row(*from, *to)?,
        Command::MoveColumn { from, to } => sheet.move_column(*from, *to)?,
        Command::CopyRow { from, to } => sheet.copy_row(*from, *to)?,
        Command::CopyColumn { from, to } => sheet.copy_column(*from, *to)?,
        Command::Print => return Ok(Some(render_grid(sheet, column_width).trim_end().to_string())),
        Command::Check => {
            return Ok(Some(match sheet.check_consistency() {
                Ok(()) => "consistent".to_string(),
                Err(err) => format!("inconsistent: {}", err),
            }));
        }
    }
    Ok(None)
}

/// Run a whole script, writing command output to `out` and failures to
/// `err`. Returns the number of lines that failed.
pub fn run_script<W: Write, E: Write>(
    sheet: &mut Spreadsheet,
    script: &str,
    column_width: usize,
    out: &mut W,
    err: &mut E,
) -> Result<usize> {
    let mut failures = 0;
    for (index, text) in script.lines().enumerate() {
        let line = index + 1;
        let command = match parse_line(text, line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(err, "Error: {}", e)?;
                failures += 1;
                continue;
            }
        };
        match execute(sheet, &command, column_width) {
            Ok(Some(output)) => writeln!(out, "{}", output)?,
            Ok(None) => {}
            Err(e) => {
                writeln!(err, "Error at line {}: {}", line, e)?;
                failures += 1;
            }
        }
    }
    Ok(failures)
}
