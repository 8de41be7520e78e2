//! Integration tests for the reactive sheet.

use std::sync::{Arc, Mutex};

use cellgraph_core::{CellRange, Coordinate, SheetError, Spreadsheet, Value};
use cellgraph_engine::engine::EvalError;
use log::{Level, Log, Metadata, Record};
use pretty_assertions::assert_eq;

fn c(text: &str) -> Coordinate {
    Coordinate::parse(text).unwrap()
}

fn shown(sheet: &Spreadsheet, coord: &str) -> String {
    sheet.get(coord).unwrap().value
}

fn content(sheet: &Spreadsheet, coord: &str) -> String {
    sheet.get(coord).unwrap().content
}

fn sheet_with(cells: &[(&str, &str)]) -> Spreadsheet {
    let mut sheet = Spreadsheet::new();
    for (coord, input) in cells {
        sheet.set(coord, input).unwrap();
    }
    sheet
}

#[test]
fn test_long_running_total_propagates() {
    let mut sheet = sheet_with(&[("A1", "1"), ("A2", "=A1+1")]);
    sheet
        .copy_cell_to_range(c("A2"), CellRange::parse("A3:A12000").unwrap())
        .unwrap();
    assert_eq!(shown(&sheet, "A12000"), "12000");

    sheet.set("A1", "2").unwrap();
    assert_eq!(shown(&sheet, "A12000"), "12001");
    // One evaluation when created, one for the change.
    assert_eq!(sheet.get("A12000").unwrap().evaluation_count, 2);
    assert_eq!(sheet.get("A6000").unwrap().evaluation_count, 2);

    let err = sheet.set("A1", "=A12000").unwrap_err();
    assert_eq!(
        err,
        SheetError::CircularReference {
            cell: c("A1"),
            target: c("A12000"),
        }
    );
    assert_eq!(shown(&sheet, "A12000"), "12001");
    assert_eq!(sheet.check_consistency(), Ok(()));
}

#[test]
fn test_change_propagates_to_readers() {
    let mut sheet = sheet_with(&[("A1", "1"), ("A2", "=A1+1")]);
    assert_eq!(shown(&sheet, "A2"), "2");

    sheet.set("A1", "10").unwrap();
    assert_eq!(shown(&sheet, "A2"), "11");
    assert!(sheet.consistent_check());
}

#[test]
fn test_propagation_through_chain() {
    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "=A1*2"), ("C1", "=B1+A1"), ("D1", "=C1&\"!\"")]);
    assert_eq!(shown(&sheet, "D1"), "3!");
    sheet.set("A1", "5").unwrap();
    assert_eq!(shown(&sheet, "C1"), "15");
    assert_eq!(shown(&sheet, "D1"), "15!");
}

#[test]
fn test_longer_cycle_is_rejected() {
    let mut sheet = sheet_with(&[("A1", "=A2"), ("A2", "=A3"), ("A3", "=A4")]);
    let err = sheet.set("A4", "=A1").unwrap_err();
    assert_eq!(
        err,
        SheetError::CircularReference {
            cell: c("A4"),
            target: c("A1"),
        }
    );
    assert_eq!(content(&sheet, "A4"), "");
    assert!(sheet.consistent_check());

    // A non-circular formula still goes through.
    sheet.set("A4", "7").unwrap();
    assert_eq!(shown(&sheet, "A1"), "7");
}

#[test]
fn test_self_reference_leaves_no_trace() {
    let mut sheet = Spreadsheet::new();
    assert!(matches!(
        sheet.set("B2", "=B2+1"),
        Err(SheetError::CircularReference { .. })
    ));
    assert_eq!(sheet.cell_count(), 0);
}

#[test]
fn test_rejected_edit_keeps_previous_formula() {
    let mut sheet = sheet_with(&[("A1", "3"), ("B1", "=A1"), ("C1", "=B1")]);
    assert!(sheet.set("A1", "=C1+D9").is_err());
    assert_eq!(content(&sheet, "A1"), "3");
    assert_eq!(shown(&sheet, "C1"), "3");
    assert!(!sheet.contains(c("D9")));
    assert!(sheet.consistent_check());
}

#[test]
fn test_unchanged_result_stops_propagation() {
    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "=A1*0"), ("C1", "=B1+1")]);
    assert_eq!(sheet.get("B1").unwrap().evaluation_count, 1);
    assert_eq!(sheet.get("C1").unwrap().evaluation_count, 1);

    sheet.set("A1", "2").unwrap();
    assert_eq!(sheet.get("B1").unwrap().evaluation_count, 2);
    assert_eq!(sheet.get("C1").unwrap().evaluation_count, 1);
    assert_eq!(shown(&sheet, "C1"), "1");
}

#[test]
fn test_evaluation_timestamp_recorded() {
    let sheet = sheet_with(&[("A1", "1")]);
    assert!(sheet.last_evaluated_at(c("A1")).is_some());
    assert!(sheet.last_evaluated_at(c("B1")).is_none());
}

#[test]
fn test_copy_respects_anchors() {
    let mut sheet = Spreadsheet::new();
    sheet.set("E5", "=A1+$B1+C$1+$D$1").unwrap();
    sheet.copy_cell(c("E5"), c("G7")).unwrap();
    assert_eq!(content(&sheet, "G7"), "=C3+$B3+E$1+$D$1");
    assert_eq!(content(&sheet, "E5"), "=A1+$B1+C$1+$D$1");
    assert!(sheet.consistent_check());
}

#[test]
fn test_copy_off_grid_fails() {
    let mut sheet = sheet_with(&[("B2", "=A1")]);
    assert!(matches!(
        sheet.copy_cell(c("B2"), c("A2")),
        Err(SheetError::IllegalCoordinate(_))
    ));
    assert!(!sheet.contains(c("A2")));
}

#[test]
fn test_copy_to_range() {
    let mut sheet = sheet_with(&[
        ("A2", "3.9"),
        ("B4", "10"),
        ("B5", "20"),
        ("B6", "30"),
        ("C4", "= B4 * $A$2"),
    ]);
    sheet
        .copy_cell_to_range(c("C4"), CellRange::parse("C4:C6").unwrap())
        .unwrap();
    assert_eq!(content(&sheet, "C5"), "=B5 * $A$2");
    assert_eq!(shown(&sheet, "C4"), "39");
    assert_eq!(shown(&sheet, "C5"), "78");
    assert_eq!(shown(&sheet, "C6"), "117");

    sheet.set("A2", "1").unwrap();
    assert_eq!(shown(&sheet, "C6"), "30");
}

#[test]
fn test_fibonacci_by_copy() {
    let mut sheet = sheet_with(&[("A1", "1"), ("A2", "1"), ("A3", "=A1+A2")]);
    sheet
        .copy_cell_to_range(c("A3"), CellRange::parse("A4:A30").unwrap())
        .unwrap();
    assert_eq!(shown(&sheet, "A30"), "832040");

    sheet.set("A1", "0").unwrap();
    assert_eq!(shown(&sheet, "A30"), "514229");
    assert!(sheet.consistent_check());
}

#[test]
fn test_insert_rows_grows_range() {
    let mut sheet = sheet_with(&[("A1", "1"), ("A2", "2"), ("A3", "4"), ("B1", "=sum(A1:A3)")]);
    assert_eq!(shown(&sheet, "B1"), "7");

    sheet.insert_rows(2, 1).unwrap();
    assert_eq!(content(&sheet, "B1"), "=sum(A1:A4)");
    assert_eq!(shown(&sheet, "B1"), "7");
    assert_eq!(content(&sheet, "A3"), "2");
    assert_eq!(content(&sheet, "A4"), "4");

    sheet.set("A2", "10").unwrap();
    assert_eq!(shown(&sheet, "B1"), "17");
    assert!(sheet.consistent_check());
}

#[test]
fn test_insert_columns_shifts_references() {
    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "2"), ("C1", "=A1+$B$1")]);
    sheet.insert_columns(2, 2).unwrap();
    assert_eq!(content(&sheet, "E1"), "=A1+$D$1");
    assert_eq!(shown(&sheet, "E1"), "3");
    assert!(!sheet.contains(c("C1")));
    assert!(sheet.consistent_check());
}

#[test]
fn test_delete_rows_invalidates_and_shrinks() {
    let mut sheet = sheet_with(&[
        ("A1", "1"),
        ("A2", "2"),
        ("A3", "3"),
        ("A4", "4"),
        ("B1", "=sum(A1:A4)"),
        ("C1", "=A2"),
        ("D1", "=A3*2"),
        ("E1", "=A4"),
    ]);
    sheet.delete_rows(2, 2).unwrap();

    assert_eq!(content(&sheet, "B1"), "=sum(A1:A2)");
    assert_eq!(shown(&sheet, "B1"), "5");
    assert_eq!(content(&sheet, "C1"), "=#REF!");
    assert_eq!(sheet.value(c("C1")), Err(EvalError::InvalidReference));
    assert_eq!(content(&sheet, "D1"), "=#REF!*2");
    assert_eq!(content(&sheet, "E1"), "=A2");
    assert_eq!(shown(&sheet, "E1"), "4");
    assert!(!sheet.contains(c("A3")));
    assert!(sheet.consistent_check());
}

#[test]
fn test_delete_whole_range() {
    let mut sheet = sheet_with(&[("A2", "1"), ("A3", "2"), ("B1", "=sum(A2:A3)")]);
    sheet.delete_rows(2, 2).unwrap();
    assert_eq!(content(&sheet, "B1"), "=sum(#REF!)");
    assert!(sheet.get("B1").unwrap().error.is_some());
    assert!(sheet.consistent_check());
}

#[test]
fn test_delete_columns() {
    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "2"), ("C1", "3"), ("A2", "=C1-A1")]);
    sheet.delete_columns(2, 1).unwrap();
    assert_eq!(content(&sheet, "A2"), "=B1-A1");
    assert_eq!(shown(&sheet, "A2"), "2");
    assert!(sheet.consistent_check());
}

#[test]
fn test_zero_line_is_rejected() {
    let mut sheet = Spreadsheet::new();
    assert!(matches!(
        sheet.insert_rows(0, 1),
        Err(SheetError::IllegalCoordinate(_))
    ));
    assert!(sheet.delete_columns(3, 0).is_ok());
}

#[test]
fn test_consistent_check_is_idempotent() {
    let sheet = sheet_with(&[("A1", "1"), ("B1", "=A1+sum(A1:A3)")]);
    assert!(sheet.consistent_check());
    assert!(sheet.consistent_check());
    assert_eq!(sheet.check_consistency(), Ok(()));
}

#[test]
fn test_move_renames_readers() {
    let mut sheet = sheet_with(&[("A1", "5"), ("B1", "=A1*2")]);
    sheet.move_cell(c("A1"), c("C3")).unwrap();

    assert_eq!(content(&sheet, "B1"), "=C3*2");
    assert_eq!(shown(&sheet, "B1"), "10");
    assert!(!sheet.contains(c("A1")));

    sheet.set("C3", "6").unwrap();
    assert_eq!(shown(&sheet, "B1"), "12");
    assert!(sheet.consistent_check());
}

#[test]
fn test_move_keeps_anchor_markers() {
    let mut sheet = sheet_with(&[("A1", "2"), ("B1", "=$A$1+A1")]);
    sheet.move_cell(c("A1"), c("A2")).unwrap();
    assert_eq!(content(&sheet, "B1"), "=$A$2+A2");
    assert_eq!(shown(&sheet, "B1"), "4");
}

#[test]
fn test_moved_formula_is_not_rewritten() {
    let mut sheet = sheet_with(&[("A1", "2"), ("B1", "=A1+1")]);
    sheet.move_cell(c("B1"), c("D4")).unwrap();
    assert_eq!(content(&sheet, "D4"), "=A1+1");
    sheet.set("A1", "3").unwrap();
    assert_eq!(shown(&sheet, "D4"), "4");
    assert!(sheet.consistent_check());
}

#[test]
fn test_move_out_of_range_leaves_hole() {
    let mut sheet = sheet_with(&[("A1", "1"), ("A2", "2"), ("B1", "=sum(A1:A2)")]);
    sheet.move_cell(c("A2"), c("C1")).unwrap();
    assert_eq!(content(&sheet, "B1"), "=sum(A1:A2)");
    assert_eq!(shown(&sheet, "B1"), "1");
    assert_eq!(shown(&sheet, "C1"), "2");
    assert!(sheet.consistent_check());
}

#[test]
fn test_move_onto_occupied_cell() {
    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "2")]);
    assert_eq!(
        sheet.move_cell(c("A1"), c("B1")),
        Err(SheetError::Occupied(c("B1")))
    );
    assert_eq!(shown(&sheet, "A1"), "1");
}

#[test]
fn test_move_adopts_readers_of_empty_destination() {
    let mut sheet = sheet_with(&[("A1", "7"), ("C1", "=B1+1")]);
    assert_eq!(shown(&sheet, "C1"), "1");

    sheet.move_cell(c("A1"), c("B1")).unwrap();
    assert_eq!(shown(&sheet, "C1"), "8");
    assert_eq!(sheet.observers_of(c("B1")), vec![c("C1")]);
    assert_eq!(sheet.cell_count(), 2);
    assert!(sheet.consistent_check());
}

#[test]
fn test_move_that_would_close_a_cycle() {
    let mut sheet = sheet_with(&[("C1", "=A1"), ("B1", "=C1")]);
    assert!(matches!(
        sheet.move_cell(c("B1"), c("A1")),
        Err(SheetError::CircularReference { .. })
    ));
    assert_eq!(content(&sheet, "B1"), "=C1");
    assert!(sheet.consistent_check());
}

#[test]
fn test_move_by_offset() {
    let mut sheet = sheet_with(&[("B2", "1"), ("C2", "=B2")]);
    sheet.move_cell_by(c("B2"), 1, 2).unwrap();
    assert_eq!(content(&sheet, "C2"), "=C4");
    assert!(sheet.move_cell_by(c("C4"), -3, 0).is_err());
}

#[test]
fn test_errors_propagate_and_recover() {
    let mut sheet = sheet_with(&[("A1", "=1/0"), ("B1", "=A1+1")]);
    assert_eq!(sheet.value(c("A1")), Err(EvalError::DivideByZero));
    assert_eq!(
        sheet.value(c("B1")),
        Err(EvalError::Reference {
            cell: "A1".to_string()
        })
    );
    assert!(matches!(
        sheet.evaluate(c("B1")),
        Err(SheetError::Evaluation { .. })
    ));

    sheet.set("A1", "2").unwrap();
    assert_eq!(sheet.value(c("B1")), Ok(Value::Number(3.0)));
}

#[test]
fn test_syntax_error_is_stored() {
    let mut sheet = Spreadsheet::new();
    sheet.set("A1", "=1+").unwrap();
    let view = sheet.get("A1").unwrap();
    assert_eq!(view.content, "=1+");
    assert!(view.is_formula);
    assert!(!view.is_valid);
    assert!(matches!(view.error, Some(EvalError::Syntax(_))));
}

#[test]
fn test_overly_nested_formula_is_stored_as_syntax_error() {
    let mut sheet = Spreadsheet::new();
    let input = format!("={}1{}", "(".repeat(10_000), ")".repeat(10_000));
    sheet.set("A1", &input).unwrap();
    let view = sheet.get("A1").unwrap();
    assert!(view.is_formula);
    assert!(matches!(view.error, Some(EvalError::Syntax(_))));
    assert!(view.value.contains("nested deeper"));
}

#[test]
fn test_unknown_function() {
    let sheet = sheet_with(&[("A1", "=foo(1)")]);
    assert_eq!(
        sheet.value(c("A1")),
        Err(EvalError::UnknownFunction("foo".to_string()))
    );
}

#[test]
fn test_registered_function() {
    let mut sheet = Spreadsheet::new();
    sheet.register_function("double", |args| {
        let n = args.first().map(|a| a.value.as_number()).transpose()?.unwrap_or(0.0);
        Ok(Value::Number(n * 2.0))
    });
    sheet.set("A1", "4").unwrap();
    sheet.set("B1", "=double(A1)").unwrap();
    assert_eq!(shown(&sheet, "B1"), "8");
}

#[test]
fn test_add_cell_refuses_existing() {
    let mut sheet = sheet_with(&[("A1", "1")]);
    assert_eq!(
        sheet.add_cell(c("A1"), 2.0),
        Err(SheetError::AlreadyExists(c("A1")))
    );
    sheet.add_cell(c("A2"), "=A1").unwrap();
    assert_eq!(shown(&sheet, "A2"), "1");
}

#[test]
fn test_unreferenced_empty_cells_are_collected() {
    let mut sheet = sheet_with(&[("B1", "=A1")]);
    assert_eq!(sheet.cell_count(), 2);
    assert!(sheet.contains(c("A1")));

    sheet.set("B1", "").unwrap();
    assert_eq!(sheet.cell_count(), 0);

    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "=A1")]);
    sheet.clear_cell(c("A1")).unwrap();
    assert!(sheet.contains(c("A1")));
    assert_eq!(shown(&sheet, "B1"), "");
}

#[test]
fn test_duplicate_reference_kinds() {
    let sheet = sheet_with(&[("A1", "1"), ("B1", "=A1+$A1")]);
    let refs = sheet.references_of(c("B1"));
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().all(|r| r.target == c("A1")));
    assert_eq!(sheet.observers_of(c("A1")), vec![c("B1")]);
}

#[test]
fn test_move_and_copy_rows() {
    let mut sheet = sheet_with(&[("A1", "1"), ("B1", "=A1+1")]);
    sheet.move_row(1, 3).unwrap();
    assert_eq!(content(&sheet, "B3"), "=A3+1");
    assert_eq!(shown(&sheet, "B3"), "2");
    assert!(sheet.row_coordinates(1).is_empty());

    sheet.copy_row(3, 5).unwrap();
    assert_eq!(content(&sheet, "B5"), "=A5+1");
    assert_eq!(shown(&sheet, "B5"), "2");
    assert!(sheet.consistent_check());
}

#[test]
fn test_move_and_copy_columns() {
    let mut sheet = sheet_with(&[("A1", "1"), ("A2", "=A1*3"), ("C2", "x")]);
    assert_eq!(sheet.move_column(1, 3), Err(SheetError::Occupied(c("C2"))));

    sheet.move_column(1, 2).unwrap();
    assert_eq!(content(&sheet, "B2"), "=B1*3");

    sheet.copy_column(2, 3).unwrap();
    assert_eq!(content(&sheet, "C2"), "=C1*3");
    assert_eq!(shown(&sheet, "C2"), "3");
    assert!(sheet.consistent_check());
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<(Level, String)>>>);

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.0
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

#[test]
fn test_logger_sees_rejections() {
    let capture = Capture::default();
    let mut sheet = Spreadsheet::new().with_logger(Box::new(capture.clone()));
    sheet.set("A1", "1").unwrap();
    let _ = sheet.set("A1", "=A1");

    let records = capture.0.lock().unwrap();
    assert!(
        records
            .iter()
            .any(|(level, message)| *level == Level::Warn && message.contains("circular"))
    );
    assert!(records.iter().any(|(level, _)| *level == Level::Debug));
}
