use gridchart::core::{Consistent, Rect, SizeValue};
use gridchart::render::{Color, Fill, PathCommand, RecordingBackend, Stroke};
use gridchart::table::{ContentMatrix, Edge, Table, TableConfig, TableSnapshot, TableState, TextContent};

fn build_table(rows: usize, cols: usize, bounds: Rect) -> Table<RecordingBackend> {
    Table::new(
        RecordingBackend::new(),
        TableConfig::default()
            .with_rows(rows)
            .with_cols(cols)
            .with_bounds(bounds),
    )
}

fn text(value: &str) -> Option<Box<dyn gridchart::table::CellContent>> {
    Some(Box::new(TextContent::new(value)))
}

#[test]
fn first_draw_builds_everything_then_settles() {
    let mut table = build_table(3, 3, Rect::new(0.0, 0.0, 90.0, 60.0));

    let processed = table.draw();
    assert!(processed.contains(TableState::STRUCTURE | TableState::CELL_BOUNDS));
    assert!(processed.contains(TableState::FILLS | TableState::BORDERS | TableState::CONTENT));
    assert!(table.is_consistent());

    let revision = table.backend().revision;
    assert_eq!(table.draw(), TableState::empty());
    assert_eq!(table.backend().revision, revision);
}

#[test]
fn mixed_size_settings_split_the_width() {
    let mut table = build_table(1, 4, Rect::new(0.0, 0.0, 200.0, 20.0));
    table
        .set_col_width(0, Some(SizeValue::px(50.0)))
        .expect("fixed width");
    table
        .set_col_width(1, Some(SizeValue::percent(25.0)))
        .expect("percent width");
    table.draw();

    // 50 fixed + 50 percent leave 100 for the two auto columns.
    assert_eq!(table.col_rights(), &[49.0, 99.0, 149.0, 199.0]);
    assert_eq!(table.row_bottoms(), &[19.0]);
}

#[test]
fn merged_cell_bounds_cover_the_whole_span() {
    let mut table = build_table(3, 3, Rect::new(0.0, 0.0, 90.0, 90.0));
    table
        .cell_mut(0, 0)
        .expect("cell")
        .set_row_span(2)
        .set_col_span(2);
    table.draw();

    let owner = table.cell(0, 0).expect("owner");
    assert!(owner.is_owner());
    assert_eq!(table.cell(1, 1).expect("covered").overlapped_by(), Some(0));

    let bounds = table.get_cell_bounds(0, 0, 2, 2);
    assert_eq!(bounds, Rect::new(0.0, 0.0, 59.0, 59.0));
}

#[test]
fn styling_only_repaints_the_affected_stage() {
    let mut table = build_table(2, 2, Rect::new(0.0, 0.0, 40.0, 40.0));
    table.draw();

    table
        .cell_mut(1, 1)
        .expect("cell")
        .set_fill(Some(Fill::solid(Color::rgb(1.0, 0.0, 0.0))))
        .expect("fill");
    assert_eq!(table.draw(), TableState::FILLS);

    table
        .set_cell_border(Edge::All, Some(Stroke::solid(Color::BLACK, 2.0)))
        .expect("border");
    assert_eq!(table.draw(), TableState::BORDERS);

    let red = table
        .backend()
        .drawn_paths()
        .into_iter()
        .find(|path| path.fill == Fill::solid(Color::rgb(1.0, 0.0, 0.0)))
        .expect("red fill path");
    assert_eq!(red.commands.first(), Some(&PathCommand::MoveTo(20.0, 20.0)));
}

#[test]
fn contents_rebuilds_the_grid_and_places_texts() {
    let mut table = build_table(5, 4, Rect::new(0.0, 0.0, 100.0, 100.0));
    let matrix: ContentMatrix = vec![vec![text("name"), text("value")], vec![text("x")]];
    table.contents(matrix, false).expect("contents");

    assert_eq!((table.rows_count(), table.cols_count()), (2, 2));
    table.draw();
    assert_eq!(
        table.contents_snapshot(),
        vec![vec![true, true], vec![true, false]]
    );
    let placed: Vec<&str> = table
        .backend()
        .texts
        .iter()
        .filter(|record| record.visible && record.layer.is_some())
        .map(|record| record.value.as_str())
        .collect();
    assert_eq!(placed, vec!["name", "value", "x"]);
}

#[test]
fn snapshot_restores_an_equivalent_table() {
    let mut table = build_table(2, 3, Rect::new(10.0, 10.0, 120.0, 40.0));
    table
        .set_row_even_fill(Some(Fill::solid(Color::WHITE)))
        .expect("even fill");
    table.cell_mut(0, 1).expect("cell").set_text("hello");
    table.draw();

    let json = table.snapshot_json_contract_v1_pretty().expect("serialize");
    let snapshot = TableSnapshot::from_json_compat_str(&json).expect("parse");
    let mut restored = Table::from_snapshot(RecordingBackend::new(), snapshot).expect("restore");
    restored.draw();

    assert_eq!(restored.col_rights(), table.col_rights());
    assert_eq!(restored.content_texts(), table.content_texts());
    assert_eq!(
        restored.backend().drawn_paths().len(),
        table.backend().drawn_paths().len()
    );
}
