use std::collections::BTreeMap;

use gridchart::render::{Color, Fill, Stroke};
use gridchart::table::{CellSettings, EdgeCell, SlotSettings, StyleChain, TableSettings};

/// Every place a horizontal edge between rows 0 and 1 of column 0 can take
/// its stroke from, most specific first.
const HORIZONTAL_LEVELS: usize = 18;

struct Fixture {
    table: TableSettings,
    rows: BTreeMap<usize, SlotSettings>,
    cols: BTreeMap<usize, SlotSettings>,
    top: CellSettings,
    bottom: CellSettings,
}

fn marker(level: usize) -> Stroke {
    Stroke::solid(Color::rgb(level as f64 / 32.0, 0.0, 0.0), 1.0)
}

fn apply(fixture: &mut Fixture, level: usize) {
    let stroke = Some(marker(level));
    match level {
        0 => fixture.top.border.bottom = stroke,
        1 => fixture.bottom.border.top = stroke,
        2 => fixture.top.border.all = stroke,
        3 => fixture.bottom.border.all = stroke,
        4 => fixture.rows.entry(0).or_default().border.bottom = stroke,
        5 => fixture.rows.entry(1).or_default().border.top = stroke,
        6 => fixture.rows.entry(0).or_default().border.all = stroke,
        7 => fixture.rows.entry(1).or_default().border.all = stroke,
        8 => fixture.rows.entry(0).or_default().cell_border.bottom = stroke,
        9 => fixture.rows.entry(1).or_default().cell_border.top = stroke,
        10 => fixture.rows.entry(0).or_default().cell_border.all = stroke,
        11 => fixture.rows.entry(1).or_default().cell_border.all = stroke,
        12 => fixture.cols.entry(0).or_default().cell_border.bottom = stroke,
        13 => fixture.cols.entry(0).or_default().cell_border.top = stroke,
        14 => fixture.cols.entry(0).or_default().cell_border.all = stroke,
        15 => fixture.table.cell_border.bottom = stroke,
        16 => fixture.table.cell_border.top = stroke,
        17 => fixture.table.cell_border.all = stroke,
        _ => unreachable!("unknown level {level}"),
    }
}

fn fixture_from(first_level: usize) -> Fixture {
    let mut fixture = Fixture {
        table: TableSettings::default(),
        rows: BTreeMap::new(),
        cols: BTreeMap::new(),
        top: CellSettings::default(),
        bottom: CellSettings::default(),
    };
    fixture.table.cell_border.all = None;
    for level in first_level..HORIZONTAL_LEVELS {
        apply(&mut fixture, level);
    }
    fixture
}

#[test]
fn horizontal_border_precedence_matrix() {
    for level in 0..=HORIZONTAL_LEVELS {
        let fixture = fixture_from(level);
        let chain = StyleChain::new(&fixture.table, &fixture.rows, &fixture.cols);
        let stroke = chain.horizontal_border(
            Some(EdgeCell {
                row: 0,
                col: 0,
                settings: &fixture.top,
            }),
            Some(EdgeCell {
                row: 1,
                col: 0,
                settings: &fixture.bottom,
            }),
        );
        let expected = (level < HORIZONTAL_LEVELS).then(|| marker(level));
        assert_eq!(stroke, expected.as_ref(), "level {level}");
    }
}

#[test]
fn vertical_edge_prefers_cell_side_over_row_cell_border() {
    let table = TableSettings::default();
    let mut rows = BTreeMap::new();
    rows.entry(0)
        .or_insert_with(SlotSettings::default)
        .cell_border
        .all = Some(marker(2));
    let cols = BTreeMap::new();
    let chain = StyleChain::new(&table, &rows, &cols);

    let mut left = CellSettings::default();
    left.border.right = Some(marker(1));
    let right = CellSettings::default();
    let stroke = chain.vertical_border(
        Some(EdgeCell {
            row: 0,
            col: 0,
            settings: &left,
        }),
        Some(EdgeCell {
            row: 0,
            col: 1,
            settings: &right,
        }),
    );
    assert_eq!(stroke, Some(&marker(1)));
}

#[test]
fn fill_precedence_walks_cell_row_column_parity_table() {
    let red = Fill::solid(Color::rgb(1.0, 0.0, 0.0));
    let green = Fill::solid(Color::rgb(0.0, 1.0, 0.0));
    let blue = Fill::solid(Color::rgb(0.0, 0.0, 1.0));
    let grey = Fill::solid(Color::rgb(0.5, 0.5, 0.5));
    let white = Fill::solid(Color::WHITE);

    let mut table = TableSettings::default();
    table.fill = white.clone();
    table.row_odd_fill = Some(grey.clone());
    let mut rows = BTreeMap::new();
    rows.insert(
        3,
        SlotSettings {
            cell_fill: Some(green.clone()),
            ..SlotSettings::default()
        },
    );
    let mut cols = BTreeMap::new();
    cols.insert(
        2,
        SlotSettings {
            cell_fill: Some(blue.clone()),
            ..SlotSettings::default()
        },
    );
    let chain = StyleChain::new(&table, &rows, &cols);
    let plain = CellSettings::default();
    let styled = CellSettings {
        fill: Some(red.clone()),
        ..CellSettings::default()
    };

    assert_eq!(chain.fill(&styled, 3, 2), &red);
    assert_eq!(chain.fill(&plain, 3, 2), &green);
    assert_eq!(chain.fill(&plain, 1, 2), &blue);
    assert_eq!(chain.fill(&plain, 1, 0), &grey);
    assert_eq!(chain.fill(&plain, 0, 0), &white);
}
