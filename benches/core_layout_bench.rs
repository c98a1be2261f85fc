use criterion::{Criterion, criterion_group, criterion_main};
use gridchart::core::tree::{fields, item_fields};
use gridchart::core::{DataTree, Rect, SizeBound, SizeValue, SlotSizing};
use gridchart::gantt::{GanttController, HeightCache};
use gridchart::render::RecordingBackend;
use gridchart::table::{Table, TableConfig};
use serde_json::json;
use std::hint::black_box;

fn bench_size_solver_constrained_200(c: &mut Criterion) {
    let mut sizing = SlotSizing::default();
    for index in (0..200).step_by(3) {
        sizing.set_slot(index, SizeBound::Min, Some(SizeValue::px(12.0)));
    }
    for index in (1..200).step_by(5) {
        sizing.set_slot(index, SizeBound::Max, Some(SizeValue::px(4.0)));
    }
    sizing.set_slot(7, SizeBound::Size, Some(SizeValue::percent(10.0)));

    c.bench_function("size_solver_constrained_200", |b| {
        b.iter(|| {
            let _ = sizing.solve(black_box(200), black_box(1_600.0));
        })
    });
}

fn bench_height_cache_lookup_100k(c: &mut Criterion) {
    let mut cache = HeightCache::new();
    for row in 0..100_000 {
        cache.push(20.0 + f64::from(row % 7));
    }
    let total = cache.total();

    c.bench_function("height_cache_lookup_100k", |b| {
        b.iter(|| {
            let index = cache.index_by_height(black_box(total * 0.618));
            let _ = cache.height_by_indexes(index, Some(index + 40));
        })
    });
}

fn bench_gantt_scroll_10k(c: &mut Criterion) {
    let mut tree = DataTree::new();
    for group in 0..100 {
        let parent = tree.add_root(item_fields([(fields::ID, json!(format!("g{group}")))]));
        for row in 0..99 {
            let start = f64::from(group * 100 + row) * 3_600_000.0;
            tree.add_child(
                parent,
                item_fields([
                    (fields::ACTUAL_START, json!(start)),
                    (fields::ACTUAL_END, json!(start + 7_200_000.0)),
                ]),
            )
            .expect("valid parent");
        }
    }
    let mut controller = GanttController::new();
    controller.set_data(tree);
    controller.set_available_height(900.0).expect("valid height");
    controller.run();

    let mut px = 0.0;
    c.bench_function("gantt_scroll_10k", |b| {
        b.iter(|| {
            px = (px + 37.0) % 150_000.0;
            controller.scroll_to(black_box(px)).expect("scroll");
        })
    });
}

fn bench_table_full_draw_20x10(c: &mut Criterion) {
    c.bench_function("table_full_draw_20x10", |b| {
        b.iter(|| {
            let mut table = Table::new(
                RecordingBackend::new(),
                TableConfig::default()
                    .with_rows(20)
                    .with_cols(10)
                    .with_bounds(Rect::new(0.0, 0.0, 1_000.0, 600.0)),
            );
            let _ = table.draw();
        })
    });
}

criterion_group!(
    benches,
    bench_size_solver_constrained_200,
    bench_height_cache_lookup_100k,
    bench_gantt_scroll_10k,
    bench_table_full_draw_20x10
);
criterion_main!(benches);
