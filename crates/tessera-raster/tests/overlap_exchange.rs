//! Integration test: two stores sharing an overlap band converge after a
//! patch exchange in both directions.
//!
//! Left store covers columns 0..6 (owns 0..5, ghosts column 5), right store
//! covers columns 4..10 (owns 5..10, ghosts column 4).

use tessera_core::{Point2D, RasterId, Rect, Size2D};
use tessera_raster::RasterStore;

fn rect(x0: i32, x1: i32) -> Rect {
    Rect::new(Point2D::new(x0, 0), Size2D::new((x1 - x0) as u32, 3))
}

fn pair() -> (RasterStore, RasterStore) {
    let mut left = RasterStore::new(rect(0, 6));
    let mut right = RasterStore::new(rect(4, 10));
    for store in [&mut left, &mut right] {
        let soil = store.register_static("soil", false, None).unwrap();
        let grass = store.register_dynamic("grass", true, None).unwrap();
        store.set_init_values(soil, 0, 100, 0).unwrap();
        store.set_init_values(grass, 0, 100, 0).unwrap();
    }
    (left, right)
}

// ── Helpers ─────────────────────────────────────────────────────

fn exchange(left: &mut RasterStore, right: &mut RasterStore, include_static: bool) {
    let to_right = left.extract_patches(&(rect(0, 5).intersection(&rect(4, 10)).unwrap()), include_static);
    let to_left = right.extract_patches(&(rect(5, 10).intersection(&rect(0, 6)).unwrap()), include_static);
    for patch in &to_right {
        right.apply_patch(patch).unwrap();
    }
    for patch in &to_left {
        left.apply_patch(patch).unwrap();
    }
}

fn column(store: &RasterStore, raster: RasterId, x: i32) -> Vec<i32> {
    (0..3)
        .map(|y| store.get_value(raster, &Point2D::new(x, y)).unwrap())
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────

#[test]
fn dynamic_band_converges() {
    let (mut left, mut right) = pair();
    let grass = left.id_of("grass").unwrap();
    for y in 0..3 {
        left.set_value(grass, &Point2D::new(4, y), 10 + y).unwrap();
        right.set_value(grass, &Point2D::new(5, y), 20 + y).unwrap();
    }
    exchange(&mut left, &mut right, false);

    assert_eq!(column(&right, grass, 4), vec![10, 11, 12]);
    assert_eq!(column(&left, grass, 5), vec![20, 21, 22]);
    // Owned cells never move.
    assert_eq!(column(&left, grass, 4), vec![10, 11, 12]);
    assert_eq!(column(&right, grass, 5), vec![20, 21, 22]);
}

#[test]
fn static_band_travels_only_when_requested() {
    let (mut left, mut right) = pair();
    let soil = left.id_of("soil").unwrap();
    left.set_value(soil, &Point2D::new(4, 1), 7).unwrap();
    left.seal();
    right.seal();

    exchange(&mut left, &mut right, false);
    assert_eq!(right.get_value(soil, &Point2D::new(4, 1)).unwrap(), 0);

    exchange(&mut left, &mut right, true);
    assert_eq!(right.get_value(soil, &Point2D::new(4, 1)).unwrap(), 7);
}

#[test]
fn max_bounds_travel_with_values() {
    let (mut left, mut right) = pair();
    let grass = left.id_of("grass").unwrap();
    left.set_max_value(grass, &Point2D::new(4, 2), 3).unwrap();
    exchange(&mut left, &mut right, false);
    assert_eq!(right.get_max_value_at(grass, &Point2D::new(4, 2)).unwrap(), 3);
    right.grow_to_max(grass).unwrap();
    assert_eq!(right.get_value(grass, &Point2D::new(4, 2)).unwrap(), 3);
    assert_eq!(right.get_value(grass, &Point2D::new(9, 2)).unwrap(), 100);
}
