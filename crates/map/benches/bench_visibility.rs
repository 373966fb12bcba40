use std::hint::black_box;
use std::time::Instant;

use stoon_map::{GridPosition, MapTile, ViewQuery, terrain, visibility};

fn make_tiles(side: i32) -> Vec<MapTile> {
    (0..side)
        .flat_map(|x| (0..side).map(move |y| MapTile::new(x, y, terrain::test_height(x, y))))
        .collect()
}

fn bench_generate(iterations: usize) {
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = black_box(terrain::test_map());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  test map ({iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn bench_visible_tiles(side: i32, view_distance: f64, iterations: usize) {
    let tiles = make_tiles(side);
    let center = f64::from(side) / 2.0;
    let query = ViewQuery::new(GridPosition::new(center, center), view_distance);

    let start = Instant::now();
    let mut visible = 0;
    for _ in 0..iterations {
        visible = visibility::visible_tiles(black_box(&tiles), black_box(&query)).count();
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  visible ({} tiles, r={view_distance}, {visible} hits, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}",
        tiles.len()
    );
}

fn main() {
    println!("=== Map Benchmarks ===\n");

    println!("Generation:");
    bench_generate(10000);

    println!("\nVisibility filter:");
    bench_visible_tiles(10, 3.0, 100000);
    bench_visible_tiles(100, 10.0, 1000);
    bench_visible_tiles(1000, 25.0, 10);

    println!("\n=== Done ===");
}
