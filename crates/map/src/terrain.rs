use crate::model::{MapTile, NewMap};

pub const TEST_MAP_NAME: &str = "Test Map";
/// Side length of the generated test grid.
pub const TEST_MAP_SIZE: u32 = 10;

const FREQUENCY: f64 = 0.5;
const AMPLITUDE: f64 = 2.0;

/// Height of the test terrain at `(x, y)`: `sin(0.5·x) · cos(0.5·y) · 2`.
///
/// Evaluated in exactly that order so results are reproducible bit for bit.
pub fn test_height(x: i32, y: i32) -> f64 {
    (f64::from(x) * FREQUENCY).sin() * (f64::from(y) * FREQUENCY).cos() * AMPLITUDE
}

/// The deterministic 10×10 test map, tiles in x-major order.
pub fn test_map() -> NewMap {
    let side = TEST_MAP_SIZE as i32;
    let tiles = (0..side)
        .flat_map(|x| (0..side).map(move |y| MapTile::new(x, y, test_height(x, y))))
        .collect();
    NewMap {
        name: TEST_MAP_NAME.to_owned(),
        width: TEST_MAP_SIZE,
        height: TEST_MAP_SIZE,
        tiles,
        zoom: 1.0,
    }
}
