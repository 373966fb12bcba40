use crate::error::MapError;
use crate::model::MapTile;
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A point in grid-coordinate space. Need not sit on a tile center.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: f64,
    pub y: f64,
}

impl GridPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn as_vec(self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }
}

/// Radius query around a viewer position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
    pub position: GridPosition,
    pub view_distance: f64,
}

impl ViewQuery {
    pub fn new(position: GridPosition, view_distance: f64) -> Self {
        Self {
            position,
            view_distance,
        }
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if !self.position.x.is_finite() || !self.position.y.is_finite() {
            return Err(MapError::Validation(format!(
                "view position must be finite, got ({}, {})",
                self.position.x, self.position.y
            )));
        }
        if !self.view_distance.is_finite() || self.view_distance < 0.0 {
            return Err(MapError::Validation(format!(
                "view distance must be finite and non-negative, got {}",
                self.view_distance
            )));
        }
        Ok(())
    }

    /// Euclidean distance from the viewer to the tile's grid coordinates.
    pub fn distance_to(&self, tile: &MapTile) -> f64 {
        DVec2::new(f64::from(tile.x), f64::from(tile.y)).distance(self.position.as_vec())
    }

    /// Inclusive: a tile exactly `view_distance` away is visible.
    pub fn includes(&self, tile: &MapTile) -> bool {
        self.distance_to(tile) <= self.view_distance
    }
}

/// Tiles within the query radius, in their original order.
pub fn visible_tiles<'a>(
    tiles: &'a [MapTile],
    query: &'a ViewQuery,
) -> impl Iterator<Item = &'a MapTile> + 'a {
    tiles.iter().filter(move |tile| query.includes(tile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::test_map;

    fn coords<'a>(tiles: impl Iterator<Item = &'a MapTile>) -> Vec<(i32, i32)> {
        tiles.map(|t| (t.x, t.y)).collect()
    }

    #[test]
    fn boundary_is_inclusive() {
        let tiles = vec![MapTile::new(3, 4, 0.0)];
        let at = ViewQuery::new(GridPosition::new(0.0, 0.0), 5.0);
        assert_eq!(at.distance_to(&tiles[0]), 5.0);
        assert_eq!(visible_tiles(&tiles, &at).count(), 1);

        let short = ViewQuery::new(GridPosition::new(0.0, 0.0), 5.0 - 1e-9);
        assert_eq!(visible_tiles(&tiles, &short).count(), 0);
    }

    #[test]
    fn unit_radius_at_origin() {
        let map = test_map();
        let query = ViewQuery::new(GridPosition::new(0.0, 0.0), 1.0);
        assert_eq!(
            coords(visible_tiles(&map.tiles, &query)),
            vec![(0, 0), (0, 1), (1, 0)]
        );
    }

    #[test]
    fn zero_radius_between_tiles_sees_nothing() {
        let map = test_map();
        let query = ViewQuery::new(GridPosition::new(4.5, 4.5), 0.0);
        assert_eq!(visible_tiles(&map.tiles, &query).count(), 0);

        let exact = ViewQuery::new(GridPosition::new(4.0, 4.0), 0.0);
        assert_eq!(coords(visible_tiles(&map.tiles, &exact)), vec![(4, 4)]);
    }

    #[test]
    fn large_radius_sees_everything() {
        let map = test_map();
        let query = ViewQuery::new(GridPosition::new(5.0, 5.0), 100.0);
        assert_eq!(visible_tiles(&map.tiles, &query).count(), map.tiles.len());
    }

    #[test]
    fn rejects_bad_queries() {
        let origin = GridPosition::default();
        assert!(ViewQuery::new(origin, -1.0).validate().is_err());
        assert!(ViewQuery::new(origin, f64::INFINITY).validate().is_err());
        assert!(
            ViewQuery::new(GridPosition::new(f64::NAN, 0.0), 1.0)
                .validate()
                .is_err()
        );
        assert!(ViewQuery::new(origin, 0.0).validate().is_ok());
    }

    #[test]
    fn query_wire_format() {
        let query: ViewQuery =
            serde_json::from_str(r#"{"position": {"x": 1, "y": 2.5}, "viewDistance": 3}"#)
                .unwrap();
        assert_eq!(query.position, GridPosition::new(1.0, 2.5));
        assert_eq!(query.view_distance, 3.0);
    }
}
