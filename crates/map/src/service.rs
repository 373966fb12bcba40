use crate::error::MapError;
use crate::model::{GameMap, MapTile, NewMap, TilePatch};
use crate::terrain;
use crate::visibility::{self, ViewQuery};
use chrono::Utc;
use stoon_common::ObjectId;
use stoon_persist::{CollectionHandle, Database, Document, Filter};

/// Collection holding every map.
pub const MAPS_COLLECTION: &str = "maps";

/// Map lifecycle and spatial queries on top of the document store.
///
/// Cloning is cheap; clones share the same collection.
#[derive(Debug, Clone)]
pub struct MapService {
    maps: CollectionHandle,
}

impl MapService {
    pub fn new(db: &Database) -> Result<Self, MapError> {
        Ok(Self {
            maps: db.collection(MAPS_COLLECTION)?,
        })
    }

    /// Validate, timestamp and store a new map. Returns it with its id set.
    pub fn create_map(&self, new_map: NewMap) -> Result<GameMap, MapError> {
        let _span = tracing::info_span!("create_map", name = %new_map.name).entered();
        new_map.validate()?;

        let mut map = new_map.into_map(Utc::now());
        let id = self.maps.lock().insert_one(&map)?;
        map.id = Some(id);

        tracing::info!(%id, tiles = map.tiles.len(), "map created");
        Ok(map)
    }

    /// Fetch a map by the string form of its id.
    pub fn get_map(&self, id: &str) -> Result<Option<GameMap>, MapError> {
        self.get_map_by_id(ObjectId::parse_str(id)?)
    }

    pub fn get_map_by_id(&self, id: ObjectId) -> Result<Option<GameMap>, MapError> {
        let maps = self.maps.lock();
        maps.find_one(&Filter::by_id(id)).map(decode).transpose()
    }

    /// Every stored map, in insertion order.
    pub fn list_maps(&self) -> Result<Vec<GameMap>, MapError> {
        self.maps.lock().iter().map(decode).collect()
    }

    /// Merge `patch` into the tile at `(x, y)` and refresh `updatedAt`.
    ///
    /// Returns `Ok(false)` and changes nothing when the map does not exist or
    /// has no tile at an in-grid `(x, y)`. Coordinates outside the grid are a
    /// validation error. The read-modify-write runs under the collection lock,
    /// so concurrent updates to one map are applied one after another.
    pub fn update_map_tile(
        &self,
        id: &str,
        x: i32,
        y: i32,
        patch: &TilePatch,
    ) -> Result<bool, MapError> {
        let id = ObjectId::parse_str(id)?;
        patch.validate()?;
        let _span = tracing::info_span!("update_map_tile", %id, x, y).entered();

        let mut maps = self.maps.lock();
        let Some(doc) = maps.find_one(&Filter::by_id(id)) else {
            tracing::debug!("map not found");
            return Ok(false);
        };
        let mut map = decode(doc)?;
        if !map.contains(x, y) {
            return Err(MapError::Validation(format!(
                "tile ({x}, {y}) outside {}x{} grid",
                map.width, map.height
            )));
        }
        let Some(tile) = map.tile_mut(x, y) else {
            tracing::debug!("tile not found");
            return Ok(false);
        };

        if patch.is_empty() {
            tracing::debug!("empty patch, refreshing updatedAt only");
        }
        tile.apply(patch);
        map.touch();
        let replaced = maps.replace_one(id, &map)?;

        tracing::debug!(updated_at = %map.updated_at, "tile updated");
        Ok(replaced)
    }

    /// Store a freshly generated copy of the deterministic test map.
    pub fn create_test_map(&self) -> Result<GameMap, MapError> {
        self.create_map(terrain::test_map())
    }

    /// Tiles of the map within the query radius. `Ok(None)` if the map does
    /// not exist.
    pub fn visible_tiles(
        &self,
        id: &str,
        query: &ViewQuery,
    ) -> Result<Option<Vec<MapTile>>, MapError> {
        query.validate()?;
        let Some(map) = self.get_map(id)? else {
            return Ok(None);
        };
        let tiles: Vec<MapTile> = visibility::visible_tiles(&map.tiles, query)
            .cloned()
            .collect();
        tracing::debug!(
            map = id,
            visible = tiles.len(),
            total = map.tiles.len(),
            "view query"
        );
        Ok(Some(tiles))
    }
}

fn decode(doc: &Document) -> Result<GameMap, MapError> {
    doc.decode().map_err(|source| MapError::Corrupt {
        id: doc.id(),
        source,
    })
}
