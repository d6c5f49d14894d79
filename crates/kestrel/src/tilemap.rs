//! Tile maps.
//!
//! Map files are parsed by the host; this module takes the decoded layer
//! arrays and draws them. Each layer is a flat, row-major `width * height`
//! array of tile ids:
//!
//! ```text
//! bit 31        horizontal flip
//! bits 0..24    1-based index into the atlas (0 = empty cell)
//! ```

use std::collections::HashMap;

use crate::math::{Rect, UVec2, Vec2};
use crate::render::{Canvas, SpriteDraw, TextureId};

const FLIP_BIT: u32 = 1 << 31;
const ID_MASK: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapLayer {
    Background = 0,
    Collision = 1,
    Lights = 2,
    Entities = 3,
}

impl MapLayer {
    pub const ALL: [MapLayer; 4] = [
        MapLayer::Background,
        MapLayer::Collision,
        MapLayer::Lights,
        MapLayer::Entities,
    ];

    /// The layer stored at position `index` of a map file.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// One decoded cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// 0-based atlas index.
    pub atlas_index: u32,
    pub flip_x: bool,
}

impl Tile {
    /// Decode a raw tile id. Empty cells decode to `None`.
    pub fn decode(raw: u32) -> Option<Self> {
        let id = raw & ID_MASK;
        if id == 0 {
            return None;
        }
        Some(Self {
            atlas_index: id - 1,
            flip_x: raw & FLIP_BIT != 0,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TileMap {
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile size in pixels.
    pub tile_width: u32,
    pub tile_height: u32,
    /// Integer multiplier applied to every drawn tile.
    pub scale: u32,
    pub atlas: TextureId,
    /// Atlas texture size in pixels.
    pub atlas_size: UVec2,
    layers: HashMap<MapLayer, Vec<u32>>,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tile_width: u32, tile_height: u32, atlas: TextureId, atlas_size: UVec2) -> Self {
        Self {
            width,
            height,
            tile_width,
            tile_height,
            scale: 1,
            atlas,
            atlas_size,
            layers: HashMap::new(),
        }
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    /// Install a layer's raw ids. Returns `false` (and keeps the old layer) if
    /// `data` is not `width * height` long.
    pub fn set_layer(&mut self, layer: MapLayer, data: Vec<u32>) -> bool {
        if self.cell_count() != Some(data.len()) {
            return false;
        }
        self.layers.insert(layer, data);
        true
    }

    pub fn has_layer(&self, layer: MapLayer) -> bool {
        self.layers.contains_key(&layer)
    }

    /// The decoded tile at `(x, y)`.
    pub fn tile(&self, layer: MapLayer, x: u32, y: u32) -> Option<Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?;
        let raw = *self.layers.get(&layer)?.get(index)?;
        Tile::decode(raw)
    }

    /// `width * height`, or `None` if it does not fit in memory indices.
    fn cell_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Pixel rect of an atlas cell, row-major.
    pub fn atlas_rect(&self, atlas_index: u32) -> Option<Rect> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return None;
        }
        let columns = self.atlas_size.x / self.tile_width;
        let rows = self.atlas_size.y / self.tile_height;
        if u64::from(atlas_index) >= u64::from(columns) * u64::from(rows) {
            return None;
        }
        Some(Rect::new(
            ((atlas_index % columns) * self.tile_width) as f32,
            ((atlas_index / columns) * self.tile_height) as f32,
            self.tile_width as f32,
            self.tile_height as f32,
        ))
    }

    /// Draw every non-empty tile of `layer`. Cells whose id falls outside the
    /// atlas are skipped.
    pub fn draw_layer(&self, canvas: &mut dyn Canvas, layer: MapLayer) {
        let size = Vec2::new(
            self.tile_width as f32 * self.scale as f32,
            self.tile_height as f32 * self.scale as f32,
        );
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(tile) = self.tile(layer, x, y) else {
                    continue;
                };
                let Some(source) = self.atlas_rect(tile.atlas_index) else {
                    continue;
                };
                let position = Vec2::new(x as f32 * size.x, y as f32 * size.y);
                canvas.draw_sprite(
                    &SpriteDraw::new(self.atlas, position, size)
                        .with_source(source)
                        .with_flip_x(tile.flip_x),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DrawList;

    fn map() -> TileMap {
        TileMap::new(3, 2, 16, 16, TextureId(2), UVec2::new(64, 32)).with_scale(2)
    }

    #[test]
    fn decode_tile_ids() {
        assert_eq!(Tile::decode(0), None);
        assert_eq!(Tile::decode(FLIP_BIT), None);
        assert_eq!(Tile::decode(5), Some(Tile { atlas_index: 4, flip_x: false }));
        assert_eq!(Tile::decode(FLIP_BIT | 1), Some(Tile { atlas_index: 0, flip_x: true }));
    }

    #[test]
    fn layer_length_is_checked() {
        let mut map = map();
        assert!(!map.set_layer(MapLayer::Background, vec![1, 2]));
        assert!(!map.has_layer(MapLayer::Background));
        assert!(map.set_layer(MapLayer::Background, vec![0; 6]));
    }

    #[test]
    fn oversized_map_does_not_overflow() {
        let mut map = TileMap::new(u32::MAX, 2, 16, 16, TextureId(2), UVec2::new(64, 32));
        assert!(!map.set_layer(MapLayer::Background, vec![1; 6]));
        assert_eq!(map.tile(MapLayer::Background, u32::MAX - 1, 1), None);

        let map = TileMap::new(70_000, 70_000, 16, 16, TextureId(2), UVec2::new(64, 32));
        assert_eq!(map.tile(MapLayer::Background, 69_999, 69_999), None);
    }

    #[test]
    fn draw_layer_skips_empty_cells() {
        let mut map = map();
        map.set_layer(MapLayer::Collision, vec![0, 2, 0, 0, 0, FLIP_BIT | 6]);
        let mut canvas = DrawList::new();
        map.draw_layer(&mut canvas, MapLayer::Collision);
        map.draw_layer(&mut canvas, MapLayer::Lights);

        assert_eq!(canvas.len(), 2);
        let first = &canvas.sprites[0];
        assert_eq!(first.position, Vec2::new(32.0, 0.0));
        assert_eq!(first.size, Vec2::new(32.0, 32.0));
        assert_eq!(first.source, Some(Rect::new(16.0, 0.0, 16.0, 16.0)));
        let second = &canvas.sprites[1];
        assert_eq!(second.position, Vec2::new(64.0, 32.0));
        assert_eq!(second.source, Some(Rect::new(16.0, 16.0, 16.0, 16.0)));
        assert!(second.flip_x);
    }

    #[test]
    fn layer_order_matches_file_order() {
        assert_eq!(MapLayer::from_index(1), Some(MapLayer::Collision));
        assert_eq!(MapLayer::from_index(4), None);
    }
}
