//! Tile grid world
//!
//! A fixed-size grid of typed cells. Lookups are total over every integer
//! coordinate:
//! - left/right of the grid is always solid wall
//! - just above or below the grid is open air, further out is solid
//! - inside the grid returns the stored kind

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::geometry::{Aabb, Polygon};
use crate::consts::{TILE_HEIGHT, TILE_WIDTH};

/// Rows above the grid that still count as open air
pub const TOP_MARGIN_ROWS: i32 = 2;
/// Rows below the grid that still count as open air
pub const BOTTOM_MARGIN_ROWS: i32 = 3;

/// Collision classification of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Empty space
    Passable,
    /// Solid block
    Impassable,
    /// One-way floor, solid only from above
    Platform,
    /// Ramp rising to the right (low at the left edge, high at the right)
    SlantedUp,
    /// Ramp falling to the right
    SlantedDown,
}

impl TileKind {
    pub fn is_slanted(&self) -> bool {
        matches!(self, TileKind::SlantedUp | TileKind::SlantedDown)
    }
}

/// One side of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileEdge {
    Left,
    Top,
    Right,
    Bottom,
}

/// Small set of tile edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeSet {
    bits: u8,
}

impl EdgeSet {
    pub const EMPTY: EdgeSet = EdgeSet { bits: 0 };
    pub const ALL: EdgeSet = EdgeSet { bits: 0b1111 };

    fn bit(edge: TileEdge) -> u8 {
        match edge {
            TileEdge::Left => 1,
            TileEdge::Top => 2,
            TileEdge::Right => 4,
            TileEdge::Bottom => 8,
        }
    }

    pub fn insert(&mut self, edge: TileEdge) {
        self.bits |= Self::bit(edge);
    }

    pub fn contains(&self, edge: TileEdge) -> bool {
        self.bits & Self::bit(edge) != 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl FromIterator<TileEdge> for EdgeSet {
    fn from_iter<I: IntoIterator<Item = TileEdge>>(iter: I) -> Self {
        let mut set = EdgeSet::EMPTY;
        for edge in iter {
            set.insert(edge);
        }
        set
    }
}

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub destructible: bool,
    /// Remaining health (0..1), only meaningful when destructible
    pub health: f32,
    /// Which partial-edge sprite to draw (0..=15)
    pub variant: u8,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        kind: TileKind::Passable,
        destructible: false,
        health: 0.0,
        variant: 0,
    };

    pub fn new(kind: TileKind, destructible: bool) -> Self {
        Self {
            kind,
            destructible,
            health: if destructible { 1.0 } else { 0.0 },
            variant: 0,
        }
    }

    /// Apply damage; returns true if this blow destroyed the tile
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.destructible {
            return false;
        }
        self.health -= amount;
        if self.health <= 0.0 {
            self.kind = TileKind::Passable;
            self.destructible = false;
            return true;
        }
        false
    }
}

/// Sprite variant for a set of sealed edges
pub fn variant_for_sealed(sealed: EdgeSet) -> u8 {
    use TileEdge::*;
    let l = sealed.contains(Left);
    let r = sealed.contains(Right);
    let t = sealed.contains(Top);
    let b = sealed.contains(Bottom);
    match (l, r, t, b) {
        (false, false, false, false) => 0,
        (true, false, false, false) => 1,
        (false, true, false, false) => 2,
        (false, false, true, false) => 3,
        (false, false, false, true) => 4,
        (true, true, false, false) => 5,
        (true, false, true, false) => 6,
        (true, false, false, true) => 7,
        (false, true, true, false) => 8,
        (false, true, false, true) => 9,
        (false, false, true, true) => 10,
        (true, false, true, true) => 11,
        (false, true, true, true) => 12,
        (true, true, true, false) => 13,
        (true, true, false, true) => 14,
        (true, true, true, true) => 15,
    }
}

/// A destroyed tile, reported back to the caller for event emission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileDestroyed {
    pub x: i32,
    pub y: i32,
    /// Centre of the tile in world units
    pub center: Vec2,
}

/// The tile grid plus a pristine copy for repairs
#[derive(Debug, Clone)]
pub struct TileWorld {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    pristine: Vec<Tile>,
}

impl TileWorld {
    /// Build a world from row-major tiles; variants are computed here.
    ///
    /// # Panics
    ///
    /// Panics if `tiles.len() != width * height`.
    pub fn new(width: usize, height: usize, tiles: Vec<Tile>) -> Self {
        assert_eq!(tiles.len(), width * height, "tile count does not match grid size");
        let mut world = Self {
            width: width as i32,
            height: height as i32,
            pristine: Vec::new(),
            tiles,
        };
        world.refresh_variants();
        world.pristine = world.tiles.clone();
        world
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Level extent in world units
    pub fn bounds(&self) -> Aabb {
        Aabb::from_rect(
            0.0,
            0.0,
            self.width as f32 * TILE_WIDTH,
            self.height as f32 * TILE_HEIGHT,
        )
    }

    fn in_grid(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn get(&self, x: i32, y: i32) -> Option<&Tile> {
        self.in_grid(x, y).then(|| &self.tiles[self.index(x, y)])
    }

    /// Collision kind at a tile coordinate (total)
    pub fn collision(&self, x: i32, y: i32) -> TileKind {
        if x < 0 || x >= self.width {
            return TileKind::Impassable;
        }
        if y < 0 || y >= self.height {
            if y < -TOP_MARGIN_ROWS || y > self.height + BOTTOM_MARGIN_ROWS {
                return TileKind::Impassable;
            }
            return TileKind::Passable;
        }
        self.tiles[self.index(x, y)].kind
    }

    /// Tile coordinate containing a world point
    pub fn tile_coords(&self, pos: Vec2) -> IVec2 {
        tile_coords(pos)
    }

    /// Collision kind at a world point
    pub fn collision_at(&self, pos: Vec2) -> TileKind {
        let t = tile_coords(pos);
        self.collision(t.x, t.y)
    }

    /// Edges of a tile that entities should resolve against.
    ///
    /// An edge is dropped when the neighbour on that side already seals it,
    /// so walking across abutting solid tiles never snags on the seam.
    pub fn collidable_edges(&self, x: i32, y: i32) -> EdgeSet {
        use TileKind::*;
        let mut edges = EdgeSet::EMPTY;
        if !matches!(self.collision(x - 1, y), Impassable | SlantedUp) {
            edges.insert(TileEdge::Left);
        }
        if !matches!(
            self.collision(x, y - 1),
            Impassable | SlantedUp | SlantedDown | Platform
        ) {
            edges.insert(TileEdge::Top);
        }
        if !matches!(self.collision(x + 1, y), Impassable | SlantedDown) {
            edges.insert(TileEdge::Right);
        }
        if !matches!(self.collision(x, y + 1), Impassable) {
            edges.insert(TileEdge::Bottom);
        }
        edges
    }

    /// Edges hidden by neighbours, for sprite selection
    pub fn sealed_edges(&self, x: i32, y: i32) -> EdgeSet {
        use TileKind::*;
        let mut edges = EdgeSet::EMPTY;
        if matches!(self.collision(x - 1, y), Impassable | SlantedUp) {
            edges.insert(TileEdge::Left);
        }
        if matches!(self.collision(x + 1, y), Impassable | SlantedDown) {
            edges.insert(TileEdge::Right);
        }
        if matches!(self.collision(x, y - 1), Impassable | SlantedUp | SlantedDown) {
            edges.insert(TileEdge::Top);
        }
        if matches!(self.collision(x, y + 1), Impassable) {
            edges.insert(TileEdge::Bottom);
        }
        edges
    }

    /// World-space rectangle of a tile
    pub fn tile_bounds(&self, x: i32, y: i32) -> Aabb {
        tile_bounds(x, y)
    }

    /// Collision hull of a tile: a rectangle, or a right triangle for ramps
    pub fn tile_polygon(&self, x: i32, y: i32) -> Polygon {
        let (w, h) = (TILE_WIDTH, TILE_HEIGHT);
        let verts = match self.collision(x, y) {
            TileKind::SlantedUp => vec![Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)],
            TileKind::SlantedDown => {
                vec![Vec2::new(0.0, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)]
            }
            _ => vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(w, 0.0),
                Vec2::new(w, h),
                Vec2::new(0.0, h),
            ],
        };
        let mut poly = Polygon::new(verts);
        poly.set_position(Vec2::new(x as f32 * w, y as f32 * h));
        poly
    }

    /// Damage a tile. Destruction reclassifies it to Passable and refreshes
    /// the sprite variants of the surrounding block.
    pub fn take_damage(&mut self, x: i32, y: i32, amount: f32) -> Option<TileDestroyed> {
        if !self.in_grid(x, y) {
            return None;
        }
        let idx = self.index(x, y);
        if !self.tiles[idx].take_damage(amount) {
            return None;
        }

        for ny in (y - 1)..=(y + 1) {
            for nx in (x - 1)..=(x + 1) {
                self.refresh_variant(nx, ny);
            }
        }

        Some(TileDestroyed {
            x,
            y,
            center: tile_bounds(x, y).center(),
        })
    }

    /// Restore every tile to its loaded state
    pub fn repair_all(&mut self) {
        self.tiles.clone_from(&self.pristine);
    }

    fn refresh_variant(&mut self, x: i32, y: i32) {
        if !self.in_grid(x, y) {
            return;
        }
        let variant = variant_for_sealed(self.sealed_edges(x, y));
        let idx = self.index(x, y);
        let tile = &mut self.tiles[idx];
        if tile.kind == TileKind::Impassable {
            tile.variant = variant;
        }
    }

    fn refresh_variants(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.refresh_variant(x, y);
            }
        }
    }
}

/// Tile coordinate containing a world point (floors toward negative infinity)
pub fn tile_coords(pos: Vec2) -> IVec2 {
    IVec2::new(
        (pos.x / TILE_WIDTH).floor() as i32,
        (pos.y / TILE_HEIGHT).floor() as i32,
    )
}

/// World-space rectangle of a tile coordinate
pub fn tile_bounds(x: i32, y: i32) -> Aabb {
    Aabb::from_rect(
        x as f32 * TILE_WIDTH,
        y as f32 * TILE_HEIGHT,
        TILE_WIDTH,
        TILE_HEIGHT,
    )
}

/// Height of a ramp surface at world `x`, interpolated across the tile span.
///
/// SlantedUp is at the tile bottom on its left edge and at the top on its
/// right edge; SlantedDown is the mirror image. `None` for other kinds.
pub fn ramp_surface_y(kind: TileKind, tile_x: i32, tile_y: i32, x: f32) -> Option<f32> {
    let top = tile_y as f32 * TILE_HEIGHT;
    let bottom = top + TILE_HEIGHT;
    let rel = ((x - tile_x as f32 * TILE_WIDTH) / TILE_WIDTH).clamp(0.0, 1.0);
    match kind {
        TileKind::SlantedUp => Some(top + (bottom - top) * (1.0 - rel)),
        TileKind::SlantedDown => Some(top + (bottom - top) * rel),
        _ => None,
    }
}
