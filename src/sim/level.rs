//! Level loading
//!
//! Levels are authored as images where every pixel color names one cell:
//! a tile kind, the player start, or an enemy spawn point. An ASCII form of
//! the same grid is accepted for tests and the headless runner.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemy::EnemyKind;
use super::tile::{Tile, TileKind, TileWorld, tile_bounds};
use crate::error::{LoadError, Result};

/// RGBA pixel
pub type Rgba = [u8; 4];

/// Source colors of the level image
pub mod colors {
    use super::Rgba;

    pub const PASSABLE: Rgba = [255, 255, 255, 255];
    pub const PLATFORM: Rgba = [220, 220, 220, 255];
    pub const DESTRUCTIBLE_BLOCK: Rgba = [70, 70, 70, 255];
    pub const STATIC_BLOCK: Rgba = [0, 0, 0, 255];
    pub const SLANTED_UP: Rgba = [100, 0, 0, 255];
    pub const SLANTED_DOWN: Rgba = [0, 0, 100, 255];
    pub const PLAYER_SPAWN: Rgba = [0, 0, 0, 0];
    pub const HELI_SPAWN: Rgba = [255, 255, 0, 255];
    pub const TANK_SPAWN: Rgba = [0, 255, 255, 255];
}

/// What a single source pixel means
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Tile(Tile),
    PlayerSpawn,
    EnemySpawn(EnemyKind),
}

/// Classify a pixel color, `None` if the color is not part of the palette
pub fn classify(color: Rgba) -> Option<Cell> {
    let cell = match color {
        colors::PASSABLE => Cell::Tile(Tile::EMPTY),
        colors::PLATFORM => Cell::Tile(Tile::new(TileKind::Platform, true)),
        colors::DESTRUCTIBLE_BLOCK => Cell::Tile(Tile::new(TileKind::Impassable, true)),
        colors::STATIC_BLOCK => Cell::Tile(Tile::new(TileKind::Impassable, false)),
        colors::SLANTED_UP => Cell::Tile(Tile::new(TileKind::SlantedUp, false)),
        colors::SLANTED_DOWN => Cell::Tile(Tile::new(TileKind::SlantedDown, false)),
        colors::PLAYER_SPAWN => Cell::PlayerSpawn,
        colors::HELI_SPAWN => Cell::EnemySpawn(EnemyKind::Heli),
        colors::TANK_SPAWN => Cell::EnemySpawn(EnemyKind::Tank),
        _ => return None,
    };
    Some(cell)
}

/// Map an ASCII glyph to its palette color
pub fn glyph_color(glyph: char) -> Option<Rgba> {
    let color = match glyph {
        '.' => colors::PASSABLE,
        '-' => colors::PLATFORM,
        '#' => colors::DESTRUCTIBLE_BLOCK,
        'X' => colors::STATIC_BLOCK,
        '/' => colors::SLANTED_UP,
        '\\' => colors::SLANTED_DOWN,
        'P' => colors::PLAYER_SPAWN,
        'H' => colors::HELI_SPAWN,
        'T' => colors::TANK_SPAWN,
        _ => return None,
    };
    Some(color)
}

/// Decoded level image, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgba>,
}

impl LevelImage {
    pub fn new(width: usize, height: usize, pixels: Vec<Rgba>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LoadError::EmptyLevel);
        }
        if pixels.len() != width * height {
            return Err(LoadError::PixelCountMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Parse an ASCII grid, one line per row. Surrounding whitespace and blank lines are ignored.
    pub fn from_ascii(text: &str) -> Result<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);

        let mut pixels = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(LoadError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let color =
                    glyph_color(glyph).ok_or(LoadError::UnrecognizedGlyph { glyph, x, y })?;
                pixels.push(color);
            }
        }
        Self::new(width, rows.len(), pixels)
    }
}

/// Where an enemy of a given kind may appear
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub kind: EnemyKind,
    /// Bottom-centre of the spawn cell
    pub position: Vec2,
    /// Occupied by a living enemy
    pub active: bool,
}

/// A loaded level
#[derive(Debug, Clone)]
pub struct Level {
    pub tiles: TileWorld,
    pub player_start: Vec2,
    pub spawn_points: Vec<SpawnPoint>,
}

/// Bottom-centre of a tile cell in world units
fn cell_foot(x: usize, y: usize) -> Vec2 {
    let b = tile_bounds(x as i32, y as i32);
    Vec2::new(b.center().x, b.bottom())
}

/// Classify every pixel and build the level.
///
/// Fails if any color is outside the palette or no player start exists.
pub fn load_level(image: &LevelImage) -> Result<Level> {
    let mut tiles = Vec::with_capacity(image.pixels.len());
    let mut player_start = None;
    let mut spawn_points = Vec::new();

    for (i, color) in image.pixels.iter().enumerate() {
        let (x, y) = (i % image.width, i / image.width);
        let cell = classify(*color).ok_or(LoadError::UnrecognizedColor {
            color: *color,
            x,
            y,
        })?;
        match cell {
            Cell::Tile(tile) => tiles.push(tile),
            Cell::PlayerSpawn => {
                if player_start.is_some() {
                    log::warn!("Extra player spawn at ({}, {}) ignored", x, y);
                } else {
                    player_start = Some(cell_foot(x, y));
                }
                tiles.push(Tile::EMPTY);
            }
            Cell::EnemySpawn(kind) => {
                spawn_points.push(SpawnPoint {
                    kind,
                    position: cell_foot(x, y),
                    active: false,
                });
                tiles.push(Tile::EMPTY);
            }
        }
    }

    let player_start = player_start.ok_or(LoadError::MissingPlayerSpawn)?;
    log::debug!(
        "Loaded {}x{} level with {} spawn points",
        image.width,
        image.height,
        spawn_points.len()
    );

    Ok(Level {
        tiles: TileWorld::new(image.width, image.height, tiles),
        player_start,
        spawn_points,
    })
}

/// Parse and load an ASCII level in one step
pub fn load_ascii_level(text: &str) -> Result<Level> {
    load_level(&LevelImage::from_ascii(text)?)
}
