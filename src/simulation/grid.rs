//! Classified city grid
//!
//! The grid is owned by the city builder. The traffic core only reads it, so
//! the one mutation hook here ([`Grid::set`]) exists for that collaborator.

use anyhow::Result;
use log::warn;

use super::types::Cell;

/// Small mixed city used by the headless runner when no map is given
pub const DEMO_CITY: &str = "\
HHH=HHHH#HHHHH=HH
HHH=HHHH#HHHHH=HH
===O====#=====O==
SSS=SSSS#SSSSS=SS
FFF=TTTT#WWWWW=BB
###=####O#####=##
..=.....#.....=..
..=.....#.....=..
..=======.....=..
..=.....B.....=..
";

/// Kind of non-drivable building occupying a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildingKind {
    House,
    Shop,
    Factory,
    Office,
    Park,
    Generic,
}

/// Normalized classification of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    Road,
    Avenue,
    Roundabout,
    Building(BuildingKind),
    #[default]
    Empty,
}

impl CellType {
    /// Normalize a cell token, accepting the legacy short aliases.
    ///
    /// Returns `None` for tokens nobody recognizes; callers treat those as empty.
    pub fn parse_token(token: &str) -> Option<CellType> {
        let normalized = token.trim().to_ascii_lowercase();
        let cell = match normalized.as_str() {
            "road" | "r" | "street" | "st" => CellType::Road,
            "avenue" | "ave" | "av" | "a" | "boulevard" => CellType::Avenue,
            "roundabout" | "rb" | "round" | "circle" | "o" => CellType::Roundabout,
            "house" | "h" | "home" | "residential" => CellType::Building(BuildingKind::House),
            "shop" | "s" | "store" | "commercial" => CellType::Building(BuildingKind::Shop),
            "factory" | "f" | "industrial" => CellType::Building(BuildingKind::Factory),
            "office" | "of" => CellType::Building(BuildingKind::Office),
            "park" | "p" | "tree" => CellType::Building(BuildingKind::Park),
            "building" | "b" | "bldg" => CellType::Building(BuildingKind::Generic),
            "" | "empty" | "." | "grass" | "none" => CellType::Empty,
            _ => return None,
        };
        Some(cell)
    }

    /// Like [`CellType::parse_token`], but unknown tokens become `Empty`
    pub fn from_token(token: &str) -> CellType {
        Self::parse_token(token).unwrap_or(CellType::Empty)
    }

    /// Single-character map symbol
    pub fn from_char(symbol: char) -> Option<CellType> {
        let cell = match symbol {
            '=' | '-' | '|' => CellType::Road,
            '#' => CellType::Avenue,
            'O' | '@' => CellType::Roundabout,
            'H' => CellType::Building(BuildingKind::House),
            'S' => CellType::Building(BuildingKind::Shop),
            'F' => CellType::Building(BuildingKind::Factory),
            'W' => CellType::Building(BuildingKind::Office),
            'T' => CellType::Building(BuildingKind::Park),
            'B' => CellType::Building(BuildingKind::Generic),
            '.' | ' ' => CellType::Empty,
            _ => return None,
        };
        Some(cell)
    }

    pub fn symbol(&self) -> char {
        match self {
            CellType::Road => '=',
            CellType::Avenue => '#',
            CellType::Roundabout => 'O',
            CellType::Building(BuildingKind::House) => 'H',
            CellType::Building(BuildingKind::Shop) => 'S',
            CellType::Building(BuildingKind::Factory) => 'F',
            CellType::Building(BuildingKind::Office) => 'W',
            CellType::Building(BuildingKind::Park) => 'T',
            CellType::Building(BuildingKind::Generic) => 'B',
            CellType::Empty => '.',
        }
    }

    pub fn is_drivable(&self) -> bool {
        matches!(
            self,
            CellType::Road | CellType::Avenue | CellType::Roundabout
        )
    }
}

/// A rectangular grid of classified cells with a fixed tile size
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    tile_size: f32,
    cells: Vec<CellType>,
}

impl Grid {
    /// Create an all-empty grid
    pub fn new(width: usize, height: usize, tile_size: f32) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            tile_size,
            cells: vec![CellType::Empty; width * height],
        }
    }

    /// Build a grid from rows of string tokens.
    ///
    /// Ragged rows are padded with `Empty` up to the widest row.
    pub fn from_tokens<R, T>(rows: &[R], tile_size: f32) -> Self
    where
        R: AsRef<[T]>,
        T: AsRef<str>,
    {
        let height = rows.len();
        let width = rows.iter().map(|row| row.as_ref().len()).max().unwrap_or(0);
        let mut grid = Grid::new(width, height, tile_size);
        let mut unknown = 0usize;

        for (y, row) in rows.iter().enumerate() {
            for (x, token) in row.as_ref().iter().enumerate() {
                let cell = match CellType::parse_token(token.as_ref()) {
                    Some(cell) => cell,
                    None => {
                        unknown += 1;
                        CellType::Empty
                    }
                };
                grid.set(Cell::new(x as i32, y as i32), cell);
            }
        }

        if unknown > 0 {
            warn!("{} unrecognized grid tokens treated as empty", unknown);
        }

        grid
    }

    /// Parse a one-character-per-cell text map
    pub fn from_ascii(text: &str, tile_size: f32) -> Result<Self> {
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end())
            .filter(|line| !line.is_empty())
            .collect();

        if rows.is_empty() {
            anyhow::bail!("Map has no rows");
        }

        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut grid = Grid::new(width, rows.len(), tile_size);
        let mut unknown = 0usize;

        for (y, row) in rows.iter().enumerate() {
            for (x, symbol) in row.chars().enumerate() {
                let cell = CellType::from_char(symbol).unwrap_or_else(|| {
                    unknown += 1;
                    CellType::Empty
                });
                grid.set(Cell::new(x as i32, y as i32), cell);
            }
        }

        if unknown > 0 {
            warn!("{} unrecognized map symbols treated as empty", unknown);
        }

        Ok(grid)
    }

    /// The built-in demo map
    pub fn demo_city(tile_size: f32) -> Result<Self> {
        Self::from_ascii(DEMO_CITY, tile_size)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        if self.contains(cell) {
            Some((cell.y * self.width + cell.x) as usize)
        } else {
            None
        }
    }

    /// Cell type at `cell`; out-of-range reads are `Empty`
    pub fn get(&self, cell: Cell) -> CellType {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(CellType::Empty)
    }

    /// Overwrite a cell. Out-of-range writes are ignored.
    pub fn set(&mut self, cell: Cell, cell_type: CellType) {
        if let Some(index) = self.index(cell) {
            self.cells[index] = cell_type;
        }
    }

    /// Iterate over every cell coordinate, row by row
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }
}
