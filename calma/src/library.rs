//!
//! # Calma Cell Graph
//!
//! The in-memory form of a GDSII library: an arena of [Cell]s keyed by
//! [CellKey], each holding polygons, text labels, and references to other
//! cells. References between cells are stored as arena keys plus the target
//! structure's name, so the graph carries no ownership cycles; the reader
//! fills in the keys during its post-parse resolution pass.
//!

// Std-Lib Imports
use std::collections::HashSet;
use std::path::Path;

// Crates.io
use derive_more::{Add, AddAssign, Sub, SubAssign};
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

// Local Imports
use crate::data::{CellDates, GdsError, GdsResult};
use crate::read::GdsParser;
use crate::units::{DbUnit, Len};
use crate::write::{GdsWriter, SaveOptions};

new_key_type! {
    /// Keys for [Cell] entries in a [Library]'s arena
    pub struct CellKey;
}

/// # Spatial Point
/// Coordinate in (x, y) layout-space, denominated in physical lengths.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize, Add, AddAssign, Sub, SubAssign,
)]
pub struct Point {
    pub x: Len,
    pub y: Len,
}
impl Point {
    /// Create a new [Point]
    pub fn new(x: Len, y: Len) -> Point {
        Point { x, y }
    }
}
/// Scale both coordinates
impl std::ops::Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Horizontal text anchoring, as packed into `PRESENTATION` bits 0-1.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HAlign {
    #[default]
    LeftEdge,
    XCenter,
    RightEdge,
}
impl HAlign {
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Self::LeftEdge => 0b00,
            Self::XCenter => 0b01,
            Self::RightEdge => 0b10,
        }
    }
    pub(crate) fn from_bits(bits: u8) -> Option<HAlign> {
        match bits {
            0b00 => Some(Self::LeftEdge),
            0b01 => Some(Self::XCenter),
            0b10 => Some(Self::RightEdge),
            _ => None,
        }
    }
}
/// Vertical text anchoring, as packed into `PRESENTATION` bits 2-3.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VAlign {
    #[default]
    TopEdge,
    YCenter,
    BottomEdge,
}
impl VAlign {
    pub(crate) fn bits(&self) -> u8 {
        match self {
            Self::TopEdge => 0b00,
            Self::YCenter => 0b01,
            Self::BottomEdge => 0b10,
        }
    }
    pub(crate) fn from_bits(bits: u8) -> Option<VAlign> {
        match bits {
            0b00 => Some(Self::TopEdge),
            0b01 => Some(Self::YCenter),
            0b10 => Some(Self::BottomEdge),
            _ => None,
        }
    }
}

/// # Spatial Transform
///
/// Reflection, magnification, and rotation applied to references and text,
/// as configured by `STRANS`, `MAG`, and `ANGLE` records.
/// Reflection about the x-axis applies before rotation; rotation is
/// counter-clockwise, in degrees. The neutral transform is never emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trans {
    /// Reflection about the x-axis
    pub reflect: bool,
    /// Magnification factor
    pub mag: f64,
    /// Rotation, counter-clockwise, in degrees
    pub angle: f64,
}
impl Trans {
    /// Boolean indication of the neutral (no-op) transform
    pub fn is_neutral(&self) -> bool {
        !self.reflect && self.mag == 1.0 && self.angle == 0.0
    }
}
impl Default for Trans {
    fn default() -> Trans {
        Trans {
            reflect: false,
            mag: 1.0,
            angle: 0.0,
        }
    }
}

/// # Polygon Element
///
/// A closed shape on a (layer, datatype) pair. Vertices are stored *without*
/// the closing repeat of the first point; the writer appends it, and the
/// reader strips it.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Layer Number
    pub layer: i16,
    /// DataType ID
    pub datatype: i16,
    /// Vertices, in order, unclosed
    pub points: Vec<Point>,
}
impl Polygon {
    /// Create a new [Polygon]
    pub fn new(layer: i16, datatype: i16, points: Vec<Point>) -> Polygon {
        Polygon {
            layer,
            datatype,
            points,
        }
    }
}

/// # Text Element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Text Value
    pub string: String,
    /// Layer Number
    pub layer: i16,
    /// Text-Type ID
    pub texttype: i16,
    /// Anchor point
    pub origin: Point,
    /// Rendered width
    pub width: Len,
    /// Whether the width scales under parent transforms.
    /// Encoded on disk as the sign of the `WIDTH` record.
    pub can_scale: bool,
    /// Horizontal anchoring
    pub halign: HAlign,
    /// Vertical anchoring
    pub valign: VAlign,
    /// Reflection, magnification & rotation
    pub trans: Trans,
}
impl Text {
    /// Create a new [Text] at `origin`, with default alignment and transform
    pub fn new(string: impl Into<String>, layer: i16, texttype: i16, origin: Point) -> Text {
        Text {
            string: string.into(),
            layer,
            texttype,
            origin,
            width: Len::ZERO,
            can_scale: true,
            halign: HAlign::default(),
            valign: VAlign::default(),
            trans: Trans::default(),
        }
    }
}

/// Rectangular tiling of an array reference: column/row counts and the two
/// lattice delta vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Number of columns
    pub cols: i16,
    /// Number of rows
    pub rows: i16,
    /// Per-column displacement
    pub dcol: Point,
    /// Per-row displacement
    pub drow: Point,
}

/// # Structure Reference
///
/// An instance (`SREF`) or rectangular array (`AREF`) of another cell.
/// Freshly-parsed references are *stubs* holding only the target's name;
/// the resolution pass fills in `cell` once the whole library is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Resolved target cell. `None` until reference-resolution completes.
    pub cell: Option<CellKey>,
    /// Target structure name
    pub target: String,
    /// Instance origin
    pub origin: Point,
    /// Reflection, magnification & rotation
    pub trans: Trans,
    /// Array tiling. `None` for single (`SREF`) references.
    pub tile: Option<Tile>,
}
impl Reference {
    /// Create a single (`SREF`) reference to `target` at `origin`
    pub fn new(target: impl Into<String>, origin: Point) -> Reference {
        Reference {
            cell: None,
            target: target.into(),
            origin,
            trans: Trans::default(),
            tile: None,
        }
    }
    /// Create an array (`AREF`) reference: `cols` x `rows` tiles of `target`,
    /// displaced by `dcol` per column and `drow` per row
    pub fn array(
        target: impl Into<String>,
        origin: Point,
        cols: i16,
        rows: i16,
        dcol: Point,
        drow: Point,
    ) -> Reference {
        Reference {
            cell: None,
            target: target.into(),
            origin,
            trans: Trans::default(),
            tile: Some(Tile {
                cols,
                rows,
                dcol,
                drow,
            }),
        }
    }
    /// Builder-style setter for the transform
    pub fn with_trans(mut self, trans: Trans) -> Reference {
        self.trans = trans;
        self
    }
}

/// # Cell (Structure) Definition
///
/// A named container of polygons, text labels, and references to other cells.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell Name
    pub name: String,
    /// Creation/Modification-Date Info
    pub dates: CellDates,
    /// Polygon elements
    pub polys: Vec<Polygon>,
    /// Text labels
    pub texts: Vec<Text>,
    /// References to other cells
    pub refs: Vec<Reference>,
    /// Preferred database grid, if any. The writer requires all cells with a
    /// preference to agree; the reader reports the stream's measured grid here.
    pub dbunit: Option<DbUnit>,
}
impl Cell {
    /// Create a new and empty [Cell]
    pub fn new(name: impl Into<String>) -> Cell {
        Cell {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Summary statistics for a [Library].
/// Total numbers of cells and of elements of each kind.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, Add, AddAssign, Sub, SubAssign,
)]
pub struct Stats {
    pub cells: usize,
    pub polygons: usize,
    pub texts: usize,
    pub srefs: usize,
    pub arefs: usize,
}

///
/// # Gds Library
///
/// The arena owning a suite of layout [Cell]s, generally corresponding
/// one-to-one with a `.gds` file. Cells are keyed by [CellKey] and indexed
/// by name in insertion order.
///
/// Note the stream-format's library *name* is not held here: it is supplied
/// through [SaveOptions] when writing, and skipped over when reading.
///
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Cell arena
    cells: SlotMap<CellKey, Cell>,
    /// Name-to-key index, in insertion order
    index: IndexMap<String, CellKey>,
    /// Database grid measured from the stream's `UNITS` record, when read
    pub dbunit: Option<DbUnit>,
}
impl Library {
    /// Create a new and empty [Library]
    pub fn new() -> Library {
        Library::default()
    }
    /// Add `cell` to the arena and index it by name.
    /// A cell of the same exact name replaces the index entry
    /// (the arena retains both definitions).
    pub fn add(&mut self, cell: Cell) -> CellKey {
        let name = cell.name.clone();
        let key = self.cells.insert(cell);
        self.index.insert(name, key);
        key
    }
    /// Get the key of the cell named `name`, if defined
    pub fn get(&self, name: &str) -> Option<CellKey> {
        self.index.get(name).copied()
    }
    /// Get a reference to the cell at `key`.
    /// Panics for keys foreign to this library's arena.
    pub fn cell(&self, key: CellKey) -> &Cell {
        &self.cells[key]
    }
    /// Get a mutable reference to the cell at `key`.
    /// Panics for keys foreign to this library's arena.
    pub fn cell_mut(&mut self, key: CellKey) -> &mut Cell {
        &mut self.cells[key]
    }
    /// Indexed cell keys, in insertion order
    pub fn keys(&self) -> Vec<CellKey> {
        self.index.values().copied().collect()
    }
    /// Iterate over indexed (key, cell) pairs, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (CellKey, &Cell)> {
        self.index.values().map(move |k| (*k, &self.cells[*k]))
    }
    /// Number of indexed cells
    pub fn len(&self) -> usize {
        self.index.len()
    }
    /// Boolean indication of an empty [Library]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
    /// The top-level cells: those not referenced by any other cell,
    /// mapped name-to-key in insertion order.
    pub fn top_cells(&self) -> IndexMap<String, CellKey> {
        let mut referenced: HashSet<CellKey> = HashSet::new();
        for (_key, cell) in self.iter() {
            for r in cell.refs.iter() {
                if let Some(dep) = r.cell {
                    referenced.insert(dep);
                }
            }
        }
        self.index
            .iter()
            .filter(|(_name, key)| !referenced.contains(*key))
            .map(|(name, key)| (name.clone(), *key))
            .collect()
    }
    /// The database grid shared by this library's cells.
    /// Cells carrying a preference must agree; absent any preference the
    /// one-nanometer default applies.
    pub fn common_dbunit(&self) -> GdsResult<DbUnit> {
        let mut found: Option<(&str, DbUnit)> = None;
        for (_key, cell) in self.iter() {
            let unit = match cell.dbunit {
                Some(u) => u,
                None => continue,
            };
            match found {
                Some((first, prior)) if prior != unit => {
                    return Err(GdsError::Encode(format!(
                        "cells {:?} and {:?} disagree on the database unit ({} um vs {} um)",
                        first,
                        cell.name,
                        prior.quantum().microns(),
                        unit.quantum().microns()
                    )));
                }
                Some(_) => (),
                None => found = Some((&cell.name, unit)),
            }
        }
        Ok(found.map(|(_, u)| u).unwrap_or_default())
    }
    /// Swap every reference stub's target name for its arena key.
    /// Fails, naming the referring cell and the missing target, if any
    /// reference points outside the library.
    pub fn resolve_references(&mut self) -> GdsResult<()> {
        let Library { cells, index, .. } = self;
        for (_key, cell) in cells.iter_mut() {
            for r in cell.refs.iter_mut() {
                if r.cell.is_some() {
                    continue;
                }
                match index.get(&r.target) {
                    Some(key) => r.cell = Some(*key),
                    None => {
                        return Err(GdsError::Unresolved {
                            cell: cell.name.clone(),
                            target: r.target.clone(),
                        })
                    }
                }
            }
        }
        Ok(())
    }
    /// Collect and return the library's aggregate statistics
    /// (numbers of cells and elements by kind)
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();
        for (_key, cell) in self.iter() {
            stats.cells += 1;
            stats.polygons += cell.polys.len();
            stats.texts += cell.texts.len();
            for r in cell.refs.iter() {
                match r.tile {
                    Some(_) => stats.arefs += 1,
                    None => stats.srefs += 1,
                }
            }
        }
        stats
    }
    /// Read a [Library] from the GDSII stream-format file at `fname`
    pub fn load(fname: impl AsRef<Path>) -> GdsResult<Library> {
        GdsParser::open(fname)?.parse_lib()
    }
    /// Write in GDSII stream format to the file at `fname`
    pub fn save(&self, fname: impl AsRef<Path>, opts: &SaveOptions) -> GdsResult<usize> {
        GdsWriter::open(fname)?.write_lib(self, opts)
    }
}

/// Check `name` against the stream-format naming rules:
/// at most 32 characters, drawn from `[A-Za-z0-9_?$]`. Violations warn.
pub(crate) fn check_name(what: &str, name: &str) {
    if name.len() > 32 {
        warn!("{} name {:?} exceeds 32 characters", what, name);
    }
    if name
        .bytes()
        .any(|b| !(b.is_ascii_alphanumeric() || b == b'_' || b == b'?' || b == b'$'))
    {
        warn!("{} name {:?} contains characters outside [A-Za-z0-9_?$]", what, name);
    }
}

/// Check a (layer, datatype)-style pair against the format's [0, 63] range.
/// Violations warn.
pub(crate) fn check_layer(element: &str, layer: i16, xtype: i16) {
    if !(0..=63).contains(&layer) {
        warn!("{} layer {} outside the range [0, 63]", element, layer);
    }
    if !(0..=63).contains(&xtype) {
        warn!("{} datatype {} outside the range [0, 63]", element, xtype);
    }
}

/// Check array column & row counts against the format's [0, 32767] range.
/// Violations warn.
pub(crate) fn check_colrow(cols: i16, rows: i16) {
    if cols < 0 {
        warn!("array column count {} outside the range [0, 32767]", cols);
    }
    if rows < 0 {
        warn!("array row count {} outside the range [0, 32767]", rows);
    }
}
