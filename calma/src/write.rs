//!
//! # Gds Byte-Encoding and Writing
//!
//! [GdsWriter] emits a [Library] as a GDSII record stream: cells are
//! serialized in dependency order (referenced cells first), each flattened
//! to the record sequence the format dictates, and every record is
//! length-prefixed and type-tagged on its way onto the byte sink.
//!

// Std-Lib Imports
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Crates.io
use byteorder::{BigEndian, WriteBytesExt};
use chrono::NaiveDateTime;
use derive_builder::Builder;
use log::{info, warn};

// Workspace Imports
use calmautils::{DepOrder, DepOrderer};

// Local Imports
use crate::data::*;
use crate::library::*;
use crate::units::{DbUnit, Len};

/// Stream-format version written into `HEADER` records
const GDS_VERSION: i16 = 600;

///
/// # Save Options
///
/// Configuration of a library write. All fields carry defaults, so the
/// common case is `SaveOptions::default()`; one-off overrides read well
/// through [SaveOptionsBuilder].
///
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", setter(into))]
pub struct SaveOptions {
    /// Library name
    #[builder(default = "\"GDSIILIB\".to_string()")]
    pub name: String,
    /// Display ("user") unit
    #[builder(default = "Len::um(1.0)")]
    pub userunit: Len,
    /// Modification timestamp written into `BGNLIB`
    #[builder(default = "gds_now()")]
    pub modify: NaiveDateTime,
    /// Last-access timestamp written into `BGNLIB`
    #[builder(default = "gds_now()")]
    pub acc: NaiveDateTime,
    /// Informational tracing of each emitted structure
    #[builder(default)]
    pub verbose: bool,
}
impl Default for SaveOptions {
    fn default() -> SaveOptions {
        let now = gds_now();
        SaveOptions {
            name: "GDSIILIB".to_string(),
            userunit: Len::um(1.0),
            modify: now,
            acc: now,
            verbose: false,
        }
    }
}

/// Dependency ordering over a [Library]'s cell graph.
/// Pushing a cell's references first yields a leaves-first order, so every
/// cell lands on disk before anything that instantiates it.
struct CellOrder<'a> {
    lib: &'a Library,
}
impl<'a> DepOrder for CellOrder<'a> {
    type Item = CellKey;
    type Error = GdsError;

    fn process(&self, item: &CellKey, orderer: &mut DepOrderer<Self>) -> GdsResult<()> {
        let cell = self.lib.cell(*item);
        for r in cell.refs.iter() {
            // Resolved references carry their target key; fresh stubs fall
            // back to a name lookup
            let dep = match r.cell.or_else(|| self.lib.get(&r.target)) {
                Some(dep) => dep,
                None => {
                    return Err(GdsError::Unresolved {
                        cell: cell.name.clone(),
                        target: r.target.clone(),
                    })
                }
            };
            orderer.push(self, &dep)?;
        }
        Ok(())
    }
    fn fail(&self, item: &CellKey) -> GdsError {
        GdsError::Cycle(self.lib.cell(*item).name.clone())
    }
}

/// # GdsWriter
///
/// Record-level encoding of a [Library] onto a byte sink.
pub struct GdsWriter<'wr> {
    /// Write Destination
    dest: Box<dyn Write + 'wr>,
}
impl<'wr> GdsWriter<'wr> {
    /// Create a new [GdsWriter] with destination file `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<Self> {
        let file = BufWriter::new(File::create(fname)?);
        Ok(Self::new(file))
    }
    /// Create a new [GdsWriter] to destination `dest`
    pub fn new(dest: impl Write + 'wr) -> Self {
        Self {
            dest: Box::new(dest),
        }
    }
    /// Write `lib` in stream format, configured by `opts`.
    /// Returns the total number of bytes written.
    pub fn write_lib(&mut self, lib: &Library, opts: &SaveOptions) -> GdsResult<usize> {
        // Settle the database grid and the cell order up front;
        // both can fail before a single byte hits the sink.
        let dbu = lib.common_dbunit()?;
        let order = CellOrder { lib }.order(&lib.keys())?;

        check_name("library", &opts.name);
        let mut n = 0;
        n += self.write_record(&Record::Header {
            version: GDS_VERSION,
        })?;
        n += self.write_record(&Record::BgnLib {
            dates: double_date(&opts.modify, &opts.acc),
        })?;
        n += self.write_record(&Record::LibName(opts.name.clone()))?;
        // UNITS holds the user-unit expressed in database units,
        // and the database unit expressed in meters
        n += self.write_record(&Record::Units(
            dbu.quantum() / opts.userunit,
            dbu.quantum().in_meters(),
        ))?;

        // Case-insensitive duplicate-name detection.
        // The dependency ordering already drops identical re-emissions;
        // distinct cells sharing a case-folded name warn and write anyway.
        let mut emitted: HashSet<String> = HashSet::new();
        for key in order {
            let cell = lib.cell(key);
            if !emitted.insert(cell.name.to_lowercase()) {
                warn!("duplicate structure name {:?} (case-insensitive)", cell.name);
            }
            n += self.write_struct(cell, dbu, opts)?;
        }
        n += self.write_record(&Record::EndLib)?;
        self.dest.flush()?;
        Ok(n)
    }
    /// Write one cell as a `BGNSTR ... ENDSTR` structure:
    /// polygons, then references, then text labels.
    fn write_struct(&mut self, cell: &Cell, dbu: DbUnit, opts: &SaveOptions) -> GdsResult<usize> {
        if opts.verbose {
            info!("writing structure {:?}", cell.name);
        }
        check_name("structure", &cell.name);
        let mut n = 0;
        // Creation date is the cell's own; modification becomes "now"
        n += self.write_record(&Record::BgnStr {
            dates: double_date(&cell.dates.created, &gds_now()),
        })?;
        n += self.write_record(&Record::StrName(cell.name.clone()))?;
        for poly in cell.polys.iter() {
            n += self.write_boundary(poly, dbu)?;
        }
        for r in cell.refs.iter() {
            n += self.write_ref(r, dbu)?;
        }
        for text in cell.texts.iter() {
            n += self.write_text(text, dbu)?;
        }
        n += self.write_record(&Record::EndStr)?;
        Ok(n)
    }
    /// Write a polygon as a `BOUNDARY` element.
    /// The on-disk coordinate list repeats the first vertex to close the shape.
    fn write_boundary(&mut self, poly: &Polygon, dbu: DbUnit) -> GdsResult<usize> {
        check_layer("BOUNDARY", poly.layer, poly.datatype);
        let mut xy = Vec::with_capacity(2 * (poly.points.len() + 1));
        for pt in poly.points.iter() {
            xy.push(dbu.encode(pt.x)?);
            xy.push(dbu.encode(pt.y)?);
        }
        if let Some(first) = poly.points.first() {
            xy.push(dbu.encode(first.x)?);
            xy.push(dbu.encode(first.y)?);
        }
        let mut n = 0;
        n += self.write_record(&Record::Boundary)?;
        n += self.write_record(&Record::Layer(poly.layer))?;
        n += self.write_record(&Record::DataType(poly.datatype))?;
        n += self.write_record(&Record::Xy(xy))?;
        n += self.write_record(&Record::EndEl)?;
        Ok(n)
    }
    /// Write a reference as an `SREF` or `AREF` element.
    ///
    /// Arrays store their lattice as three points: the origin, plus the far
    /// ends of the column and row axes (origin + cols * dcol, and likewise
    /// for rows).
    fn write_ref(&mut self, r: &Reference, dbu: DbUnit) -> GdsResult<usize> {
        let mut n = 0;
        match &r.tile {
            None => {
                n += self.write_record(&Record::Sref)?;
                n += self.write_record(&Record::Sname(r.target.clone()))?;
                n += self.write_trans(&r.trans)?;
                n += self.write_record(&Record::Xy(vec![
                    dbu.encode(r.origin.x)?,
                    dbu.encode(r.origin.y)?,
                ]))?;
            }
            Some(tile) => {
                check_colrow(tile.cols, tile.rows);
                n += self.write_record(&Record::Aref)?;
                n += self.write_record(&Record::Sname(r.target.clone()))?;
                n += self.write_trans(&r.trans)?;
                n += self.write_record(&Record::ColRow {
                    cols: tile.cols,
                    rows: tile.rows,
                })?;
                let end_cols = r.origin + tile.dcol * tile.cols as f64;
                let end_rows = r.origin + tile.drow * tile.rows as f64;
                n += self.write_record(&Record::Xy(vec![
                    dbu.encode(r.origin.x)?,
                    dbu.encode(r.origin.y)?,
                    dbu.encode(end_cols.x)?,
                    dbu.encode(end_cols.y)?,
                    dbu.encode(end_rows.x)?,
                    dbu.encode(end_rows.y)?,
                ]))?;
            }
        }
        n += self.write_record(&Record::EndEl)?;
        Ok(n)
    }
    /// Write a text label as a `TEXT` element.
    fn write_text(&mut self, text: &Text, dbu: DbUnit) -> GdsResult<usize> {
        check_layer("TEXT", text.layer, text.texttype);
        let mut n = 0;
        n += self.write_record(&Record::Text)?;
        n += self.write_record(&Record::Layer(text.layer))?;
        n += self.write_record(&Record::TextType(text.texttype))?;
        n += self.write_record(&Record::Presentation(
            0,
            text.valign.bits() << 2 | text.halign.bits(),
        ))?;
        // A negated width marks text that does not scale with its parents
        let mut width = dbu.encode(text.width)?;
        if !text.can_scale {
            width = -width;
        }
        n += self.write_record(&Record::Width(width))?;
        n += self.write_trans(&text.trans)?;
        n += self.write_record(&Record::Xy(vec![
            dbu.encode(text.origin.x)?,
            dbu.encode(text.origin.y)?,
        ]))?;
        n += self.write_record(&Record::String(text.string.clone()))?;
        n += self.write_record(&Record::EndEl)?;
        Ok(n)
    }
    /// Write the `STRANS`/`MAG`/`ANGLE` records for `trans`.
    /// The neutral transform writes nothing at all, and the magnification
    /// and angle records appear only at non-default values.
    fn write_trans(&mut self, trans: &Trans) -> GdsResult<usize> {
        if trans.is_neutral() {
            return Ok(0);
        }
        let mut n = 0;
        n += self.write_record(&Record::Strans((trans.reflect as u8) << 7, 0))?;
        if trans.mag != 1.0 {
            n += self.write_record(&Record::Mag(trans.mag))?;
        }
        if trans.angle != 0.0 {
            n += self.write_record(&Record::Angle(trans.angle))?;
        }
        Ok(n)
    }
    /// Encode `record` onto the destination.
    /// Returns the number of bytes written.
    pub fn write_record(&mut self, record: &Record) -> GdsResult<usize> {
        let n = self.write_record_header(record)?;
        Ok(n + self.write_record_content(record)?)
    }
    /// Write the four header bytes: the total length, then the token's
    /// kind and payload-type bytes.
    fn write_record_header(&mut self, record: &Record) -> GdsResult<usize> {
        // A quick closure for GDS's "even-lengths-only allowed" strings
        let gds_strlen = |s: &str| -> usize { s.len() + s.len() % 2 };
        let (kind, len) = match record {
            // Library-Level Records
            Record::Header { .. } => (RecordKind::Header, 2),
            Record::BgnLib { dates } => (RecordKind::BgnLib, 2 * dates.len()),
            Record::LibName(s) => (RecordKind::LibName, gds_strlen(s)),
            Record::Units(..) => (RecordKind::Units, 16),
            Record::EndLib => (RecordKind::EndLib, 0),

            // Structure (Cell) Level Records
            Record::BgnStr { dates } => (RecordKind::BgnStr, 2 * dates.len()),
            Record::StrName(s) => (RecordKind::StrName, gds_strlen(s)),
            Record::Sname(s) => (RecordKind::Sname, gds_strlen(s)),
            Record::EndStr => (RecordKind::EndStr, 0),

            // Element-Level Records
            Record::Boundary => (RecordKind::Boundary, 0),
            Record::Sref => (RecordKind::Sref, 0),
            Record::Aref => (RecordKind::Aref, 0),
            Record::Text => (RecordKind::Text, 0),
            Record::Layer(_) => (RecordKind::Layer, 2),
            Record::DataType(_) => (RecordKind::DataType, 2),
            Record::Width(_) => (RecordKind::Width, 4),
            Record::Xy(d) => (RecordKind::Xy, 4 * d.len()),
            Record::EndEl => (RecordKind::EndEl, 0),

            // Element Sub-Records
            Record::ColRow { .. } => (RecordKind::ColRow, 4),
            Record::TextType(_) => (RecordKind::TextType, 2),
            Record::Presentation(..) => (RecordKind::Presentation, 2),
            Record::String(s) => (RecordKind::String, gds_strlen(s)),
            Record::Strans(..) => (RecordKind::Strans, 2),
            Record::Mag(_) => (RecordKind::Mag, 8),
            Record::Angle(_) => (RecordKind::Angle, 8),
            Record::PathType(_) => (RecordKind::PathType, 2),
            Record::ElFlags(..) => (RecordKind::ElFlags, 2),
            Record::Plex(_) => (RecordKind::Plex, 4),
            Record::PropAttr(_) => (RecordKind::PropAttr, 2),
            Record::PropValue(s) => (RecordKind::PropValue, gds_strlen(s)),

            Record::Other { rtype, .. } => {
                return Err(GdsError::Encode(format!(
                    "cannot encode unknown record kind 0x{:02X}",
                    rtype
                )))
            }
        };
        // The payload carried in memory must match the token table's
        // declared payload type
        let dtype = kind.data_type();
        if record.payload_type() != dtype {
            return Err(GdsError::Encode(format!(
                "payload of type {:?} does not fit a {} record",
                record.payload_type(),
                kind.name()
            )));
        }
        // Send the header bytes, including the four header bytes in total-length
        match u16::try_from(len + 4) {
            Ok(val) => self.dest.write_u16::<BigEndian>(val)?,
            Err(_) => return Err(GdsError::RecordLen(len)),
        };
        self.dest.write_u8(kind as u8)?;
        self.dest.write_u8(dtype as u8)?;
        Ok(4)
    }
    /// Write the payload bytes. Organized by payload type.
    fn write_record_content(&mut self, record: &Record) -> GdsResult<usize> {
        let n = match record {
            // NoData
            Record::EndLib
            | Record::EndStr
            | Record::Boundary
            | Record::Sref
            | Record::Aref
            | Record::Text
            | Record::EndEl => 0,

            // BitArrays
            Record::Presentation(d0, d1)
            | Record::Strans(d0, d1)
            | Record::ElFlags(d0, d1) => {
                self.dest.write_u8(*d0)?;
                self.dest.write_u8(*d1)?;
                2
            }
            // Single I16s
            Record::Header { version: d }
            | Record::Layer(d)
            | Record::DataType(d)
            | Record::TextType(d)
            | Record::PathType(d)
            | Record::PropAttr(d) => {
                self.dest.write_i16::<BigEndian>(*d)?;
                2
            }
            // Single I32s
            Record::Width(d) | Record::Plex(d) => {
                self.dest.write_i32::<BigEndian>(*d)?;
                4
            }
            // Single F64s
            Record::Mag(d) | Record::Angle(d) => {
                self.dest.write_u64::<BigEndian>(Gds64::encode(*d)?)?;
                8
            }
            // "Structs"
            Record::Units(d0, d1) => {
                self.dest.write_u64::<BigEndian>(Gds64::encode(*d0)?)?;
                self.dest.write_u64::<BigEndian>(Gds64::encode(*d1)?)?;
                16
            }
            Record::ColRow { cols, rows } => {
                self.dest.write_i16::<BigEndian>(*cols)?;
                self.dest.write_i16::<BigEndian>(*rows)?;
                4
            }
            // Vectors
            Record::BgnLib { dates: d } | Record::BgnStr { dates: d } => {
                for val in d.iter() {
                    self.dest.write_i16::<BigEndian>(*val)?;
                }
                2 * d.len()
            }
            Record::Xy(d) => {
                for val in d.iter() {
                    self.dest.write_i32::<BigEndian>(*val)?;
                }
                4 * d.len()
            }
            // Strings
            Record::LibName(s)
            | Record::StrName(s)
            | Record::Sname(s)
            | Record::String(s)
            | Record::PropValue(s) => {
                self.dest.write_all(s.as_bytes())?;
                let mut n = s.len();
                if s.len() % 2 != 0 {
                    // Pad odd-length strings with a zero-valued byte
                    self.dest.write_u8(0x00)?;
                    n += 1;
                }
                n
            }

            Record::Other { rtype, .. } => {
                return Err(GdsError::Encode(format!(
                    "cannot encode unknown record kind 0x{:02X}",
                    rtype
                )))
            }
        };
        Ok(n)
    }
}

/// Flatten a (first, second) date pair into the twelve `u16` fields of a
/// `BGNLIB` or `BGNSTR` payload.
fn double_date(first: &NaiveDateTime, second: &NaiveDateTime) -> Vec<i16> {
    let mut dates = date_fields(first).to_vec();
    dates.extend(date_fields(second));
    dates
}
