//!
//! # Gds Reading & Parsing
//!
//! Two layers: [GdsReader] decodes length-prefixed records from a byte
//! stream, one at a time, and [GdsParser] runs the record-level state
//! machine which assembles [Cell]s and finally resolves cross-cell
//! references once the whole stream has been consumed.
//!

// Std-Lib Imports
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

// Crates.io
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use log::{debug, info, warn};
use num_traits::FromPrimitive;

// Workspace Imports
use calmautils::ErrorHelper;

// Local Imports
use crate::data::*;
use crate::library::*;
use crate::units::DbUnit;

/// # Gds Record Header
/// Decoded contents of a record's four header bytes.
/// The `len` field holds the *payload* length, i.e. the on-disk total less four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordHeader {
    rtype: u8,
    dtype: u8,
    len: u16,
}

/// # GdsReader
///
/// Byte-level record primitives over any [Read] source.
/// Tracks the stream position for error reporting.
pub struct GdsReader<R: Read> {
    /// Byte source
    src: R,
    /// Bytes consumed so far
    pos: u64,
}
impl<R: Read> GdsReader<R> {
    /// Create a [GdsReader] over `src`
    pub fn new(src: R) -> GdsReader<R> {
        GdsReader { src, pos: 0 }
    }
    /// The stream position, in bytes consumed
    pub fn pos(&self) -> u64 {
        self.pos
    }
    /// Read the next four header bytes.
    /// Returns `None` at a clean end-of-stream, i.e. one falling on a
    /// record boundary.
    fn read_header(&mut self) -> GdsResult<Option<RecordHeader>> {
        let len = match self.src.read_u16::<BigEndian>() {
            Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
            // Total lengths below the four header bytes, i.e. negative payload
            // lengths, and odd lengths are malformed.
            Ok(num) if num < 4 => return Err(GdsError::RecordLen(num as usize)),
            Ok(num) if num % 2 != 0 => return Err(GdsError::RecordLen(num as usize)),
            Ok(num) => num,
        };
        let rtype = self.src.read_u8()?;
        let dtype = self.src.read_u8()?;
        self.pos += 4;
        Ok(Some(RecordHeader {
            rtype,
            dtype,
            len: len - 4,
        }))
    }
    /// Read `len` bytes
    fn read_bytes(&mut self, len: u16) -> GdsResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        self.src.read_exact(&mut buf)?;
        self.pos += len as u64;
        Ok(buf)
    }
    /// Read and discard `len` payload bytes
    fn skip(&mut self, len: u16) -> GdsResult<()> {
        self.read_bytes(len)?;
        Ok(())
    }
    /// Read `len/2` i16s from `len` bytes
    fn read_i16s(&mut self, len: u16) -> GdsResult<Vec<i16>> {
        let bytes = self.read_bytes(len)?;
        let mut rv = vec![0i16; bytes.len() / 2];
        BigEndian::read_i16_into(&bytes, &mut rv);
        Ok(rv)
    }
    /// Read `len/4` i32s from `len` bytes
    fn read_i32s(&mut self, len: u16) -> GdsResult<Vec<i32>> {
        let bytes = self.read_bytes(len)?;
        let mut rv = vec![0i32; bytes.len() / 4];
        BigEndian::read_i32_into(&bytes, &mut rv);
        Ok(rv)
    }
    /// Read `len/8` f64s from `len` bytes, decoding the eight-byte real
    /// format along the way
    fn read_f64s(&mut self, len: u16) -> GdsResult<Vec<f64>> {
        let mut rv = Vec::with_capacity(len as usize / 8);
        for _ in 0..len / 8 {
            let bits = self.src.read_u64::<BigEndian>()?;
            self.pos += 8;
            rv.push(Gds64::decode(bits));
        }
        Ok(rv)
    }
    /// Read `len` bytes as an ASCII string, stripping the optional
    /// padding NUL from odd-length sources
    fn read_str(&mut self, len: u16) -> GdsResult<String> {
        let mut bytes = self.read_bytes(len)?;
        if bytes.last() == Some(&0u8) {
            bytes.pop();
        }
        Ok(std::str::from_utf8(&bytes)?.to_string())
    }
    /// Decode the next record from the stream.
    /// Returns `None` at a clean end-of-stream.
    ///
    /// Record kinds outside the working set - unknown kind bytes included -
    /// have their payload skipped and arrive as [Record::Other]; it is the
    /// caller's business whether those warrant a warning or a fatal error.
    /// A working-set kind whose payload type or length disagrees with the
    /// token table is malformed data and fails here.
    pub fn next_record(&mut self) -> GdsResult<Option<Record>> {
        let RecordHeader { rtype, dtype, len } = match self.read_header()? {
            Some(h) => h,
            None => return Ok(None),
        };
        let other = Record::Other { rtype, dtype, len };
        let kind = match RecordKind::from_u8(rtype) {
            Some(k) if k.handled() => k,
            _ => {
                self.skip(len)?;
                return Ok(Some(other));
            }
        };
        let dt = match DataType::from_u8(dtype) {
            Some(dt) if dt == kind.data_type() => dt,
            _ => return Err(GdsError::RecordDecode(rtype, dtype, len)),
        };

        use DataType::{BitArray, NoData, Str, F64, I16, I32};
        let record = match (kind, dt, len) {
            // Library-Level Records
            (RecordKind::Header, I16, 2) => Record::Header {
                version: self.read_i16s(len)?[0],
            },
            (RecordKind::BgnLib, I16, 24) => Record::BgnLib {
                dates: self.read_i16s(len)?,
            },
            (RecordKind::LibName, Str, _) => Record::LibName(self.read_str(len)?),
            (RecordKind::Units, F64, 16) => {
                let v = self.read_f64s(len)?;
                Record::Units(v[0], v[1])
            }
            (RecordKind::EndLib, NoData, 0) => Record::EndLib,

            // Structure (Cell) Level Records
            (RecordKind::BgnStr, I16, 24) => Record::BgnStr {
                dates: self.read_i16s(len)?,
            },
            (RecordKind::StrName, Str, _) => Record::StrName(self.read_str(len)?),
            (RecordKind::Sname, Str, _) => Record::Sname(self.read_str(len)?),
            (RecordKind::EndStr, NoData, 0) => Record::EndStr,

            // Element-Level Records
            (RecordKind::Boundary, NoData, 0) => Record::Boundary,
            (RecordKind::Sref, NoData, 0) => Record::Sref,
            (RecordKind::Aref, NoData, 0) => Record::Aref,
            (RecordKind::Text, NoData, 0) => Record::Text,
            (RecordKind::Layer, I16, 2) => Record::Layer(self.read_i16s(len)?[0]),
            (RecordKind::DataType, I16, 2) => Record::DataType(self.read_i16s(len)?[0]),
            (RecordKind::Width, I32, 4) => Record::Width(self.read_i32s(len)?[0]),
            (RecordKind::Xy, I32, _) if len % 4 == 0 => Record::Xy(self.read_i32s(len)?),
            (RecordKind::EndEl, NoData, 0) => Record::EndEl,

            // Element Sub-Records
            (RecordKind::ColRow, I16, 4) => {
                let d = self.read_i16s(len)?;
                Record::ColRow {
                    cols: d[0],
                    rows: d[1],
                }
            }
            (RecordKind::TextType, I16, 2) => Record::TextType(self.read_i16s(len)?[0]),
            (RecordKind::Presentation, BitArray, 2) => {
                let bytes = self.read_bytes(len)?;
                Record::Presentation(bytes[0], bytes[1])
            }
            (RecordKind::String, Str, _) => Record::String(self.read_str(len)?),
            (RecordKind::Strans, BitArray, 2) => {
                let bytes = self.read_bytes(len)?;
                Record::Strans(bytes[0], bytes[1])
            }
            (RecordKind::Mag, F64, 8) => Record::Mag(self.read_f64s(len)?[0]),
            (RecordKind::Angle, F64, 8) => Record::Angle(self.read_f64s(len)?[0]),
            (RecordKind::PathType, I16, 2) => Record::PathType(self.read_i16s(len)?[0]),
            (RecordKind::ElFlags, BitArray, 2) => {
                let bytes = self.read_bytes(len)?;
                Record::ElFlags(bytes[0], bytes[1])
            }
            (RecordKind::Plex, I32, 4) => Record::Plex(self.read_i32s(len)?[0]),
            (RecordKind::PropAttr, I16, 2) => Record::PropAttr(self.read_i16s(len)?[0]),
            (RecordKind::PropValue, Str, _) => Record::PropValue(self.read_str(len)?),

            // Failing to meet any of these clauses means the payload length
            // is invalid for its record kind
            _ => return Err(GdsError::RecordDecode(rtype, dtype, len)),
        };
        Ok(Some(record))
    }
}

/// # GdsParser
///
/// The record-level state machine. Consumes records from a [GdsReader],
/// assembles [Cell]s one structure at a time, and resolves cross-cell
/// references after the stream closes.
pub struct GdsParser<R: Read> {
    /// Record source
    rdr: GdsReader<R>,
    /// Parse-context stack, for error reporting
    ctx: Vec<GdsContext>,
}
impl GdsParser<BufReader<File>> {
    /// Create a [GdsParser] reading the file at `fname`
    pub fn open(fname: impl AsRef<Path>) -> GdsResult<GdsParser<BufReader<File>>> {
        Ok(Self::new(BufReader::new(File::open(fname)?)))
    }
}
impl<R: Read> GdsParser<R> {
    /// Create a [GdsParser] over byte source `src`
    pub fn new(src: R) -> GdsParser<R> {
        GdsParser {
            rdr: GdsReader::new(src),
            ctx: Vec::new(),
        }
    }
    /// Parse a full [Library] from the stream.
    ///
    /// The stream must open with a `HEADER` record (the six-byte magic);
    /// the version it carries is reported and otherwise ignored.
    /// Unexpected records at library scope are warned over and skipped.
    /// After end-of-stream every reference is resolved to its target cell.
    pub fn parse_lib(&mut self) -> GdsResult<Library> {
        self.ctx.push(GdsContext::Library);
        let version = match self.rdr.next_record()? {
            Some(Record::Header { version }) => version,
            Some(r) => {
                return self.fail(format!(
                    "expected the HEADER magic at start-of-stream, not {}",
                    r.describe()
                ))
            }
            None => return self.fail("empty stream"),
        };
        info!("reading GDSII stream, version {}", version);

        let mut lib = Library::new();
        // Case-folded names already defined, for duplicate warnings
        let mut defined: HashSet<String> = HashSet::new();
        let mut first = true;
        let mut ended = false;
        while let Some(record) = self.rdr.next_record()? {
            if first && !matches!(record, Record::BgnLib { .. }) {
                warn!(
                    "expected BGNLIB after the stream header, found {}",
                    record.describe()
                );
            }
            first = false;
            match record {
                // Per-library dates and the library name are not retained
                Record::BgnLib { .. } => (),
                Record::LibName(_) => (),
                Record::Units(_uu, db) => {
                    let dbu = DbUnit::from_meters(db);
                    debug!("database unit of {} um", dbu.quantum().microns());
                    lib.dbunit = Some(dbu);
                }
                Record::BgnStr { .. } => {
                    let cell = self.parse_struct(lib.dbunit.unwrap_or_default())?;
                    if !defined.insert(cell.name.to_lowercase()) {
                        warn!(
                            "duplicate structure name {:?} (case-insensitive); \
                             the later definition replaces any exact-name match",
                            cell.name
                        );
                    }
                    lib.add(cell);
                }
                Record::EndLib => {
                    // Anything following ENDLIB is discarded
                    ended = true;
                    break;
                }
                other => warn!("skipping {} record at library scope", other.describe()),
            }
        }
        if !ended {
            warn!("GDSII stream ended without ENDLIB");
        }
        lib.resolve_references()?;
        self.ctx.pop();
        Ok(lib)
    }
    /// Parse one structure, up to and including its `ENDSTR`.
    /// Assumes the opening `BGNSTR` (whose timestamps are skipped) has
    /// already been consumed.
    fn parse_struct(&mut self, dbu: DbUnit) -> GdsResult<Cell> {
        self.ctx.push(GdsContext::Struct);
        let mut name: Option<String> = None;
        let mut cell = Cell::new("");
        loop {
            match self.next_required()? {
                Record::EndStr => break,
                Record::StrName(n) => {
                    check_name("structure", &n);
                    self.set_once(&mut name, n, "STRNAME")?;
                }
                Record::Boundary => cell.polys.push(self.parse_boundary(dbu)?),
                Record::Text => cell.texts.push(self.parse_text(dbu)?),
                Record::Sref => cell.refs.push(self.parse_sref(dbu)?),
                Record::Aref => cell.refs.push(self.parse_aref(dbu)?),
                other => {
                    return self.fail(format!("invalid {} record within structure", other.describe()))
                }
            }
        }
        cell.name = self.unwrap(name, "structure missing its STRNAME record")?;
        cell.dbunit = Some(dbu);
        self.ctx.pop();
        Ok(cell)
    }
    /// Parse a polygon: the sub-records of a `BOUNDARY` element, through `ENDEL`.
    fn parse_boundary(&mut self, dbu: DbUnit) -> GdsResult<Polygon> {
        self.ctx.push(GdsContext::Boundary);
        let mut layer: Option<i16> = None;
        let mut datatype: Option<i16> = None;
        let mut xy: Option<Vec<i32>> = None;
        let mut extras = Extras::default();
        loop {
            match self.next_required()? {
                Record::EndEl => break,
                Record::Layer(d) => self.set_once(&mut layer, d, "LAYER")?,
                Record::DataType(d) => self.set_once(&mut datatype, d, "DATATYPE")?,
                Record::Xy(d) => self.set_once(&mut xy, d, "XY")?,
                Record::PropAttr(_) => self.parse_property()?,
                other => self.element_extra(other, &mut extras)?,
            }
        }
        let layer = layer.unwrap_or(0);
        let datatype = datatype.unwrap_or(0);
        check_layer("BOUNDARY", layer, datatype);
        let xy = self.unwrap(xy, "BOUNDARY missing its XY record")?;
        let pairs = xy.len() / 2;
        self.assert(
            xy.len() % 2 == 0 && pairs >= 1,
            "BOUNDARY with invalid XY coordinate count",
        )?;
        // The final on-disk pair closes the polygon; drop it
        let mut points = Vec::with_capacity(pairs - 1);
        for i in 0..pairs - 1 {
            points.push(Point::new(dbu.decode(xy[2 * i]), dbu.decode(xy[2 * i + 1])));
        }
        self.ctx.pop();
        Ok(Polygon {
            layer,
            datatype,
            points,
        })
    }
    /// Parse a text label: the sub-records of a `TEXT` element, through `ENDEL`.
    fn parse_text(&mut self, dbu: DbUnit) -> GdsResult<Text> {
        self.ctx.push(GdsContext::Text);
        let mut layer: Option<i16> = None;
        let mut texttype: Option<i16> = None;
        let mut presentation: Option<(u8, u8)> = None;
        let mut width: Option<i32> = None;
        let mut strans: Option<(u8, u8)> = None;
        let mut mag: Option<f64> = None;
        let mut angle: Option<f64> = None;
        let mut xy: Option<Vec<i32>> = None;
        let mut string: Option<String> = None;
        let mut extras = Extras::default();
        loop {
            match self.next_required()? {
                Record::EndEl => break,
                Record::Layer(d) => self.set_once(&mut layer, d, "LAYER")?,
                Record::TextType(d) => self.set_once(&mut texttype, d, "TEXTTYPE")?,
                Record::Presentation(d0, d1) => {
                    self.set_once(&mut presentation, (d0, d1), "PRESENTATION")?
                }
                Record::Width(d) => self.set_once(&mut width, d, "WIDTH")?,
                Record::Strans(d0, d1) => self.set_once(&mut strans, (d0, d1), "STRANS")?,
                Record::Mag(d) => self.set_once(&mut mag, d, "MAG")?,
                Record::Angle(d) => self.set_once(&mut angle, d, "ANGLE")?,
                Record::Xy(d) => self.set_once(&mut xy, d, "XY")?,
                Record::String(d) => self.set_once(&mut string, d, "STRING")?,
                Record::PropAttr(_) => self.parse_property()?,
                other => self.element_extra(other, &mut extras)?,
            }
        }
        let layer = layer.unwrap_or(0);
        let texttype = texttype.unwrap_or(0);
        check_layer("TEXT", layer, texttype);
        let origin = self.single_point(xy, dbu, "TEXT")?;
        let (halign, valign) = self.decode_presentation(presentation);
        let width = width.unwrap_or(0);
        self.ctx.pop();
        Ok(Text {
            string: string.unwrap_or_default(),
            layer,
            texttype,
            origin,
            width: dbu.decode(width.abs()),
            // A negated width marks text that does not scale with its parents
            can_scale: width >= 0,
            halign,
            valign,
            trans: self.decode_strans(strans, mag, angle),
        })
    }
    /// Parse a single (`SREF`) reference stub, through `ENDEL`.
    fn parse_sref(&mut self, dbu: DbUnit) -> GdsResult<Reference> {
        self.ctx.push(GdsContext::Sref);
        let mut sname: Option<String> = None;
        let mut strans: Option<(u8, u8)> = None;
        let mut mag: Option<f64> = None;
        let mut angle: Option<f64> = None;
        let mut xy: Option<Vec<i32>> = None;
        let mut extras = Extras::default();
        loop {
            match self.next_required()? {
                Record::EndEl => break,
                Record::Sname(d) => self.set_once(&mut sname, d, "SNAME")?,
                Record::Strans(d0, d1) => self.set_once(&mut strans, (d0, d1), "STRANS")?,
                Record::Mag(d) => self.set_once(&mut mag, d, "MAG")?,
                Record::Angle(d) => self.set_once(&mut angle, d, "ANGLE")?,
                Record::Xy(d) => self.set_once(&mut xy, d, "XY")?,
                Record::PropAttr(_) => self.parse_property()?,
                other => self.element_extra(other, &mut extras)?,
            }
        }
        let target = self.unwrap(sname, "SREF missing its SNAME record")?;
        let origin = self.single_point(xy, dbu, "SREF")?;
        let trans = self.decode_strans(strans, mag, angle);
        self.ctx.pop();
        Ok(Reference {
            cell: None,
            target,
            origin,
            trans,
            tile: None,
        })
    }
    /// Parse an array (`AREF`) reference stub, through `ENDEL`.
    ///
    /// The three on-disk points are the array origin and the *far ends* of
    /// its column and row axes; the per-tile displacement vectors are
    /// recovered by subtraction and division.
    fn parse_aref(&mut self, dbu: DbUnit) -> GdsResult<Reference> {
        self.ctx.push(GdsContext::Aref);
        let mut sname: Option<String> = None;
        let mut strans: Option<(u8, u8)> = None;
        let mut mag: Option<f64> = None;
        let mut angle: Option<f64> = None;
        let mut colrow: Option<(i16, i16)> = None;
        let mut xy: Option<Vec<i32>> = None;
        let mut extras = Extras::default();
        loop {
            match self.next_required()? {
                Record::EndEl => break,
                Record::Sname(d) => self.set_once(&mut sname, d, "SNAME")?,
                Record::Strans(d0, d1) => self.set_once(&mut strans, (d0, d1), "STRANS")?,
                Record::Mag(d) => self.set_once(&mut mag, d, "MAG")?,
                Record::Angle(d) => self.set_once(&mut angle, d, "ANGLE")?,
                Record::ColRow { cols, rows } => {
                    self.set_once(&mut colrow, (cols, rows), "COLROW")?
                }
                Record::Xy(d) => self.set_once(&mut xy, d, "XY")?,
                Record::PropAttr(_) => self.parse_property()?,
                other => self.element_extra(other, &mut extras)?,
            }
        }
        let target = self.unwrap(sname, "AREF missing its SNAME record")?;
        let (cols, rows) = self.unwrap(colrow, "AREF missing its COLROW record")?;
        check_colrow(cols, rows);
        let xy = self.unwrap(xy, "AREF missing its XY record")?;
        self.assert(xy.len() == 6, "AREF XY must hold exactly three points")?;
        let origin = Point::new(dbu.decode(xy[0]), dbu.decode(xy[1]));
        let end_cols = Point::new(dbu.decode(xy[2]), dbu.decode(xy[3]));
        let end_rows = Point::new(dbu.decode(xy[4]), dbu.decode(xy[5]));
        // A zero axis has no spacing to recover; its delta stays the zero vector
        let dcol = match cols {
            0 => Point::default(),
            _ => Point::new(
                (end_cols.x - origin.x) / cols as f64,
                (end_cols.y - origin.y) / cols as f64,
            ),
        };
        let drow = match rows {
            0 => Point::default(),
            _ => Point::new(
                (end_rows.x - origin.x) / rows as f64,
                (end_rows.y - origin.y) / rows as f64,
            ),
        };
        let trans = self.decode_strans(strans, mag, angle);
        self.ctx.pop();
        Ok(Reference {
            cell: None,
            target,
            origin,
            trans,
            tile: Some(Tile {
                cols,
                rows,
                dcol,
                drow,
            }),
        })
    }
    /// Consume the `PROPVALUE` which must immediately follow each `PROPATTR`.
    /// Property pairs are accepted and ignored.
    fn parse_property(&mut self) -> GdsResult<()> {
        match self.next_required()? {
            Record::PropValue(_) => Ok(()),
            other => self.fail(format!(
                "PROPATTR must be followed by PROPVALUE, not {}",
                other.describe()
            )),
        }
    }
    /// Handle the accepted-but-unimplemented element sub-records
    /// (`ELFLAGS`, `PLEX`, `PATHTYPE`): warn, enforce at-most-once, and
    /// discard. Anything else within an element is fatal.
    fn element_extra(&mut self, record: Record, extras: &mut Extras) -> GdsResult<()> {
        let slot = match &record {
            Record::ElFlags(..) => &mut extras.elflags,
            Record::Plex(_) => &mut extras.plex,
            Record::PathType(_) => &mut extras.pathtype,
            other => {
                return self.fail(format!("invalid {} record within element", other.describe()))
            }
        };
        warn!("unimplemented {} record skipped", record.describe());
        self.set_once(slot, (), record.describe())
    }
    /// Decode the `STRANS` bits plus any `MAG`/`ANGLE` payloads to a [Trans].
    /// Bit 15 is x-reflection; the "absolute" magnification and angle flags
    /// are decoded but treated as relative.
    fn decode_strans(
        &self,
        strans: Option<(u8, u8)>,
        mag: Option<f64>,
        angle: Option<f64>,
    ) -> Trans {
        let reflect = match strans {
            Some((d0, d1)) => {
                if d1 & 0x04 != 0 || d1 & 0x02 != 0 {
                    debug!("absolute magnification/angle flags ignored");
                }
                d0 & 0x80 != 0
            }
            None => false,
        };
        Trans {
            reflect,
            mag: mag.unwrap_or(1.0),
            angle: angle.unwrap_or(0.0),
        }
    }
    /// Decode a `PRESENTATION` payload: the first byte is skipped, the second
    /// packs horizontal alignment in bits 0-1 and vertical in bits 2-3.
    fn decode_presentation(&self, presentation: Option<(u8, u8)>) -> (HAlign, VAlign) {
        let bits = match presentation {
            Some((_d0, d1)) => d1,
            None => return (HAlign::default(), VAlign::default()),
        };
        let halign = HAlign::from_bits(bits & 0x03).unwrap_or_else(|| {
            warn!("invalid horizontal-alignment bits in PRESENTATION");
            HAlign::default()
        });
        let valign = VAlign::from_bits((bits >> 2) & 0x03).unwrap_or_else(|| {
            warn!("invalid vertical-alignment bits in PRESENTATION");
            VAlign::default()
        });
        (halign, valign)
    }
    /// Decode a single-point `XY` payload for `element`
    fn single_point(&self, xy: Option<Vec<i32>>, dbu: DbUnit, element: &str) -> GdsResult<Point> {
        let xy = self.unwrap(xy, format!("{} missing its XY record", element))?;
        self.assert(
            xy.len() == 2,
            format!("{} XY must hold exactly one point", element),
        )?;
        Ok(Point::new(dbu.decode(xy[0]), dbu.decode(xy[1])))
    }
    /// Store `val` into `slot`, failing upon a duplicate `name` sub-record.
    fn set_once<T>(&self, slot: &mut Option<T>, val: T, name: impl Into<String>) -> GdsResult<()> {
        self.assert(
            slot.is_none(),
            format!("duplicate {} record", name.into()),
        )?;
        *slot = Some(val);
        Ok(())
    }
    /// Fetch the next record, failing on end-of-stream.
    /// Structures and elements may not be truncated.
    fn next_required(&mut self) -> GdsResult<Record> {
        match self.rdr.next_record()? {
            Some(r) => Ok(r),
            None => self.fail("unexpected end-of-stream"),
        }
    }
}
impl<R: Read> ErrorHelper for GdsParser<R> {
    type Error = GdsError;
    /// Create a fatal parse error carrying the stream position and
    /// context stack.
    fn err(&self, msg: impl Into<String>) -> GdsError {
        GdsError::Parse {
            message: msg.into(),
            pos: self.rdr.pos(),
            context: self.ctx.clone(),
        }
    }
}

/// At-most-once occurrence tracking for the accepted-but-unimplemented
/// element sub-records.
#[derive(Default)]
struct Extras {
    elflags: Option<()>,
    plex: Option<()>,
    pathtype: Option<()>,
}
