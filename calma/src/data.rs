//!
//! # Calma Wire-Level Data Model
//!
//! The building blocks of the GDSII record stream:
//! record kinds and payload types, the typed [Record] enumeration,
//! the GDSII "excess-64" floating-point codec ([Gds64]),
//! dates, and the crate-wide error types.
//!

// Std-Lib Imports
use std::error::Error;
use std::fmt;

// Crates.io
use chrono::{Datelike, NaiveDateTime, SubsecRound, Timelike, Utc};
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

///
/// # Gds Record Kinds
///
/// The high byte of each record token, in the numeric order specified by
/// GDSII, for automatic [FromPrimitive](num_traits::FromPrimitive) conversions.
/// The full historical set is enumerated so that warnings and errors can name
/// whatever shows up on disk; only the subset for which
/// [`RecordKind::handled`] returns `true` is decoded into typed [Record]s.
///
#[derive(FromPrimitive, Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum RecordKind {
    Header = 0x00,
    BgnLib,
    LibName,
    Units,
    EndLib,
    BgnStr,
    StrName, // STRNAME
    EndStr,
    Boundary,
    Path,
    Sref,
    Aref,
    Text,
    Layer,
    DataType,
    Width,
    Xy,
    EndEl,
    Sname, // SNAME
    ColRow,
    TextNode, // "Not currently used"
    Node,
    TextType,
    Presentation,
    Spacing, // "Discontinued"
    String,
    Strans,
    Mag,
    Angle,
    Uinteger, // "No longer used"
    Ustring,  // "No longer used"
    RefLibs,
    Fonts,
    PathType,
    Generations,
    AttrTable,
    StypTable, // "Unreleased Feature"
    StrType,   // "Unreleased Feature"
    ElFlags,
    ElKey,    // "Unreleased Feature"
    LinkType, // "Unreleased Feature"
    LinkKeys, // "Unreleased Feature"
    NodeType,
    PropAttr,
    PropValue,
    Box,
    BoxType,
    Plex,
    BgnExtn, // "Only occurs in CustomPlus"
    EndExtn, // "Only occurs in CustomPlus"
    TapeNum,
    TapeCode,
    StrClass, // "Only for Calma internal use"
    Reserved, // "Reserved for future use"
    Format,
    Mask,
    EndMasks,
    LibDirSize,
    SrfName,
    LibSecur,
}
impl RecordKind {
    /// The GDSII-standard token name, used in warnings and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Header => "HEADER",
            Self::BgnLib => "BGNLIB",
            Self::LibName => "LIBNAME",
            Self::Units => "UNITS",
            Self::EndLib => "ENDLIB",
            Self::BgnStr => "BGNSTR",
            Self::StrName => "STRNAME",
            Self::EndStr => "ENDSTR",
            Self::Boundary => "BOUNDARY",
            Self::Path => "PATH",
            Self::Sref => "SREF",
            Self::Aref => "AREF",
            Self::Text => "TEXT",
            Self::Layer => "LAYER",
            Self::DataType => "DATATYPE",
            Self::Width => "WIDTH",
            Self::Xy => "XY",
            Self::EndEl => "ENDEL",
            Self::Sname => "SNAME",
            Self::ColRow => "COLROW",
            Self::TextNode => "TEXTNODE",
            Self::Node => "NODE",
            Self::TextType => "TEXTTYPE",
            Self::Presentation => "PRESENTATION",
            Self::Spacing => "SPACING",
            Self::String => "STRING",
            Self::Strans => "STRANS",
            Self::Mag => "MAG",
            Self::Angle => "ANGLE",
            Self::Uinteger => "UINTEGER",
            Self::Ustring => "USTRING",
            Self::RefLibs => "REFLIBS",
            Self::Fonts => "FONTS",
            Self::PathType => "PATHTYPE",
            Self::Generations => "GENERATIONS",
            Self::AttrTable => "ATTRTABLE",
            Self::StypTable => "STYPTABLE",
            Self::StrType => "STRTYPE",
            Self::ElFlags => "ELFLAGS",
            Self::ElKey => "ELKEY",
            Self::LinkType => "LINKTYPE",
            Self::LinkKeys => "LINKKEYS",
            Self::NodeType => "NODETYPE",
            Self::PropAttr => "PROPATTR",
            Self::PropValue => "PROPVALUE",
            Self::Box => "BOX",
            Self::BoxType => "BOXTYPE",
            Self::Plex => "PLEX",
            Self::BgnExtn => "BGNEXTN",
            Self::EndExtn => "ENDEXTN",
            Self::TapeNum => "TAPENUM",
            Self::TapeCode => "TAPECODE",
            Self::StrClass => "STRCLASS",
            Self::Reserved => "RESERVED",
            Self::Format => "FORMAT",
            Self::Mask => "MASK",
            Self::EndMasks => "ENDMASKS",
            Self::LibDirSize => "LIBDIRSIZE",
            Self::SrfName => "SRFNAME",
            Self::LibSecur => "LIBSECUR",
        }
    }
    /// The payload type this record kind carries on disk.
    /// Together with [`RecordKind::name`] this forms the static token table.
    pub fn data_type(&self) -> DataType {
        use DataType::{BitArray, NoData, Str, F64, I16, I32};
        match self {
            Self::Header | Self::BgnLib | Self::BgnStr => I16,
            Self::LibName | Self::StrName | Self::Sname | Self::String => Str,
            Self::Units | Self::Mag | Self::Angle => F64,
            Self::EndLib
            | Self::EndStr
            | Self::Boundary
            | Self::Path
            | Self::Sref
            | Self::Aref
            | Self::Text
            | Self::EndEl
            | Self::TextNode
            | Self::Node
            | Self::Box
            | Self::EndMasks => NoData,
            Self::Layer
            | Self::DataType
            | Self::ColRow
            | Self::TextType
            | Self::Spacing
            | Self::Uinteger
            | Self::PathType
            | Self::Generations
            | Self::NodeType
            | Self::PropAttr
            | Self::BoxType
            | Self::TapeNum
            | Self::TapeCode
            | Self::Reserved
            | Self::Format
            | Self::LibDirSize
            | Self::LibSecur => I16,
            Self::Width | Self::Xy | Self::Plex | Self::BgnExtn | Self::EndExtn | Self::ElKey
            | Self::LinkKeys => I32,
            Self::Presentation | Self::Strans | Self::ElFlags | Self::StrClass => BitArray,
            Self::Ustring
            | Self::RefLibs
            | Self::Fonts
            | Self::AttrTable
            | Self::StypTable
            | Self::StrType
            | Self::LinkType
            | Self::PropValue
            | Self::Mask
            | Self::SrfName => Str,
        }
    }
    /// Boolean indication of whether this kind decodes to a typed [Record].
    /// Everything else is skipped over and surfaced as [Record::Other],
    /// leaving the enclosing parse state to warn or fail as its context requires.
    pub fn handled(&self) -> bool {
        matches!(
            self,
            Self::Header
                | Self::BgnLib
                | Self::LibName
                | Self::Units
                | Self::EndLib
                | Self::BgnStr
                | Self::StrName
                | Self::EndStr
                | Self::Boundary
                | Self::Sref
                | Self::Aref
                | Self::Text
                | Self::Layer
                | Self::DataType
                | Self::Width
                | Self::Xy
                | Self::EndEl
                | Self::Sname
                | Self::ColRow
                | Self::TextType
                | Self::Presentation
                | Self::String
                | Self::Strans
                | Self::Mag
                | Self::Angle
                | Self::PathType
                | Self::ElFlags
                | Self::Plex
                | Self::PropAttr
                | Self::PropValue
        )
    }
}

/// # Gds Payload-Type Enumeration
///
/// The low byte of each record token, in order as decoded from binary data.
#[derive(FromPrimitive, Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum DataType {
    NoData = 0,
    BitArray = 1,
    I16 = 2,
    I32 = 3,
    F32 = 4,
    F64 = 5,
    Str = 6,
}

///
/// # Gds Record Enumeration
///
/// Typed form of each record the codec reads and writes, in relatively "raw"
/// terms: payloads are converted to native types but not interpreted.
/// Record kinds outside the working set arrive as [Record::Other], with their
/// payload already skipped over; whether that warrants a warning or a fatal
/// error depends on the parse context.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Header { version: i16 },
    BgnLib { dates: Vec<i16> },
    LibName(String),
    Units(f64, f64),
    EndLib,
    BgnStr { dates: Vec<i16> },
    StrName(String),
    EndStr,
    Boundary,
    Sref,
    Aref,
    Text,
    Layer(i16),
    DataType(i16),
    Width(i32),
    Xy(Vec<i32>),
    EndEl,
    Sname(String),
    ColRow { cols: i16, rows: i16 },
    TextType(i16),
    Presentation(u8, u8),
    String(String),
    Strans(u8, u8),
    Mag(f64),
    Angle(f64),
    PathType(i16),
    ElFlags(u8, u8),
    Plex(i32),
    PropAttr(i16),
    PropValue(String),
    /// Recognized-but-unhandled or altogether unknown record, payload skipped.
    Other { rtype: u8, dtype: u8, len: u16 },
}
impl Record {
    /// The [RecordKind] of this record. `None` for [Record::Other] carrying an
    /// unknown kind byte.
    pub fn kind(&self) -> Option<RecordKind> {
        use num_traits::FromPrimitive;
        match self {
            Record::Header { .. } => Some(RecordKind::Header),
            Record::BgnLib { .. } => Some(RecordKind::BgnLib),
            Record::LibName(_) => Some(RecordKind::LibName),
            Record::Units(..) => Some(RecordKind::Units),
            Record::EndLib => Some(RecordKind::EndLib),
            Record::BgnStr { .. } => Some(RecordKind::BgnStr),
            Record::StrName(_) => Some(RecordKind::StrName),
            Record::EndStr => Some(RecordKind::EndStr),
            Record::Boundary => Some(RecordKind::Boundary),
            Record::Sref => Some(RecordKind::Sref),
            Record::Aref => Some(RecordKind::Aref),
            Record::Text => Some(RecordKind::Text),
            Record::Layer(_) => Some(RecordKind::Layer),
            Record::DataType(_) => Some(RecordKind::DataType),
            Record::Width(_) => Some(RecordKind::Width),
            Record::Xy(_) => Some(RecordKind::Xy),
            Record::EndEl => Some(RecordKind::EndEl),
            Record::Sname(_) => Some(RecordKind::Sname),
            Record::ColRow { .. } => Some(RecordKind::ColRow),
            Record::TextType(_) => Some(RecordKind::TextType),
            Record::Presentation(..) => Some(RecordKind::Presentation),
            Record::String(_) => Some(RecordKind::String),
            Record::Strans(..) => Some(RecordKind::Strans),
            Record::Mag(_) => Some(RecordKind::Mag),
            Record::Angle(_) => Some(RecordKind::Angle),
            Record::PathType(_) => Some(RecordKind::PathType),
            Record::ElFlags(..) => Some(RecordKind::ElFlags),
            Record::Plex(_) => Some(RecordKind::Plex),
            Record::PropAttr(_) => Some(RecordKind::PropAttr),
            Record::PropValue(_) => Some(RecordKind::PropValue),
            Record::Other { rtype, .. } => RecordKind::from_u8(*rtype),
        }
    }
    /// Human-readable description for warnings and errors:
    /// the GDSII token name where known, the raw token word otherwise.
    pub fn describe(&self) -> String {
        match self.kind() {
            Some(kind) => kind.name().to_string(),
            None => match self {
                Record::Other { rtype, dtype, .. } => format!("0x{:02X}{:02X}", rtype, dtype),
                _ => "?".to_string(),
            },
        }
    }
    /// The payload type of this record's in-memory content.
    /// Checked against the token table when writing.
    pub fn payload_type(&self) -> DataType {
        use DataType::{BitArray, NoData, Str, F64, I16, I32};
        match self {
            Record::Header { .. }
            | Record::BgnLib { .. }
            | Record::BgnStr { .. }
            | Record::Layer(_)
            | Record::DataType(_)
            | Record::ColRow { .. }
            | Record::TextType(_)
            | Record::PathType(_)
            | Record::PropAttr(_) => I16,
            Record::Width(_) | Record::Xy(_) | Record::Plex(_) => I32,
            Record::Units(..) | Record::Mag(_) | Record::Angle(_) => F64,
            Record::LibName(_)
            | Record::StrName(_)
            | Record::Sname(_)
            | Record::String(_)
            | Record::PropValue(_) => Str,
            Record::Presentation(..) | Record::Strans(..) | Record::ElFlags(..) => BitArray,
            Record::EndLib
            | Record::EndStr
            | Record::Boundary
            | Record::Sref
            | Record::Aref
            | Record::Text
            | Record::EndEl => NoData,
            Record::Other { dtype, .. } => {
                use num_traits::FromPrimitive;
                DataType::from_u8(*dtype).unwrap_or(DataType::NoData)
            }
        }
    }
}

///
/// # GDSII's Home-Grown Floating-Point Format
///
/// GDSII predates IEEE754 and encodes its reals in an "excess-64" base-16
/// format: one sign bit, a seven-bit excess-64 hexadecimal exponent, and a
/// 56-bit base-16 significand, stored left-justified and *not* normalized
/// to a hidden bit. The all-zero pattern denotes zero.
///
/// [Gds64] is not used as a data-store, but as a namespace for the `encode`
/// and `decode` conversions to and from IEEE754 double-precision format.
/// Values are handled as host-order `u64` bit-patterns; the big-endian
/// byte-swap happens at the stream I/O boundary.
///
pub struct Gds64;
impl Gds64 {
    /// Encode `val` into the GDSII eight-byte real format, as a `u64`.
    /// Fails for non-finite inputs and for magnitudes beyond the seven-bit
    /// hexadecimal exponent range.
    pub fn encode(val: f64) -> GdsResult<u64> {
        if !val.is_finite() {
            return Err(GdsError::NonFinite(val));
        }
        let bits = val.to_bits();
        let sign = bits & 0x8000_0000_0000_0000;
        let mut exp = ((bits >> 52) & 0x7FF) as i32;
        if exp <= 762 {
            // Smaller in magnitude than 16^-65: clamps to the all-zero pattern.
            // Also catches true zeroes and all subnormals.
            return Ok(0);
        }
        // Restore the hidden bit
        let mut mantissa = (bits & 0x000F_FFFF_FFFF_FFFF) | (1 << 52);
        // Nibble-align: the hexadecimal exponent advances in steps of four
        // binary orders, so shift the significand down until the binary
        // exponent lands on a step boundary.
        while (exp - 766) % 4 != 0 {
            mantissa >>= 1;
            exp += 1;
        }
        let exp16 = (exp - 766) >> 2;
        if exp16 > 0x7F {
            return Err(GdsError::FloatRange(val));
        }
        Ok(sign | (exp16 as u64) << 56 | (mantissa << 3) & 0x00FF_FFFF_FFFF_FFFF)
    }
    /// Decode the GDSII eight-byte real bit-pattern `bits` to an `f64`.
    pub fn decode(bits: u64) -> f64 {
        let sign = bits & 0x8000_0000_0000_0000;
        let mantissa = bits & 0x00FF_FFFF_FFFF_FFFF;
        if mantissa == 0 {
            return f64::from_bits(sign); // The all-zero (and negated-zero) patterns
        }
        let exp16 = ((bits >> 56) & 0x7F) as i64;
        let mut exp = exp16 * 4 + 767;
        let mut mantissa = mantissa >> 4;
        // Normalize into IEEE hidden-bit position
        while mantissa & (1 << 52) == 0 {
            mantissa <<= 1;
            exp -= 1;
            if exp <= 0 {
                // Underflows the IEEE normal range
                return f64::from_bits(sign);
            }
        }
        f64::from_bits(sign | (exp as u64) << 52 | (mantissa & 0x000F_FFFF_FFFF_FFFF))
    }
}

/// # Cell Creation & Modification Times
///
/// Written into `BGNSTR` records, creation first.
/// Per the stream-format's semantics the modification time is replaced with
/// "now" at write time; neither is retained when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellDates {
    /// Creation Date & Time
    pub created: NaiveDateTime,
    /// Last Modification Date & Time
    pub modified: NaiveDateTime,
}
impl Default for CellDates {
    /// Default dates & times: what better time than now!
    fn default() -> Self {
        let now = gds_now();
        Self {
            created: now,
            modified: now,
        }
    }
}

/// Current UTC time, rounded to the whole seconds GDSII dates can hold.
pub fn gds_now() -> NaiveDateTime {
    Utc::now().naive_utc().round_subsecs(0)
}

/// Flatten `dt` into the six `u16` fields (Y/M/D/h/m/s) of an on-disk date.
pub(crate) fn date_fields(dt: &NaiveDateTime) -> [i16; 6] {
    [
        dt.year() as i16,
        dt.month() as i16,
        dt.day() as i16,
        dt.hour() as i16,
        dt.minute() as i16,
        dt.second() as i16,
    ]
}

/// Enumeration of the contexts in which a record can be parsed,
/// carried in fatal parse errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GdsContext {
    Library,
    Struct,
    Boundary,
    Text,
    Sref,
    Aref,
}

/// # GdsResult Type-Alias
pub type GdsResult<T> = Result<T, GdsError>;

///
/// # Gds Error Enumeration
///
/// Fatal failures only; the recoverable conditions the format tolerates are
/// reported through [log::warn] and parsing continues.
///
#[derive(Debug)]
pub enum GdsError {
    /// Invalid binary-to-record conversion: token word and payload length
    RecordDecode(u8, u8, u16),
    /// Invalid record length
    RecordLen(usize),
    /// Fatal parse error, with stream position and context stack
    Parse {
        message: String,
        pos: u64,
        context: Vec<GdsContext>,
    },
    /// Non-finite value offered to the eight-byte real format
    NonFinite(f64),
    /// Magnitude beyond the eight-byte real exponent range
    FloatRange(f64),
    /// Fatal encode error
    Encode(String),
    /// Reference to a structure absent from the library
    Unresolved { cell: String, target: String },
    /// Dependency cycle through the named cell
    Cycle(String),
    /// Boxed (External) Errors
    Boxed(Box<dyn Error + Send + Sync>),
    /// Other errors
    Str(String),
}
impl fmt::Display for GdsError {
    /// Display a [GdsError].
    /// Functionally delegates to the (derived) [fmt::Debug] implementation.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl Error for GdsError {}
impl From<std::io::Error> for GdsError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<std::str::Utf8Error> for GdsError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<String> for GdsError {
    fn from(e: String) -> Self {
        GdsError::Str(e)
    }
}
impl From<&str> for GdsError {
    fn from(e: &str) -> Self {
        GdsError::Str(e.to_string())
    }
}
