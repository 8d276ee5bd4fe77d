//!
//! # Calma Integrated-Circuit Layout Parser & Writer
//!
//! GDSII is the IC industry's de facto standard for storing and sharing
//! layout data. Calma (named for the format's originator) reads and writes
//! GDSII streams to and from a compact, unit-aware cell graph.
//!
//! Layout data passes through three forms:
//!
//! * A [Library] of layout cells. Each [Cell] holds polygons, text labels,
//!   and references (single instances and rectangular arrays) to other cells.
//!   Cells live in an arena keyed by [CellKey]; references store the key of
//!   their target plus its structure name, so the graph stays acyclic in
//!   ownership terms even as cells reference one another freely.
//!   Spatial data is carried as physical lengths ([Len]), converted to and
//!   from the stream's integer grid by the library's database unit ([DbUnit]).
//! * For storage on disk, cells are flattened to sequences of [Record]s -
//!   length-prefixed, type-tagged units which are the atoms of the stream.
//!   The writer emits cells dependency-first, so every structure is defined
//!   before anything that instantiates it; the reader accepts forward
//!   references and resolves all of them in a pass after end-of-stream.
//! * Records are stored on disk in big-endian binary form, including the
//!   format's home-grown "excess-64" floating-point representation ([Gds64]).
//!   Raw bytes are never stored, only generated and consumed on their way
//!   into and out of [Read](std::io::Read) and [Write](std::io::Write)
//!   objects.
//!
//! ## Usage
//!
//! Creating a [Library], and adding a [Cell] definition:
//!
//! ```
//! use calma::{Cell, Library};
//! let mut lib = Library::new();
//! lib.add(Cell::new("mycell"));
//! ```
//!
//! Loading a [Library] from disk, and fetching its top-level cells:
//!
//! ```skip
//! let lib = Library::load("sample.gds")?;
//! let tops = lib.top_cells();
//! ```
//!
//! Saving a [Library] to disk:
//!
//! ```skip
//! lib.save("mylib.gds", &SaveOptions::default())?;
//! ```
//!

pub mod data;
pub use data::*;

pub mod units;
pub use units::*;

pub mod library;
pub use library::*;

pub mod read;
pub use read::{GdsParser, GdsReader};

pub mod write;
pub use write::{GdsWriter, SaveOptions, SaveOptionsBuilder};

/// Write `lib` to an in-memory stream and read it back.
/// The helper behind most of the crate's round-trip tests.
#[cfg(any(test, feature = "selftest"))]
pub fn roundtrip(lib: &Library, opts: &SaveOptions) -> GdsResult<Library> {
    use std::io::{BufReader, Seek, SeekFrom};
    // Write to a temporary file
    let mut file = tempfile::tempfile()?;
    GdsWriter::new(&mut file).write_lib(lib, opts)?;
    // Rewind to the file-start, and read it back
    file.seek(SeekFrom::Start(0))?;
    GdsParser::new(BufReader::new(file)).parse_lib()
}

#[cfg(test)]
mod tests;
