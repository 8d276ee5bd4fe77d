use super::*;

/// Specified creation date for test cases
fn test_dates() -> CellDates {
    let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 1)
        .unwrap();
    CellDates {
        created: date,
        modified: date,
    }
}
/// Encode `lib` to an in-memory byte stream
fn encode_bytes(lib: &Library) -> GdsResult<Vec<u8>> {
    let mut buf = Vec::new();
    GdsWriter::new(&mut buf).write_lib(lib, &SaveOptions::default())?;
    Ok(buf)
}
/// Decode every record in `bytes`
fn read_records(bytes: &[u8]) -> GdsResult<Vec<Record>> {
    let mut rdr = GdsReader::new(bytes);
    let mut records = Vec::new();
    while let Some(r) = rdr.next_record()? {
        records.push(r);
    }
    Ok(records)
}
/// Approximate float equality, scaled for micron-denominated lengths
fn near(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 + 1e-9 * b.abs()
}

#[test]
fn gds64_known_patterns() -> GdsResult<()> {
    // Bit-patterns from the GDSII spec's own examples
    assert_eq!(Gds64::encode(0.0)?, 0x0000000000000000);
    assert_eq!(Gds64::encode(1.0)?, 0x4110000000000000);
    assert_eq!(Gds64::encode(2.0)?, 0x4120000000000000);
    assert_eq!(Gds64::encode(-1.0)?, 0xC110000000000000);
    assert_eq!(Gds64::encode(10.0)?, 0x41A0000000000000);
    assert_eq!(Gds64::decode(0x0000000000000000), 0.0);
    assert_eq!(Gds64::decode(0x4110000000000000), 1.0);
    assert_eq!(Gds64::decode(0x4120000000000000), 2.0);
    assert_eq!(Gds64::decode(0xC110000000000000), -1.0);
    assert_eq!(Gds64::decode(0x41A0000000000000), 10.0);
    Ok(())
}
#[test]
fn gds64_clamps_tiny_values() -> GdsResult<()> {
    // Anything below 16^-65 in magnitude becomes the all-zero pattern
    assert_eq!(Gds64::encode(1e-80)?, 0);
    assert_eq!(Gds64::encode(-1e-80)?, 0);
    assert_eq!(Gds64::encode(f64::MIN_POSITIVE / 2.0)?, 0);
    Ok(())
}
#[test]
fn gds64_rejects_non_finite() {
    for val in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        match Gds64::encode(val) {
            Err(GdsError::NonFinite(_)) => (),
            _ => panic!("expected a NonFinite error for {}", val),
        }
    }
    // Magnitudes beyond the seven-bit hexadecimal exponent fail too
    match Gds64::encode(1e80) {
        Err(GdsError::FloatRange(_)) => (),
        _ => panic!("expected a FloatRange error"),
    }
}
#[test]
fn gds64_round_trips() -> GdsResult<()> {
    let vals = [
        1e-12, 2.4e-6, 1e-9, 1e-3, 0.1, 1.0, 1.5, 3.14159265, 123.456, 1e6, 9.87e11,
    ];
    for v in vals {
        for v in [v, -v] {
            let rt = Gds64::decode(Gds64::encode(v)?);
            assert_eq!(rt.signum(), v.signum());
            assert!(
                ((rt - v) / v).abs() <= 1e-13,
                "{} round-tripped to {}",
                v,
                rt
            );
        }
    }
    Ok(())
}

#[test]
fn dbunit_snaps_canonical_scales() {
    assert_eq!(DbUnit::from_meters(1e-6), DbUnit::new(Len::um(1.0)));
    assert_eq!(DbUnit::from_meters(1e-9), DbUnit::new(Len::nm(1.0)));
    assert_eq!(DbUnit::from_meters(1e-12), DbUnit::new(Len::pm(1.0)));
    // Within tolerance of a canonical unit still snaps
    assert_eq!(
        DbUnit::from_meters(1e-9 * (1.0 + 1e-12)),
        DbUnit::new(Len::nm(1.0))
    );
    // Anything else becomes an anonymous grid of exactly that step
    let odd = DbUnit::from_meters(2.4e-6);
    assert!(near(odd.quantum().microns(), 2.4));
}
#[test]
fn dbunit_round_trips_lengths() -> GdsResult<()> {
    let dbu = DbUnit::default();
    let cases = [
        (0.0, 0),
        (1.0, 1000),
        (1.25, 1250),
        (-17.5, -17_500),
        (1000.0, 1_000_000),
    ];
    for (um, expected) in cases {
        let n = dbu.encode(Len::um(um))?;
        assert_eq!(n, expected);
        // decode(encode(x)) lands exactly on the grid
        assert_eq!(dbu.decode(n), dbu.quantum() * n as f64);
    }
    Ok(())
}
#[test]
fn dbunit_rejects_off_grid_coordinates() {
    // Ten meters on a 1 nm grid overflows the 32-bit coordinate range
    match DbUnit::default().encode(Len::meters(10.0)) {
        Err(GdsError::Encode(_)) => (),
        _ => panic!("expected an Encode error"),
    }
}

#[test]
fn it_round_trips_an_empty_cell() -> GdsResult<()> {
    let mut lib = Library::new();
    lib.add(Cell::new("A"));
    let lib2 = roundtrip(&lib, &SaveOptions::default())?;

    let tops = lib2.top_cells();
    assert_eq!(tops.len(), 1);
    let cell = lib2.cell(tops["A"]);
    assert_eq!(cell.name, "A");
    assert_eq!(cell.polys.len(), 0);
    assert_eq!(cell.texts.len(), 0);
    assert_eq!(cell.refs.len(), 0);
    // Absent any preference, the one-nanometer default grid applies
    assert_eq!(cell.dbunit, Some(DbUnit::default()));
    Ok(())
}
#[test]
fn it_writes_boundary_records() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("A");
    cell.polys.push(Polygon::new(
        2,
        0,
        vec![
            Point::new(Len::ZERO, Len::ZERO),
            Point::new(Len::um(1.0), Len::ZERO),
            Point::new(Len::um(1.0), Len::um(1.0)),
            Point::new(Len::ZERO, Len::um(1.0)),
        ],
    ));
    lib.add(cell);
    let records = read_records(&encode_bytes(&lib)?)?;

    // The element arrives in exactly the order the format dictates
    let at = records
        .iter()
        .position(|r| *r == Record::Boundary)
        .expect("no BOUNDARY record");
    assert_eq!(records[at - 1], Record::StrName("A".to_string()));
    assert_eq!(records[at + 1], Record::Layer(2));
    assert_eq!(records[at + 2], Record::DataType(0));
    match &records[at + 3] {
        Record::Xy(xy) => {
            // Five coordinate pairs: four vertices plus the closing repeat
            assert_eq!(xy.len(), 10);
            assert_eq!(4 * xy.len(), 40);
            assert_eq!(*xy, vec![0, 0, 1000, 0, 1000, 1000, 0, 1000, 0, 0]);
        }
        other => panic!("expected XY, found {:?}", other),
    }
    assert_eq!(records[at + 4], Record::EndEl);
    Ok(())
}
#[test]
fn records_have_even_lengths() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("odd"); // three-byte name forces string padding
    cell.texts
        .push(Text::new("HEY", 1, 0, Point::default()));
    lib.add(cell);
    let bytes = encode_bytes(&lib)?;

    // Walk the raw stream record-by-record
    let mut at = 0;
    while at < bytes.len() {
        let len = u16::from_be_bytes([bytes[at], bytes[at + 1]]) as usize;
        assert!(len >= 4);
        assert_eq!(len % 2, 0);
        at += len;
    }
    assert_eq!(at, bytes.len());
    Ok(())
}
#[test]
fn it_writes_and_resolves_srefs() -> GdsResult<()> {
    let mut lib = Library::new();
    lib.add(Cell::new("C"));
    let mut parent = Cell::new("P");
    parent.refs.push(
        Reference::new("C", Point::new(Len::um(5.0), Len::ZERO)).with_trans(Trans {
            reflect: true,
            mag: 1.0,
            angle: 90.0,
        }),
    );
    lib.add(parent);
    let bytes = encode_bytes(&lib)?;
    let records = read_records(&bytes)?;

    // Reflection packs into bit 15 of STRANS; unit magnification is omitted
    assert!(records.contains(&Record::Strans(0x80, 0x00)));
    assert!(records.contains(&Record::Angle(90.0)));
    assert!(!records.iter().any(|r| matches!(r, Record::Mag(_))));

    let lib2 = GdsParser::new(&bytes[..]).parse_lib()?;
    let p = lib2.cell(lib2.get("P").expect("cell P"));
    assert_eq!(p.refs.len(), 1);
    let r = &p.refs[0];
    assert_eq!(r.target, "C");
    assert_eq!(r.cell, lib2.get("C"));
    assert!(r.trans.reflect);
    assert_eq!(r.trans.mag, 1.0);
    assert_eq!(r.trans.angle, 90.0);
    assert!(near(r.origin.x.microns(), 5.0));
    // C is instantiated, so P alone is top-level
    let tops = lib2.top_cells();
    assert_eq!(tops.len(), 1);
    assert!(tops.contains_key("P"));
    Ok(())
}
#[test]
fn it_writes_and_recovers_arrays() -> GdsResult<()> {
    let mut lib = Library::new();
    lib.add(Cell::new("C"));
    let mut parent = Cell::new("P");
    parent.refs.push(Reference::array(
        "C",
        Point::default(),
        3,
        2,
        Point::new(Len::um(10.0), Len::ZERO),
        Point::new(Len::ZERO, Len::um(20.0)),
    ));
    lib.add(parent);
    let bytes = encode_bytes(&lib)?;
    let records = read_records(&bytes)?;

    assert!(records.contains(&Record::Aref));
    assert!(records.contains(&Record::ColRow { cols: 3, rows: 2 }));
    // Origin, then the far ends of the column and row axes
    assert!(records.contains(&Record::Xy(vec![0, 0, 30_000, 0, 0, 40_000])));

    let lib2 = GdsParser::new(&bytes[..]).parse_lib()?;
    let p = lib2.cell(lib2.get("P").expect("cell P"));
    let tile = p.refs[0].tile.as_ref().expect("array tiling");
    assert_eq!((tile.cols, tile.rows), (3, 2));
    assert!(near(tile.dcol.x.microns(), 10.0));
    assert!(near(tile.dcol.y.microns(), 0.0));
    assert!(near(tile.drow.x.microns(), 0.0));
    assert!(near(tile.drow.y.microns(), 20.0));
    Ok(())
}
#[test]
fn it_writes_and_recovers_text() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("A");
    let mut text = Text::new("HELLO", 5, 1, Point::new(Len::um(2.0), Len::um(3.0)));
    text.width = Len::um(1.0);
    text.can_scale = false;
    cell.texts.push(text);
    lib.add(cell);
    let bytes = encode_bytes(&lib)?;
    let records = read_records(&bytes)?;

    // Non-scaling text negates its width on disk; top-left alignment is all-zero
    assert!(records.contains(&Record::Width(-1000)));
    assert!(records.contains(&Record::Presentation(0x00, 0x00)));
    assert!(records.contains(&Record::TextType(1)));
    assert!(records.contains(&Record::String("HELLO".to_string())));

    let lib2 = GdsParser::new(&bytes[..]).parse_lib()?;
    let cell = lib2.cell(lib2.get("A").expect("cell A"));
    let text = &cell.texts[0];
    assert_eq!(text.string, "HELLO");
    assert_eq!((text.layer, text.texttype), (5, 1));
    assert!(!text.can_scale);
    assert!(near(text.width.microns(), 1.0));
    assert_eq!(text.halign, HAlign::LeftEdge);
    assert_eq!(text.valign, VAlign::TopEdge);
    assert!(near(text.origin.x.microns(), 2.0));
    assert!(near(text.origin.y.microns(), 3.0));
    Ok(())
}
#[test]
fn it_packs_presentation_bits() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("A");
    let mut text = Text::new("T", 0, 0, Point::default());
    text.halign = HAlign::XCenter;
    text.valign = VAlign::BottomEdge;
    cell.texts.push(text);
    lib.add(cell);
    let bytes = encode_bytes(&lib)?;

    // Bottom (0b10) in bits 2-3, center (0b01) in bits 0-1
    assert!(read_records(&bytes)?.contains(&Record::Presentation(0x00, 0x09)));
    let lib2 = GdsParser::new(&bytes[..]).parse_lib()?;
    let text = &lib2.cell(lib2.get("A").expect("cell A")).texts[0];
    assert_eq!(text.halign, HAlign::XCenter);
    assert_eq!(text.valign, VAlign::BottomEdge);
    Ok(())
}
#[test]
fn it_reads_custom_database_units() -> GdsResult<()> {
    // Hand-build a stream whose database unit is an uncommon 2.4 um
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::LibName("L".to_string()))?;
        wr.write_record(&Record::Units(1.0, 2.4e-6))?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Boundary)?;
        wr.write_record(&Record::Layer(0))?;
        wr.write_record(&Record::DataType(0))?;
        wr.write_record(&Record::Xy(vec![0, 0, 1, 0, 1, 1, 0, 1, 0, 0]))?;
        wr.write_record(&Record::EndEl)?;
        wr.write_record(&Record::EndStr)?;
        wr.write_record(&Record::EndLib)?;
    }
    let lib = GdsParser::new(&buf[..]).parse_lib()?;
    let cell = lib.cell(lib.get("A").expect("cell A"));
    let dbu = cell.dbunit.expect("measured dbunit");
    assert!(near(dbu.quantum().microns(), 2.4));
    // Grid coordinates are integer counts of that measured unit
    let poly = &cell.polys[0];
    assert_eq!(poly.points.len(), 4);
    assert!(near(poly.points[2].x.microns(), 2.4));
    assert!(near(poly.points[2].y.microns(), 2.4));
    Ok(())
}
#[test]
fn it_skips_unknown_library_records() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
    }
    // A GENERATIONS record, which the library scope warns over and skips
    buf.extend_from_slice(&[0x00, 0x06, 0x22, 0x02, 0x00, 0x03]);
    // And an altogether unknown record kind
    buf.extend_from_slice(&[0x00, 0x06, 0x7F, 0x02, 0x00, 0x00]);
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::EndStr)?;
        wr.write_record(&Record::EndLib)?;
    }
    let lib = GdsParser::new(&buf[..]).parse_lib()?;
    assert!(lib.get("A").is_some());
    Ok(())
}
#[test]
fn it_tolerates_a_missing_endlib() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::EndStr)?;
        // No ENDLIB: end-of-stream warns, but the library still loads
    }
    let lib = GdsParser::new(&buf[..]).parse_lib()?;
    assert_eq!(lib.len(), 1);
    Ok(())
}
#[test]
fn it_accepts_property_pairs() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::Units(1e-3, 1e-9))?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Boundary)?;
        wr.write_record(&Record::Layer(1))?;
        wr.write_record(&Record::DataType(0))?;
        wr.write_record(&Record::Xy(vec![0, 0, 1, 0, 1, 1, 0, 0]))?;
        wr.write_record(&Record::PropAttr(1))?;
        wr.write_record(&Record::PropValue("metal".to_string()))?;
        wr.write_record(&Record::EndEl)?;
        wr.write_record(&Record::EndStr)?;
        wr.write_record(&Record::EndLib)?;
    }
    let lib = GdsParser::new(&buf[..]).parse_lib()?;
    assert_eq!(lib.cell(lib.get("A").expect("cell A")).polys.len(), 1);
    Ok(())
}
#[test]
fn it_rejects_unpaired_propattr() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Boundary)?;
        wr.write_record(&Record::PropAttr(1))?;
        wr.write_record(&Record::EndEl)?;
    }
    match GdsParser::new(&buf[..]).parse_lib() {
        Err(GdsError::Parse { .. }) => Ok(()),
        _ => Err("should generate a parse error".into()),
    }
}
#[test]
fn it_rejects_duplicate_subrecords() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Boundary)?;
        wr.write_record(&Record::Layer(1))?;
        wr.write_record(&Record::Layer(2))?;
    }
    match GdsParser::new(&buf[..]).parse_lib() {
        Err(GdsError::Parse { message, .. }) => {
            assert!(message.contains("duplicate"));
            Ok(())
        }
        _ => Err("should generate a parse error".into()),
    }
}
#[test]
fn it_rejects_missing_xy() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Sref)?;
        wr.write_record(&Record::Sname("C".to_string()))?;
        wr.write_record(&Record::EndEl)?;
    }
    match GdsParser::new(&buf[..]).parse_lib() {
        Err(GdsError::Parse { message, .. }) => {
            assert!(message.contains("XY"));
            Ok(())
        }
        _ => Err("should generate a parse error".into()),
    }
}
#[test]
fn it_rejects_elements_outside_the_working_set() -> GdsResult<()> {
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
    }
    // A PATH element header: fatal within a structure
    buf.extend_from_slice(&[0x00, 0x04, 0x09, 0x00]);
    match GdsParser::new(&buf[..]).parse_lib() {
        Err(GdsError::Parse { message, .. }) => {
            assert!(message.contains("PATH"));
            Ok(())
        }
        _ => Err("should generate a parse error".into()),
    }
}
#[test]
fn it_warns_over_unimplemented_subrecords() -> GdsResult<()> {
    // ELFLAGS and PLEX are accepted once apiece, warned, and skipped
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Boundary)?;
        wr.write_record(&Record::ElFlags(0, 0))?;
        wr.write_record(&Record::Plex(1))?;
        wr.write_record(&Record::Layer(1))?;
        wr.write_record(&Record::DataType(0))?;
        wr.write_record(&Record::Xy(vec![0, 0, 1, 0, 1, 1, 0, 0]))?;
        wr.write_record(&Record::EndEl)?;
        wr.write_record(&Record::EndStr)?;
        wr.write_record(&Record::EndLib)?;
    }
    let lib = GdsParser::new(&buf[..]).parse_lib()?;
    assert_eq!(lib.cell(lib.get("A").expect("cell A")).polys.len(), 1);

    // A second ELFLAGS within one element is fatal
    let mut buf = Vec::new();
    {
        let mut wr = GdsWriter::new(&mut buf);
        wr.write_record(&Record::Header { version: 600 })?;
        wr.write_record(&Record::BgnLib {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::BgnStr {
            dates: vec![0; 12],
        })?;
        wr.write_record(&Record::StrName("A".to_string()))?;
        wr.write_record(&Record::Boundary)?;
        wr.write_record(&Record::ElFlags(0, 0))?;
        wr.write_record(&Record::ElFlags(0, 0))?;
    }
    match GdsParser::new(&buf[..]).parse_lib() {
        Err(GdsError::Parse { .. }) => Ok(()),
        _ => Err("should generate a parse error".into()),
    }
}
#[test]
fn it_orders_cells_dependencies_first() -> GdsResult<()> {
    let mut lib = Library::new();
    // Parent added first; its child must still land on disk first
    let mut parent = Cell::new("P");
    parent.refs.push(Reference::new("C", Point::default()));
    lib.add(parent);
    lib.add(Cell::new("C"));
    let records = read_records(&encode_bytes(&lib)?)?;

    let names: Vec<&String> = records
        .iter()
        .filter_map(|r| match r {
            Record::StrName(n) => Some(n),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["C", "P"]);
    Ok(())
}
#[test]
fn it_writes_both_case_colliding_cells() -> GdsResult<()> {
    let mut lib = Library::new();
    lib.add(Cell::new("Foo"));
    lib.add(Cell::new("foo"));
    let records = read_records(&encode_bytes(&lib)?)?;
    // The collision warns, but both bodies are written
    let n_structs = records
        .iter()
        .filter(|r| matches!(r, Record::BgnStr { .. }))
        .count();
    assert_eq!(n_structs, 2);
    Ok(())
}
#[test]
fn it_rejects_reference_cycles() -> GdsResult<()> {
    let mut lib = Library::new();
    let a = lib.add(Cell::new("A"));
    let b = lib.add(Cell::new("B"));
    lib.cell_mut(a).refs.push(Reference::new("B", Point::default()));
    lib.cell_mut(b).refs.push(Reference::new("A", Point::default()));
    match encode_bytes(&lib) {
        Err(GdsError::Cycle(_)) => Ok(()),
        _ => Err("should generate a cycle error".into()),
    }
}
#[test]
fn it_rejects_unresolved_references() -> GdsResult<()> {
    let mut lib = Library::new();
    let a = lib.add(Cell::new("A"));
    lib.cell_mut(a)
        .refs
        .push(Reference::new("GHOST", Point::default()));
    match encode_bytes(&lib) {
        Err(GdsError::Unresolved { cell, target }) => {
            assert_eq!(cell, "A");
            assert_eq!(target, "GHOST");
            Ok(())
        }
        _ => Err("should generate an unresolved-reference error".into()),
    }
}
#[test]
fn it_rejects_disagreeing_units() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut a = Cell::new("A");
    a.dbunit = Some(DbUnit::new(Len::nm(1.0)));
    let mut b = Cell::new("B");
    b.dbunit = Some(DbUnit::new(Len::um(1.0)));
    lib.add(a);
    lib.add(b);
    match encode_bytes(&lib) {
        Err(GdsError::Encode(message)) => {
            assert!(message.contains("disagree"));
            Ok(())
        }
        _ => Err("should generate an encode error".into()),
    }
}
#[test]
/// Test too-long record length (>16K) generates an error
fn record_too_long() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("big");
    cell.polys
        .push(Polygon::new(0, 0, vec![Point::default(); 10_000]));
    lib.add(cell);
    match encode_bytes(&lib) {
        Err(GdsError::RecordLen(_)) => Ok(()),
        Ok(_) | Err(_) => Err("should generate a RecordLen error".into()),
    }
}
#[test]
fn it_preserves_creation_dates() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("A");
    cell.dates = test_dates();
    lib.add(cell);
    let records = read_records(&encode_bytes(&lib)?)?;
    let dates = records
        .iter()
        .find_map(|r| match r {
            Record::BgnStr { dates } => Some(dates),
            _ => None,
        })
        .expect("no BGNSTR record");
    // Creation fields come through as-given; modification becomes "now"
    assert_eq!(&dates[0..6], &[1970, 1, 1, 0, 0, 1]);
    assert!(dates[6] >= 2026);
    Ok(())
}
#[test]
fn it_counts_stats() {
    let mut lib = Library::new();
    lib.add(Cell::new("C"));
    let mut cell = Cell::new("A");
    cell.polys.push(Polygon::new(0, 0, vec![Point::default(); 3]));
    cell.texts.push(Text::new("T", 0, 0, Point::default()));
    cell.refs.push(Reference::new("C", Point::default()));
    cell.refs.push(Reference::array(
        "C",
        Point::default(),
        2,
        2,
        Point::new(Len::um(1.0), Len::ZERO),
        Point::new(Len::ZERO, Len::um(1.0)),
    ));
    lib.add(cell);
    assert_eq!(
        lib.stats(),
        Stats {
            cells: 2,
            polygons: 1,
            texts: 1,
            srefs: 1,
            arefs: 1,
        }
    );
}
#[test]
fn it_serializes_to_json() -> GdsResult<()> {
    let mut lib = Library::new();
    let mut cell = Cell::new("A");
    cell.dates = test_dates();
    cell.polys.push(Polygon::new(
        1,
        0,
        vec![
            Point::default(),
            Point::new(Len::um(1.0), Len::ZERO),
            Point::new(Len::um(1.0), Len::um(1.0)),
        ],
    ));
    lib.add(cell);
    let json = serde_json::to_string(&lib).expect("serialization");
    let lib2: Library = serde_json::from_str(&json).expect("deserialization");
    assert_eq!(lib2.stats(), lib.stats());
    assert_eq!(
        lib2.cell(lib2.get("A").expect("cell A")),
        lib.cell(lib.get("A").expect("cell A"))
    );
    Ok(())
}
