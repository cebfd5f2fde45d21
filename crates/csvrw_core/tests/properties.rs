//! Property tests for the read/write engines.

use csvrw_core::{CsvReader, CsvWriter, ReadFlags, ReadOutcome, WriteFlags};
use proptest::prelude::*;
use std::io::Cursor;

type Record = Vec<Vec<u8>>;

fn field() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..12),
        proptest::collection::vec(
            prop_oneof![
                Just(b'"'),
                Just(b','),
                Just(b';'),
                Just(b'\n'),
                Just(b'\r'),
                Just(b' '),
                Just(b'x'),
            ],
            0..6
        ),
    ]
}

fn records() -> impl Strategy<Value = Vec<Record>> {
    proptest::collection::vec(proptest::collection::vec(field(), 0..5), 0..12)
}

fn delimiter() -> impl Strategy<Value = (&'static str, char)> {
    prop_oneof![
        Just((",", ',')),
        Just((";", ';')),
        Just((" , ", ',')),
        Just(("\t", '\t')),
    ]
}

fn terminator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\n"), Just("\r\n"), Just(" \r\n "), Just("\r")]
}

fn write_all(
    records: &[Record],
    delimiter: &str,
    terminator: &str,
    process_empty: bool,
    bom: bool,
    buffer: usize,
) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = CsvWriter::new();
        writer.set_delimiter(delimiter).unwrap();
        writer.set_terminator(terminator).unwrap();
        writer.resize_buffer(buffer).unwrap();
        writer
            .associate(
                &mut out,
                WriteFlags::none().process_empty_records(process_empty),
            )
            .unwrap();
        if bom {
            writer.write_utf8_bom().unwrap();
        }
        for record in records {
            writer.write_record(record, true).unwrap();
        }
        writer.close().unwrap();
    }
    out
}

fn read_all(bytes: &[u8], delimiter: char, flags: ReadFlags, buffer: usize) -> Vec<Record> {
    let mut source = Cursor::new(bytes.to_vec());
    let mut reader = CsvReader::new();
    reader.set_delimiter(delimiter).unwrap();
    reader.resize_buffer(buffer).unwrap();
    reader.associate(&mut source, flags).unwrap();
    let mut out = Vec::new();
    while reader.read_record().unwrap() == ReadOutcome::Record {
        out.push(reader.fields().to_vec());
    }
    assert!(reader.is_eof());
    assert_eq!(reader.end_record_num(), Some(out.len() as u64));
    assert!(!reader.end_record_not_terminated());
    out
}

fn expected(records: &[Record], process_empty: bool) -> Vec<Record> {
    records
        .iter()
        .filter(|r| process_empty || !r.is_empty())
        .cloned()
        .collect()
}

proptest! {
    #[test]
    fn round_trip(
        records in records(),
        (write_delim, read_delim) in delimiter(),
        terminator in terminator(),
        process_empty in any::<bool>(),
        strict in any::<bool>(),
    ) {
        let bytes = write_all(&records, write_delim, terminator, process_empty, false, 4096);
        let flags = ReadFlags::none()
            .strict_mode(strict)
            .process_empty_records(process_empty);
        prop_assert_eq!(read_all(&bytes, read_delim, flags, 4096), expected(&records, process_empty));
    }

    #[test]
    fn buffer_size_independence(
        records in records(),
        write_buffer in 1usize..64,
        read_buffer in 1usize..64,
    ) {
        let reference = write_all(&records, ",", "\n", true, false, 4096);
        let bytes = write_all(&records, ",", "\n", true, false, write_buffer);
        prop_assert_eq!(&bytes, &reference);

        let flags = ReadFlags::none().strict_mode(true).process_empty_records(true);
        prop_assert_eq!(
            read_all(&bytes, ',', flags, read_buffer),
            read_all(&bytes, ',', flags, 4096)
        );
    }

    #[test]
    fn bom_is_transparent(records in records(), buffer in 1usize..16) {
        let plain = write_all(&records, ",", "\r\n", false, false, 4096);
        let marked = write_all(&records, ",", "\r\n", false, true, 4096);
        prop_assert_eq!(marked.len(), plain.len() + 3);

        let flags = ReadFlags::none().strict_mode(true);
        prop_assert_eq!(
            read_all(&marked, ',', flags, buffer),
            read_all(&plain, ',', flags, buffer)
        );
    }

    #[test]
    fn random_access_matches_sequential(
        records in records(),
        order in proptest::collection::vec(
            (any::<prop::sample::Index>(), proptest::option::of(1usize..48)),
            0..24
        ),
        buffer in 1usize..32,
        process_empty in any::<bool>(),
    ) {
        let bytes = write_all(&records, ",", "\n", process_empty, false, 4096);
        let flags = ReadFlags::none().process_empty_records(process_empty);
        let sequential = read_all(&bytes, ',', flags, 4096);
        let count = sequential.len() as u64;

        let mut source = Cursor::new(bytes.clone());
        let mut reader = CsvReader::new();
        reader.resize_buffer(buffer).unwrap();
        reader.associate(&mut source, flags).unwrap();
        for (pick, resize) in &order {
            if count == 0 {
                break;
            }
            // Resizing between reads must not disturb indexed offsets.
            if let Some(capacity) = resize {
                reader.resize_buffer(*capacity).unwrap();
            }
            let n = pick.index(sequential.len()) as u64 + 1;
            prop_assert_eq!(reader.read_record_at(n).unwrap(), ReadOutcome::Record);
            prop_assert_eq!(reader.record_num(), n);
            prop_assert_eq!(reader.fields(), &sequential[n as usize - 1][..]);
        }
        prop_assert_eq!(reader.read_record_at(count + 1).unwrap(), ReadOutcome::Exhausted);
        prop_assert!(reader.is_eof());
        prop_assert!(!reader.has_error());
        prop_assert_eq!(reader.end_record_num(), Some(count));
    }
}
