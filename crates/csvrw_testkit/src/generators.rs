//! Property-based test generators using proptest.
//!
//! Strategies lean towards the bytes that matter to the parser: quotes,
//! delimiters, line breaks and padding spaces.

use crate::fixtures::{CsvLayout, Record};
use csvrw_core::ReadFlags;
use proptest::prelude::*;

/// Strategy for a single field value.
///
/// Half of the values are arbitrary bytes, the other half are built from
/// the characters with special meaning in CSV.
pub fn field_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..16),
        prop::collection::vec(
            prop_oneof![
                Just(b'"'),
                Just(b','),
                Just(b';'),
                Just(b'|'),
                Just(b'\n'),
                Just(b'\r'),
                Just(b' '),
                Just(b'\t'),
                Just(b'x'),
            ],
            0..8
        ),
    ]
}

/// Strategy for a record, possibly with zero fields.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::vec(field_strategy(), 0..6)
}

/// Strategy for a list of records.
pub fn records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record_strategy(), 0..24)
}

/// Strategy for a list of records with at least one field each.
pub fn non_empty_records_strategy() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(prop::collection::vec(field_strategy(), 1..6), 0..24)
}

/// Pads `core` with a space before, after, both or neither.
fn padded(core: &'static str) -> impl Strategy<Value = String> {
    (any::<bool>(), any::<bool>()).prop_map(move |(before, after)| {
        let mut out = String::new();
        if before {
            out.push(' ');
        }
        out.push_str(core);
        if after {
            out.push(' ');
        }
        out
    })
}

/// Strategy for a reader delimiter and the, possibly padded, writer
/// delimiter that produces it.
pub fn delimiter_strategy() -> impl Strategy<Value = (char, String)> {
    prop_oneof![
        padded(",").prop_map(|written| (',', written)),
        padded(";").prop_map(|written| (';', written)),
        padded("|").prop_map(|written| ('|', written)),
        Just(('\t', "\t".to_string())),
    ]
}

/// Strategy for a writer terminator, possibly padded.
pub fn terminator_strategy() -> impl Strategy<Value = String> {
    prop_oneof![padded("\n"), padded("\r\n"), padded("\r")]
}

/// Strategy for buffer capacities, small ones included.
pub fn buffer_size_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![1usize..8, 8usize..64, Just(csvrw_core::DEFAULT_BUFFER_SIZE)]
}

/// Strategy for read flags that do not change field content.
///
/// Text mode rewrites line endings inside quoted fields, so it is left off.
pub fn read_flags_strategy() -> impl Strategy<Value = ReadFlags> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(strict, empty, skip_bom)| {
        ReadFlags::none()
            .strict_mode(strict)
            .process_empty_records(empty)
            .skip_utf8_bom_check(skip_bom)
    })
}

/// Strategy for a complete write/read layout.
pub fn layout_strategy() -> impl Strategy<Value = CsvLayout> {
    (
        delimiter_strategy(),
        terminator_strategy(),
        buffer_size_strategy(),
        buffer_size_strategy(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |((read_delimiter, write_delimiter), terminator, write_buffer, read_buffer, bom, empty)| {
                CsvLayout {
                    read_delimiter,
                    write_delimiter,
                    terminator,
                    write_buffer,
                    read_buffer,
                    bom,
                    process_empty_records: empty,
                }
            },
        )
}
