//! Benchmark utilities.

use csvrw_core::{CsvWriter, WriteFlags};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed seed so every run measures the same input.
const SEED: u64 = 0x00c5_7b3e;

/// Generate a printable field of `len` bytes; roughly one byte in
/// `quote_every` is a quote.
pub fn random_field(rng: &mut impl Rng, len: usize, quote_every: u32) -> Vec<u8> {
    (0..len)
        .map(|_| {
            if quote_every > 0 && rng.gen_ratio(1, quote_every) {
                b'"'
            } else {
                rng.gen_range(b' '..=b'~')
            }
        })
        .collect()
}

/// Generate `count` records of `fields` fields, each `field_len` bytes.
pub fn generate_records(count: usize, fields: usize, field_len: usize) -> Vec<Vec<Vec<u8>>> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count)
        .map(|_| (0..fields).map(|_| random_field(&mut rng, field_len, 16)).collect())
        .collect()
}

/// Encode `records` into a CSV document with the default settings.
pub fn encode_document(records: &[Vec<Vec<u8>>]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = CsvWriter::new();
        writer
            .associate(&mut out, WriteFlags::none())
            .expect("associate");
        for record in records {
            writer.write_record(record, true).expect("write record");
        }
        writer.close().expect("close");
    }
    out
}
