#![no_main]

use libfuzzer_sys::fuzz_target;
use nh3harvest::merger::{parse_source, ColumnLayout};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Any byte sequence must parse or fail with an error, never panic
    let layout = ColumnLayout::default();
    if let Ok(rows) = parse_source(Cursor::new(data), &layout) {
        for row in rows {
            let _ = row.utc.format("%d-%m-%Y_%H%M%S").to_string();
        }
    }
});
