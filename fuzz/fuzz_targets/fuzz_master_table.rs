#![no_main]

use libfuzzer_sys::fuzz_target;
use nh3harvest::config::ReductionConfig;
use nh3harvest::reducer::Reducer;
use nh3harvest::table::read_master_table;

fuzz_target!(|data: &[u8]| {
    let Ok(samples) = read_master_table(data) else {
        return;
    };

    // Whatever parses must reduce or be rejected as unsorted
    if let Ok(reducer) = Reducer::new(ReductionConfig::default()) {
        let _ = reducer.reduce(&samples);
    }
});
