#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(records) = cl_io::records_from_csv_str(input) {
            let _ = cl_io::records_to_csv_string(&records);
        }
    }
});
