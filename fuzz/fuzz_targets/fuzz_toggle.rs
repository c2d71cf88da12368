#![no_main]

use cl_filter::{Selection, SelectionValue};
use cl_types::Scalar;
use libfuzzer_sys::fuzz_target;

// Toggle totality: no click sequence may ever produce an empty selection.
fuzz_target!(|data: &[u8]| {
    let mut selection = Selection::All;
    for byte in data {
        let value = if byte % 11 == 0 {
            SelectionValue::All
        } else {
            SelectionValue::Value(Scalar::Int64(i64::from(byte % 11)))
        };
        selection = selection.toggle(&value);
        if let Selection::Values(values) = &selection {
            assert!(!values.is_empty());
        }
    }
});
