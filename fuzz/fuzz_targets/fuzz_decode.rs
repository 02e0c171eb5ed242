#![no_main]

use bson_wire::bson::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must encode again
    if let Ok(doc) = decode(data) {
        let _ = encode(&doc);
    }
});
