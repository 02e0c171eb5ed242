#![no_main]

use bson_wire::OpMsg;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz frame parsing - test for panics, crashes, infinite loops
    let _ = OpMsg::from_bytes(data);
});
