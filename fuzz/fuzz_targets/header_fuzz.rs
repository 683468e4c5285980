#![no_main]
use bsdelta::format::{Header, signmag};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = Header::parse(data) {
        let mut out = Vec::new();
        header.encode(&mut out).unwrap();
        // Negative zero fields re-encode as plain zero, so compare parsed values.
        assert_eq!(Header::parse(&out).unwrap(), header);
    }

    if let Some(v) = signmag::read_i64(data) {
        if let Some(bytes) = signmag::encode(v) {
            assert_eq!(signmag::decode(&bytes), v);
        }
    }
});
