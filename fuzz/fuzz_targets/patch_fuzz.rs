#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary patch bytes must only ever produce errors, never panics.
    let _ = bsdelta::apply(&[], data);

    if data.len() >= 2 {
        let split = data[0] as usize % data.len();
        let (old, patch) = data[1..].split_at(split.min(data.len() - 1));
        let whole = bsdelta::apply(old, patch);
        let mut out = Vec::new();
        let streamed = bsdelta::apply_streaming(Cursor::new(old), &mut out, patch);
        if let (Ok(whole), Ok(_)) = (&whole, &streamed) {
            assert_eq!(whole, &out);
        }
        assert_eq!(whole.is_ok(), streamed.is_ok());
    }
});
