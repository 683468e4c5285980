#![no_main]
use bsdelta::patch::{BuildOptions, PatchBuilder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the old/new split; the rest is old ++ new.
    if data.is_empty() {
        return;
    }
    let body = &data[1..];
    let split = data[0] as usize % (body.len() + 1);
    let (old, new) = body.split_at(split);

    let common = old.len().min(new.len());
    let diff: Vec<u8> = new[..common]
        .iter()
        .zip(old)
        .map(|(n, o)| n.wrapping_sub(*o))
        .collect();

    let mut builder = PatchBuilder::new();
    builder.push(&diff, &new[common..], 0);
    let patch = builder.to_vec(&BuildOptions { level: 1 }).unwrap();

    let rebuilt = bsdelta::apply(old, patch.as_slice()).unwrap();
    assert_eq!(rebuilt, new);
});
