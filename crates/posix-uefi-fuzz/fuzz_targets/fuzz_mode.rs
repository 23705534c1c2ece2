#![no_main]
use libfuzzer_sys::fuzz_target;
use posix_uefi_core::stdio::{classify, parse_mode};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Some(mode) = parse_mode(&text) {
        // Every accepted mode names exactly one primary access.
        assert!(mode.reads() || mode.writes());
    }
    let _ = classify(&text);
});
