#![no_main]
use libfuzzer_sys::fuzz_target;
use posix_uefi_core::{Arg, MemoryView, render};

fuzz_target!(|data: &[u8]| {
    // First byte picks the capacity; the rest splits into a format string
    // and a byte argument.
    let Some((&cap, rest)) = data.split_first() else {
        return;
    };
    let split = rest.len() / 2;
    let (fmt_bytes, arg_bytes) = rest.split_at(split);
    let fmt: Vec<u16> = fmt_bytes
        .chunks(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect();
    let wide: Vec<u16> = arg_bytes.iter().map(|&b| u16::from(b)).collect();
    let args = [
        Arg::Int(i64::from(cap) - 128),
        Arg::from(&wide[..]),
        Arg::Bytes(Some(arg_bytes)),
        Arg::Memory(MemoryView::new(arg_bytes)),
        Arg::Wide(None),
        Arg::Bytes(None),
    ];

    let capacity = usize::from(cap);
    let mut buf = vec![0xaaaau16; 300];
    let n = render(&mut buf, capacity, &fmt, &args);
    if capacity > 0 {
        assert!(n < capacity);
        assert_eq!(buf[n], 0);
    }
    assert!(buf[capacity..].iter().all(|&u| u == 0xaaaa));
});
