use posix_uefi_core::printf::BUFSIZ;
use posix_uefi_core::{Arg, MemoryView, render, snprintf, sprintf};

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn format(fmt: &str, args: &[Arg<'_>]) -> String {
    let mut buf = vec![0u16; BUFSIZ];
    let n = sprintf(&mut buf, &wide(fmt), args);
    assert_eq!(buf[n], 0, "terminator after {fmt:?}");
    String::from_utf16(&buf[..n]).unwrap()
}

struct Case {
    fmt: &'static str,
    args: Vec<Arg<'static>>,
    expected: &'static str,
}

fn matrix() -> Vec<Case> {
    vec![
        Case { fmt: "%05d", args: vec![Arg::Int(-42)], expected: "-0042" },
        Case { fmt: "%x", args: vec![Arg::Int(255)], expected: "ff" },
        Case { fmt: "%p", args: vec![Arg::Ptr(0)], expected: "0000000000000000" },
        Case { fmt: "%d%%", args: vec![Arg::Int(50)], expected: "50%" },
        Case { fmt: "%ld", args: vec![Arg::Int(-7)], expected: "-7" },
        Case { fmt: "%08X", args: vec![Arg::Uint(0xdead)], expected: "0000DEAD" },
        Case { fmt: "%3d|", args: vec![Arg::Int(5)], expected: "  5|" },
        Case { fmt: "%Q", args: vec![Arg::from("a\nb")], expected: "a\\nb" },
        Case { fmt: "%S", args: vec![Arg::from("tab\there")], expected: "tab\there" },
        Case { fmt: "line\n", args: vec![], expected: "line\r\n" },
        Case { fmt: "%c%c", args: vec![Arg::from('o'), Arg::from('k')], expected: "ok" },
        Case { fmt: "%d", args: vec![Arg::Int(123_456_789_012_345_678)], expected: "99999999999999999" },
    ]
}

#[test]
fn directive_matrix() {
    for case in matrix() {
        assert_eq!(format(case.fmt, &case.args), case.expected, "format {:?}", case.fmt);
    }
}

#[test]
fn escaped_wide_newline_is_backslash_n() {
    let text = wide("x\ny");
    let out = format("%q", &[Arg::from(&text[..])]);
    assert_eq!(out, "x\\ny");
}

#[test]
fn output_is_always_terminated_and_bounded() {
    let fmt = wide("%s and %S and %d");
    let long = wide(&"w".repeat(100));
    for cap in 1..40 {
        let mut buf = vec![0xaaaau16; 64];
        let n = snprintf(
            &mut buf,
            cap,
            &fmt,
            &[Arg::from(&long[..]), Arg::from("bytes"), Arg::Int(-1)],
        );
        assert!(n < cap, "cap {cap} wrote {n}");
        assert_eq!(buf[n], 0);
        assert!(buf[cap..].iter().all(|&u| u == 0xaaaa), "cap {cap} overran");
    }
}

#[test]
fn max_len_larger_than_slice_is_clamped() {
    let mut buf = [0u16; 8];
    let n = render(&mut buf, usize::MAX, &wide("0123456789"), &[]);
    assert_eq!(n, 7);
    assert_eq!(buf[7], 0);
}

#[test]
fn dump_of_real_memory() {
    let data: Vec<u8> = (0u8..32).collect();
    let view = MemoryView::new(&data);
    let out = format("%2D", &[Arg::from(view)]);
    let lines: Vec<&str> = out.split_terminator("\r\n").collect();
    assert_eq!(lines.len(), 2);
    let address = format!("{:012X}", view.address() & 0xffff_ffff_ffff);
    assert!(lines[0].starts_with(&format!("{address}: 00 01 02")));
    assert!(lines[1].contains(": 10 11 12"));
    assert!(lines[0].ends_with("................"));
}

#[test]
fn dump_truncation_stops_rendering() {
    let data = [0x41u8; 16];
    let fmt = wide("%Dtail");
    let mut buf = [0u16; 20];
    let n = render(&mut buf, 20, &fmt, &[Arg::Memory(MemoryView::at(0, &data))]);
    assert_eq!(n, 19);
    assert_eq!(String::from_utf16(&buf[..n]).unwrap(), "000000000000: 41 41");
}
