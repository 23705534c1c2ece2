//! Typed format arguments.
//!
//! The engine takes a slice of [`Arg`] values instead of a C variadic list.
//! Each directive consumes the next argument; an argument of the wrong
//! shape (or a missing one) renders as 0 for numeric directives and as a
//! null string for string directives.

/// A byte range and the address it is reported at by `%D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryView<'a> {
    address: u64,
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    /// View of `bytes` at their actual address.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            address: bytes.as_ptr() as usize as u64,
            bytes,
        }
    }

    /// View of `bytes` reported at `address`.
    pub const fn at(address: u64, bytes: &'a [u8]) -> Self {
        Self { address, bytes }
    }

    pub const fn address(&self) -> u64 {
        self.address
    }

    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// One format argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    Int(i64),
    Uint(u64),
    /// A UTF-16 unit for `%c`.
    Char(u16),
    Ptr(u64),
    /// UTF-16 string for `%s`/`%q`; `None` is a null pointer.
    Wide(Option<&'a [u16]>),
    /// UTF-8 string for `%S`/`%Q`/`%C`; `None` is a null pointer.
    Bytes(Option<&'a [u8]>),
    Memory(MemoryView<'a>),
}

impl Arg<'_> {
    /// Numeric value; non-numeric arguments read as 0.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Arg::Int(v) => v,
            Arg::Uint(v) | Arg::Ptr(v) => v as i64,
            Arg::Char(c) => i64::from(c),
            _ => 0,
        }
    }

    pub fn as_u64(&self) -> u64 {
        self.as_i64() as u64
    }
}

impl From<i32> for Arg<'_> {
    fn from(v: i32) -> Self {
        Arg::Int(i64::from(v))
    }
}

impl From<i64> for Arg<'_> {
    fn from(v: i64) -> Self {
        Arg::Int(v)
    }
}

impl From<u32> for Arg<'_> {
    fn from(v: u32) -> Self {
        Arg::Uint(u64::from(v))
    }
}

impl From<u64> for Arg<'_> {
    fn from(v: u64) -> Self {
        Arg::Uint(v)
    }
}

impl From<usize> for Arg<'_> {
    fn from(v: usize) -> Self {
        Arg::Uint(v as u64)
    }
}

impl From<char> for Arg<'_> {
    fn from(c: char) -> Self {
        Arg::Char(c as u32 as u16)
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(s: &'a str) -> Self {
        Arg::Bytes(Some(s.as_bytes()))
    }
}

impl<'a> From<&'a [u8]> for Arg<'a> {
    fn from(s: &'a [u8]) -> Self {
        Arg::Bytes(Some(s))
    }
}

impl<'a> From<&'a [u16]> for Arg<'a> {
    fn from(s: &'a [u16]) -> Self {
        Arg::Wide(Some(s))
    }
}

impl<'a> From<MemoryView<'a>> for Arg<'a> {
    fn from(view: MemoryView<'a>) -> Self {
        Arg::Memory(view)
    }
}

impl<T> From<*const T> for Arg<'_> {
    fn from(p: *const T) -> Self {
        Arg::Ptr(p as usize as u64)
    }
}
