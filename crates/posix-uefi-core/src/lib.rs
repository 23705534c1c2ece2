//! # posix-uefi-core
//!
//! POSIX-shaped stdio on top of handle-based firmware protocols.
//!
//! This crate provides the safe core of the compatibility layer: a unified
//! stream abstraction over consoles, a serial port, block devices and
//! filesystem objects, plus a bounded, allocation-free `printf` engine that
//! renders UTF-16 text the way firmware consoles expect it. The firmware is
//! reached only through the traits in [`firmware`]. No `unsafe` code is
//! permitted at the crate level.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod errno;
pub mod error;
pub mod firmware;
pub mod printf;
pub mod registry;
pub mod stdio;

pub use error::{Result, StdioError};
pub use firmware::{Firmware, Status};
pub use printf::{Arg, MemoryView, render, snprintf, sprintf};
pub use registry::DeviceRegistry;
pub use stdio::{Stdio, Stream, StreamKind, Whence};
