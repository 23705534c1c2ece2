//! Fixture loading and case inputs.

use std::collections::BTreeMap;
use std::path::Path;

use posix_uefi_core::{Arg, MemoryView};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// A single fixture test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureCase {
    /// Case identifier.
    pub name: String,
    /// `render` or `stream`.
    pub operation: String,
    /// Contract section the case exercises.
    pub section: String,
    /// Operation inputs, see [`RenderInput`] and [`StreamInput`].
    pub inputs: serde_json::Value,
    /// Rendered text or stream transcript.
    pub expected_output: String,
    /// Last-error slot after the case (0 for formatter cases).
    #[serde(default)]
    pub expected_errno: i32,
}

/// A collection of fixture cases for one area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Schema version.
    pub version: String,
    /// Area name, e.g. `printf` or `stream`.
    pub family: String,
    /// Individual test cases.
    pub cases: Vec<FixtureCase>,
}

impl FixtureSet {
    /// Load fixture set from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize fixture set to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load fixture set from a file path.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Load every `*.json` file in `dir`, sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, HarnessError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            return Err(HarnessError::NoFixtures(dir.to_path_buf()));
        }
        paths
            .into_iter()
            .map(|path| {
                Self::from_file(&path).map_err(|source| HarnessError::Fixture {
                    path,
                    source: Box::new(source),
                })
            })
            .collect()
    }
}

/// A format argument as written in fixtures and on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgSpec {
    Int(i64),
    Uint(u64),
    Char(char),
    Ptr(u64),
    /// Text passed as UTF-16 (`%s`, `%q`).
    Wide(String),
    /// Text passed as UTF-8 bytes (`%S`, `%Q`, `%C`).
    Utf8(String),
    NullWide,
    NullUtf8,
    Memory { address: u64, bytes: Vec<u8> },
}

impl ArgSpec {
    /// Parse `kind:value`, e.g. `int:-5`, `wide:hello`, `char:x`.
    pub fn parse(text: &str) -> Result<Self, HarnessError> {
        let invalid = || HarnessError::InvalidInput(format!("bad argument `{text}`"));
        let (kind, value) = text.split_once(':').unwrap_or((text, ""));
        let spec = match kind {
            "int" => ArgSpec::Int(value.parse().map_err(|_| invalid())?),
            "uint" => ArgSpec::Uint(value.parse().map_err(|_| invalid())?),
            "ptr" => ArgSpec::Ptr(
                u64::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|_| invalid())?,
            ),
            "char" => {
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => ArgSpec::Char(ch),
                    _ => return Err(invalid()),
                }
            }
            "wide" => ArgSpec::Wide(value.to_string()),
            "utf8" => ArgSpec::Utf8(value.to_string()),
            "null_wide" => ArgSpec::NullWide,
            "null_utf8" => ArgSpec::NullUtf8,
            "memory" => ArgSpec::Memory {
                address: 0,
                bytes: value.as_bytes().to_vec(),
            },
            _ => return Err(invalid()),
        };
        Ok(spec)
    }

    /// UTF-16 storage the argument borrows from, empty for non-wide kinds.
    #[must_use]
    pub fn wide_storage(&self) -> Vec<u16> {
        match self {
            ArgSpec::Wide(text) => text.encode_utf16().collect(),
            _ => Vec::new(),
        }
    }

    /// Borrow as an engine argument. `wide` must come from
    /// [`ArgSpec::wide_storage`] on the same spec.
    #[must_use]
    pub fn to_arg<'a>(&'a self, wide: &'a [u16]) -> Arg<'a> {
        match self {
            ArgSpec::Int(v) => Arg::Int(*v),
            ArgSpec::Uint(v) => Arg::Uint(*v),
            ArgSpec::Char(ch) => {
                let mut units = [0u16; 2];
                Arg::Char(ch.encode_utf16(&mut units)[0])
            }
            ArgSpec::Ptr(v) => Arg::Ptr(*v),
            ArgSpec::Wide(_) => Arg::Wide(Some(wide)),
            ArgSpec::Utf8(text) => Arg::Bytes(Some(text.as_bytes())),
            ArgSpec::NullWide => Arg::Wide(None),
            ArgSpec::NullUtf8 => Arg::Bytes(None),
            ArgSpec::Memory { address, bytes } => Arg::Memory(MemoryView::at(*address, bytes)),
        }
    }
}

/// Inputs of a `render` case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderInput {
    pub format: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// Output capacity in UTF-16 units, terminator included.
    #[serde(default)]
    pub max_len: Option<usize>,
}

/// A block device in a stream case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSpec {
    pub block_size: u32,
    pub blocks: u64,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub contents: String,
}

/// Simulated firmware plus the steps to run against it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamInput {
    /// Attach a boot volume even when no files or dirs are listed.
    #[serde(default)]
    pub volume: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub disks: Vec<DiskSpec>,
    #[serde(default)]
    pub serial: bool,
    #[serde(default)]
    pub keys: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhenceSpec {
    Set,
    Cur,
    End,
}

/// One call in a stream script. Steps act on the most recently opened
/// stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Open { path: String, mode: String },
    Close,
    Flush,
    Read { len: usize },
    Write { data: String },
    Seek { offset: i64, whence: WhenceSpec },
    Tell,
    Eof,
    Printf {
        format: String,
        #[serde(default)]
        args: Vec<ArgSpec>,
    },
    Remove { path: String },
    Getchar,
    Putchar { ch: char },
    ExitBootServices,
    /// Report what the console has shown so far.
    Console,
    /// Report a file's bytes straight from the volume.
    Contents { path: String },
}
