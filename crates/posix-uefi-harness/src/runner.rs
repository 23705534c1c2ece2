//! Test execution engine.
//!
//! `render` cases run the formatter into a buffer of `max_len` units.
//! `stream` cases build a [`MemoryFirmware`], run the scripted calls and
//! compare the resulting transcript: one `op:result` entry per step, joined
//! by `;`, with failures shown as the errno name.

use log::{debug, warn};
use posix_uefi_core::errno;
use posix_uefi_core::firmware::memory::{MemoryDisk, MemoryFile, MemoryFirmware, MemoryVolume};
use posix_uefi_core::printf::BUFSIZ;
use posix_uefi_core::{Arg, Stdio, StdioError, Stream, Whence, render};

use crate::diff;
use crate::error::HarnessError;
use crate::fixtures::{ArgSpec, FixtureCase, FixtureSet, RenderInput, Step, StreamInput, WhenceSpec};
use crate::verify::VerificationResult;

/// Runs fixture sets and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
}

impl TestRunner {
    #[must_use]
    pub fn new(campaign: impl Into<String>) -> Self {
        Self {
            campaign: campaign.into(),
        }
    }

    /// Run all fixtures in a set and return results.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .map(|case| {
                debug!("{}: running {}/{}", self.campaign, fixture_set.family, case.name);
                let (actual, errno) = match execute_case(case) {
                    Ok(outcome) => outcome,
                    Err(err) => (format!("error:{err}"), -1),
                };
                let passed = actual == case.expected_output && errno == case.expected_errno;
                let diff = if passed {
                    None
                } else if actual != case.expected_output {
                    Some(diff::render_diff(&case.expected_output, &actual))
                } else {
                    Some(format!(
                        "errno mismatch: expected {}, got {}",
                        errno_name(case.expected_errno),
                        errno_name(errno)
                    ))
                };
                VerificationResult {
                    case_name: case.name.clone(),
                    family: fixture_set.family.clone(),
                    section: case.section.clone(),
                    passed,
                    expected: case.expected_output.clone(),
                    actual,
                    expected_errno: case.expected_errno,
                    errno,
                    diff,
                }
            })
            .collect()
    }
}

/// Execute one case, returning its output and final errno.
pub fn execute_case(case: &FixtureCase) -> Result<(String, i32), HarnessError> {
    match case.operation.as_str() {
        "render" => {
            let input: RenderInput = serde_json::from_value(case.inputs.clone())?;
            Ok((render_text(&input.format, &input.args, input.max_len), 0))
        }
        "stream" => {
            let input: StreamInput = serde_json::from_value(case.inputs.clone())?;
            run_script(&input)
        }
        other => Err(HarnessError::UnknownOperation(other.to_string())),
    }
}

/// Render `format` with `args` and return the text before the terminator.
#[must_use]
pub fn render_text(format: &str, args: &[ArgSpec], max_len: Option<usize>) -> String {
    let fmt: Vec<u16> = format.encode_utf16().collect();
    let storage: Vec<Vec<u16>> = args.iter().map(ArgSpec::wide_storage).collect();
    let args: Vec<Arg<'_>> = args
        .iter()
        .zip(&storage)
        .map(|(spec, wide)| spec.to_arg(wide))
        .collect();
    let mut buf = vec![0u16; BUFSIZ];
    let len = render(&mut buf, max_len.unwrap_or(BUFSIZ), &fmt, &args);
    String::from_utf16_lossy(&buf[..len])
}

/// Symbolic name of an errno value, or its number.
#[must_use]
pub fn errno_name(value: i32) -> String {
    let name = match value {
        0 => "OK",
        errno::EPERM => "EPERM",
        errno::ENOENT => "ENOENT",
        errno::EIO => "EIO",
        errno::EBADF => "EBADF",
        errno::ENOMEM => "ENOMEM",
        errno::EACCES => "EACCES",
        errno::ENODEV => "ENODEV",
        errno::ENOTDIR => "ENOTDIR",
        errno::EISDIR => "EISDIR",
        errno::EINVAL => "EINVAL",
        errno::ENOSPC => "ENOSPC",
        errno::ESPIPE => "ESPIPE",
        errno::EROFS => "EROFS",
        other => return other.to_string(),
    };
    name.to_string()
}

fn build_firmware(input: &StreamInput) -> MemoryFirmware {
    let mut fw = MemoryFirmware::new();
    if input.volume || !input.files.is_empty() || !input.dirs.is_empty() {
        let mut volume = MemoryVolume::new();
        for dir in &input.dirs {
            volume = volume.with_dir(dir);
        }
        for (path, contents) in &input.files {
            volume = volume.with_file(path, contents.as_bytes());
        }
        if let Some(capacity) = input.capacity {
            volume = volume.with_capacity(capacity);
        }
        if input.read_only {
            volume = volume.read_only();
        }
        fw = fw.with_volume(volume);
    }
    for spec in &input.disks {
        let mut disk =
            MemoryDisk::new(spec.block_size, spec.blocks).with_contents(0, spec.contents.as_bytes());
        if spec.read_only {
            disk = disk.read_only();
        }
        fw = fw.with_disk(disk);
    }
    if input.serial {
        fw = fw.with_serial();
    }
    if !input.keys.is_empty() {
        fw = fw.with_keys(&input.keys);
    }
    fw
}

fn report<T>(op: &str, result: Result<T, StdioError>, show: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(value) => format!("{op}:{}", show(value)),
        Err(err) => format!("{op}:{}", errno_name(err.errno())),
    }
}

fn ok(_: ()) -> String {
    String::from("ok")
}

fn escaped(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).escape_debug().to_string()
}

fn whence(spec: WhenceSpec) -> Whence {
    match spec {
        WhenceSpec::Set => Whence::Set,
        WhenceSpec::Cur => Whence::Current,
        WhenceSpec::End => Whence::End,
    }
}

fn current<'a>(
    slot: &'a mut Option<Stream<MemoryFile>>,
    op: &str,
) -> Result<&'a mut Stream<MemoryFile>, HarnessError> {
    slot.as_mut()
        .ok_or_else(|| HarnessError::InvalidInput(format!("`{op}` with no open stream")))
}

/// Run a stream script and return its transcript and the final errno.
pub fn run_script(input: &StreamInput) -> Result<(String, i32), HarnessError> {
    let mut io = Stdio::new(build_firmware(input));
    let mut slot: Option<Stream<MemoryFile>> = None;
    let mut transcript = Vec::with_capacity(input.steps.len());

    for step in &input.steps {
        let entry = match step {
            Step::Open { path, mode } => {
                let opened = io.open(path, mode);
                let mut entry =
                    report("open", opened.as_ref().map(|_| ()).map_err(|err| *err), ok);
                if let Ok(stream) = opened {
                    if let Some(previous) = slot.replace(stream) {
                        if let Err(err) = io.close(previous) {
                            warn!("closing replaced stream failed: {err}");
                            entry.push_str(&format!(";close:{}", errno_name(err.errno())));
                        }
                    }
                }
                entry
            }
            Step::Close => {
                let stream = slot
                    .take()
                    .ok_or_else(|| HarnessError::InvalidInput("`close` with no open stream".into()))?;
                report("close", io.close(stream), ok)
            }
            Step::Flush => {
                let stream = current(&mut slot, "flush")?;
                report("flush", io.flush(stream), ok)
            }
            Step::Read { len } => {
                let stream = current(&mut slot, "read")?;
                let mut buf = vec![0u8; *len];
                let result = io.read(stream, &mut buf);
                // Block devices report whole blocks even when `buf` is shorter.
                report("read", result, |n| escaped(&buf[..n.min(buf.len())]))
            }
            Step::Write { data } => {
                let stream = current(&mut slot, "write")?;
                report("write", io.write(stream, data.as_bytes()), |n| n.to_string())
            }
            Step::Seek { offset, whence: spec } => {
                let stream = current(&mut slot, "seek")?;
                report("seek", io.seek(stream, *offset, whence(*spec)), ok)
            }
            Step::Tell => {
                let stream = current(&mut slot, "tell")?;
                report("tell", io.tell(stream), |pos| pos.to_string())
            }
            Step::Eof => {
                let stream = current(&mut slot, "eof")?;
                report("eof", io.at_end(stream), |end| u8::from(end).to_string())
            }
            Step::Printf { format, args } => {
                let fmt: Vec<u16> = format.encode_utf16().collect();
                let storage: Vec<Vec<u16>> = args.iter().map(ArgSpec::wide_storage).collect();
                let args: Vec<Arg<'_>> = args
                    .iter()
                    .zip(&storage)
                    .map(|(spec, wide)| spec.to_arg(wide))
                    .collect();
                let result = match slot.as_mut() {
                    Some(stream) => io.fprintf(stream, &fmt, &args),
                    None => io.printf(&fmt, &args),
                };
                report("printf", result, |n| n.to_string())
            }
            Step::Remove { path } => report("remove", io.remove(path), ok),
            Step::Getchar => report("getchar", io.getchar(), |unit| {
                char::from_u32(u32::from(unit))
                    .map_or_else(|| unit.to_string(), |ch| ch.escape_debug().to_string())
            }),
            Step::Putchar { ch } => {
                let mut units = [0u16; 2];
                let unit = ch.encode_utf16(&mut units)[0];
                report("putchar", io.putchar(unit).map(|_| ()), ok)
            }
            Step::ExitBootServices => {
                io.exit_boot_services();
                String::from("exit_boot_services:ok")
            }
            Step::Console => format!("console:{}", io.firmware().stdout().text().escape_debug()),
            Step::Contents { path } => match io.firmware().file_contents(path) {
                Some(bytes) => format!("contents:{}", escaped(&bytes)),
                None => String::from("contents:missing"),
            },
        };
        transcript.push(entry);
    }

    if let Some(stream) = slot.take() {
        if let Err(err) = io.close(stream) {
            warn!("closing stream after script failed: {err}");
        }
    }
    Ok((transcript.join(";"), io.errno()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_case(inputs: serde_json::Value, expected: &str, errno: i32) -> FixtureSet {
        FixtureSet {
            version: "v1".into(),
            family: "stream".into(),
            cases: vec![FixtureCase {
                name: "case".into(),
                operation: "stream".into(),
                section: "test".into(),
                inputs,
                expected_output: expected.into(),
                expected_errno: errno,
            }],
        }
    }

    #[test]
    fn render_case_passes() {
        let set = FixtureSet::from_json(
            r#"{
                "version":"v1",
                "family":"printf",
                "cases":[
                    {"name":"pad","operation":"render","section":"printf",
                     "inputs":{"format":"%05d|%x","args":[{"int":-42},{"int":255}]},
                     "expected_output":"-0042|ff"}
                ]
            }"#,
        )
        .expect("valid fixture json");
        let results = TestRunner::new("smoke").run(&set);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "{:?}", results[0].diff);
    }

    #[test]
    fn write_then_read_back() {
        let set = stream_case(
            serde_json::json!({
                "volume": true,
                "steps": [
                    {"op": "open", "path": "/a.txt", "mode": "w"},
                    {"op": "write", "data": "hello"},
                    {"op": "close"},
                    {"op": "open", "path": "/a.txt", "mode": "r"},
                    {"op": "read", "len": 16},
                    {"op": "eof"}
                ]
            }),
            "open:ok;write:5;close:ok;open:ok;read:hello;eof:1",
            0,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert!(results[0].passed, "{:?}", results[0].diff);
    }

    #[test]
    fn reopening_closes_the_replaced_stream() {
        let (transcript, errno) = run_script(&StreamInput {
            volume: true,
            steps: vec![
                Step::Open { path: "/a.txt".into(), mode: "w".into() },
                Step::Write { data: "one".into() },
                Step::Open { path: "/b.txt".into(), mode: "w".into() },
                Step::Write { data: "two".into() },
                Step::Contents { path: "a.txt".into() },
                Step::Contents { path: "b.txt".into() },
            ],
            ..StreamInput::default()
        })
        .unwrap();
        assert_eq!(transcript, "open:ok;write:3;open:ok;write:3;contents:one;contents:two");
        assert_eq!(errno, 0);
    }

    #[test]
    fn failures_show_errno_names() {
        let set = stream_case(
            serde_json::json!({
                "steps": [{"op": "open", "path": "/missing", "mode": "r"}]
            }),
            "open:ENODEV",
            errno::ENODEV,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert!(results[0].passed, "{:?}", results[0].diff);
    }

    #[test]
    fn errno_mismatch_fails_the_case() {
        let set = stream_case(
            serde_json::json!({
                "steps": [{"op": "open", "path": "/missing", "mode": "r"}]
            }),
            "open:ENODEV",
            0,
        );
        let results = TestRunner::new("smoke").run(&set);
        assert!(!results[0].passed);
        assert!(results[0].diff.as_deref().unwrap().contains("errno mismatch"));
    }

    #[test]
    fn step_without_stream_is_a_harness_error() {
        let set = stream_case(serde_json::json!({"steps": [{"op": "tell"}]}), "", 0);
        let results = TestRunner::new("smoke").run(&set);
        assert!(!results[0].passed);
        assert!(results[0].actual.starts_with("error:invalid input"));
    }

    #[test]
    fn unknown_operation_is_reported() {
        let mut set = stream_case(serde_json::json!({}), "", 0);
        set.cases[0].operation = "scanf".into();
        let results = TestRunner::new("smoke").run(&set);
        assert_eq!(results[0].actual, "error:unknown operation `scanf`");
    }

    #[test]
    fn errno_names() {
        assert_eq!(errno_name(0), "OK");
        assert_eq!(errno_name(errno::EROFS), "EROFS");
        assert_eq!(errno_name(999), "999");
    }
}
