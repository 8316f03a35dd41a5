//! Single-frame samples from `/proc/<pid>/task/<tid>/syscall`
//!
//! For a thread blocked in the kernel the file reports the syscall number,
//! its arguments, the user stack pointer and the user program counter:
//!
//! ```text
//! 232 0x4 0x7ffd2a1c 0x400 0xffffffff 0x0 0x8 0x7ffd2a1bc8 0x7f3c9e2b1d4e
//! -1 0x7ffd2a1bc8 0x55d4a1b2c3d4          (blocked, not in a syscall)
//! running                                  (on CPU, nothing to report)
//! ```
//!
//! The last field is the innermost frame. This is not a stack walk, so a
//! sample has at most one frame. Reading the file needs ptrace access to the
//! target, the same permission a real stack walker would need.

use std::fs;
use std::io::ErrorKind;

use crate::domain::SampleError;
use crate::providers::{ProcessHandle, StackSampling, ThreadHandle};

use super::threads::process_exists;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallSampler;

impl SyscallSampler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StackSampling for SyscallSampler {
    fn sample(
        &self,
        process: &ProcessHandle,
        thread: &ThreadHandle,
        max_depth: usize,
    ) -> Result<Vec<u64>, SampleError> {
        if max_depth == 0 {
            return Ok(Vec::new());
        }

        let path = format!("/proc/{}/task/{}/syscall", thread.pid.0, thread.tid.0);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(if process_exists(process.pid) {
                    SampleError::ThreadGone(thread.tid)
                } else {
                    SampleError::TargetExited
                });
            }
            Err(e) => return Err(SampleError::Io(e)),
        };

        parse_syscall_pc(&content).map(|pc| pc.into_iter().collect())
    }
}

/// Program counter from a syscall line, `None` when the thread is running.
fn parse_syscall_pc(content: &str) -> Result<Option<u64>, SampleError> {
    let content = content.trim();
    if content.is_empty() || content == "running" {
        return Ok(None);
    }

    let fields: Vec<&str> = content.split_whitespace().collect();
    // "-1 sp pc" or "nr a0..a5 sp pc"
    if fields.len() != 3 && fields.len() != 9 {
        return Err(SampleError::Failed(format!("unexpected syscall line: {content}")));
    }

    let pc = fields[fields.len() - 1];
    let digits = pc.strip_prefix("0x").unwrap_or(pc);
    let pc = u64::from_str_radix(digits, 16)
        .map_err(|e| SampleError::Failed(format!("bad program counter '{pc}': {e}")))?;

    Ok((pc != 0).then_some(pc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Pid, Tid};

    #[test]
    fn test_parse_blocked_in_syscall() {
        let line = "232 0x4 0x7ffd2a1c 0x400 0xffffffff 0x0 0x8 0x7ffd2a1bc8 0x7f3c9e2b1d4e\n";
        assert_eq!(parse_syscall_pc(line).unwrap(), Some(0x7f3c_9e2b_1d4e));
    }

    #[test]
    fn test_parse_blocked_outside_syscall() {
        assert_eq!(parse_syscall_pc("-1 0x7ffd2a1bc8 0x55d4a1b2c3d4").unwrap(), Some(0x55d4_a1b2_c3d4));
    }

    #[test]
    fn test_parse_running() {
        assert_eq!(parse_syscall_pc("running\n").unwrap(), None);
        assert_eq!(parse_syscall_pc("").unwrap(), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_syscall_pc("1 2"), Err(SampleError::Failed(_))));
        assert!(matches!(parse_syscall_pc("-1 0x1 0xzz"), Err(SampleError::Failed(_))));
    }

    #[test]
    fn test_missing_process_is_target_exited() {
        let process = ProcessHandle { pid: Pid(9_999_999) };
        let thread = ThreadHandle { pid: Pid(9_999_999), tid: Tid(9_999_999) };
        let result = SyscallSampler::new().sample(&process, &thread, 8);
        assert!(matches!(result, Err(SampleError::TargetExited)));
    }

    #[test]
    fn test_zero_depth() {
        let process = ProcessHandle { pid: Pid(9_999_999) };
        let thread = ThreadHandle { pid: Pid(9_999_999), tid: Tid(9_999_999) };
        assert!(SyscallSampler::new().sample(&process, &thread, 0).unwrap().is_empty());
    }
}
