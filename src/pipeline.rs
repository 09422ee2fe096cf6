use std::ffi::CString;
use std::os::fd::IntoRawFd;
use std::os::unix::io::RawFd;
use std::process;

use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, execvp, fork, pipe, ForkResult, Pid};
use thiserror::Error;

use crate::logger::AuditLog;
use crate::redirect;
use crate::signal::SigchldGuard;
use crate::tokenize::Stage;

/// Child exit status when the program image cannot be replaced.
pub const EXIT_EXEC_FAILED: i32 = 127;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipe creation failed: {0}")]
    Pipe(#[source] nix::Error),
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("signal mask update failed: {0}")]
    Mask(#[source] nix::Error),
}

/// Inter-stage pipe descriptors, one pair per adjacent stage boundary.
/// Ends are closed explicitly as ownership settles in parent and children;
/// Drop closes whatever is left so no exit path leaks a descriptor, which
/// would wedge a reader waiting for EOF.
struct PipeTable {
    pairs: Vec<Option<(RawFd, RawFd)>>,
}

impl PipeTable {
    fn with_capacity(n: usize) -> PipeTable {
        PipeTable { pairs: Vec::with_capacity(n) }
    }

    fn push(&mut self) -> nix::Result<()> {
        let (r, w) = pipe()?;
        self.pairs.push(Some((r.into_raw_fd(), w.into_raw_fd())));
        Ok(())
    }

    fn read_end(&self, i: usize) -> Option<RawFd> {
        self.pairs.get(i).copied().flatten().map(|(r, _)| r)
    }

    fn write_end(&self, i: usize) -> Option<RawFd> {
        self.pairs.get(i).copied().flatten().map(|(_, w)| w)
    }

    fn close_pair(&mut self, i: usize) {
        if let Some(Some((r, w))) = self.pairs.get_mut(i).map(|p| p.take()) {
            let _ = close(r);
            let _ = close(w);
        }
    }

    fn close_all(&mut self) {
        for i in 0..self.pairs.len() {
            self.close_pair(i);
        }
    }
}

impl Drop for PipeTable {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Executes a parsed pipeline: forks every stage with the inter-stage pipes
/// wired, then reaps each child in spawn order, forwarding one audit record
/// per stage. All stages run concurrently; the only waits happen after the
/// last fork. Children spawned before a pipe or fork failure are still
/// reaped and audited.
pub fn run(stages: &[Stage], log: &AuditLog) -> Result<(), PipelineError> {
    if stages.is_empty() {
        return Ok(());
    }
    let mut pipes = PipeTable::with_capacity(stages.len().saturating_sub(1));
    let mut registry: Vec<(Pid, String)> = Vec::with_capacity(stages.len());

    let spawned = spawn_stages(stages, &mut pipes, &mut registry);
    pipes.close_all();
    reap(&registry, log);
    spawned
}

fn spawn_stages(
    stages: &[Stage],
    pipes: &mut PipeTable,
    registry: &mut Vec<(Pid, String)>,
) -> Result<(), PipelineError> {
    let last = stages.len() - 1;
    for (i, stage) in stages.iter().enumerate() {
        if i != last {
            pipes.push().map_err(PipelineError::Pipe)?;
        }
        let guard = SigchldGuard::block().map_err(PipelineError::Mask)?;
        match unsafe { fork() } {
            Ok(ForkResult::Child) => wire_and_exec(stage, pipes, i, last, guard),
            Ok(ForkResult::Parent { child }) => {
                registry.push((child, stage.text.clone()));
                drop(guard);
                if i != 0 {
                    // Both adjacent children hold their own copies of the
                    // previous boundary now; the parent's go away.
                    pipes.close_pair(i - 1);
                }
            }
            Err(e) => return Err(PipelineError::Fork(e)),
        }
    }
    Ok(())
}

/// Child side. SIGCHLD stays blocked until the standard streams are
/// rewired; the guard is released just before redirection resolution and
/// exec. Never returns to the caller.
fn wire_and_exec(stage: &Stage, pipes: &mut PipeTable, i: usize, last: usize, guard: SigchldGuard) -> ! {
    if i != 0 {
        if let Some(r) = pipes.read_end(i - 1) {
            if let Err(e) = dup2(r, libc::STDIN_FILENO) {
                eprintln!("stdin rebind failed: {e}");
                process::exit(redirect::EXIT_OPEN_FAILED);
            }
        }
    }
    if i != last {
        if let Some(w) = pipes.write_end(i) {
            if let Err(e) = dup2(w, libc::STDOUT_FILENO) {
                eprintln!("stdout rebind failed: {e}");
                process::exit(redirect::EXIT_OPEN_FAILED);
            }
        }
    }
    pipes.close_all();
    drop(guard);
    if let Some(r) = &stage.redirect {
        if let Err(e) = redirect::apply(r) {
            eprintln!("{e}");
            process::exit(redirect::EXIT_OPEN_FAILED);
        }
    }
    exec_argv(&stage.argv)
}

fn exec_argv(argv: &[String]) -> ! {
    let cstrs: Result<Vec<CString>, _> = argv.iter().map(|a| CString::new(a.as_str())).collect();
    let cstrs = match cstrs {
        Ok(v) if !v.is_empty() => v,
        _ => exec_failed(),
    };
    let argv_refs: Vec<&CString> = cstrs.iter().collect();
    let _ = execvp(argv_refs[0], &argv_refs);
    exec_failed()
}

// The one child path that regains control without execing.
fn exec_failed() -> ! {
    eprintln!("Incorrect input");
    process::exit(EXIT_EXEC_FAILED)
}

fn reap(registry: &[(Pid, String)], log: &AuditLog) {
    for (pid, text) in registry {
        // A wait failure neither stops the remaining reaps nor this
        // stage's audit record.
        if let Err(e) = waitpid(*pid, None) {
            eprintln!("wait for {pid} failed: {e}");
        }
        if let Err(e) = log.record(text, *pid) {
            eprintln!("audit log: {e}");
        }
    }
}
