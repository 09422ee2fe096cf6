use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{
    sigaction, sigprocmask, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal,
};

// Set from signal context, sampled only between top-level commands.
static NOTICE_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn notice_handler(sig: libc::c_int) {
    // Signal context: raw write(2) only, no allocation, no stdio locks.
    let msg: &[u8] = match sig {
        libc::SIGINT => b"\nSIGINT signal is received\n",
        libc::SIGTSTP => b"\nSIGTSTP signal is received\n",
        libc::SIGQUIT => b"\nSIGQUIT signal is received\n",
        _ => b"\nUNKNOWN signal is received\n",
    };
    let _ = unsafe { libc::write(libc::STDOUT_FILENO, msg.as_ptr().cast(), msg.len()) };
    NOTICE_PENDING.store(true, Ordering::SeqCst);
}

/// Installs the interactive-signal handler for SIGINT, SIGTSTP and SIGQUIT.
/// SA_RESTART keeps the blocking prompt read from surfacing EINTR.
pub fn install_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(notice_handler),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTSTP, &action)?;
        sigaction(Signal::SIGQUIT, &action)?;
    }
    Ok(())
}

/// True if an interactive signal arrived since the last `reset`.
pub fn poll() -> bool {
    NOTICE_PENDING.load(Ordering::SeqCst)
}

/// Clears the notice flag; called at the top of each read-prompt cycle.
pub fn reset() {
    NOTICE_PENDING.store(false, Ordering::SeqCst);
}

/// Blocks SIGCHLD at the process level for the scope of a fork, closing the
/// window where a child could terminate before the parent records it.
/// Release restores the exact mask that was in effect before, never an
/// empty one, on every exit path.
pub struct SigchldGuard {
    prev: SigSet,
}

impl SigchldGuard {
    pub fn block() -> nix::Result<SigchldGuard> {
        let mut chld = SigSet::empty();
        chld.add(Signal::SIGCHLD);
        let mut prev = SigSet::empty();
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&chld), Some(&mut prev))?;
        Ok(SigchldGuard { prev })
    }
}

impl Drop for SigchldGuard {
    fn drop(&mut self) {
        let _ = sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.prev), None);
    }
}
