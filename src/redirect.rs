use std::fs::OpenOptions;
use std::os::fd::IntoRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::RawFd;

use nix::unistd::{close, dup2};
use thiserror::Error;

use crate::tokenize::{RedirKind, Redirect};

/// Creation mode for `>` targets, moderated by the process umask.
const FILE_MODE: u32 = 0o777;

/// Child exit status when the redirection cannot be applied.
pub const EXIT_OPEN_FAILED: i32 = 1;

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("cannot open file")]
    Open(#[source] std::io::Error),
    #[error("stream rebind failed: {0}")]
    Rebind(#[from] nix::Error),
}

/// Opens the redirection target and rebinds the matching standard stream:
/// `<` opens read-only and never creates the file, `>` creates and
/// truncates. The resolved descriptor is duplicated onto fd 0 or fd 1 and
/// the original is closed.
pub fn apply(redirect: &Redirect) -> Result<(), RedirectError> {
    let (opened, stream): (_, RawFd) = match redirect.kind {
        RedirKind::Input => (
            OpenOptions::new().read(true).open(&redirect.target),
            libc::STDIN_FILENO,
        ),
        RedirKind::Output => (
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(&redirect.target),
            libc::STDOUT_FILENO,
        ),
    };
    let fd = opened.map_err(RedirectError::Open)?.into_raw_fd();
    dup2(fd, stream)?;
    close(fd)?;
    Ok(())
}
