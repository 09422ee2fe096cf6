use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use chrono::Local;
use nix::unistd::Pid;

/// Fixed relative path of the audit log. The file is created on first
/// record; the directory is not, and a missing one surfaces as an open
/// error the caller reports. The path follows `cd`, as it is resolved
/// against the current working directory on every record.
pub const LOG_FILE: &str = "logs/Hist.log";

const FILE_MODE: u32 = 0o777;

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new() -> AuditLog {
        AuditLog { path: PathBuf::from(LOG_FILE) }
    }

    /// Appends one record for a reaped child. The file is opened in append
    /// mode per record; a failure here is fatal to this entry only.
    pub fn record(&self, command: &str, pid: Pid) -> io::Result<()> {
        let stamp = Local::now().format("log_%Y_%m_%d_%H.%M.%S%.9f");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(FILE_MODE)
            .open(&self.path)?;
        write!(file, "Time: {stamp}\nCommand: {command}\nPID: {pid}\nCommand: {command}\n")
    }
}
