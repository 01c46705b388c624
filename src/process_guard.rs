//! Process lifecycle management for external tools
//!
//! Mount, build and validate tools run in their own process group so an
//! interrupt can stop the whole tool tree with one signal, and so a terminal
//! Ctrl+C reaches only the harness, which then decides how to unwind.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

/// Global registry of running tool process groups
static CHILD_REGISTRY: OnceLock<Mutex<ChildRegistry>> = OnceLock::new();

/// Process groups of tools that are currently running
#[derive(Debug, Default)]
pub struct ChildRegistry {
    pids: HashSet<u32>,
}

impl ChildRegistry {
    pub fn global() -> &'static Mutex<ChildRegistry> {
        CHILD_REGISTRY.get_or_init(|| Mutex::new(ChildRegistry::default()))
    }

    pub fn register(&mut self, pid: u32) {
        self.pids.insert(pid);
        tracing::debug!("Registered tool process group {}", pid);
    }

    pub fn unregister(&mut self, pid: u32) {
        self.pids.remove(&pid);
        tracing::debug!("Unregistered tool process group {}", pid);
    }

    pub fn count(&self) -> usize {
        self.pids.len()
    }

    /// Send `sig` to every registered process group
    pub fn signal_all(&self, sig: Signal) {
        for &pid in &self.pids {
            if let Err(e) = send_signal_to_group(pid, sig) {
                tracing::warn!("Failed to send {} to process group {}: {}", sig, pid, e);
            }
        }
    }
}

/// Negative PID addresses the whole group
fn send_signal_to_group(pgid: u32, sig: Signal) -> Result<(), nix::Error> {
    let pgid = i32::try_from(pgid).map_err(|_| nix::Error::EINVAL)?;
    signal::kill(Pid::from_raw(-pgid), sig)
}

/// Register `pid` for the lifetime of the returned token
pub(crate) struct Registration(u32);

impl Registration {
    pub(crate) fn new(pid: u32) -> Self {
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.register(pid);
        }
        Self(pid)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Ok(mut registry) = ChildRegistry::global().lock() {
            registry.unregister(self.0);
        }
    }
}

/// Extension trait for std::process::Command to set up process groups
pub trait CommandProcessGroup {
    /// Run the command as the leader of a new process group
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // SAFETY: setpgid and prctl are async-signal-safe
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::from)?;

                // Tool dies with the harness
                #[cfg(target_os = "linux")]
                if nix::libc::prctl(nix::libc::PR_SET_PDEATHSIG, nix::libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}
