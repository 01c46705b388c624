//! Interrupt handling for validation runs
//!
//! SIGINT, SIGTERM and SIGHUP set a shared flag and stop any running tool
//! process group. The harness checks the flag between matrix steps and
//! unwinds normally, so a mounted payload image is still detached. A second
//! signal exits immediately.

use crate::error::{PatchsetError, Result};
use crate::process_guard::ChildRegistry;
use nix::sys::signal::Signal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared "stop requested" flag
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once the flag is set
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(PatchsetError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Install signal handlers that drive `flag`.
/// Call this once at program start.
pub fn install_handlers(flag: &InterruptFlag) -> std::io::Result<()> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    let flag = flag.clone();

    std::thread::spawn(move || {
        for sig in signals.forever() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };

            if flag.is_set() {
                tracing::warn!("Received second {}, exiting without cleanup", signal_name);
                std::process::exit(128 + sig);
            }

            tracing::info!("Received {}, stopping after the current step", signal_name);
            flag.trigger();

            if let Ok(registry) = ChildRegistry::global().lock() {
                registry.signal_all(Signal::SIGTERM);
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_shared_between_clones() {
        let flag = InterruptFlag::new();
        let clone = flag.clone();
        assert!(flag.check().is_ok());

        clone.trigger();
        assert!(flag.is_set());
        assert!(matches!(flag.check(), Err(PatchsetError::Interrupted)));
    }
}
