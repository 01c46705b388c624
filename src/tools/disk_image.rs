//! Disk image mounting
//!
//! The payload store ships as an encrypted disk image. `MountedImage` is the
//! scoped handle: acquiring it attaches the image (unless something already
//! has it mounted), and every exit path detaches it again and deletes the
//! shadow overlay.

use crate::error::Result;
use crate::tool_runner::run_tool;
use crate::tool_traits::ToolInvocation;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Attach/detach primitive for a disk image.
pub trait DiskImageTool {
    /// Attach `image` at `mountpoint`, writing through `shadow` when given.
    fn attach(&self, image: &Path, mountpoint: &Path, shadow: Option<&Path>) -> Result<()>;

    fn detach(&self, mountpoint: &Path) -> Result<()>;
}

// ============================================================================
// hdiutil
// ============================================================================

/// macOS `hdiutil`
#[derive(Debug, Clone)]
pub struct Hdiutil {
    pub program: PathBuf,
    pub passphrase: String,
}

impl Hdiutil {
    pub fn new(program: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            passphrase: passphrase.into(),
        }
    }
}

/// `hdiutil attach -noverify <image> -mountpoint <dir> -nobrowse [-shadow <file>] -passphrase <pw>`
#[derive(Debug)]
pub struct AttachArgs<'a> {
    pub program: &'a Path,
    pub image: &'a Path,
    pub mountpoint: &'a Path,
    pub shadow: Option<&'a Path>,
    pub passphrase: &'a str,
}

impl ToolInvocation for AttachArgs<'_> {
    fn program(&self) -> &Path {
        self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "attach".to_string(),
            "-noverify".to_string(),
            self.image.display().to_string(),
            "-mountpoint".to_string(),
            self.mountpoint.display().to_string(),
            "-nobrowse".to_string(),
        ];
        if let Some(shadow) = self.shadow {
            args.push("-shadow".to_string());
            args.push(shadow.display().to_string());
        }
        args.push("-passphrase".to_string());
        args.push(self.passphrase.to_string());
        args
    }

    fn tool_name(&self) -> String {
        "hdiutil attach".to_string()
    }
}

/// `hdiutil detach <mountpoint> -force`
#[derive(Debug)]
pub struct DetachArgs<'a> {
    pub program: &'a Path,
    pub mountpoint: &'a Path,
}

impl ToolInvocation for DetachArgs<'_> {
    fn program(&self) -> &Path {
        self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "detach".to_string(),
            self.mountpoint.display().to_string(),
            "-force".to_string(),
        ]
    }

    fn tool_name(&self) -> String {
        "hdiutil detach".to_string()
    }
}

impl DiskImageTool for Hdiutil {
    fn attach(&self, image: &Path, mountpoint: &Path, shadow: Option<&Path>) -> Result<()> {
        let args = AttachArgs {
            program: &self.program,
            image,
            mountpoint,
            shadow,
            passphrase: &self.passphrase,
        };
        run_tool(&args)?.ensure_success()?;
        Ok(())
    }

    fn detach(&self, mountpoint: &Path) -> Result<()> {
        let args = DetachArgs {
            program: &self.program,
            mountpoint,
        };
        run_tool(&args)?.ensure_success()?;
        Ok(())
    }
}

// ============================================================================
// Scoped mount
// ============================================================================

/// A mounted payload image, detached when released or dropped.
///
/// When the mountpoint is already populated at acquisition time the mount is
/// borrowed: it is used as-is and left mounted afterwards.
pub struct MountedImage<'a> {
    tool: &'a dyn DiskImageTool,
    mountpoint: PathBuf,
    shadow: Option<PathBuf>,
    owned: bool,
    released: bool,
}

impl<'a> MountedImage<'a> {
    pub fn acquire(
        tool: &'a dyn DiskImageTool,
        image: &Path,
        mountpoint: &Path,
        shadow: Option<&Path>,
    ) -> Result<Self> {
        if is_mounted(mountpoint) {
            info!("{} is already mounted, using it as-is", mountpoint.display());
            return Ok(Self {
                tool,
                mountpoint: mountpoint.to_path_buf(),
                shadow: None,
                owned: false,
                released: false,
            });
        }

        if let Some(shadow) = shadow {
            if shadow.exists() {
                debug!("Removing stale shadow {}", shadow.display());
                fs::remove_file(shadow)?;
            }
        }

        tool.attach(image, mountpoint, shadow)?;
        info!("Mounted {} at {}", image.display(), mountpoint.display());

        Ok(Self {
            tool,
            mountpoint: mountpoint.to_path_buf(),
            shadow: shadow.map(Path::to_path_buf),
            owned: true,
            released: false,
        })
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    /// Whether the mount was found in place rather than attached here
    pub fn is_borrowed(&self) -> bool {
        !self.owned
    }

    /// Detach now, surfacing a detach failure. The shadow overlay is removed
    /// either way.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        if !self.owned {
            return Ok(());
        }

        let detached = self.tool.detach(&self.mountpoint);
        self.remove_shadow();
        detached?;
        info!("Unmounted {}", self.mountpoint.display());
        Ok(())
    }

    fn remove_shadow(&self) {
        if let Some(shadow) = &self.shadow {
            if let Err(e) = fs::remove_file(shadow) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove shadow {}: {}", shadow.display(), e);
                }
            }
        }
    }
}

impl Drop for MountedImage<'_> {
    fn drop(&mut self) {
        if self.released || !self.owned {
            return;
        }

        // Unwinding from an earlier error: log, never replace it
        if let Err(e) = self.tool.detach(&self.mountpoint) {
            warn!("Failed to unmount {}: {}", self.mountpoint.display(), e);
        }
        self.remove_shadow();
    }
}

/// A mountpoint with at least one entry is taken to be mounted already
pub fn is_mounted(mountpoint: &Path) -> bool {
    fs::read_dir(mountpoint)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
