//! Payload archive download

use crate::error::{PatchsetError, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Downloads a payload archive to a local path.
pub trait ArchiveFetcher {
    /// Fetch `url` into `destination`. On failure nothing is left at
    /// `destination`.
    fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Blocking HTTP(S) fetcher. No retries; a failure is fatal to the run.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(30))
            .redirects(8)
            .build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, destination.display());

        let response = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, _)) => {
                return Err(PatchsetError::download(url, format!("http status {}", code)));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(PatchsetError::download(url, format!("transport error: {}", err)));
            }
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stream into a sibling temp file so a partial download never looks complete
        let partial = partial_path(destination);
        let copied = File::create(&partial).and_then(|mut file| {
            let mut reader = response.into_reader();
            io::copy(&mut reader, &mut file)
        });

        match copied {
            Ok(bytes) => {
                fs::rename(&partial, destination)?;
                info!("Downloaded {} bytes", bytes);
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&partial);
                Err(PatchsetError::download(url, e.to_string()))
            }
        }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    destination.with_file_name(name)
}
