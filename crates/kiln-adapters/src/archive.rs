//! Skeleton download and extraction for features that ship an application
//! template (`web-app`).

use std::{
    io::Read,
    path::{Component, Path, PathBuf},
    time::Duration,
};

use flate2::read::GzDecoder;
use kiln_core::{
    application::{ApplicationError, ports::ArchiveFetcher},
    error::KilnResult,
};
use tar::{Archive, EntryType};
use thiserror::Error;
use tracing::{debug, info, instrument};

const USER_AGENT: &str = concat!("kiln/", env!("CARGO_PKG_VERSION"));

/// Failures while unpacking an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {0}")]
    Status(reqwest::StatusCode),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry '{0}' escapes the destination")]
    UnsafeEntry(PathBuf),

    #[error("archive contains no files")]
    Empty,

    #[error("destination '{0}' has no parent directory")]
    Destination(PathBuf),
}

/// Fetches a `.tar.gz` over HTTPS and unpacks it, dropping the archive's
/// single top-level directory.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    timeout: Duration,
}

impl HttpArchiveFetcher {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn download(&self, url: &str, dest: &Path) -> Result<usize, ArchiveError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()?;
        let response = client.get(url).send()?;
        if !response.status().is_success() {
            return Err(ArchiveError::Status(response.status()));
        }
        install_tar_gz(response, dest)
    }
}

impl Default for HttpArchiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFetcher for HttpArchiveFetcher {
    #[instrument(skip(self), fields(dest = %dest.display()))]
    fn fetch_into(&self, url: &str, dest: &Path) -> KilnResult<usize> {
        info!("downloading skeleton");
        let written = self
            .download(url, dest)
            .map_err(|e| ApplicationError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        info!(files = written, "skeleton unpacked");
        Ok(written)
    }
}

/// Unpack a gzip-compressed tarball and move it into `dest` in one rename.
///
/// Extraction happens in a hidden sibling of `dest`, which is discarded on
/// any error, so an interrupted download never leaves a partial skeleton.
/// `dest` must be absent or empty.
pub fn install_tar_gz(reader: impl Read, dest: &Path) -> Result<usize, ArchiveError> {
    let parent = dest
        .parent()
        .ok_or_else(|| ArchiveError::Destination(dest.to_path_buf()))?;
    let staging = tempfile::Builder::new()
        .prefix(".kiln-fetch-")
        .tempdir_in(parent)?;

    let written = extract_tar_gz(reader, staging.path())?;

    if dest.is_dir() {
        std::fs::remove_dir(dest)?;
    }
    std::fs::rename(staging.path(), dest)?;
    debug!(staging = %staging.path().display(), "skeleton moved into place");
    Ok(written)
}

/// Unpack a gzip-compressed tarball into `dest`.
///
/// The first path component of every entry is stripped. Entries that would
/// land outside `dest` abort the extraction. Returns the number of files
/// written.
pub fn extract_tar_gz(reader: impl Read, dest: &Path) -> Result<usize, ArchiveError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    std::fs::create_dir_all(dest)?;

    let mut written = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let kind = entry.header().entry_type();
        let path = entry.path()?.into_owned();

        let Some(relative) = strip_top_level(&path)? else {
            continue;
        };
        let target = dest.join(&relative);

        match kind {
            EntryType::Directory => std::fs::create_dir_all(&target)?,
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                entry.unpack(&target)?;
                written += 1;
            }
            other => debug!(path = %path.display(), kind = ?other, "skipped entry"),
        }
    }

    if written == 0 {
        return Err(ArchiveError::Empty);
    }
    Ok(written)
}

fn strip_top_level(path: &Path) -> Result<Option<PathBuf>, ArchiveError> {
    let mut components = path.components();
    components.next();

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(ArchiveError::UnsafeEntry(path.to_path_buf())),
        }
    }
    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}
