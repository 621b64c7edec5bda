use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use trove_cache::atomic_write_with;
use trove_coordinates::ModelCoordinate;
use trove_scheduler::Progress;

use crate::url::sanitize_url;
use crate::{LocalRepository, ModelRepository, RepositoryError};

/// A local repository that fills misses from a remote Maven-layout repository.
#[derive(Clone)]
pub struct HttpRepository {
    local: LocalRepository,
    remote_url: String,
    agent: ureq::Agent,
}

impl HttpRepository {
    pub fn new(local: LocalRepository, remote_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            local,
            remote_url: remote_url.into().trim_end_matches('/').to_owned(),
            agent,
        }
    }

    pub fn local(&self) -> &LocalRepository {
        &self.local
    }

    pub fn remote_url_for(&self, coordinate: &ModelCoordinate) -> String {
        format!("{}/{}", self.remote_url, coordinate.repository_path())
    }

    fn download(
        &self,
        coordinate: &ModelCoordinate,
        dest: &Path,
        progress: &Progress,
    ) -> Result<(), RepositoryError> {
        let url = self.remote_url_for(coordinate);
        let safe_url = sanitize_url(&url);

        let response = self.agent.get(&url).call().map_err(|err| match err {
            ureq::Error::Status(404, _) => RepositoryError::NotFound {
                coordinate: coordinate.to_string(),
            },
            ureq::Error::Status(code, _) => RepositoryError::Http {
                message: format!("server returned status {code} for {safe_url}"),
            },
            ureq::Error::Transport(transport) => RepositoryError::Http {
                message: format!("transport error for {safe_url}: {}", transport.kind()),
            },
        })?;

        let total = response
            .header("Content-Length")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|total| *total > 0);

        tracing::info!(
            target: "trove.repository",
            coordinate = %coordinate,
            url = %safe_url,
            bytes = ?total,
            "downloading model archive"
        );

        atomic_write_with(dest, |out| {
            let mut reader = response.into_reader();
            copy_with_progress(&mut reader, out, total, progress)?;
            Ok(())
        })?;
        Ok(())
    }
}

fn copy_with_progress(
    reader: &mut dyn Read,
    out: &mut dyn Write,
    total: Option<u64>,
    progress: &Progress,
) -> io::Result<u64> {
    let mut buf = [0_u8; 64 * 1024];
    let mut copied = 0u64;
    let mut last_reported = None;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        out.write_all(&buf[..read])?;
        copied += read as u64;

        if let Some(total) = total {
            let percentage = ((copied.min(total) * 100) / total) as u32;
            if last_reported != Some(percentage) {
                last_reported = Some(percentage);
                progress.report(None, Some(percentage));
            }
        }
    }
    out.flush()?;
    Ok(copied)
}

impl ModelRepository for HttpRepository {
    fn location(&self, coordinate: &ModelCoordinate) -> PathBuf {
        self.local.location(coordinate)
    }

    fn resolve(
        &self,
        coordinate: &ModelCoordinate,
        progress: &Progress,
    ) -> Result<PathBuf, RepositoryError> {
        let dest = self.location(coordinate);
        if dest.is_file() {
            return Ok(dest);
        }
        self.download(coordinate, &dest, progress)?;
        progress.finish(Some(format!("downloaded {coordinate}")));
        Ok(dest)
    }
}
