use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const FALLBACK_INPUT_NAME: &str = "input_file";
const OUTPUT_DIR_NAME: &str = "output";

/// Per-request scratch directory. Removed with everything in it by [`Workspace::close`],
/// or when dropped.
pub struct Workspace {
    dir: TempDir,
    input_file: PathBuf,
    output_dir: PathBuf,
}

impl Workspace {
    /// Creates the directory under `parent` (or the system temp dir) with an empty
    /// `output/` subdirectory. The input file is named after the last segment of
    /// `input_ref`.
    pub async fn create(parent: Option<&Path>, input_ref: &str) -> io::Result<Self> {
        let parent = parent.map(Path::to_path_buf);
        let input_name = input_file_name(input_ref).to_string();

        tokio::task::spawn_blocking(move || Self::create_blocking(parent.as_deref(), &input_name))
            .await
            .map_err(io::Error::other)?
    }

    fn create_blocking(parent: Option<&Path>, input_name: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("prediction-");

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        let input_file = dir.path().join(input_name);
        let output_dir = dir.path().join(OUTPUT_DIR_NAME);
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            dir,
            input_file,
            output_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_file(&self) -> &Path {
        &self.input_file
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Removes the directory on the blocking pool.
    pub async fn close(self) {
        let path = self.dir.path().to_path_buf();
        debug!("Removing workspace {}", path.display());

        match tokio::task::spawn_blocking(move || self.dir.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to remove workspace {}: {}", path.display(), e),
            Err(e) => warn!("Workspace cleanup task failed for {}: {}", path.display(), e),
        }
    }
}

/// Last `/`-separated segment of a reference, empty for a trailing slash.
pub fn base_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn input_file_name(input_ref: &str) -> &str {
    match base_name(input_ref) {
        "" | "." | ".." => FALLBACK_INPUT_NAME,
        name if name == OUTPUT_DIR_NAME => FALLBACK_INPUT_NAME,
        name => name,
    }
}
