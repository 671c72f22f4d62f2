//! Expanding uploaded archives (container images, tarballs) into directory
//! artifacts.
//!
//! Unpacking always happens inside a transaction body, on a blocking thread,
//! so the interface is synchronous.

use std::fmt::Debug;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};

pub trait ArchiveUnpacker: Send + Sync + Debug + 'static {
    /// Expand the archive at `archive` into the directory `destination`,
    /// which does not exist yet.
    fn unpack(&self, archive: &Path, destination: &Path) -> anyhow::Result<()>;
}

/// Runs an external program as `<argv...> <archive> <destination>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandUnpacker {
    program: String,
    args: Vec<String>,
}

impl CommandUnpacker {
    /// `None` if `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ArchiveUnpacker for CommandUnpacker {
    fn unpack(&self, archive: &Path, destination: &Path) -> anyhow::Result<()> {
        tracing::debug!(
            program = %self.program,
            archive = %archive.display(),
            destination = %destination.display(),
            "unpacking archive"
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(archive)
            .arg(destination)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to spawn unpacker `{}`", self.program))?;

        if !output.status.success() {
            bail!(
                "unpacker `{}` exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Spill `content` to a scratch file and unpack it into `destination`.
pub(crate) fn unpack_bytes(
    unpacker: &dyn ArchiveUnpacker,
    content: &[u8],
    destination: &Path,
) -> anyhow::Result<()> {
    let mut archive = tempfile::NamedTempFile::new().context("failed to create scratch archive")?;
    archive
        .write_all(content)
        .context("failed to write scratch archive")?;
    archive.flush()?;
    unpacker.unpack(archive.path(), destination)
}
