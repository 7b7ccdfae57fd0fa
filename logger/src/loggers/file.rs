use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{LogMessage, Logger};

/// What to do when the log file already exists
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileConflictBehavior {
    /// Log to `name_1.ext`, `name_2.ext`, ... instead
    AppendNumber,
    Append,
    Error,
    Overwrite,
    /// Move the old file to `name_old_N.ext` and start fresh
    RenameOld,
}

pub struct FileLogger {
    file: File,
    path: PathBuf,
}

impl Logger for FileLogger {
    fn log(&mut self, message: &LogMessage) -> bool {
        writeln!(
            self.file,
            "({}) | {:?} : {}",
            message.time.format("%Y-%b-%d %H:%M:%S"),
            message.severity,
            message.content
        )
        .is_ok()
    }
}

impl FileLogger {
    pub fn new(path: PathBuf, behavior: FileConflictBehavior) -> Result<Self, std::io::Error> {
        if !path.try_exists()? {
            let file = File::create(&path)?;
            return Ok(Self { file, path });
        }
        let (file, path) = match behavior {
            FileConflictBehavior::AppendNumber => {
                let fresh = first_free_sibling(&path, "")?;
                (File::create(&fresh)?, fresh)
            }
            FileConflictBehavior::Append => (File::options().append(true).open(&path)?, path),
            FileConflictBehavior::Error => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("log file {} already exists", path.display()),
                ));
            }
            FileConflictBehavior::Overwrite => (File::create(&path)?, path),
            FileConflictBehavior::RenameOld => {
                let old = first_free_sibling(&path, "old_")?;
                std::fs::rename(&path, old)?;
                (File::create(&path)?, path)
            }
        };
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `dir/stem_<infix>N.ext` for the lowest N >= 1 that doesn't exist yet
fn first_free_sibling(path: &Path, infix: &str) -> Result<PathBuf, std::io::Error> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut counter = 1;
    loop {
        let mut candidate = path.with_file_name(format!("{}_{}{}", stem, infix, counter));
        if let Some(extension) = path.extension() {
            candidate.set_extension(extension);
        }
        if !candidate.try_exists()? {
            return Ok(candidate);
        }
        counter += 1;
    }
}
