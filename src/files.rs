use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use relative_path::{Component, RelativePath, RelativePathBuf};

fn filter_file(file: &Path) -> bool {
    let Some(filename) = file.file_name().and_then(OsStr::to_str) else {
        return false;
    };

    let is_backup = filename.ends_with('~');
    let is_buffer = filename.ends_with('#') && filename.starts_with('#');

    file.is_file() && !is_buffer && !is_backup
}

/// True when `new` is missing or older than `old`.
pub(crate) fn file_changed(old: &Path, new: &Path) -> std::io::Result<bool> {
    Ok(!new.exists() || new.metadata()?.modified()? < old.metadata()?.modified()?)
}

pub(crate) fn writeable(path: &Path) -> std::io::Result<std::fs::File> {
    use std::fs::{create_dir_all, File};

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    File::create(path)
}

/// Write `contents` at `route` below `dest`, creating directories as needed.
pub fn write_route(dest: &Path, route: &RelativePath, contents: &[u8]) -> std::io::Result<PathBuf> {
    if route.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("route `{}` leaves the output directory", route),
        ));
    }

    let path = route.to_path(dest);
    writeable(&path)?.write_all(contents)?;
    log::debug!("Wrote {:?}", path);
    Ok(path)
}

/// Copies a site's static assets into the output under `static/`.
pub struct StaticFiles {
    source: PathBuf,
}

impl StaticFiles {
    pub fn new(source: &Path) -> Self {
        Self {
            source: source.to_owned(),
        }
    }

    /// Copy every asset that is new or changed. Returns the number copied.
    pub fn copy_into(&self, dest: &Path) -> anyhow::Result<usize> {
        if !self.source.is_dir() {
            log::info!("No static directory at {:?}", self.source);
            return Ok(0);
        }

        let mut copied = 0;
        for entry in walkdir::WalkDir::new(&self.source).sort_by_file_name() {
            let file = entry?.into_path();
            if !filter_file(&file) {
                continue;
            }

            let relative = RelativePathBuf::from_path(file.strip_prefix(&self.source)?)?;
            let target = RelativePath::new("static").join(relative).to_path(dest);
            if !file_changed(&file, &target)? {
                continue;
            }

            log::info!("Copying {:?}", file);
            writeable(&target)?.write_all(std::fs::read(&file)?.as_slice())?;
            copied += 1;
        }

        Ok(copied)
    }
}
