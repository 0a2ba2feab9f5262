use std::fs;
use std::io;
use std::path::{Component, Path};
use std::time::SystemTime;

/// Returns the `/`-separated path of `path` relative to `root`, or `None` if
/// `path` isn't under `root` or has a component that isn't valid UTF-8.
pub fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    match parts.is_empty() {
        true => None,
        false => Some(parts.join("/")),
    }
}

/// Drops the extension of the last component of a `/`-separated path, so
/// `2014/hello.markdown` becomes `2014/hello`. Dotfiles keep their name.
pub fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    match path.rfind('.') {
        Some(dot) if dot > file_start => &path[..dot],
        _ => path,
    }
}

/// Returns the modification time of the file at `path`.
pub fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Writes `contents` to `path` unless the file already holds exactly those
/// bytes, creating parent directories as needed. Returns whether the file was
/// written.
pub fn write_if_changed(path: &Path, contents: &[u8]) -> io::Result<bool> {
    match fs::read(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(true)
}
