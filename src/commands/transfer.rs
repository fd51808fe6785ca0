use anyhow::{Context, Result};
use filebridge::boundary::adapter;
use filebridge::util::path::{get_file_name, join_path, normalize_remote_path};
use std::path::{Path, PathBuf};

use super::session::{self, Target};

pub fn get(target: &Target, remote: &str, local: Option<PathBuf>) -> Result<()> {
    session::open_authenticated(target)?;
    let remote = normalize_remote_path(remote);

    let name = get_file_name(&remote);
    let local = match local {
        Some(path) if path.is_dir() => path.join(&name),
        Some(path) => path,
        None => PathBuf::from(&name),
    };
    let local_str = local
        .to_str()
        .with_context(|| format!("Local path {} is not valid UTF-8", local.display()))?;

    session::check(adapter::download_to_file(&remote, local_str))?;
    println!("{} -> {}", remote, local.display());
    Ok(())
}

pub fn put(target: &Target, local: &Path, remote: &str, force: bool) -> Result<()> {
    session::open_authenticated(target)?;

    // A trailing slash means "into this directory".
    let remote = if remote.ends_with('/') {
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Cannot derive a remote name from {}", local.display()))?;
        join_path(remote, name)
    } else {
        normalize_remote_path(remote)
    };
    let local_str = local
        .to_str()
        .with_context(|| format!("Local path {} is not valid UTF-8", local.display()))?;

    session::check(adapter::upload_from_file(&remote, local_str, force))
        .with_context(|| format!("Upload to {} failed (use --force to overwrite)", remote))?;
    println!("{} -> {}", local.display(), remote);
    Ok(())
}
