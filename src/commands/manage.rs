use anyhow::Result;
use filebridge::boundary::adapter;

use super::session::{self, Target};

pub fn mkdir(target: &Target, path: &str) -> Result<()> {
    session::open_authenticated(target)?;
    session::check(adapter::create_directory(path))
}

pub fn remove(target: &Target, path: &str) -> Result<()> {
    session::open_authenticated(target)?;
    session::check(adapter::delete(path))
}

pub fn rename(target: &Target, source: &str, destination: &str, force: bool) -> Result<()> {
    session::open_authenticated(target)?;
    session::check(adapter::rename(source, destination, force))?;
    println!("{} -> {}", source, destination);
    Ok(())
}

pub fn copy(target: &Target, source: &str, destination: &str, force: bool) -> Result<()> {
    session::open_authenticated(target)?;
    session::check(adapter::copy(source, destination, force))?;
    println!("{} -> {}", source, destination);
    Ok(())
}
