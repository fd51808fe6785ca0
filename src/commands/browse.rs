use anyhow::Result;
use filebridge::boundary::adapter;
use filebridge::util::date::format_modified;
use filebridge::util::fs::{format_size, mode_to_symbolic};
use filebridge::{Resource, SearchResult};

use super::session::{self, Target};

pub fn list(target: &Target, path: &str) -> Result<()> {
    session::open_authenticated(target)?;
    let listing: Resource = session::decode(adapter::list_directory(path))?;

    for item in listing.children() {
        println!("{}", format_entry(item));
    }
    println!(
        "\n{} directories, {} files",
        listing.num_dirs, listing.num_files
    );
    Ok(())
}

pub fn info(target: &Target, path: &str) -> Result<()> {
    session::open_authenticated(target)?;
    let resource: Resource = session::decode(adapter::get_resource(path))?;

    println!("Path:      {}", resource.path);
    println!("Name:      {}", resource.name);
    println!(
        "Kind:      {}",
        if resource.is_dir {
            "directory"
        } else if resource.kind.is_empty() {
            "file"
        } else {
            resource.kind.as_str()
        }
    );
    println!("Size:      {}", format_size(resource.size));
    println!("Mode:      {}", mode_to_symbolic(resource.mode));
    println!("Modified:  {}", format_modified(&resource.modified));
    if resource.is_symlink {
        println!("Symlink:   yes");
    }
    if resource.is_dir {
        println!(
            "Contents:  {} directories, {} files",
            resource.num_dirs, resource.num_files
        );
    }
    Ok(())
}

pub fn search(target: &Target, query: &str, path: &str) -> Result<()> {
    session::open_authenticated(target)?;
    let results: Vec<SearchResult> = session::decode(adapter::search(query, path))?;

    if results.is_empty() {
        println!("No matches for `{}`", query);
    }
    for result in results {
        if result.dir {
            println!("{}/", result.path);
        } else {
            println!("{}", result.path);
        }
    }
    Ok(())
}

fn format_entry(item: &Resource) -> String {
    let name = if item.is_dir {
        format!("{}/", item.name)
    } else {
        item.name.clone()
    };

    format!(
        "{} {:>7} {} {}",
        mode_to_symbolic(item.mode),
        format_size(item.size),
        format_modified(&item.modified),
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_mark_directories() {
        let dir = Resource {
            name: "photos".to_string(),
            is_dir: true,
            mode: 2147484141.0,
            modified: "2024-03-01T10:15:30Z".to_string(),
            ..Default::default()
        };
        assert_eq!(format_entry(&dir), "drwxr-xr-x      0B 2024-03-01 10:15 photos/");
    }
}
