use anyhow::{Context, Result};
use filebridge::config::settings::Config;
use std::io::{self, Write};
use std::path::PathBuf;

pub fn run() -> Result<()> {
    let config_path = Config::default_path()?;

    if config_path.exists() {
        eprintln!(
            "\nConfiguration file already exists at `{}`",
            config_path.display()
        );
        eprintln!("Delete or rename it before creating a new one.");
        return Ok(());
    }

    println!("\nfilebridge configuration setup:");
    println!("Press ENTER to use the default value (shown in brackets)\n");

    let defaults = Config::default();

    let server_url = prompt("Default server URL (empty for none)", "")?;
    let timeout_secs = prompt_parse::<u64>("Timeout in seconds", defaults.timeout_secs)?;
    let auth_file = prompt(
        "Credentials file (empty for the config directory)",
        "",
    )?;

    let config = Config {
        server_url: (!server_url.is_empty()).then_some(server_url),
        timeout_secs,
        auth_file: (!auth_file.is_empty()).then(|| PathBuf::from(auth_file)),
    };
    config.validate()?;

    let written = config
        .save_to_file()
        .context("Failed to create configuration file")?;
    println!("\nConfiguration file created at `{}`", written.display());
    Ok(())
}

fn prompt(field: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", field, default);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn prompt_parse<T>(field: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display,
{
    loop {
        print!("{} [{}]: ", field, default);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Ok(default);
        } else if let Ok(parsed) = trimmed.parse::<T>() {
            return Ok(parsed);
        } else {
            println!("Invalid input, please try again.");
        }
    }
}
