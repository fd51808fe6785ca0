use anyhow::{Context, Result};
use filebridge::boundary::adapter;
use filebridge::ServerCredentials;
use std::io::{self, Write};

use super::session::{self, Target};

pub fn run(target: &Target, username: Option<String>, password: Option<String>) -> Result<()> {
    session::open(target)?;

    let username = match username {
        Some(name) => name,
        None => prompt("Username")?,
    };
    let password = match password {
        Some(password) => password,
        None => {
            // stderr keeps the prompt out of piped output
            eprint!("Password: ");
            io::stderr().flush()?;
            rpassword::read_password().context("Failed to read password")?
        }
    };

    let credentials: ServerCredentials = session::decode(adapter::login(&username, &password))?;
    println!("Logged in to {}", credentials.server_url);
    Ok(())
}

pub fn logout(target: &Target) -> Result<()> {
    let server = session::open(target)?;
    session::check(adapter::logout())?;
    println!("Logged out from {}", server);
    Ok(())
}

fn prompt(field: &str) -> Result<String> {
    print!("{}: ", field);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
