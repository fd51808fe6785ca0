use clap::{Parser, Subcommand};
use std::path::PathBuf;
mod commands;

#[derive(Parser)]
#[command(name = "filebridge")]
#[command(
    about = "A command line client for Filebrowser servers",
    long_about = r#"
        filebridge talks to a Filebrowser server over its HTTP API.
        It supports:
        • Logging in once and reusing the stored token
        • Browsing, searching and transferring files
        • Creating, moving, copying and deleting remote entries
    "#
)]
struct Cli {
    /// Server URL; falls back to the config file, then the last login
    #[arg(long, short = 's', env = "FILEBRIDGE_SERVER", global = true)]
    server: Option<String>,

    /// Use this token instead of the stored one
    #[arg(long, env = "FILEBRIDGE_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the configuration file interactively
    Config,
    /// Log in and store the token
    Login {
        #[arg(long, short = 'u')]
        username: Option<String>,
        /// Prompted for without echo when omitted
        #[arg(long, short = 'p')]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Show details about a file or directory
    Info { path: String },
    /// Download a file
    Get {
        remote: String,
        local: Option<PathBuf>,
    },
    /// Upload a file
    Put {
        local: PathBuf,
        remote: String,
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Delete a file or directory
    Rm { path: String },
    /// Move or rename
    Mv {
        source: String,
        destination: String,
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Copy
    Cp {
        source: String,
        destination: String,
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Create a directory
    Mkdir { path: String },
    /// Search below a directory
    Search {
        query: String,
        #[arg(long, short = 'p', default_value = "/")]
        path: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let target = commands::session::Target {
        server: cli.server,
        token: cli.token,
    };

    // Commands talk to the server through the same boundary a foreign host uses.
    let result = match cli.command {
        Commands::Config => commands::config::run(),
        Commands::Login { username, password } => {
            commands::login::run(&target, username, password)
        }
        Commands::Logout => commands::login::logout(&target),
        Commands::Ls { path } => commands::browse::list(&target, &path),
        Commands::Info { path } => commands::browse::info(&target, &path),
        Commands::Search { query, path } => commands::browse::search(&target, &query, &path),
        Commands::Get { remote, local } => commands::transfer::get(&target, &remote, local),
        Commands::Put {
            local,
            remote,
            force,
        } => commands::transfer::put(&target, &local, &remote, force),
        Commands::Rm { path } => commands::manage::remove(&target, &path),
        Commands::Mv {
            source,
            destination,
            force,
        } => commands::manage::rename(&target, &source, &destination, force),
        Commands::Cp {
            source,
            destination,
            force,
        } => commands::manage::copy(&target, &source, &destination, force),
        Commands::Mkdir { path } => commands::manage::mkdir(&target, &path),
    };
    filebridge::boundary::adapter::destroy_client();

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
