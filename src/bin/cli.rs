//! fileshare CLI Client
//!
//! Command-line interface for browsing and transferring shared files.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fileshare::{list_files, Client, DEFAULT_PORT};
use tracing_subscriber::{fmt, EnvFilter};

/// fileshare CLI
#[derive(Parser, Debug)]
#[command(name = "fileshare-cli")]
#[command(about = "CLI for a fileshare server")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the files in the server's shared directory
    List,

    /// List the files in a local directory
    Local {
        /// Directory to list
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Upload a local file
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// Download a file from the server
    Download {
        /// Name of the file on the server
        name: String,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        to: PathBuf,

        /// Write the content to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let client = Client::with_host(&args.host, args.port);

    if let Err(e) = run(&client, args.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(client: &Client, command: Commands) -> fileshare::Result<()> {
    match command {
        Commands::List => {
            let names = client.list()?;
            if names.is_empty() {
                eprintln!("(no files)");
            }
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Local { dir } => {
            for name in list_files(&dir) {
                println!("{}", name);
            }
        }
        Commands::Upload { file } => {
            let name = client.upload_file(&file)?;
            println!("uploaded {}", name);
        }
        Commands::Download { name, to, stdout } => {
            if stdout {
                let content = client.download(&name)?;
                let mut out = std::io::stdout().lock();
                out.write_all(&content)?;
                out.flush()?;
            } else {
                let path = client.download_to(&to, &name)?;
                println!("saved {}", path.display());
            }
        }
    }
    Ok(())
}
