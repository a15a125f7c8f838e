//! CLI entry point for sanity-blog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sanity_blog::Blog;

#[derive(Parser)]
#[command(name = "sanity-blog")]
#[command(version)]
#[command(about = "A server-rendered blog front-end for a Sanity content backend", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Serve content from a local JSON dataset instead of the backend
    /// (relative to the current directory, not --cwd)
    #[arg(short, long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Skip rendering known posts at start-up
        #[arg(long)]
        no_prerender: bool,
    },

    /// Export the site as static files
    #[command(alias = "g")]
    Generate,

    /// List posts
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "sanity_blog=debug,info"
    } else {
        "sanity_blog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let fixture = cli.fixture;
    let cwd = cli.cwd;

    match cli.command {
        Commands::Server {
            port,
            ip,
            no_prerender,
        } => {
            let blog = Blog::open(cwd, fixture)?;
            tracing::info!("Starting server at http://{}:{}", ip, port);
            sanity_blog::server::start(&blog, &ip, port, !no_prerender).await?;
        }

        Commands::Generate => {
            let blog = Blog::open(cwd, fixture)?;
            tracing::info!("Generating static files...");
            let written = blog.generate().await?;
            println!("Generated {} post pages successfully!", written);
        }

        Commands::List => {
            let blog = Blog::open(cwd, fixture)?;
            sanity_blog::commands::list::run(&blog).await?;
        }

        Commands::Version => {
            println!("sanity-blog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
