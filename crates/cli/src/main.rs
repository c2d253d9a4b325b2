//! PG Cards CLI - offline QR, vCard and card preview tools.
//!
//! # Usage
//!
//! ```bash
//! # Export a styled QR code
//! pgc qr "https://pgcards.com/modern/64f1c0ffee" -o card.png --dot-style rounded
//!
//! # Export a contact card from a saved profile
//! pgc vcard profile.json -o jane.vcf
//!
//! # Render a profile with another theme
//! pgc preview profile.yaml --theme epic -o preview.html
//! ```
//!
//! # Commands
//!
//! - `qr` - Render a QR code to PNG, JPEG or SVG
//! - `vcard` - Build a vCard 3.0 file from a profile
//! - `preview` - Render a profile card to a standalone HTML page

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::qr::QrArgs;

#[derive(Parser)]
#[command(name = "pgc")]
#[command(author, version, about = "PG Cards CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a QR code
    Qr(QrArgs),
    /// Export a profile as a vCard
    Vcard {
        /// Profile file (JSON or YAML, backend field names)
        profile: PathBuf,

        /// Output file, defaults to a name derived from the profile
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a profile card as HTML
    Preview {
        /// Profile file (JSON or YAML, backend field names)
        profile: PathBuf,

        /// Theme (`standard`, `modern`, `epic`), defaults to the stored one
        #[arg(short, long)]
        theme: Option<String>,

        /// Accent colour as `#rgb` or `#rrggbb`
        #[arg(short, long)]
        accent: Option<String>,

        /// Stylesheet the page links to
        #[arg(long, default_value = "/static/css/main.css")]
        stylesheet: String,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pgcards_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Qr(args) => commands::qr::export(args).await,
        Commands::Vcard { profile, output } => commands::vcard::export(&profile, output).await,
        Commands::Preview {
            profile,
            theme,
            accent,
            stylesheet,
            output,
        } => {
            commands::preview::render(&profile, theme.as_deref(), accent.as_deref(), &stylesheet, output)
                .await
        }
    }
}
