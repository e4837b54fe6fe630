use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "credsweep",
    version,
    about = "Dictionary search for web login and archive passwords"
)]
pub struct Cli {
    /// Verbose human output
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue, global = true)]
    pub verbose: bool,

    /// Debug logs (implies verbose)
    #[arg(short = 'd', long = "debug", action = ArgAction::SetTrue, global = true)]
    pub debug: bool,

    /// Configuration file (YAML)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search for the password of a web login form
    Web(WebArgs),
    /// Search for the password of an encrypted zip archive
    Archive(ArchiveArgs),
    /// List wordlist sources in search order
    Wordlists(ListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WebArgs {
    /// Login page URL
    #[arg(short = 'u', long = "url")]
    pub url: Url,

    /// Account name submitted with every candidate
    #[arg(short = 'U', long = "username")]
    pub username: String,

    /// Use only this wordlist file
    #[arg(short = 'w', long = "wordlist")]
    pub wordlist: Option<PathBuf>,

    /// Local wordlist size tier: all, small, medium, big
    #[arg(short = 't', long = "tier")]
    pub tier: Option<String>,

    /// Skip the headless browser and discover the form from plain HTML
    #[arg(long = "no-browser", action = ArgAction::SetTrue)]
    pub no_browser: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Encrypted zip archive
    #[arg(short = 'p', long = "path")]
    pub path: PathBuf,

    /// Use only this wordlist file
    #[arg(short = 'w', long = "wordlist")]
    pub wordlist: Option<PathBuf>,

    /// Local wordlist size tier: all, small, medium, big
    #[arg(short = 't', long = "tier")]
    pub tier: Option<String>,

    /// Extract the archive once the password is found
    #[arg(short = 'x', long = "extract", action = ArgAction::SetTrue)]
    pub extract: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Local wordlist size tier: all, small, medium, big
    #[arg(short = 't', long = "tier")]
    pub tier: Option<String>,
}
