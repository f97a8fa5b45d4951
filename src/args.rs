use clap::{Parser, Subcommand};
use std::path::PathBuf;

use embedserve::config::{DEFAULT_GZIP_LEVEL, DEFAULT_ZSTD_LEVEL};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Directory packaged into the catalog
    #[arg(short, long)]
    pub serve_dir: PathBuf,

    /// Module name the resources are packaged under
    #[arg(short, long, default_value = "app")]
    pub module: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve one request against an embedded directory and print the response
    Resolve {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// URL prefix the catalog is bound to
        #[arg(short = 'd', long, default_value = "/")]
        virtual_dir: String,

        /// Namespace inside the module exposed by the virtual directory
        #[arg(short, long, default_value = "")]
        namespace: String,

        #[arg(long, default_value = "GET")]
        method: String,

        /// Request header as "Name: value"; may be repeated
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(short, long, default_value_t = DEFAULT_ZSTD_LEVEL)]
        zstd_level: i32,

        #[arg(short, long, default_value_t = DEFAULT_GZIP_LEVEL)]
        gzip_level: u32,

        /// Regex of request paths that are never compressed; may be repeated
        #[arg(short, long = "bypass")]
        bypass_patterns: Vec<String>,

        /// Request path, e.g. /Content/site.css
        path: String,
    },

    /// List the views packaged in a directory
    Views {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Root namespace stripped from view locations
        #[arg(short, long)]
        root_namespace: Option<String>,

        /// View extensions to look for, e.g. html sshtml
        extensions: Vec<String>,
    },
}
