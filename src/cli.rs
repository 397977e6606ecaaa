use crate::constants::{DEFAULT_COMPRESSION_QUALITY, DEFAULT_FIGMA_API_BASE_URL, DEFAULT_FORMAT, DEFAULT_SCALE};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "figma-squeeze",
    about = "Export Figma nodes as compressed images and upload them to storage",
    long_about = "figma-squeeze renders Figma nodes through the Figma REST API, downloads the images, \
                  compresses them (pngquant for PNG, re-encoding for JPEG/WebP) and uploads them to a \
                  signed upload endpoint or Walrus decentralized storage.",
    version,
    after_help = "EXAMPLES:\n  \
    figma-squeeze export --file-key AbC123 --node-ids 1:2,1:3\n  \
    figma-squeeze export --file-key AbC123 --node-ids 10:1 --nodes-only --format jpg -q 0.7\n  \
    figma-squeeze children --file-key AbC123 --node-ids 10:1\n  \
    figma-squeeze upload ./assets\n  \
    figma-squeeze compress icon.png -q 0.6"
)]
pub struct Args {
    #[arg(short = 'Q', long, global = true, help = "Only log warnings and errors")]
    pub quiet: bool,

    #[arg(
        short = 'v',
        long,
        global = true,
        conflicts_with = "quiet",
        help = "Enable debug logging"
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Figma connection flags shared by the commands that talk to the API
#[derive(clap::Args, Debug, Clone)]
pub struct FigmaArgs {
    #[arg(
        long,
        env = "FIGMA_ACCESS_TOKEN",
        hide_env_values = true,
        help = "Figma personal access token"
    )]
    pub access_token: String,

    #[arg(
        long,
        env = "FIGMA_API_BASE_URL",
        default_value = DEFAULT_FIGMA_API_BASE_URL,
        help = "Figma REST API base URL"
    )]
    pub api_base_url: String,

    #[arg(short = 'k', long, help = "Figma file key (from the file URL)")]
    pub file_key: String,

    #[arg(
        short = 'n',
        long,
        help = "Comma-separated node ids",
        long_help = "Comma-separated node ids, e.g. '1:2,1:3'. Blank entries are ignored."
    )]
    pub node_ids: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Export the children of Figma nodes, compress and upload them",
        long_about = "Resolve the direct children of the given nodes (or the nodes themselves with \
                      --nodes-only), render them, download and compress the images, upload them to the \
                      configured storage provider and print a JSON report."
    )]
    Export {
        #[command(flatten)]
        figma: FigmaArgs,

        #[arg(
            short = 'f',
            long,
            default_value = DEFAULT_FORMAT,
            help = "Render format (png, jpg, svg, pdf)"
        )]
        format: String,

        #[arg(
            short = 's',
            long,
            default_value_t = DEFAULT_SCALE,
            help = "Render scale (0.01-4.0)"
        )]
        scale: f64,

        #[arg(
            short = 'q',
            long,
            default_value_t = DEFAULT_COMPRESSION_QUALITY,
            help = "Compression quality (0.0-1.0)",
            long_help = "Compression quality from 0.0 (smallest) to 1.0 (best). \
                         PNG maps this to a pngquant quality range, JPEG/WebP to an encoder quality of 1-100."
        )]
        quality: f64,

        #[arg(long, help = "Export the given nodes instead of their children")]
        nodes_only: bool,

        #[arg(
            long,
            env = "FIGMA_SQUEEZE_STAGING_DIR",
            help = "Directory for downloaded images (default: temp-images)"
        )]
        staging_dir: Option<PathBuf>,

        #[arg(
            long,
            env = "PNGQUANT_PATH",
            help = "pngquant binary to run for PNG compression"
        )]
        pngquant: Option<PathBuf>,
    },

    #[command(about = "List the direct children of Figma nodes")]
    Children {
        #[command(flatten)]
        figma: FigmaArgs,
    },

    #[command(
        about = "Upload every image in a folder to the configured storage provider",
        long_about = "Recursively upload png, jpg, jpeg, gif, svg and webp files (hidden entries are \
                      skipped) and print a JSON summary."
    )]
    Upload {
        #[arg(help = "Folder to upload")]
        folder: PathBuf,
    },

    #[command(about = "Compress a single image in place")]
    Compress {
        #[arg(help = "Image file path")]
        input: PathBuf,

        #[arg(
            short = 'q',
            long,
            default_value_t = DEFAULT_COMPRESSION_QUALITY,
            help = "Compression quality (0.0-1.0)"
        )]
        quality: f64,

        #[arg(
            long,
            env = "PNGQUANT_PATH",
            help = "pngquant binary to run for PNG compression"
        )]
        pngquant: Option<PathBuf>,
    },
}
