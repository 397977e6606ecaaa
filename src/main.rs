use anyhow::{Context, Result};
use clap::Parser;
use figma_squeeze::cli::{Args, Commands, FigmaArgs};
use figma_squeeze::config::{FigmaConfig, PipelineConfig, StorageConfig};
use figma_squeeze::constants::DEFAULT_PNGQUANT_BINARY;
use figma_squeeze::logger::{init_logging, is_quiet};
use figma_squeeze::utils::{create_progress_spinner, format_file_size};
use figma_squeeze::validation::{parse_node_ids, validate_file_key, validate_quality};
use figma_squeeze::{ExportPipeline, ExportRequest, FigmaClient, ImageCompressor, StorageProvider, UploadDispatcher};
use indicatif::ProgressBar;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so clap's `env` fallbacks can see it
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.quiet, args.verbose);

    match args.command {
        Commands::Export {
            figma,
            format,
            scale,
            quality,
            nodes_only,
            staging_dir,
            pngquant,
        } => {
            let request = ExportRequest::new(
                &figma.file_key,
                &figma.node_ids,
                &format,
                scale,
                quality,
                !nodes_only,
            )?;

            let mut config = PipelineConfig::default();
            if let Some(dir) = staging_dir {
                config.staging_dir = dir;
            }
            if let Some(path) = pngquant {
                config.pngquant_path = path;
            }

            let storage = StorageConfig::from_env()?;
            let pipeline = ExportPipeline::from_storage_config(&figma_config(&figma), &storage, &config)
                .context("failed to set up the export pipeline")?;

            let spinner = spinner("Exporting images from Figma...");
            let result = pipeline.run(&request).await;
            finish(spinner);

            let report = result.context("export failed")?;
            print_json(&report)?;
        }
        Commands::Children { figma } => {
            let file_key = validate_file_key(&figma.file_key)?;
            let node_ids = parse_node_ids(&figma.node_ids)?;
            let client = FigmaClient::new(&figma_config(&figma))?;

            let children = client
                .get_child_nodes(file_key, &node_ids)
                .await
                .context("child node lookup failed")?;
            print_json(&json!({
                "child_node_ids": children.child_node_ids,
                "parent_nodes": children.parent_nodes,
                "total_children": children.total_children,
            }))?;
        }
        Commands::Upload { folder } => {
            let dispatcher = UploadDispatcher::new(build_provider(&PipelineConfig::default())?);

            let spinner = spinner("Uploading images...");
            let result = dispatcher.upload_folder(&folder).await;
            finish(spinner);

            let summary = result.with_context(|| format!("failed to upload {:?}", folder))?;
            info!(
                uploaded = summary.successful_count,
                failed = summary.failed_count,
                size = %format_file_size(summary.total_size),
                "Folder upload finished"
            );
            print_json(&summary)?;
        }
        Commands::Compress {
            input,
            quality,
            pngquant,
        } => {
            compress_file(&input, quality, pngquant).await?;
        }
    }

    Ok(())
}

async fn compress_file(input: &Path, quality: f64, pngquant: Option<PathBuf>) -> Result<()> {
    let quality = validate_quality(quality)?;
    let compressor =
        ImageCompressor::new(pngquant.unwrap_or_else(|| PathBuf::from(DEFAULT_PNGQUANT_BINARY)));

    let report = compressor
        .compress(input, quality)
        .await
        .with_context(|| format!("failed to compress {:?}", input))?;
    info!(
        method = report.method.as_str(),
        before = %format_file_size(report.original_size),
        after = %format_file_size(report.compressed_size),
        "Compressed {:?}",
        input
    );
    print_json(&report)
}

fn figma_config(args: &FigmaArgs) -> FigmaConfig {
    FigmaConfig::new(args.access_token.clone()).with_api_base_url(args.api_base_url.clone())
}

fn build_provider(config: &PipelineConfig) -> Result<StorageProvider> {
    let storage = StorageConfig::from_env()?;
    let provider = StorageProvider::from_config(&storage, config.upload_timeout)
        .context("storage provider is not configured")?;
    Ok(provider)
}

fn spinner(message: &str) -> Option<ProgressBar> {
    if is_quiet() {
        return None;
    }
    let pb = create_progress_spinner(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Some(pb)
}

fn finish(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
