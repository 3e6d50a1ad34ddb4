use anyhow::Context;
use clap::Parser;
use locale_sync_core::sync::SyncReport;
use locale_sync_core::{config, sync_translations, GeminiClient, LanguagePair, SyncConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Fill missing keys in a JSON locale file by translating them from a source
/// locale through the Gemini API.
#[derive(Debug, Parser)]
#[command(name = "locale-sync", version, about)]
struct Cli {
    /// Source language code, e.g. "en"
    source_lang: String,

    /// Destination language code, e.g. "vi"
    dest_lang: String,

    /// Path to the source locale JSON file
    source_file: PathBuf,

    /// Path to the destination locale JSON file (created if missing)
    dest_file: PathBuf,

    /// Gemini model to use (overrides the config file)
    #[arg(long)]
    model: Option<String>,

    /// API key; falls back to the GOOGLE_API_KEY environment variable
    #[arg(long)]
    api_key: Option<String>,

    /// Optional JSON config file with model, pacing, and retry settings
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => {
            println!("✅ Translation sync completed successfully!");
            println!("Total keys synchronized: {}", report.source_leaves);
            println!(
                "  translated: {}, reused: {}, copied: {}, kept untranslated: {}",
                report.translated, report.reused, report.copied, report.degraded
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("❌ Error during translation sync: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<SyncReport> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_json_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid config file {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(model) = cli.model {
        config.model_id = model;
    }

    let api_key = cli.api_key.unwrap_or_else(config::env_api_key);
    if api_key.is_empty() {
        log::warn!(
            "no API key configured; set {} or pass --api-key",
            config::API_KEY_ENV
        );
    }

    let translator =
        GeminiClient::new(api_key, config.model_id.clone()).with_pacing(config.pacing());
    let pair = LanguagePair::new(&cli.source_lang, &cli.dest_lang);

    let report = sync_translations(
        &translator,
        &pair,
        &cli.source_file,
        &cli.dest_file,
        config.retry.policy(),
    )
    .await?;

    Ok(report)
}
