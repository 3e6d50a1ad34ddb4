/// Sync orchestration: load both locale files, translate what is missing,
/// write the merged tree back once at the end.
use crate::ai::retry::{next_delay, RetryPolicy};
use crate::ai::{LanguagePair, TranslationError, Translator};
use crate::merge::{self, KeyPath};
use log::{info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read source file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse source file {path}: {source}")]
    SourceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("source file {path} must contain a top-level JSON object")]
    SourceNotObject { path: PathBuf },

    #[error("failed to serialize merged tree: {0}")]
    Serialize(serde_json::Error),

    #[error("failed to write destination file {path}: {source}")]
    DestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Exact counters accumulated during the walk, replacing the old habit of
/// grepping key patterns out of serialized JSON.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Total leaves in the source tree.
    pub source_leaves: u32,
    /// Leaves filled in by the translator.
    pub translated: u32,
    /// Leaves that already had a destination value.
    pub reused: u32,
    /// Missing non-string leaves copied from the source verbatim.
    pub copied: u32,
    /// Leaves that kept the untranslated source text after an unrecoverable
    /// translation failure.
    pub degraded: u32,
    /// Destination-only keys left untouched.
    pub preserved: u32,
}

/// Fills every missing leaf of `dest_path` with a translation of the
/// corresponding `source_path` leaf, then overwrites `dest_path` with the
/// merged tree as pretty-printed JSON.
///
/// Strictly sequential: each leaf's translation, including its retry delays,
/// completes before the next leaf begins. Per-leaf failures degrade to the
/// original source text and never abort the run; only file-level problems do.
pub async fn sync_translations(
    translator: &dyn Translator,
    pair: &LanguagePair,
    source_path: &Path,
    dest_path: &Path,
    policy: RetryPolicy,
) -> Result<SyncReport, SyncError> {
    let source = load_required_object(source_path)?;
    let destination = load_existing_object(dest_path, &pair.target);

    let plan = merge::plan(&destination, &source);
    let total = plan.missing.len();
    info!(
        "{}: {} leaves, {} missing in {}",
        source_path.display(),
        plan.stats.source_leaves,
        total,
        dest_path.display()
    );

    let mut resolved: HashMap<KeyPath, String> = HashMap::new();
    let mut translated = 0u32;
    let mut degraded = 0u32;

    for (index, leaf) in plan.missing.iter().enumerate() {
        match translate_with_retry(translator, &leaf.text, pair, policy).await {
            Ok(output) => {
                info!(
                    "[{}/{}] {}: {} -> {}",
                    index + 1,
                    total,
                    leaf.path,
                    leaf.text,
                    output
                );
                translated += 1;
                resolved.insert(leaf.path.clone(), output);
            }
            Err(error) => {
                warn!(
                    "[{}/{}] {}: keeping source text ({}): {}",
                    index + 1,
                    total,
                    leaf.path,
                    error.code(),
                    error
                );
                degraded += 1;
                resolved.insert(leaf.path.clone(), leaf.text.clone());
            }
        }
    }

    let merged = merge::apply(&destination, &source, &resolved);
    let mut serialized =
        serde_json::to_string_pretty(&Value::Object(merged)).map_err(SyncError::Serialize)?;
    serialized.push('\n');
    fs::write(dest_path, serialized).map_err(|source| SyncError::DestWrite {
        path: dest_path.to_path_buf(),
        source,
    })?;

    Ok(SyncReport {
        source_leaves: plan.stats.source_leaves,
        translated,
        reused: plan.stats.reused,
        copied: plan.stats.copied,
        degraded,
        preserved: plan.stats.preserved,
    })
}

/// Drives one leaf through the translator, sleeping between attempts as long
/// as the retry policy allows.
pub async fn translate_with_retry(
    translator: &dyn Translator,
    text: &str,
    pair: &LanguagePair,
    policy: RetryPolicy,
) -> Result<String, TranslationError> {
    let mut attempts = 0u32;
    loop {
        match translator.translate(text, pair).await {
            Ok(output) => return Ok(output),
            Err(error) => match next_delay(&error, policy, attempts) {
                Some(delay) => {
                    warn!(
                        "{} call failed ({}), retrying in {:.1}s",
                        translator.name(),
                        error,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempts += 1;
                }
                None => return Err(error),
            },
        }
    }
}

fn load_required_object(path: &Path) -> Result<Map<String, Value>, SyncError> {
    let contents = fs::read_to_string(path).map_err(|source| SyncError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value =
        serde_json::from_str(&contents).map_err(|source| SyncError::SourceParse {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SyncError::SourceNotObject {
            path: path.to_path_buf(),
        }),
    }
}

/// The destination file is optional: absence or a parse failure just means
/// the sync starts from an empty tree and creates the file on write.
fn load_existing_object(path: &Path, target_lang: &str) -> Map<String, Value> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => {
            info!("no existing {target_lang} translations found, creating new file");
            return Map::new();
        }
    };

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!(
                "{} does not contain a JSON object, starting from scratch",
                path.display()
            );
            Map::new()
        }
        Err(error) => {
            warn!(
                "could not parse {}: {error}, starting from scratch",
                path.display()
            );
            Map::new()
        }
    }
}
