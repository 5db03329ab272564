use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use plano_core::{DocumentChunk, HazardRow, ZoningRow};
use plano_storage::Dataset;
use regex::Regex;
use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use crate::chunking::chunk_legal_text;

const MAX_CHUNK_CHARS: usize = 900;

static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid title regex"));

/// Loads `zoning.json`, `hazards.json`, `sections.json` and every Markdown or
/// text file under `legal/` into a [`Dataset`].
pub fn load_data_dir(root: impl AsRef<Path>) -> Result<Dataset> {
    let root = root.as_ref();
    let mut dataset = Dataset {
        zoning: read_table::<ZoningRow>(&root.join("zoning.json"))?,
        hazards: read_table::<HazardRow>(&root.join("hazards.json"))?,
        sections: read_table::<DocumentChunk>(&root.join("sections.json"))?,
        chunks: Vec::new(),
    };

    let legal_root = root.join("legal");
    if legal_root.is_dir() {
        for entry in WalkDir::new(&legal_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                matches!(
                    entry.path().extension().and_then(|ext| ext.to_str()),
                    Some("md") | Some("txt")
                )
            })
        {
            let path = entry.path();
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("failed reading legal document: {}", path.display()))?;

            let rel_path = path
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| path.to_string_lossy().to_string());

            let title = TITLE
                .captures(&body)
                .and_then(|captures| captures.get(1))
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_else(|| {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .unwrap_or("documento")
                        .to_uppercase()
                });

            for (idx, content) in chunk_legal_text(&body, MAX_CHUNK_CHARS).into_iter().enumerate() {
                dataset.chunks.push(DocumentChunk {
                    content,
                    metadata: serde_json::json!({
                        "title": title,
                        "source_path": rel_path,
                        "chunk_index": idx,
                    }),
                });
            }
        }
    }

    Ok(dataset)
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading table: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("malformed table: {}", path.display()))
}
