//! Manifest utility for Afrigrow artifacts.
//!
//! Hashes the exported model, scaler and encoders and writes `manifest.json`
//! next to them, so loading can detect a partially replaced model directory.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin write_manifest -- <model_dir> [--check]
//! ```
//!
//! With `--check` the existing manifest is verified instead of rewritten.

use std::env;
use std::fs;
use std::path::PathBuf;

use afrigrow::adapters::artifacts::{verify_manifest, MANIFEST_FILE};
use afrigrow::adapters::{ArtifactBundle, ArtifactManifest};

fn usage() -> String {
    "Usage: write_manifest <model_dir> [--check]".to_string()
}

fn parse_args() -> Result<(PathBuf, bool), String> {
    let mut model_dir: Option<PathBuf> = None;
    let mut check = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--check" => check = true,
            "-h" | "--help" => return Err(usage()),
            _ => {
                if model_dir.is_none() {
                    model_dir = Some(PathBuf::from(arg));
                } else {
                    return Err(usage());
                }
            }
        }
    }

    let model_dir = model_dir.ok_or_else(usage)?;
    Ok((model_dir, check))
}

fn main() -> Result<(), String> {
    let (model_dir, check) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
            .to_path_buf()
    } else {
        model_dir
    };

    if check {
        verify_manifest(&model_dir, true).map_err(|e| e.to_string())?;
        println!("Manifest OK: {:?}", model_dir.join(MANIFEST_FILE));
        return Ok(());
    }

    // Refuse to bless artifacts that would not load together.
    ArtifactBundle::load(&model_dir, false).map_err(|e| e.to_string())?;

    let manifest = ArtifactManifest::build(&model_dir).map_err(|e| e.to_string())?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize {MANIFEST_FILE}: {e}"))?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Wrote manifest: {manifest_path:?}");
    for (file, hash) in &manifest.files {
        println!("  {file}  {hash}");
    }

    Ok(())
}
