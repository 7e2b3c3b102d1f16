//! Recognize the item shown in one or more image files.
//!
//! Usage: `recognize <config.toml> <image>...`
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use item_recognizer::{
    CancelToken, CaptureRequest, Recognizer, init_logger, parse_toml, processing_spinner,
};

const USAGE: &str = "usage: recognize <config.toml> <image>...";

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    let mut argv = std::env::args().skip(1);
    let config_toml = PathBuf::from(argv.next().context(USAGE)?);
    let images: Vec<PathBuf> = argv.map(PathBuf::from).collect();
    if images.is_empty() {
        bail!(USAGE);
    }

    // Relative model paths are resolved against the config file's directory
    let project_root = config_toml
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let args = parse_toml(&config_toml, &project_root)
        .with_context(|| format!("Failed to parse TOML config: {:?}", config_toml))?;
    let recognizer = Recognizer::from_args(&args)?;
    let model_path = recognizer.models().loader().model_path();
    tracing::info!("[Model]: {:?}", model_path);

    recognizer
        .models()
        .init()
        .await
        .with_context(|| format!("Failed to load model: {:?}", model_path))?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling...");
                cancel.cancel();
            }
        });
    }

    let mut failures = 0usize;
    for path in &images {
        if cancel.is_cancelled() {
            break;
        }

        let request = match CaptureRequest::from_path(path) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!("Failed to read {:?}: {}", path, e);
                println!("{}: {}", path.display(), e.notice());
                failures += 1;
                continue;
            }
        };

        let pb = processing_spinner("Processing image...");
        let outcome = recognizer
            .recognize_with_callback(request, &cancel, |label| {
                pb.println(format!("{}: {}", path.display(), label));
            })
            .await;
        pb.finish_and_clear();

        if let Err(notice) = outcome {
            println!("{}: {}", path.display(), notice);
            failures += 1;
        }
    }

    recognizer.models().teardown().await;

    if failures > 0 {
        tracing::warn!("{} of {} images were not recognized", failures, images.len());
    }
    Ok(())
}
