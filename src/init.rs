use crate::logi;
use anyhow::Result;
use std::path::Path;
use tokio::fs;

/// Creates the queue and processed directories when missing.
pub async fn ensure_directories(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
            logi(format!("Created directory: {}", dir.display()));
        }
    }
    Ok(())
}

pub async fn check_ffmpeg() -> bool {
    match tokio::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
