use anyhow::{Context, Result, bail};
use std::path::Path;
use tokio::process::Command;

async fn run_cmd(args: &[String]) -> Result<()> {
    let (program, rest) = args.split_first().context("Empty command")?;
    let status = Command::new(program)
        .args(rest)
        .status()
        .await
        .with_context(|| format!("Failed to start {}", program))?;
    if !status.success() {
        bail!("{} exited with {}", program, status);
    }
    Ok(())
}

pub fn still_to_video_args(image: &Path, seconds: u32, out_mp4: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-i".to_string(),
        image.display().to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        "anullsrc=channel_layout=stereo:sample_rate=44100".to_string(),
        "-t".to_string(),
        seconds.max(1).to_string(),
        "-vf".to_string(),
        "scale=trunc(iw/2)*2:trunc(ih/2)*2,format=yuv420p".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-tune".to_string(),
        "stillimage".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-shortest".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]
}

/// Renders a still image into an H.264 mp4 with a silent audio track.
pub async fn ffmpeg_still_to_video(image: &Path, seconds: u32, out_mp4: &Path) -> Result<()> {
    run_cmd(&still_to_video_args(image, seconds, out_mp4)).await?;
    let len = tokio::fs::metadata(out_mp4)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    if len == 0 {
        bail!("ffmpeg produced no output at {}", out_mp4.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn still_args_loop_image_for_duration() {
        let args = still_to_video_args(Path::new("/tmp/a.png"), 8, Path::new("/tmp/a.mp4"));
        assert_eq!(args[0], "ffmpeg");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "8");
        assert!(args.contains(&"stillimage".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/a.mp4"));
    }

    #[test]
    fn zero_duration_is_clamped() {
        let args = still_to_video_args(Path::new("a.png"), 0, Path::new("a.mp4"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "1");
    }

    #[tokio::test]
    async fn unrenderable_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("junk.png");
        std::fs::write(&image, vec![0u8; 4096]).unwrap();
        let out = dir.path().join("junk.mp4");
        assert!(ffmpeg_still_to_video(&image, 2, &out).await.is_err());
    }
}
