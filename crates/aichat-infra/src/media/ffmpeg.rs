//! FfmpegWatermarker -- overlays the watermark image with ffmpeg.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use aichat_core::storage::media::MediaProcessor;
use aichat_types::config::MediaConfig;
use aichat_types::error::MediaError;

#[derive(Debug, Clone)]
pub struct FfmpegWatermarker {
    program: String,
    watermark: PathBuf,
    overlay: String,
}

impl FfmpegWatermarker {
    pub fn new(program: impl Into<String>, watermark: impl Into<PathBuf>, overlay: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            watermark: watermark.into(),
            overlay: overlay.into(),
        }
    }

    /// Build from config, resolving a relative watermark path against `data_dir`.
    pub fn from_config(config: &MediaConfig, data_dir: &Path) -> Self {
        Self::new(
            config.ffmpeg_bin.clone(),
            data_dir.join(&config.watermark_image),
            config.overlay.clone(),
        )
    }

    fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            input.into(),
            "-i".into(),
            self.watermark.clone().into(),
            "-filter_complex".into(),
            format!("overlay={}", self.overlay).into(),
            "-y".into(),
            output.into(),
        ]
    }
}

impl MediaProcessor for FfmpegWatermarker {
    async fn watermark(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        if !tokio::fs::try_exists(&self.watermark).await.unwrap_or(false) {
            return Err(MediaError::Io(format!(
                "watermark image '{}' not found",
                self.watermark.display()
            )));
        }

        let result = Command::new(&self.program)
            .args(self.args(input, output))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::Launch {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            tracing::warn!(
                program = %self.program,
                status = %result.status,
                input = %input.display(),
                "watermark run failed"
            );
            return Err(MediaError::ExternalTool {
                program: self.program.clone(),
                status: result.status.to_string(),
                stderr,
            });
        }

        tracing::debug!(output = %output.display(), "watermark applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn with_watermark(dir: &Path, program: &str) -> FfmpegWatermarker {
        let watermark = dir.join("wm.png");
        tokio::fs::write(&watermark, b"png").await.unwrap();
        FfmpegWatermarker::new(program, watermark, "W-w-10:H-h-10")
    }

    #[test]
    fn test_args_layout() {
        let marker = FfmpegWatermarker::new("ffmpeg", "/data/wm.png", "10:10");
        let args: Vec<String> = marker
            .args(Path::new("/tmp/in.mp4"), Path::new("/tmp/out.mp4"))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-i",
                "/tmp/in.mp4",
                "-i",
                "/data/wm.png",
                "-filter_complex",
                "overlay=10:10",
                "-y",
                "/tmp/out.mp4"
            ]
        );
    }

    #[test]
    fn test_from_config_resolves_watermark() {
        let marker = FfmpegWatermarker::from_config(&MediaConfig::default(), Path::new("/data"));
        assert_eq!(marker.watermark, Path::new("/data/static/watermark.png"));
        assert_eq!(marker.program, "ffmpeg");
    }

    #[tokio::test]
    async fn test_missing_watermark_image() {
        let marker = FfmpegWatermarker::new("ffmpeg", "/nonexistent/wm.png", "0:0");
        let err = marker
            .watermark(Path::new("in.mp4"), Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let marker = with_watermark(dir.path(), "aichat-no-such-ffmpeg-binary").await;
        let err = marker
            .watermark(&dir.path().join("in.mp4"), &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let marker = with_watermark(dir.path(), "false").await;
        let err = marker
            .watermark(&dir.path().join("in.mp4"), &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::ExternalTool { .. }));
    }
}
