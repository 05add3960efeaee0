//! yt-dlp / ffmpeg engine.
//!
//! Drives `yt-dlp` as a child process with `--newline` so progress arrives
//! as discrete stdout lines, and `ffmpeg` for the audio transcode step.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mediagrab_queue::OutputKind;

use crate::engine::{EngineError, EngineEvent, FetchSpec, MediaEngine};

/// Cap on stderr kept for diagnostics when a tool fails.
const DIAGNOSTIC_LIMIT: usize = 4096;

/// Cap a diagnostic at [`DIAGNOSTIC_LIMIT`] bytes, backing off to the
/// nearest char boundary. Tool stderr carries media-title-derived paths, so
/// the byte at the limit routinely falls inside a multi-byte character.
fn clip_diagnostic(mut diagnostic: String) -> String {
    if diagnostic.len() > DIAGNOSTIC_LIMIT {
        let mut cut = DIAGNOSTIC_LIMIT;
        while !diagnostic.is_char_boundary(cut) {
            cut -= 1;
        }
        diagnostic.truncate(cut);
    }
    diagnostic
}

/// Output filename template: title capped at 80 chars, native extension.
const OUTPUT_TEMPLATE: &str = "%(title).80s.%(ext)s";

#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    ytdlp: String,
    ffmpeg: String,
}

impl YtDlpEngine {
    pub fn new(ytdlp: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            ytdlp: ytdlp.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    async fn probe(tool: &str, version_flag: &str) -> Result<(), EngineError> {
        let status = Command::new(tool)
            .arg(version_flag)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|_| EngineError::ToolMissing(tool.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::ToolMissing(tool.to_string()))
        }
    }

    fn build_fetch_args(&self, spec: &FetchSpec) -> Vec<String> {
        let mut args = vec!["-f".to_string(), format_selector(spec)];
        if spec.output_kind == OutputKind::Video {
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }
        let template = spec.work_dir.join(OUTPUT_TEMPLATE);
        args.push("-o".to_string());
        args.push(template.to_string_lossy().into_owned());
        args.push("--ffmpeg-location".to_string());
        args.push(self.ffmpeg.clone());
        args.push("--no-playlist".to_string());
        args.push("--newline".to_string());
        args.push(spec.source_url.clone());
        args
    }
}

/// Build the yt-dlp format selector for a job.
///
/// Video with a parseable quality like `720p` caps the stream height;
/// otherwise best available. Audio jobs fetch the best audio stream and
/// leave transcoding to ffmpeg afterwards.
fn format_selector(spec: &FetchSpec) -> String {
    match spec.output_kind {
        OutputKind::Audio => "bestaudio/best".to_string(),
        OutputKind::Video => match parse_height(spec.quality.as_deref()) {
            Some(h) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]/best"),
            None => "bestvideo+bestaudio/best".to_string(),
        },
    }
}

fn parse_height(quality: Option<&str>) -> Option<u32> {
    let quality = quality?.trim();
    quality.strip_suffix(['p', 'P']).unwrap_or(quality).parse().ok()
}

/// Classify a single yt-dlp stdout line into a progress event.
///
/// `[download]` percentage lines are matched first so that
/// `[download] Destination: ...` lines are not mistaken for the final
/// destination checkpoint each fragment emits one.
pub(crate) fn parse_progress_line(line: &str) -> Option<EngineEvent> {
    let line = line.trim();
    if line.starts_with("[download]") {
        if let Some(percent) = line
            .split_whitespace()
            .find_map(|token| token.strip_suffix('%'))
        {
            let fraction = percent.parse::<f64>().ok()? / 100.0;
            return Some(EngineEvent::Transfer(fraction.clamp(0.0, 1.0)));
        }
        return None;
    }
    if line.contains("Merging formats") || line.contains("[ExtractAudio]") {
        return Some(EngineEvent::Postprocess);
    }
    if line.contains("Destination:") {
        return Some(EngineEvent::Destination);
    }
    None
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    async fn resolve_tools(&self) -> Result<(), EngineError> {
        Self::probe(&self.ytdlp, "--version").await?;
        Self::probe(&self.ffmpeg, "-version").await?;
        Ok(())
    }

    async fn fetch(
        &self,
        spec: FetchSpec,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), EngineError> {
        let args = self.build_fetch_args(&spec);
        debug!(job_id = %spec.job_id, tool = %self.ytdlp, ?args, "spawning fetch");

        let mut child = Command::new(&self.ytdlp)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                tool: self.ytdlp.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf).await;
            }
            buf
        });

        if let Some(stdout) = stdout {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(event) = parse_progress_line(&line) {
                    let _ = events.send(event);
                }
            }
        }

        let status = child.wait().await?;
        let diagnostic = stderr_task.await.unwrap_or_default();
        if !status.success() {
            let diagnostic = clip_diagnostic(diagnostic);
            return Err(EngineError::Exited {
                tool: self.ytdlp.clone(),
                code: status.code().unwrap_or(-1),
                diagnostic: diagnostic.trim().to_string(),
            });
        }
        if !diagnostic.trim().is_empty() {
            debug!(job_id = %spec.job_id, "fetch stderr: {}", diagnostic.trim());
        }
        Ok(())
    }

    async fn transcode_audio(
        &self,
        input: &Path,
        output: &Path,
        bitrate: u32,
    ) -> Result<(), EngineError> {
        let output_arg = output.to_string_lossy().into_owned();
        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-b:a")
            .arg(format!("{bitrate}k"))
            .arg(&output_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| EngineError::Spawn {
                tool: self.ffmpeg.clone(),
                source,
            })?;

        if !result.status.success() {
            let diagnostic =
                clip_diagnostic(String::from_utf8_lossy(&result.stderr).into_owned());
            warn!(output = %output_arg, "transcode failed");
            return Err(EngineError::Exited {
                tool: self.ffmpeg.clone(),
                code: result.status.code().unwrap_or(-1),
                diagnostic: diagnostic.trim().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;

    fn spec(kind: OutputKind, quality: Option<&str>) -> FetchSpec {
        FetchSpec {
            job_id: Uuid::new_v4(),
            source_url: "https://www.youtube.com/watch?v=abc123".to_string(),
            output_kind: kind,
            quality: quality.map(str::to_string),
            bitrate: 192,
            work_dir: PathBuf::from("/tmp/job"),
        }
    }

    #[test]
    fn video_quality_caps_height() {
        let selector = format_selector(&spec(OutputKind::Video, Some("720p")));
        assert_eq!(
            selector,
            "bestvideo[height<=720]+bestaudio/best[height<=720]/best"
        );
    }

    #[test]
    fn unparseable_quality_falls_back_to_best() {
        let selector = format_selector(&spec(OutputKind::Video, Some("maximum")));
        assert_eq!(selector, "bestvideo+bestaudio/best");
    }

    #[test]
    fn audio_jobs_fetch_best_audio() {
        let selector = format_selector(&spec(OutputKind::Audio, None));
        assert_eq!(selector, "bestaudio/best");
    }

    #[test]
    fn download_percent_lines_become_transfer_events() {
        let event = parse_progress_line(
            "[download]  42.7% of 10.00MiB at 1.00MiB/s ETA 00:05",
        );
        match event {
            Some(EngineEvent::Transfer(fraction)) => {
                assert!((fraction - 0.427).abs() < 1e-9, "got {fraction}");
            }
            other => panic!("expected transfer event, got {other:?}"),
        }
    }

    #[test]
    fn download_destination_lines_are_ignored() {
        // Per-fragment destination lines would otherwise bounce progress
        // forward to the destination checkpoint mid-download.
        let event = parse_progress_line("[download] Destination: /tmp/job/clip.f137.mp4");
        assert_eq!(event, None);
    }

    #[test]
    fn merger_destination_line_is_a_checkpoint() {
        let event = parse_progress_line("[Merger] Destination: /tmp/job/clip.mp4");
        assert_eq!(event, Some(EngineEvent::Destination));
    }

    #[test]
    fn postprocess_markers_are_detected() {
        assert_eq!(
            parse_progress_line("[Merger] Merging formats into \"/tmp/job/clip.mp4\""),
            Some(EngineEvent::Postprocess)
        );
        assert_eq!(
            parse_progress_line("[ExtractAudio] Destination: /tmp/job/clip.mp3"),
            Some(EngineEvent::Postprocess)
        );
    }

    #[test]
    fn transfer_fraction_is_clamped() {
        let event = parse_progress_line("[download] 100.0% of 10.00MiB in 00:10");
        assert_eq!(event, Some(EngineEvent::Transfer(1.0)));
    }

    #[test]
    fn unrelated_lines_produce_nothing() {
        assert_eq!(parse_progress_line("[youtube] abc123: Downloading webpage"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn diagnostic_clip_respects_char_boundaries() {
        // 3-byte chars guarantee the byte limit lands mid-character.
        let long = "媒".repeat(2000);
        assert!(long.len() > DIAGNOSTIC_LIMIT);
        let clipped = clip_diagnostic(long);
        assert!(clipped.len() <= DIAGNOSTIC_LIMIT);
        assert!(clipped.chars().all(|c| c == '媒'));

        let short = clip_diagnostic("ffmpeg: no such file".to_string());
        assert_eq!(short, "ffmpeg: no such file");
    }

    #[test]
    fn height_parses_with_and_without_suffix() {
        assert_eq!(parse_height(Some("1080p")), Some(1080));
        assert_eq!(parse_height(Some("480")), Some(480));
        assert_eq!(parse_height(Some("")), None);
        assert_eq!(parse_height(None), None);
    }
}
