//! FFmpeg-backed container writer
//!
//! Production implementation of `ContainerWriter`. Raw BGRA frames are
//! streamed over a bounded channel to an I/O thread that feeds a
//! spawned ffmpeg encoder's stdin; raw PCM audio is appended to a
//! sidecar file. Finalize closes the stream, waits for the encoder,
//! and runs one mux pass that stream-copies the encoded video and
//! attaches the audio track (AAC) plus the rotation metadata - the
//! captured video itself is never re-encoded.

use crate::capture::frame::{MediaFrame, MediaTime, SampleFormat};
use crate::capture::topology::{AudioTrackConfig, VideoTrackConfig};
use crate::recorder::writer::{ContainerWriter, TrackKind, VideoTransform, WriterFactory};
use crate::recorder::{RecordingError, RecordingResult};
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tempfile::TempDir;
use uuid::Uuid;

/// Video frames tolerated in flight to the encoder before the track
/// reports not-ready and frames start dropping.
const VIDEO_QUEUE_DEPTH: usize = 8;

/// Build the live-encoder invocation: raw BGRA on stdin, H.264 out.
fn encoder_args(video: &VideoTrackConfig, video_path: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pixel_format".to_string(),
        "bgra".to_string(),
        "-video_size".to_string(),
        format!("{}x{}", video.width, video.height),
        "-framerate".to_string(),
        video.frame_rate.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-crf".to_string(),
        "18".to_string(),
        "-g".to_string(),
        (video.frame_rate * 2).to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        video_path.to_string_lossy().to_string(),
    ]
}

/// Build the finalize-time mux invocation: stream-copy the encoded
/// video, encode the PCM sidecar to AAC, bake in rotation metadata.
fn mux_args(
    video_path: &Path,
    audio_path: Option<&Path>,
    audio: &AudioTrackConfig,
    transform: VideoTransform,
    output_path: &Path,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        video_path.to_string_lossy().to_string(),
    ];

    if let Some(audio_path) = audio_path {
        let sample_format = match audio.sample_format {
            SampleFormat::S16 => "s16le",
            SampleFormat::F32 => "f32le",
        };
        args.extend([
            "-f".to_string(),
            sample_format.to_string(),
            "-ar".to_string(),
            audio.sample_rate.to_string(),
            "-ac".to_string(),
            audio.channels.to_string(),
            "-i".to_string(),
            audio_path.to_string_lossy().to_string(),
        ]);
    }

    args.extend(["-map".to_string(), "0:v".to_string()]);
    if audio_path.is_some() {
        args.extend(["-map".to_string(), "1:a".to_string()]);
    }

    args.extend(["-c:v".to_string(), "copy".to_string()]);
    if audio_path.is_some() {
        args.extend([
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
        ]);
    }

    if let Some(degrees) = transform.rotation_degrees() {
        args.extend([
            "-metadata:s:v:0".to_string(),
            format!("rotate={degrees}"),
        ]);
    }

    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args.push(output_path.to_string_lossy().to_string());
    args
}

fn spawn_encoder(video: &VideoTrackConfig, video_path: &Path) -> anyhow::Result<Child> {
    Command::new("ffmpeg")
        .args(encoder_args(video, video_path))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to start ffmpeg encoder")
}

/// Drains the frame channel into the encoder's stdin, then waits the
/// encoder out.
fn run_encoder_io(
    mut encoder: Child,
    frames: Receiver<Vec<u8>>,
    depth: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    let mut stdin = encoder
        .stdin
        .take()
        .context("ffmpeg encoder has no stdin")?;

    for frame in frames {
        let result = stdin.write_all(&frame);
        depth.fetch_sub(1, Ordering::Release);
        result.context("failed to write frame to ffmpeg")?;
    }

    // EOF tells the encoder to flush and exit.
    drop(stdin);
    let output = encoder
        .wait_with_output()
        .context("failed to wait for ffmpeg encoder")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg encoder exited with {}: {}", output.status, stderr);
    }
    Ok(())
}

struct LiveSession {
    video_tx: SyncSender<Vec<u8>>,
    depth: Arc<AtomicUsize>,
    io_thread: JoinHandle<anyhow::Result<()>>,
    audio_file: BufWriter<File>,
    audio_bytes: u64,
}

/// Container writer streaming into a spawned ffmpeg process.
pub struct FfmpegContainerWriter {
    audio: AudioTrackConfig,
    video: VideoTrackConfig,
    transform: VideoTransform,
    /// Scratch directory for the intermediates; removed on drop.
    work_dir: TempDir,
    video_path: PathBuf,
    audio_path: PathBuf,
    output_path: PathBuf,
    session: Option<LiveSession>,
}

impl FfmpegContainerWriter {
    /// Allocate paths for a new recording under the system temp
    /// directory. Processes are spawned lazily by `begin_session`.
    pub fn create(
        audio: &AudioTrackConfig,
        video: &VideoTrackConfig,
        transform: VideoTransform,
    ) -> RecordingResult<Self> {
        let id = Uuid::new_v4();
        let work_dir = tempfile::Builder::new().prefix("pipcam-").tempdir()?;

        Ok(Self {
            audio: *audio,
            video: *video,
            transform,
            video_path: work_dir.path().join("video.mp4"),
            audio_path: work_dir.path().join("audio.pcm"),
            output_path: std::env::temp_dir().join(format!("{id}.mp4")),
            work_dir,
            session: None,
        })
    }
}

impl ContainerWriter for FfmpegContainerWriter {
    fn begin_session(&mut self, origin: MediaTime) -> RecordingResult<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let encoder = spawn_encoder(&self.video, &self.video_path)
            .map_err(|e| RecordingError::Writer(format!("{e:#}")))?;
        let audio_file = BufWriter::new(File::create(&self.audio_path)?);

        let (video_tx, video_rx) = sync_channel(VIDEO_QUEUE_DEPTH);
        let depth = Arc::new(AtomicUsize::new(0));
        let io_depth = depth.clone();
        let io_thread = std::thread::spawn(move || run_encoder_io(encoder, video_rx, io_depth));

        tracing::info!(
            "ffmpeg session opened at {} ({}x{} @ {}fps)",
            origin,
            self.video.width,
            self.video.height,
            self.video.frame_rate
        );

        self.session = Some(LiveSession {
            video_tx,
            depth,
            io_thread,
            audio_file,
            audio_bytes: 0,
        });
        Ok(())
    }

    fn is_ready_for(&self, track: TrackKind) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        match track {
            TrackKind::Video => session.depth.load(Ordering::Acquire) < VIDEO_QUEUE_DEPTH,
            TrackKind::Audio => true,
        }
    }

    fn append(&mut self, track: TrackKind, frame: MediaFrame) -> RecordingResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(RecordingError::Writer("session not open".to_string()));
        };

        match track {
            TrackKind::Video => {
                session.depth.fetch_add(1, Ordering::Release);
                match session.video_tx.try_send(frame.data) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Full(_)) => {
                        session.depth.fetch_sub(1, Ordering::Release);
                        tracing::debug!("encoder backlog full, dropping video frame");
                        Ok(())
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        session.depth.fetch_sub(1, Ordering::Release);
                        Err(RecordingError::Writer("encoder thread exited".to_string()))
                    }
                }
            }
            TrackKind::Audio => {
                session.audio_file.write_all(&frame.data)?;
                session.audio_bytes += frame.data.len() as u64;
                Ok(())
            }
        }
    }

    fn finalize(self: Box<Self>) -> RecordingResult<PathBuf> {
        let Some(session) = self.session else {
            // Nothing was written; dropping self releases the scratch
            // directory.
            return Err(RecordingError::Writer(
                "no frames were recorded".to_string(),
            ));
        };

        let LiveSession {
            video_tx,
            io_thread,
            mut audio_file,
            audio_bytes,
            ..
        } = session;

        // Closing the channel lets the I/O thread flush and reap the
        // encoder.
        drop(video_tx);
        match io_thread.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RecordingError::Writer(format!("{e:#}"))),
            Err(_) => {
                return Err(RecordingError::Writer("encoder thread panicked".to_string()));
            }
        }
        audio_file.flush()?;
        drop(audio_file);

        let audio_path = (audio_bytes > 0).then_some(self.audio_path.as_path());
        let args = mux_args(
            &self.video_path,
            audio_path,
            &self.audio,
            self.transform,
            &self.output_path,
        );
        tracing::info!("muxing recording: ffmpeg {}", args.join(" "));

        let output = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecordingError::Writer(format!(
                "ffmpeg mux exited with {}: {}",
                output.status, stderr
            )));
        }

        self.work_dir
            .close()
            .map_err(|e| RecordingError::Writer(format!("scratch cleanup failed: {e}")))?;
        Ok(self.output_path.clone())
    }

    fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Factory for the production writer.
pub struct FfmpegWriterFactory;

impl WriterFactory for FfmpegWriterFactory {
    fn create(
        &self,
        audio: &AudioTrackConfig,
        video: &VideoTrackConfig,
        transform: VideoTransform,
    ) -> RecordingResult<Box<dyn ContainerWriter>> {
        // Fail the start request early when ffmpeg is missing.
        if Command::new("ffmpeg").arg("-version").output().is_err() {
            return Err(RecordingError::Writer(
                "ffmpeg not found on PATH".to_string(),
            ));
        }
        Ok(Box::new(FfmpegContainerWriter::create(
            audio, video, transform,
        )?))
    }
}
