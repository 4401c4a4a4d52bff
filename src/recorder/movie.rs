//! Movie recorder
//!
//! Drives one container writer for the lifetime of a recording:
//! start allocates the writer at a fresh temporary location, the first
//! video frame opens the container session and establishes its time
//! origin, subsequent frames append only while the writer reports
//! readiness, and stop finalizes asynchronously so a new recording can
//! start without waiting on the old file.

use crate::capture::frame::MediaFrame;
use crate::capture::topology::{AudioTrackConfig, VideoTrackConfig};
use crate::recorder::writer::{ContainerWriter, TrackKind, VideoTransform, WriterFactory};
use crate::recorder::{RecordingError, RecordingResult};
use std::path::PathBuf;

/// Container session progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterPhase {
    /// Writer allocated, session not yet opened.
    Unopened,
    /// Session open, frames appending.
    Writing,
}

/// Records composited video plus one audio stream into a container.
pub struct MovieRecorder {
    audio_settings: AudioTrackConfig,
    video_settings: VideoTrackConfig,
    video_transform: VideoTransform,
    writer: Option<Box<dyn ContainerWriter>>,
    phase: WriterPhase,
    is_recording: bool,
}

impl MovieRecorder {
    pub fn new(
        audio_settings: AudioTrackConfig,
        video_settings: VideoTrackConfig,
        video_transform: VideoTransform,
    ) -> Self {
        Self {
            audio_settings,
            video_settings,
            video_transform,
            writer: None,
            phase: WriterPhase::Unopened,
            is_recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Allocate the container writer and begin accepting frames.
    pub fn start(&mut self, factory: &dyn WriterFactory) -> RecordingResult<()> {
        if self.is_recording {
            return Err(RecordingError::AlreadyRecording);
        }

        let writer = factory.create(
            &self.audio_settings,
            &self.video_settings,
            self.video_transform,
        )?;
        tracing::info!("recording to {}", writer.output_path().display());

        self.writer = Some(writer);
        self.phase = WriterPhase::Unopened;
        self.is_recording = true;
        Ok(())
    }

    /// Submit a composited video frame.
    ///
    /// No-op while not recording. The first frame opens the container
    /// session at its timestamp and is not itself appended; later
    /// frames are dropped silently whenever the writer is not ready -
    /// real-time responsiveness beats completeness here.
    pub fn record_video(&mut self, frame: MediaFrame) {
        if !self.is_recording {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        match self.phase {
            WriterPhase::Unopened => match writer.begin_session(frame.pts) {
                Ok(()) => {
                    tracing::info!("container session opened at {}", frame.pts);
                    self.phase = WriterPhase::Writing;
                }
                Err(e) => {
                    tracing::error!("failed to open container session: {e}");
                }
            },
            WriterPhase::Writing => {
                if writer.is_ready_for(TrackKind::Video) {
                    if let Err(e) = writer.append(TrackKind::Video, frame) {
                        tracing::warn!("video append failed: {e}");
                    }
                } else {
                    tracing::debug!("video writer not ready, dropping frame");
                }
            }
        }
    }

    /// Submit an audio frame.
    ///
    /// No-op until recording and the container session is open (video
    /// establishes the time origin); dropped when the track is busy.
    pub fn record_audio(&mut self, frame: MediaFrame) {
        if !self.is_recording || self.phase != WriterPhase::Writing {
            return;
        }
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        if writer.is_ready_for(TrackKind::Audio) {
            if let Err(e) = writer.append(TrackKind::Audio, frame) {
                tracing::warn!("audio append failed: {e}");
            }
        }
    }

    /// Stop recording and finalize the container off-thread.
    ///
    /// The completion callback receives the finished file's location
    /// once it is complete and playable. A second stop is a no-op and
    /// the completion is not invoked. Writer resources are released
    /// immediately so a new `start` never contends with finalization.
    pub fn stop<F>(&mut self, completion: F)
    where
        F: FnOnce(RecordingResult<PathBuf>) + Send + 'static,
    {
        self.is_recording = false;
        let Some(writer) = self.writer.take() else {
            return;
        };
        self.phase = WriterPhase::Unopened;

        std::thread::spawn(move || {
            let result = writer.finalize();
            match &result {
                Ok(path) => tracing::info!("recording finalized at {}", path.display()),
                Err(e) => tracing::error!("recording finalization failed: {e}"),
            }
            completion(result);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::{FormatDescriptor, MediaTime, PixelFormat, SampleFormat};
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct MockWriterState {
        session_origin: Option<MediaTime>,
        video_frames: Vec<MediaTime>,
        audio_frames: Vec<MediaTime>,
        video_ready: bool,
        audio_ready: bool,
        finalized: bool,
    }

    struct MockWriter {
        state: Arc<Mutex<MockWriterState>>,
        path: PathBuf,
    }

    impl ContainerWriter for MockWriter {
        fn begin_session(&mut self, origin: MediaTime) -> RecordingResult<()> {
            self.state.lock().session_origin = Some(origin);
            Ok(())
        }

        fn is_ready_for(&self, track: TrackKind) -> bool {
            let state = self.state.lock();
            match track {
                TrackKind::Video => state.video_ready,
                TrackKind::Audio => state.audio_ready,
            }
        }

        fn append(&mut self, track: TrackKind, frame: MediaFrame) -> RecordingResult<()> {
            let mut state = self.state.lock();
            match track {
                TrackKind::Video => state.video_frames.push(frame.pts),
                TrackKind::Audio => state.audio_frames.push(frame.pts),
            }
            Ok(())
        }

        fn finalize(self: Box<Self>) -> RecordingResult<PathBuf> {
            self.state.lock().finalized = true;
            Ok(self.path.clone())
        }

        fn output_path(&self) -> &std::path::Path {
            &self.path
        }
    }

    struct MockFactory {
        state: Arc<Mutex<MockWriterState>>,
    }

    impl WriterFactory for MockFactory {
        fn create(
            &self,
            _audio: &AudioTrackConfig,
            _video: &VideoTrackConfig,
            _transform: VideoTransform,
        ) -> RecordingResult<Box<dyn ContainerWriter>> {
            Ok(Box::new(MockWriter {
                state: self.state.clone(),
                path: PathBuf::from("/tmp/mock-recording.mp4"),
            }))
        }
    }

    fn recorder_with_mock() -> (MovieRecorder, MockFactory, Arc<Mutex<MockWriterState>>) {
        let state = Arc::new(Mutex::new(MockWriterState {
            video_ready: true,
            audio_ready: true,
            ..Default::default()
        }));
        let recorder = MovieRecorder::new(
            AudioTrackConfig {
                sample_rate: 44_100,
                channels: 1,
                sample_format: SampleFormat::S16,
            },
            VideoTrackConfig {
                width: 1920,
                height: 1080,
                frame_rate: 30,
                pixel_format: PixelFormat::Bgra8,
            },
            VideoTransform::Identity,
        );
        let factory = MockFactory {
            state: state.clone(),
        };
        (recorder, factory, state)
    }

    fn video_frame(pts_ms: i64) -> MediaFrame {
        MediaFrame {
            pts: MediaTime::from_millis(pts_ms),
            dts: None,
            duration: MediaTime::from_millis(33),
            descriptor: FormatDescriptor::Video {
                width: 1920,
                height: 1080,
                pixel_format: PixelFormat::Bgra8,
            },
            data: Vec::new(),
        }
    }

    fn audio_frame(pts_ms: i64) -> MediaFrame {
        MediaFrame {
            pts: MediaTime::from_millis(pts_ms),
            dts: None,
            duration: MediaTime::from_millis(100),
            descriptor: FormatDescriptor::Audio {
                sample_rate: 44_100,
                channels: 1,
                sample_format: SampleFormat::S16,
            },
            data: Vec::new(),
        }
    }

    #[test]
    fn submits_are_noops_while_not_recording() {
        let (mut recorder, _factory, state) = recorder_with_mock();
        recorder.record_video(video_frame(0));
        recorder.record_audio(audio_frame(0));
        let state = state.lock();
        assert!(state.session_origin.is_none());
        assert!(state.video_frames.is_empty());
        assert!(state.audio_frames.is_empty());
    }

    #[test]
    fn first_video_frame_opens_session_without_appending() {
        let (mut recorder, factory, state) = recorder_with_mock();
        recorder.start(&factory).unwrap();

        recorder.record_video(video_frame(500));
        {
            let state = state.lock();
            assert_eq!(state.session_origin, Some(MediaTime::from_millis(500)));
            assert!(state.video_frames.is_empty());
        }

        recorder.record_video(video_frame(533));
        assert_eq!(state.lock().video_frames, vec![MediaTime::from_millis(533)]);
    }

    #[test]
    fn audio_waits_for_the_session_origin() {
        let (mut recorder, factory, state) = recorder_with_mock();
        recorder.start(&factory).unwrap();

        recorder.record_audio(audio_frame(0));
        assert!(state.lock().audio_frames.is_empty());

        recorder.record_video(video_frame(0));
        recorder.record_audio(audio_frame(100));
        assert_eq!(state.lock().audio_frames, vec![MediaTime::from_millis(100)]);
    }

    #[test]
    fn unready_tracks_drop_frames_instead_of_queuing() {
        let (mut recorder, factory, state) = recorder_with_mock();
        recorder.start(&factory).unwrap();
        recorder.record_video(video_frame(0));

        state.lock().video_ready = false;
        state.lock().audio_ready = false;
        recorder.record_video(video_frame(33));
        recorder.record_audio(audio_frame(50));

        let snapshot = state.lock();
        assert!(snapshot.video_frames.is_empty());
        assert!(snapshot.audio_frames.is_empty());
    }

    #[test]
    fn double_start_is_rejected() {
        let (mut recorder, factory, _state) = recorder_with_mock();
        recorder.start(&factory).unwrap();
        assert!(matches!(
            recorder.start(&factory),
            Err(RecordingError::AlreadyRecording)
        ));
    }

    #[test]
    fn stop_finalizes_and_reports_the_output() {
        let (mut recorder, factory, state) = recorder_with_mock();
        recorder.start(&factory).unwrap();
        recorder.record_video(video_frame(0));

        let (tx, rx) = mpsc::channel();
        recorder.stop(move |result| {
            tx.send(result.unwrap()).unwrap();
        });

        let path = rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/mock-recording.mp4"));
        assert!(state.lock().finalized);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn second_stop_is_a_noop() {
        let (mut recorder, factory, _state) = recorder_with_mock();
        recorder.start(&factory).unwrap();

        let (tx, rx) = mpsc::channel();
        recorder.stop(move |_| {
            tx.send(()).unwrap();
        });
        rx.recv_timeout(std::time::Duration::from_secs(2)).unwrap();

        let (tx2, rx2) = mpsc::channel::<()>();
        recorder.stop(move |_| {
            tx2.send(()).unwrap();
        });
        assert!(rx2
            .recv_timeout(std::time::Duration::from_millis(200))
            .is_err());
    }

    #[test]
    fn restart_after_stop_uses_a_fresh_writer() {
        let (mut recorder, factory, state) = recorder_with_mock();
        recorder.start(&factory).unwrap();
        recorder.record_video(video_frame(0));
        recorder.stop(|_| {});

        recorder.start(&factory).unwrap();
        recorder.record_video(video_frame(1_000));
        // The fresh session re-opens at the new origin.
        assert_eq!(
            state.lock().session_origin,
            Some(MediaTime::from_millis(1_000))
        );
    }
}
