//! Pipeline controller
//!
//! `CaptureController` is the surface the host drives: configure the
//! dual-camera session, toggle the PiP role, start/stop/pause/resume
//! recording, and deliver captured frames. Commands are fire-and-
//! forget; outcomes arrive on the broadcast event stream. Frame
//! delivery runs on the capture thread and never blocks on
//! configuration work: the frame path touches only the compositor and
//! the active recording, while topology mutations stay behind the
//! configuration lock.

use crate::capture::device::{CameraDescriptor, CameraPosition, CaptureSession, PressureLevel};
use crate::capture::frame::MediaFrame;
use crate::capture::topology::{AudioTrackConfig, CameraSlot, CaptureTopology};
use crate::compositor::{OverlayRect, PipCompositor};
use crate::governor::SessionCostGovernor;
use crate::recorder::settings::{self, DeviceOrientation};
use crate::recorder::state::{RecordingSession, RecordingState};
use crate::recorder::timeline::TimelineAdjuster;
use crate::recorder::writer::WriterFactory;
use crate::recorder::MovieRecorder;
use crate::router::{self, PipRole, VideoRoute};
use crate::utils::error::{ErrorResponse, PipelineError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Outcome of session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetupResult {
    Success,
    NotAuthorized,
    ConfigurationFailed,
    MultiCamNotSupported,
}

/// Events emitted by the pipeline
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Recording started
    Started,
    /// Recording stopped; finalization is in flight
    Stopped,
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// The finished container is complete and playable at this
    /// location; the host persists it and deletes the file after.
    Finished(PathBuf),
    /// A start-recording attempt failed on incompatible settings
    ConfigurationFailed(String),
    /// The capture session faulted and needs a manual resume
    SessionInterrupted { can_resume: bool },
    /// Error occurred
    Error(String),
}

/// Everything the host hands over at configuration time.
#[derive(Debug, Clone)]
pub struct DeviceSetup {
    pub authorized: bool,
    pub multicam_supported: bool,
    pub back_camera: CameraDescriptor,
    pub front_camera: CameraDescriptor,
    pub back_mic: AudioTrackConfig,
    pub front_mic: AudioTrackConfig,
    pub orientation: DeviceOrientation,
}

/// State owned by the serialized configuration context.
struct ConfigState {
    topology: Option<CaptureTopology>,
    setup_result: Option<SetupResult>,
    is_session_running: bool,
    orientation: DeviceOrientation,
}

/// One in-flight recording with its timeline.
struct ActiveRecording {
    recorder: MovieRecorder,
    timeline: TimelineAdjuster,
    session: RecordingSession,
}

/// The dual-camera PiP pipeline.
pub struct CaptureController {
    role: RwLock<PipRole>,
    rendering_enabled: AtomicBool,
    compositor: Mutex<PipCompositor>,
    recording: Mutex<Option<ActiveRecording>>,
    config: Mutex<ConfigState>,
    governor: SessionCostGovernor,
    session: Arc<dyn CaptureSession>,
    writer_factory: Box<dyn WriterFactory>,
    event_tx: broadcast::Sender<PipelineEvent>,
}

impl CaptureController {
    pub fn new(session: Arc<dyn CaptureSession>, writer_factory: Box<dyn WriterFactory>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            role: RwLock::new(PipRole::default()),
            rendering_enabled: AtomicBool::new(true),
            compositor: Mutex::new(PipCompositor::new()),
            recording: Mutex::new(None),
            config: Mutex::new(ConfigState {
                topology: None,
                setup_result: None,
                is_session_running: false,
                orientation: DeviceOrientation::Portrait,
            }),
            governor: SessionCostGovernor::new(),
            session,
            writer_factory,
            event_tx,
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    pub fn role(&self) -> PipRole {
        *self.role.read()
    }

    /// Snapshot of the current topology, for the capture layer to
    /// apply after configuration or a governor pass mutates it.
    pub fn topology(&self) -> Option<CaptureTopology> {
        self.config.lock().topology.clone()
    }

    /// Current recording state
    pub fn recording_state(&self) -> RecordingState {
        match self.recording.lock().as_ref() {
            None => RecordingState::Idle,
            Some(active) if active.timeline.is_paused() => RecordingState::Paused,
            Some(_) => RecordingState::Recording,
        }
    }

    /// Configure the multi-stream session.
    ///
    /// Validates authorization and multi-cam support, builds the
    /// topology from the enumerated devices, starts the session and
    /// runs one cost check. Setup failures are surfaced once and not
    /// retried automatically.
    pub fn configure(&self, devices: DeviceSetup) -> SetupResult {
        let mut config = self.config.lock();
        if let Some(previous) = config.setup_result {
            return previous;
        }

        let result = self.configure_locked(&mut config, devices);
        config.setup_result = Some(result);
        result
    }

    fn configure_locked(&self, config: &mut ConfigState, devices: DeviceSetup) -> SetupResult {
        if !devices.authorized {
            tracing::warn!("camera/microphone access not authorized");
            return SetupResult::NotAuthorized;
        }
        if !devices.multicam_supported {
            tracing::warn!("multi-camera capture not supported on this device");
            return SetupResult::MultiCamNotSupported;
        }

        let Some(mut topology) = CaptureTopology::new(
            devices.back_camera,
            devices.front_camera,
            devices.back_mic,
            devices.front_mic,
        ) else {
            tracing::error!("no multicam-compatible format on a camera");
            return SetupResult::ConfigurationFailed;
        };

        config.orientation = devices.orientation;
        config.is_session_running = self.session.start_running();
        if !config.is_session_running {
            return SetupResult::ConfigurationFailed;
        }

        self.governor
            .check_and_reduce(&mut topology, self.session.as_ref());
        config.topology = Some(topology);

        tracing::info!("capture session configured");
        SetupResult::Success
    }

    /// Swap which camera fills the screen; effective from the next
    /// composited frame.
    pub fn toggle_role(&self) {
        let mut role = self.role.write();
        *role = role.toggled();
        tracing::info!("pip role toggled to {:?}", *role);
    }

    /// Host notification that the on-screen layout moved.
    pub fn overlay_geometry_changed(&self, rect: OverlayRect) {
        self.compositor.lock().set_overlay(rect);
    }

    /// Enable or disable rendering (foreground/background).
    ///
    /// Disabling halts compositor work and releases retained buffers;
    /// a recording in progress simply stops receiving fresh frames
    /// until rendering resumes - degrade, not fail.
    pub fn set_rendering_enabled(&self, enabled: bool) {
        self.rendering_enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.compositor.lock().reset();
            tracing::info!("rendering disabled, compositor reset");
        }
    }

    /// Start a recording, or stop the one in flight.
    pub fn start_or_stop_recording(&self) {
        let mut recording = self.recording.lock();
        match recording.take() {
            Some(mut active) => {
                let event_tx = self.event_tx.clone();
                active.recorder.stop(move |result| match result {
                    Ok(path) => {
                        let _ = event_tx.send(PipelineEvent::Finished(path));
                    }
                    Err(e) => {
                        let response = ErrorResponse::from(PipelineError::from(e));
                        let _ = event_tx.send(PipelineEvent::Error(response.message));
                    }
                });
                tracing::info!(
                    "recording stopped after {} pause(s)",
                    active.session.pause_count
                );
                let _ = self.event_tx.send(PipelineEvent::Stopped);
            }
            None => match self.build_recorder() {
                Ok(recorder) => {
                    *recording = Some(ActiveRecording {
                        recorder,
                        timeline: TimelineAdjuster::new(),
                        session: RecordingSession::new(),
                    });
                    let _ = self.event_tx.send(PipelineEvent::Started);
                }
                Err(e) => {
                    tracing::error!("could not start recording: {e}");
                    let _ = self
                        .event_tx
                        .send(PipelineEvent::ConfigurationFailed(e.to_string()));
                }
            },
        }
    }

    /// Negotiate track settings from the topology and start a writer.
    fn build_recorder(&self) -> crate::recorder::RecordingResult<MovieRecorder> {
        let config = self.config.lock();
        let topology = config.topology.as_ref().ok_or_else(|| {
            crate::recorder::RecordingError::Writer("session not configured".to_string())
        })?;

        let audio = settings::negotiate_audio_settings(
            &topology.recommended_audio_settings(CameraPosition::Back),
            &topology.recommended_audio_settings(CameraPosition::Front),
        )?;
        let video = settings::negotiate_video_settings(
            &topology.recommended_video_settings(CameraSlot::Primary),
            &topology.recommended_video_settings(CameraSlot::Secondary),
        )?;
        let transform = settings::create_video_transform(config.orientation);

        let mut recorder = MovieRecorder::new(audio, video, transform);
        recorder.start(self.writer_factory.as_ref())?;
        Ok(recorder)
    }

    /// Pause the recording timeline. No-op unless recording.
    pub fn pause_capture(&self) {
        let mut recording = self.recording.lock();
        if let Some(active) = recording.as_mut() {
            if active.recorder.is_recording() && !active.timeline.is_paused() {
                active.timeline.pause();
                active.session.pause_count += 1;
                tracing::info!("recording paused");
                let _ = self.event_tx.send(PipelineEvent::Paused);
            }
        }
    }

    /// Resume a paused recording timeline.
    pub fn resume_capture(&self) {
        let mut recording = self.recording.lock();
        if let Some(active) = recording.as_mut() {
            if active.timeline.is_paused() {
                active.timeline.resume();
                tracing::info!("recording resumed");
                let _ = self.event_tx.send(PipelineEvent::Resumed);
            }
        }
    }

    /// Flip the primary camera's torch.
    pub fn toggle_torch(&self) {
        let mut config = self.config.lock();
        if let Some(topology) = config.topology.as_mut() {
            if topology.toggle_torch() {
                tracing::info!("torch {}", if topology.torch_on() { "on" } else { "off" });
            }
        }
    }

    /// Deliver a captured video frame. Capture-thread context.
    pub fn video_frame_captured(&self, position: CameraPosition, frame: MediaFrame) {
        if !self.rendering_enabled.load(Ordering::Acquire) {
            return;
        }

        let role = *self.role.read();
        let mut compositor = self.compositor.lock();
        match router::route_video(role, position) {
            VideoRoute::CompositeAsInset => {
                compositor.set_inset_frame(frame);
            }
            VideoRoute::CompositeAsPrimary => {
                let inset_is_front = role.inset_position() == CameraPosition::Front;
                let Some(mixed) = compositor.composite(&frame, inset_is_front) else {
                    return;
                };

                let mut recording = self.recording.lock();
                match recording.as_mut() {
                    Some(active) if active.recorder.is_recording() => {
                        if let Some(adjusted) = active.timeline.adjust(mixed) {
                            active.recorder.record_video(adjusted);
                        }
                    }
                    _ => compositor.recycle_output(mixed),
                }
            }
        }
    }

    /// Deliver a captured audio frame. Capture-thread context.
    pub fn audio_frame_captured(&self, position: CameraPosition, frame: MediaFrame) {
        let role = *self.role.read();
        if !router::routes_audio(role, position) {
            return;
        }

        let mut recording = self.recording.lock();
        if let Some(active) = recording.as_mut() {
            if active.recorder.is_recording() {
                if let Some(adjusted) = active.timeline.adjust(frame) {
                    active.recorder.record_audio(adjusted);
                }
            }
        }
    }

    /// Pressure-level notification from the capture layer.
    pub fn pressure_state_changed(&self, level: PressureLevel) {
        let recording = self.recording_state() != RecordingState::Idle;
        let mut config = self.config.lock();
        if let Some(topology) = config.topology.as_mut() {
            self.governor.throttle_for_pressure(topology, level, recording);
            self.governor.check_and_reduce(topology, self.session.as_ref());
        }
    }

    /// Runtime fault in the capture session.
    ///
    /// A media-services reset is retried once automatically when the
    /// session had been running; anything else is surfaced for a
    /// manual resume.
    pub fn runtime_error_occurred(&self, media_services_reset: bool) {
        let mut config = self.config.lock();
        if media_services_reset && config.is_session_running {
            tracing::warn!("capture session reset, restarting");
            config.is_session_running = self.session.start_running();
            if !config.is_session_running {
                let _ = self
                    .event_tx
                    .send(PipelineEvent::SessionInterrupted { can_resume: true });
            }
        } else {
            let _ = self
                .event_tx
                .send(PipelineEvent::SessionInterrupted { can_resume: true });
        }
    }

    /// Stop the capture session entirely.
    pub fn shutdown(&self) {
        let mut config = self.config.lock();
        if config.is_session_running {
            self.session.stop_running();
            config.is_session_running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::device::{LensKind, VideoFormat};
    use crate::capture::frame::{
        FormatDescriptor, MediaTime, PixelEncoding, PixelFormat, SampleFormat,
    };
    use crate::capture::topology::VideoTrackConfig;
    use crate::recorder::writer::{ContainerWriter, TrackKind, VideoTransform};
    use crate::recorder::RecordingResult;

    struct StubSession;

    impl CaptureSession for StubSession {
        fn start_running(&self) -> bool {
            true
        }
        fn stop_running(&self) {}
        fn system_pressure_cost(&self) -> f64 {
            0.5
        }
        fn hardware_cost(&self) -> f64 {
            0.5
        }
    }

    #[derive(Debug, Default)]
    struct RecordedFrames {
        origin: Option<MediaTime>,
        video: Vec<MediaTime>,
        audio: Vec<MediaTime>,
    }

    struct SharedWriter {
        frames: Arc<Mutex<RecordedFrames>>,
        path: PathBuf,
    }

    impl ContainerWriter for SharedWriter {
        fn begin_session(&mut self, origin: MediaTime) -> RecordingResult<()> {
            self.frames.lock().origin = Some(origin);
            Ok(())
        }

        fn is_ready_for(&self, _track: TrackKind) -> bool {
            true
        }

        fn append(&mut self, track: TrackKind, frame: MediaFrame) -> RecordingResult<()> {
            let mut frames = self.frames.lock();
            match track {
                TrackKind::Video => frames.video.push(frame.pts),
                TrackKind::Audio => frames.audio.push(frame.pts),
            }
            Ok(())
        }

        fn finalize(self: Box<Self>) -> RecordingResult<PathBuf> {
            Ok(self.path.clone())
        }

        fn output_path(&self) -> &std::path::Path {
            &self.path
        }
    }

    struct SharedWriterFactory {
        frames: Arc<Mutex<RecordedFrames>>,
    }

    impl WriterFactory for SharedWriterFactory {
        fn create(
            &self,
            _audio: &AudioTrackConfig,
            _video: &VideoTrackConfig,
            _transform: VideoTransform,
        ) -> RecordingResult<Box<dyn ContainerWriter>> {
            Ok(Box::new(SharedWriter {
                frames: self.frames.clone(),
                path: PathBuf::from("/tmp/controller-test.mp4"),
            }))
        }
    }

    fn camera(position: CameraPosition) -> CameraDescriptor {
        CameraDescriptor {
            id: format!("{position:?}"),
            position,
            formats: vec![VideoFormat {
                width: 1280,
                height: 720,
                max_frame_rate: 30,
                supports_multicam: true,
            }],
            available_encodings: vec![PixelEncoding::Packed],
            lens: LensKind::Single,
            has_torch: position == CameraPosition::Back,
        }
    }

    fn mic(rate: u32) -> AudioTrackConfig {
        AudioTrackConfig {
            sample_rate: rate,
            channels: 1,
            sample_format: SampleFormat::S16,
        }
    }

    fn setup(back_mic_rate: u32, front_mic_rate: u32) -> DeviceSetup {
        DeviceSetup {
            authorized: true,
            multicam_supported: true,
            back_camera: camera(CameraPosition::Back),
            front_camera: camera(CameraPosition::Front),
            back_mic: mic(back_mic_rate),
            front_mic: mic(front_mic_rate),
            orientation: DeviceOrientation::Portrait,
        }
    }

    fn controller() -> (CaptureController, Arc<Mutex<RecordedFrames>>) {
        let frames = Arc::new(Mutex::new(RecordedFrames::default()));
        let controller = CaptureController::new(
            Arc::new(StubSession),
            Box::new(SharedWriterFactory {
                frames: frames.clone(),
            }),
        );
        (controller, frames)
    }

    fn video_frame(pts_ms: i64) -> MediaFrame {
        let descriptor = FormatDescriptor::Video {
            width: 4,
            height: 4,
            pixel_format: PixelFormat::Bgra8,
        };
        MediaFrame {
            pts: MediaTime::from_millis(pts_ms),
            dts: None,
            duration: MediaTime::from_millis(33),
            descriptor,
            data: vec![0u8; 64],
        }
    }

    fn audio_frame(pts_ms: i64) -> MediaFrame {
        MediaFrame {
            pts: MediaTime::from_millis(pts_ms),
            dts: None,
            duration: MediaTime::from_millis(10),
            descriptor: FormatDescriptor::Audio {
                sample_rate: 44_100,
                channels: 1,
                sample_format: SampleFormat::S16,
            },
            data: vec![0u8; 882],
        }
    }

    fn drain(rx: &mut broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn configure_validates_preconditions() {
        let (controller, _) = controller();
        let mut devices = setup(44_100, 44_100);
        devices.authorized = false;
        assert_eq!(controller.configure(devices), SetupResult::NotAuthorized);

        // Setup outcome is sticky, as a failed setup is not retried.
        assert_eq!(
            controller.configure(setup(44_100, 44_100)),
            SetupResult::NotAuthorized
        );
    }

    #[test]
    fn configure_rejects_missing_multicam_support() {
        let (controller, _) = controller();
        let mut devices = setup(44_100, 44_100);
        devices.multicam_supported = false;
        assert_eq!(
            controller.configure(devices),
            SetupResult::MultiCamNotSupported
        );
    }

    #[test]
    fn configure_succeeds_with_matching_devices() {
        let (controller, _) = controller();
        assert_eq!(controller.configure(setup(44_100, 44_100)), SetupResult::Success);
    }

    #[test]
    fn double_toggle_restores_role() {
        let (controller, _) = controller();
        let initial = controller.role();
        controller.toggle_role();
        assert_ne!(controller.role(), initial);
        controller.toggle_role();
        assert_eq!(controller.role(), initial);
    }

    #[test]
    fn mismatched_microphones_fail_the_start_request() {
        let (controller, _) = controller();
        controller.configure(setup(44_100, 48_000));
        let mut rx = controller.subscribe();

        controller.start_or_stop_recording();
        assert_eq!(controller.recording_state(), RecordingState::Idle);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PipelineEvent::ConfigurationFailed(_))));
    }

    #[test]
    fn recording_round_trip_routes_frames() {
        let (controller, frames) = controller();
        controller.configure(setup(44_100, 44_100));
        controller.start_or_stop_recording();
        assert_eq!(controller.recording_state(), RecordingState::Recording);

        // Default role: back camera is primary, front is the inset,
        // front microphone is the recorded audio path.
        controller.video_frame_captured(CameraPosition::Front, video_frame(0));
        controller.video_frame_captured(CameraPosition::Back, video_frame(0));
        controller.video_frame_captured(CameraPosition::Back, video_frame(33));
        controller.audio_frame_captured(CameraPosition::Front, audio_frame(40));
        controller.audio_frame_captured(CameraPosition::Back, audio_frame(40));

        let snapshot = frames.lock();
        // First composited frame opens the session; the second appends.
        assert_eq!(snapshot.origin, Some(MediaTime::ZERO));
        assert_eq!(snapshot.video, vec![MediaTime::from_millis(33)]);
        // Only the front microphone path was recorded.
        assert_eq!(snapshot.audio, vec![MediaTime::from_millis(40)]);
    }

    #[test]
    fn inset_frames_alone_do_not_record() {
        let (controller, frames) = controller();
        controller.configure(setup(44_100, 44_100));
        controller.start_or_stop_recording();

        controller.video_frame_captured(CameraPosition::Front, video_frame(0));
        controller.video_frame_captured(CameraPosition::Front, video_frame(33));
        assert!(frames.lock().origin.is_none());
    }

    #[test]
    fn rendering_disabled_drops_video_frames() {
        let (controller, frames) = controller();
        controller.configure(setup(44_100, 44_100));
        controller.start_or_stop_recording();

        controller.set_rendering_enabled(false);
        controller.video_frame_captured(CameraPosition::Front, video_frame(0));
        controller.video_frame_captured(CameraPosition::Back, video_frame(0));
        assert!(frames.lock().origin.is_none());

        // Re-enabling lets frames flow again.
        controller.set_rendering_enabled(true);
        controller.video_frame_captured(CameraPosition::Front, video_frame(66));
        controller.video_frame_captured(CameraPosition::Back, video_frame(66));
        assert!(frames.lock().origin.is_some());
    }

    #[test]
    fn pause_blocks_frames_until_resume() {
        let (controller, frames) = controller();
        controller.configure(setup(44_100, 44_100));
        controller.start_or_stop_recording();

        controller.video_frame_captured(CameraPosition::Front, video_frame(0));
        controller.video_frame_captured(CameraPosition::Back, video_frame(0));
        controller.audio_frame_captured(CameraPosition::Front, audio_frame(10));

        controller.pause_capture();
        assert_eq!(controller.recording_state(), RecordingState::Paused);
        controller.video_frame_captured(CameraPosition::Back, video_frame(33));
        controller.audio_frame_captured(CameraPosition::Front, audio_frame(50));

        let before_resume = frames.lock().audio.len();
        controller.resume_capture();
        assert_eq!(controller.recording_state(), RecordingState::Recording);

        // Anchor audio frame is consumed, then frames flow again.
        controller.audio_frame_captured(CameraPosition::Front, audio_frame(2_050));
        controller.audio_frame_captured(CameraPosition::Front, audio_frame(2_060));
        assert_eq!(frames.lock().audio.len(), before_resume + 1);
    }

    #[test]
    fn stop_emits_stopped_and_finished() {
        let (controller, _) = controller();
        controller.configure(setup(44_100, 44_100));
        let mut rx = controller.subscribe();

        controller.start_or_stop_recording();
        controller.video_frame_captured(CameraPosition::Front, video_frame(0));
        controller.video_frame_captured(CameraPosition::Back, video_frame(0));
        controller.start_or_stop_recording();
        assert_eq!(controller.recording_state(), RecordingState::Idle);

        // Finalization runs on a background thread.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        let mut events = Vec::new();
        while std::time::Instant::now() < deadline {
            events.extend(drain(&mut rx));
            if events
                .iter()
                .any(|e| matches!(e, PipelineEvent::Finished(_)))
            {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::Started)));
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::Stopped)));
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::Finished(p) if p.ends_with("controller-test.mp4"))));
    }

    #[test]
    fn runtime_reset_restarts_silently() {
        let (controller, _) = controller();
        controller.configure(setup(44_100, 44_100));
        let mut rx = controller.subscribe();

        controller.runtime_error_occurred(true);
        assert!(drain(&mut rx).is_empty());

        controller.runtime_error_occurred(false);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PipelineEvent::SessionInterrupted { can_resume: true })));
    }

    #[test]
    fn torch_round_trip() {
        let (controller, _) = controller();
        controller.configure(setup(44_100, 44_100));
        // No observable host surface beyond the topology flag; this
        // just must not panic before configuration either.
        controller.toggle_torch();
    }

    #[test]
    fn pressure_throttle_spares_active_recordings() {
        let (controller, _) = controller();
        controller.configure(setup(44_100, 44_100));

        controller.start_or_stop_recording();
        controller.pressure_state_changed(PressureLevel::Serious);
        assert!(controller
            .topology()
            .unwrap()
            .frame_rate_clamp(CameraSlot::Primary)
            .is_none());

        controller.start_or_stop_recording();
        controller.pressure_state_changed(PressureLevel::Serious);
        assert_eq!(
            controller
                .topology()
                .unwrap()
                .frame_rate_clamp(CameraSlot::Primary),
            Some((15, 20))
        );
    }

    #[test]
    fn shutdown_stops_the_session_once() {
        use std::sync::atomic::AtomicUsize;

        struct CountingSession {
            stops: AtomicUsize,
        }

        impl CaptureSession for CountingSession {
            fn start_running(&self) -> bool {
                true
            }
            fn stop_running(&self) {
                self.stops.fetch_add(1, Ordering::SeqCst);
            }
            fn system_pressure_cost(&self) -> f64 {
                0.5
            }
            fn hardware_cost(&self) -> f64 {
                0.5
            }
        }

        let session = Arc::new(CountingSession {
            stops: AtomicUsize::new(0),
        });
        let controller = CaptureController::new(
            session.clone(),
            Box::new(SharedWriterFactory {
                frames: Arc::new(Mutex::new(RecordedFrames::default())),
            }),
        );
        controller.configure(setup(44_100, 44_100));

        controller.shutdown();
        controller.shutdown();
        assert_eq!(session.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unconfigured_start_fails_cleanly() {
        let (controller, _) = controller();
        let mut rx = controller.subscribe();
        controller.start_or_stop_recording();
        assert_eq!(controller.recording_state(), RecordingState::Idle);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, PipelineEvent::ConfigurationFailed(_))));
    }
}
