use base64::{engine::general_purpose, Engine as _};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::api_connection::connection::ApiConnectionError;

pub const CAMERA_UNAVAILABLE_MESSAGE: &str = "Could not access the camera. Please check your permissions.";
pub const IDENTIFY_FAILED_MESSAGE: &str = "Sorry, we couldn't identify ingredients. Please try again.";
pub const FRAME_FAILED_MESSAGE: &str = "Could not process the image.";

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("failed to grab frame: {0}")]
    Frame(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture surface is not open")]
    NotOpen,
    #[error("no camera stream is active")]
    NoStream,
    #[error("an identification is already in progress")]
    Busy,
    #[error("could not capture a frame")]
    Frame,
    #[error("ingredient identification failed")]
    IdentificationFailed,
}

/// One source track of a camera stream.
pub trait VideoTrack: Send {
    /// Grabs a still frame as JPEG bytes.
    fn still_frame(&mut self) -> Result<Vec<u8>, DeviceError>;
    fn stop(&mut self);
}

pub trait Camera {
    fn acquire(&self) -> Result<CameraStream, DeviceError>;
}

/// Live camera stream. Every track is stopped when the stream is dropped.
pub struct CameraStream {
    tracks: Vec<Box<dyn VideoTrack>>,
}

impl CameraStream {
    pub fn new(tracks: Vec<Box<dyn VideoTrack>>) -> Self {
        Self { tracks }
    }

    pub fn capture_still(&mut self) -> Result<Vec<u8>, DeviceError> {
        let track = self
            .tracks
            .first_mut()
            .ok_or_else(|| DeviceError::Frame("stream has no video track".to_string()))?;
        track.still_frame()
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        for track in self.tracks.iter_mut() {
            track.stop();
        }
        debug!(tracks = self.tracks.len(), "Camera stream released");
    }
}

impl std::fmt::Debug for CameraStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStream")
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

/// Camera backed by a JPEG file on disk. Each still frame is the file's bytes.
#[derive(Debug, Clone)]
pub struct ImageFileCamera {
    path: PathBuf,
}

impl ImageFileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

struct ImageFileTrack {
    path: PathBuf,
    stopped: bool,
}

impl VideoTrack for ImageFileTrack {
    fn still_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        if self.stopped {
            return Err(DeviceError::Frame("track is stopped".to_string()));
        }
        fs::read(&self.path).map_err(|e| DeviceError::Frame(format!("{}: {}", self.path.display(), e)))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

impl Camera for ImageFileCamera {
    fn acquire(&self) -> Result<CameraStream, DeviceError> {
        if !self.path.is_file() {
            return Err(DeviceError::Unavailable(format!(
                "no image at {}",
                self.path.display()
            )));
        }
        Ok(CameraStream::new(vec![Box::new(ImageFileTrack {
            path: self.path.clone(),
            stopped: false,
        })]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Closed,
    Capturing,
    Identifying,
}

/// The capture surface: owns the camera stream while open.
#[derive(Debug, Default)]
pub struct CaptureSurface {
    phase: CapturePhase,
    stream: Option<CameraStream>,
    error: Option<String>,
}

impl CaptureSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != CapturePhase::Closed
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Inline message shown on the surface, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Opens the surface and requests the camera. A device failure leaves the
    /// surface open with an inline message.
    pub fn open(&mut self, camera: &dyn Camera) {
        // Already open: keep the current stream instead of acquiring a second one.
        if self.is_open() {
            return;
        }
        self.phase = CapturePhase::Capturing;
        self.error = None;
        self.acquire(camera);
    }

    /// Requests the camera again while the surface is open without a stream.
    pub fn retry_camera(&mut self, camera: &dyn Camera) -> Result<(), CaptureError> {
        match self.phase {
            CapturePhase::Closed => Err(CaptureError::NotOpen),
            CapturePhase::Identifying => Err(CaptureError::Busy),
            CapturePhase::Capturing => {
                // A live stream needs no retry.
                if self.stream.is_none() {
                    self.error = None;
                    self.acquire(camera);
                }
                Ok(())
            }
        }
    }

    fn acquire(&mut self, camera: &dyn Camera) {
        match camera.acquire() {
            Ok(stream) => self.stream = Some(stream),
            Err(e) => {
                warn!(error = %e, "Error accessing camera");
                self.error = Some(CAMERA_UNAVAILABLE_MESSAGE.to_string());
            }
        }
    }

    /// Grabs a still frame and returns it base64 encoded, moving to `Identifying`.
    pub fn begin_identify(&mut self) -> Result<String, CaptureError> {
        match self.phase {
            CapturePhase::Closed => return Err(CaptureError::NotOpen),
            CapturePhase::Identifying => return Err(CaptureError::Busy),
            CapturePhase::Capturing => {}
        }
        let stream = self.stream.as_mut().ok_or(CaptureError::NoStream)?;
        self.error = None;

        match stream.capture_still() {
            Ok(frame) => {
                self.phase = CapturePhase::Identifying;
                Ok(general_purpose::STANDARD.encode(frame))
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture frame");
                self.error = Some(FRAME_FAILED_MESSAGE.to_string());
                Err(CaptureError::Frame)
            }
        }
    }

    /// Applies the identification outcome. On success the surface closes and
    /// the names are handed back for merging. On failure nothing is returned
    /// and the surface stays open for another attempt.
    pub fn finish_identify(
        &mut self,
        outcome: Result<Vec<String>, ApiConnectionError>,
    ) -> Option<Vec<String>> {
        if self.phase != CapturePhase::Identifying {
            return None;
        }
        match outcome {
            Ok(names) => {
                self.close();
                Some(names)
            }
            Err(e) => {
                error!(error = %e, "API error identifying ingredients");
                self.error = Some(IDENTIFY_FAILED_MESSAGE.to_string());
                // Stream stays live so the user can shoot again.
                self.phase = CapturePhase::Capturing;
                None
            }
        }
    }

    /// Releases the camera and closes the surface.
    pub fn close(&mut self) {
        self.stream = None;
        self.error = None;
        self.phase = CapturePhase::Closed;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Camera double that counts stopped tracks.
    pub struct FakeCamera {
        pub available: bool,
        pub frame: Option<Vec<u8>>,
        pub stops: Arc<AtomicUsize>,
    }

    impl FakeCamera {
        pub fn working(frame: &[u8]) -> Self {
            Self {
                available: true,
                frame: Some(frame.to_vec()),
                stops: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn unavailable() -> Self {
            Self {
                available: false,
                frame: None,
                stops: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn stop_count(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    struct FakeTrack {
        frame: Option<Vec<u8>>,
        stops: Arc<AtomicUsize>,
    }

    impl VideoTrack for FakeTrack {
        fn still_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
            self.frame
                .clone()
                .ok_or_else(|| DeviceError::Frame("no frame".to_string()))
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Camera for FakeCamera {
        fn acquire(&self) -> Result<CameraStream, DeviceError> {
            if !self.available {
                return Err(DeviceError::Unavailable("permission denied".to_string()));
            }
            Ok(CameraStream::new(vec![
                Box::new(FakeTrack {
                    frame: self.frame.clone(),
                    stops: Arc::clone(&self.stops),
                }),
                Box::new(FakeTrack {
                    frame: None,
                    stops: Arc::clone(&self.stops),
                }),
            ]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FakeCamera;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_acquires_stream() {
        let camera = FakeCamera::working(b"jpeg");
        let mut surface = CaptureSurface::new();
        surface.open(&camera);
        assert_eq!(surface.phase(), CapturePhase::Capturing);
        assert!(surface.has_stream());
        assert!(surface.error().is_none());
    }

    #[test]
    fn test_unavailable_camera_keeps_surface_open() {
        let camera = FakeCamera::unavailable();
        let mut surface = CaptureSurface::new();
        surface.open(&camera);
        assert!(surface.is_open());
        assert!(!surface.has_stream());
        assert_eq!(surface.error(), Some(CAMERA_UNAVAILABLE_MESSAGE));
        assert_eq!(surface.begin_identify(), Err(CaptureError::NoStream));

        let working = FakeCamera::working(b"jpeg");
        surface.retry_camera(&working).unwrap();
        assert!(surface.has_stream());
        assert!(surface.error().is_none());
    }

    #[test]
    fn test_successful_identify_closes_and_releases_all_tracks() {
        let camera = FakeCamera::working(b"\xff\xd8jpeg");
        let mut surface = CaptureSurface::new();
        surface.open(&camera);

        let encoded = surface.begin_identify().unwrap();
        assert_eq!(encoded, general_purpose::STANDARD.encode(b"\xff\xd8jpeg"));
        assert_eq!(surface.phase(), CapturePhase::Identifying);
        assert_eq!(surface.begin_identify(), Err(CaptureError::Busy));

        let names = surface.finish_identify(Ok(vec!["egg".to_string()]));
        assert_eq!(names, Some(vec!["egg".to_string()]));
        assert_eq!(surface.phase(), CapturePhase::Closed);
        assert_eq!(camera.stop_count(), 2);
    }

    #[test]
    fn test_failed_identify_stays_open_for_retry() {
        let camera = FakeCamera::working(b"jpeg");
        let mut surface = CaptureSurface::new();
        surface.open(&camera);
        surface.begin_identify().unwrap();

        let names = surface.finish_identify(Err(ApiConnectionError::EmptyResponse));
        assert!(names.is_none());
        assert_eq!(surface.phase(), CapturePhase::Capturing);
        assert_eq!(surface.error(), Some(IDENTIFY_FAILED_MESSAGE));
        assert!(surface.has_stream());
        assert_eq!(camera.stop_count(), 0);

        assert!(surface.begin_identify().is_ok());
        assert!(surface.error().is_none());
    }

    #[test]
    fn test_close_and_drop_release_stream() {
        let camera = FakeCamera::working(b"jpeg");
        let mut surface = CaptureSurface::new();
        surface.open(&camera);
        surface.close();
        assert_eq!(camera.stop_count(), 2);

        {
            let mut dropped = CaptureSurface::new();
            dropped.open(&camera);
            dropped.begin_identify().unwrap();
        }
        assert_eq!(camera.stop_count(), 4);
    }

    #[test]
    fn test_identify_requires_open_surface() {
        let mut surface = CaptureSurface::new();
        assert_eq!(surface.begin_identify(), Err(CaptureError::NotOpen));
        assert!(surface.finish_identify(Ok(vec!["egg".to_string()])).is_none());
    }

    #[test]
    fn test_image_file_camera_reads_frame() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not-really-a-jpeg").unwrap();
        file.flush().unwrap();

        let camera = ImageFileCamera::new(file.path());
        let mut stream = camera.acquire().unwrap();
        assert_eq!(stream.capture_still().unwrap(), b"not-really-a-jpeg".to_vec());

        let missing = ImageFileCamera::new("/definitely/not/here.jpg");
        assert!(matches!(missing.acquire(), Err(DeviceError::Unavailable(_))));
    }
}
