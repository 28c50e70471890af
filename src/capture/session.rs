use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, Instrument};

use super::{Debounce, FrameExtractor, JpegDecoder};
use crate::config::{Config, ConfigCamera, ConfigCapture};
use crate::notify::{EmailNotifier, Notifier};
use crate::trigger::TriggerEvent;

/// One handled doorbell press: when it happened and which files it produced.
/// Empty `frames` means the press was debounced, the stream was unavailable,
/// or nothing decoded.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct CaptureEvent {
    pub triggered_at: DateTime<Utc>,
    pub frames: Vec<PathBuf>,
}

/// Handles one doorbell press end to end: debounce, stream fetch, frame
/// extraction, persistence, notification.
pub struct CaptureSession<N> {
    camera: ConfigCamera,
    capture: ConfigCapture,
    client: reqwest::Client,
    debounce: Debounce,
    notifier: N,
}

impl<N: Notifier> CaptureSession<N> {
    pub fn new(
        camera: ConfigCamera,
        capture: ConfigCapture,
        notifier: N,
    ) -> Result<CaptureSession<N>, CaptureError> {
        let mut builder = reqwest::Client::builder().tcp_keepalive(Duration::from_secs(60));
        if camera.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(camera.timeout));
        }
        let client = builder.build().map_err(CaptureError::Connection)?;
        let debounce = Debounce::new(Duration::from_secs(capture.cooldown));
        Ok(CaptureSession {
            camera,
            capture,
            client,
            debounce,
            notifier,
        })
    }

    /// Entry point for a button press. The cooldown window moves forward at
    /// acceptance, before any capture work, so a slow capture still holds
    /// off the next press.
    pub async fn handle_trigger(&mut self, trigger: TriggerEvent) -> CaptureEvent {
        info!("Doorbell pressed");
        if !self.debounce.try_accept(Instant::now()) {
            info!("Button pressed too soon, ignoring");
            return CaptureEvent {
                triggered_at: trigger.pressed_at,
                frames: Vec::new(),
            };
        }

        let frames = match self.capture_frames().await {
            Ok(frames) => frames,
            Err(e) => {
                error!("Unable to retrieve the camera stream: {}", e);
                Vec::new()
            }
        };

        if frames.is_empty() {
            info!("No images captured, email not sent");
        } else {
            self.notifier.deliver(&frames).await;
        }

        CaptureEvent {
            triggered_at: trigger.pressed_at,
            frames,
        }
    }

    async fn capture_frames(&self) -> Result<Vec<PathBuf>, CaptureError> {
        let res = self
            .client
            .get(self.camera.stream_url.as_str())
            .send()
            .await
            .map_err(CaptureError::Connection)?;
        if !res.status().is_success() {
            return Err(CaptureError::StreamStatus(res.status()));
        }

        let extractor = FrameExtractor::new(JpegDecoder, self.capture.frame_limit);
        let images = extractor.collect(Box::pin(res.bytes_stream())).await;

        let mut saved = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let path = self
                .capture
                .image_dir
                .join(format!("doorbell_frame_{}.jpg", i + 1));
            match image.save(&path) {
                Ok(()) => {
                    info!("Saved image {}", path.display());
                    saved.push(path);
                }
                Err(e) => error!("Unable to write {}: {}", path.display(), e),
            }
        }
        Ok(saved)
    }
}

/// Spawns the task that owns the session and drains the trigger queue.
/// Presses are handled strictly in arrival order, one at a time, which is
/// what keeps the debounce state single-writer.
pub fn run_capture_loop(
    config: &Config,
) -> Result<mpsc::UnboundedSender<TriggerEvent>, CaptureError> {
    let notifier = EmailNotifier::new(config.smtp.clone(), config.chime.clone());
    let mut session =
        CaptureSession::new(config.camera.clone(), config.capture.clone(), notifier)?;
    let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<TriggerEvent>();

    let logging_span = info_span!("Capture");
    tokio::spawn(
        async move {
            while let Some(trigger) = trigger_rx.recv().await {
                session.handle_trigger(trigger).await;
            }
            debug!("Trigger queue closed, capture loop stopping");
        }
        .instrument(logging_span),
    );

    Ok(trigger_tx)
}

quick_error! {
    #[derive(Debug)]
    pub enum CaptureError {
        Connection(error: reqwest::Error) {
            display("Unable to connect to camera stream: {}", error)
            source(error)
        }
        StreamStatus(status: reqwest::StatusCode) {
            display("Camera stream returned non-success status: {}", status)
        }
    }
}
