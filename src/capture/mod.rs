mod debounce;
mod extractor;
mod session;

pub use debounce::Debounce;
pub use extractor::{FrameDecoder, FrameExtractor, JpegDecoder};
pub use session::{run_capture_loop, CaptureError, CaptureEvent, CaptureSession};
