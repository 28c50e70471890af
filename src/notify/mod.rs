mod chime;
mod email;

use std::future::Future;
use std::path::PathBuf;

pub use chime::ChimeError;
pub use email::{EmailNotifier, NotifyError};

/// Outbound side of a handled doorbell press.
pub trait Notifier {
    /// Deliver the captured images. Failures are handled and logged behind
    /// this boundary; the capture path is never told about them and nothing
    /// is retried.
    fn deliver(&self, frames: &[PathBuf]) -> impl Future<Output = ()> + Send;
}
