mod button;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use button::{DoorbellButton, TriggerError};

/// One "pressed" edge from the doorbell button. Debouncing happens in the
/// capture session, not here.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TriggerEvent {
    pub pressed_at: DateTime<Utc>,
}
