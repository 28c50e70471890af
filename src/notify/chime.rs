use std::path::Path;
use std::process::ExitStatus;

use tokio::process::Command;

/// Plays the doorbell chime by handing the audio file to an external player.
///
/// Launch and exit failures are reported to the caller; whether to care is
/// the caller's decision.
pub async fn play(player: &str, file: &Path) -> Result<(), ChimeError> {
    let status = Command::new(player)
        .arg(file)
        .status()
        .await
        .map_err(|e| ChimeError::Launch(player.to_string(), e))?;
    if !status.success() {
        return Err(ChimeError::Exited(status));
    }
    Ok(())
}

quick_error! {
    #[derive(Debug)]
    pub enum ChimeError {
        Launch(player: String, error: std::io::Error) {
            display("Unable to launch audio player `{}`: {}", player, error)
            source(error)
        }
        Exited(status: ExitStatus) {
            display("Audio player exited unsuccessfully: {}", status)
        }
    }
}
