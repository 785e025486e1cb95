//! Logging for nutritrack.
use anyhow::Context;
use nutritrack_core::get_data_dir;
use std::io::LineWriter;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::OffsetTime;

const MAX_LOG_SIZE: u64 = 100 * 1024;

/// Initializes file based logging at `<data_dir>/nutritrack.log`.
///
/// A log larger than 100KB is moved to `nutritrack.log.old` first. The nutritrack crates log at
/// DEBUG, rustyline at INFO.
///
/// # Errors
///
/// Fails if the data directory or log file cannot be prepared, or the subscriber cannot be set.
pub fn setup_logging() -> anyhow::Result<()> {
    let data_dir = get_data_dir().context("Failed to get data directory")?;
    let log_path = data_dir.join("nutritrack.log");
    rotate_log(&log_path, &data_dir.join("nutritrack.log.old"))?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    // Flush after every line
    let writer = Mutex::new(LineWriter::new(log_file));

    tracing_subscriber::fmt()
        .with_env_filter("nutritrack=debug,nutritrack_core=debug,rustyline=info")
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(OffsetTime::local_rfc_3339()?)
        .init();
    Ok(())
}

fn rotate_log(log_path: &Path, backup_path: &Path) -> std::io::Result<()> {
    if log_path.exists() && std::fs::metadata(log_path)?.len() > MAX_LOG_SIZE {
        if backup_path.exists() {
            std::fs::remove_file(backup_path)?;
        }
        std::fs::rename(log_path, backup_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_log_moves_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("nutritrack.log");
        let old = dir.path().join("nutritrack.log.old");
        std::fs::write(&old, "stale").unwrap();
        std::fs::write(&log, vec![b'x'; (MAX_LOG_SIZE + 1) as usize]).unwrap();

        rotate_log(&log, &old).unwrap();

        assert!(!log.exists());
        assert_eq!(std::fs::metadata(&old).unwrap().len(), MAX_LOG_SIZE + 1);
    }

    #[test]
    fn test_rotate_log_keeps_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("nutritrack.log");
        let old = dir.path().join("nutritrack.log.old");
        std::fs::write(&log, "small").unwrap();

        rotate_log(&log, &old).unwrap();

        assert!(log.exists());
        assert!(!old.exists());
    }
}
