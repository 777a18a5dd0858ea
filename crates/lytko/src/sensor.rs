//! External temperature sensor backed by a polled file.
//!
//! The file holds the sensor's raw state, e.g. `21.4` or `unavailable`.
//! Parsing happens in the coordinator; this side only forwards changes.

use std::path::PathBuf;
use std::time::Duration;

use lytko_config::SensorSource;
use lytko_core::ExternalSensor;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const UNAVAILABLE: &str = "unavailable";

/// Start polling `source` and return the sensor handle plus its task.
pub fn spawn_file_sensor(
    source: &SensorSource,
    cancel: CancellationToken,
) -> (ExternalSensor, JoinHandle<()>) {
    let (tx, readings) = watch::channel(String::new());
    let interval = Duration::from_secs(source.poll_secs.max(1));
    let handle = tokio::spawn(poll_file(source.path.clone(), interval, tx, cancel));
    let sensor = ExternalSensor {
        id: source.id.clone(),
        readings,
    };
    (sensor, handle)
}

async fn poll_file(
    path: PathBuf,
    interval: Duration,
    tx: watch::Sender<String>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let raw = match tokio::fs::read_to_string(&path).await {
                    Ok(contents) => contents.trim().to_owned(),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "sensor file unreadable");
                        UNAVAILABLE.to_owned()
                    }
                };
                tx.send_if_modified(|current| {
                    if *current == raw {
                        return false;
                    }
                    *current = raw;
                    true
                });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn next(readings: &mut watch::Receiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(5), readings.changed())
            .await
            .unwrap()
            .unwrap();
        readings.borrow_and_update().clone()
    }

    #[tokio::test]
    async fn forwards_changes_of_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hall");
        std::fs::write(&path, "21.5\n").unwrap();

        let (tx, mut readings) = watch::channel(String::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_file(
            path.clone(),
            Duration::from_millis(10),
            tx,
            cancel.clone(),
        ));

        assert_eq!(next(&mut readings).await, "21.5");

        std::fs::write(&path, "22").unwrap();
        assert_eq!(next(&mut readings).await, "22");

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_reads_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut readings) = watch::channel(String::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_file(
            dir.path().join("absent"),
            Duration::from_millis(10),
            tx,
            cancel.clone(),
        ));

        assert_eq!(next(&mut readings).await, UNAVAILABLE);

        cancel.cancel();
        task.await.unwrap();
    }
}
