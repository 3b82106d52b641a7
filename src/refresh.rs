//! Background refresh trigger
//!
//! Sends a [`RefreshMessage::Tick`] on a fixed interval so the dashboard
//! re-runs the pipeline. Per-source TTLs still decide whether a provider is
//! actually called.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Messages sent from the background timer to the main loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMessage {
    /// The refresh interval elapsed
    Tick,
}

/// Configuration for the refresh timer
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Whether auto-refresh is enabled
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            enabled: true,
        }
    }
}

impl RefreshConfig {
    /// Builds a config from an optional interval; `None` or zero disables it
    pub fn from_interval(interval: Option<Duration>) -> Self {
        match interval.filter(|d| !d.is_zero()) {
            Some(interval) => Self {
                interval,
                enabled: true,
            },
            None => Self {
                enabled: false,
                ..Self::default()
            },
        }
    }
}

/// Handle for the background refresh task
pub struct RefreshHandle {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshHandle {
    /// Spawns the timer task; nothing is spawned when disabled
    pub fn spawn(config: RefreshConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            let period = config.interval;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            debug!("refresh tick");
                            // A full channel means a tick is already pending
                            if let Err(mpsc::error::TrySendError::Closed(_)) =
                                msg_tx.try_send(RefreshMessage::Tick)
                            {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Stops the timer task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for a pending refresh message without blocking
pub fn try_recv(handle: &mut RefreshHandle) -> Option<RefreshMessage> {
    handle.receiver.try_recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert!(config.enabled);
    }

    #[test]
    fn test_zero_interval_disables() {
        assert!(!RefreshConfig::from_interval(Some(Duration::ZERO)).enabled);
        assert!(!RefreshConfig::from_interval(None).enabled);
        let config = RefreshConfig::from_interval(Some(Duration::from_secs(60)));
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(config);

        // With refresh disabled, there should be no messages
        assert!(try_recv(&mut handle).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_after_interval() {
        let mut handle = RefreshHandle::spawn(RefreshConfig::from_interval(Some(
            Duration::from_secs(30),
        )));

        let msg = tokio::time::timeout(Duration::from_secs(31), handle.receiver.recv())
            .await
            .expect("tick should arrive within the interval");
        assert_eq!(msg, Some(RefreshMessage::Tick));

        handle.shutdown().await;
    }
}
