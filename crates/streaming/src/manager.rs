//! Stream Session Manager

use crate::{SampleSource, SessionStats, StreamBufferManager, StreamConfig, StreamError};
use chrono::{DateTime, Utc};
use metrics::counter;
use pipeline::PipelineOrchestrator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Point-in-time view of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub user_id: String,
    pub session_id: String,
    pub running: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: f64,
    pub buffer_size: usize,
    pub required_buffer_size: usize,
    pub progress_percent: f64,
    pub processed_batches: usize,
    pub stats: SessionStats,
    pub config: StreamConfig,
    /// A full batch is buffered
    pub ready: bool,
}

impl StreamStatus {
    fn capture(user_id: &str, started_at: DateTime<Utc>, running: bool, buffer: &StreamBufferManager) -> Self {
        let buffer_size = buffer.buffered();
        let required = buffer.required_buffer_size();
        let progress = if required > 0 {
            (buffer_size as f64 / required as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        Self {
            user_id: user_id.to_string(),
            session_id: buffer.session_id().to_string(),
            running,
            started_at,
            uptime_seconds: uptime(started_at),
            buffer_size,
            required_buffer_size: required,
            progress_percent: progress,
            processed_batches: buffer.processed_batches(),
            stats: buffer.stats().clone(),
            config: *buffer.config(),
            ready: buffer_size >= required,
        }
    }
}

fn uptime(started_at: DateTime<Utc>) -> f64 {
    (Utc::now() - started_at).num_milliseconds() as f64 / 1000.0
}

struct SessionHandle {
    stop: watch::Sender<bool>,
    status: watch::Receiver<StreamStatus>,
    task: JoinHandle<SessionStats>,
}

/// Streaming sessions keyed by user id
pub struct StreamManager {
    orchestrator: Arc<PipelineOrchestrator>,
    config: StreamConfig,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl StreamManager {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, config: StreamConfig) -> Self {
        Self {
            orchestrator,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session for `user_id` fed by `source`
    pub async fn start<S>(&self, user_id: &str, source: S) -> Result<StreamStatus, StreamError>
    where
        S: SampleSource + 'static,
    {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(user_id) {
            return Err(StreamError::AlreadyRunning(user_id.to_string()));
        }

        let started_at = Utc::now();
        let session_id = format!("stream_{}_{}", user_id, started_at.timestamp());
        let buffer = StreamBufferManager::new(session_id.as_str(), self.config, Arc::clone(&self.orchestrator))?;
        let initial = StreamStatus::capture(user_id, started_at, true, &buffer);

        let (stop_tx, stop_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(initial.clone());
        let session = Session {
            user_id: user_id.to_string(),
            started_at,
            buffer,
            status: status_tx,
        };
        let task = tokio::spawn(session.run(source, stop_rx));

        sessions.insert(
            user_id.to_string(),
            SessionHandle {
                stop: stop_tx,
                status: status_rx,
                task,
            },
        );
        info!(
            "Stream started for user {} (session {}), {} active",
            user_id,
            session_id,
            sessions.len()
        );
        Ok(initial)
    }

    /// Stop a session and return its cumulative stats. A pipeline run in
    /// progress completes first.
    pub async fn stop(&self, user_id: &str) -> Result<SessionStats, StreamError> {
        let handle = self
            .sessions
            .lock()
            .await
            .remove(user_id)
            .ok_or_else(|| StreamError::NotFound(user_id.to_string()))?;

        // the task may already have exited on its own
        let _ = handle.stop.send(true);
        let stats = handle
            .task
            .await
            .map_err(|e| StreamError::TaskFailed(e.to_string()))?;
        info!("Stream stopped for user {}", user_id);
        Ok(stats)
    }

    /// Stop every session, returning the users that were stopped
    pub async fn stop_all(&self) -> Vec<String> {
        let users = self.active_users().await;
        let mut stopped = Vec::with_capacity(users.len());
        for user in users {
            match self.stop(&user).await {
                Ok(_) => stopped.push(user),
                Err(e) => warn!("Failed to stop stream for user {}: {}", user, e),
            }
        }
        stopped
    }

    pub async fn status(&self, user_id: &str) -> Option<StreamStatus> {
        let sessions = self.sessions.lock().await;
        sessions.get(user_id).map(|h| current(&h.status))
    }

    pub async fn statuses(&self) -> BTreeMap<String, StreamStatus> {
        let sessions = self.sessions.lock().await;
        sessions
            .iter()
            .map(|(user, h)| (user.clone(), current(&h.status)))
            .collect()
    }

    /// Receiver that observes every status update of one session
    pub async fn subscribe(&self, user_id: &str) -> Option<watch::Receiver<StreamStatus>> {
        let sessions = self.sessions.lock().await;
        sessions.get(user_id).map(|h| h.status.clone())
    }

    pub async fn active_users(&self) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut users: Vec<String> = sessions.keys().cloned().collect();
        users.sort();
        users
    }
}

fn current(status: &watch::Receiver<StreamStatus>) -> StreamStatus {
    let mut snapshot = status.borrow().clone();
    if snapshot.running {
        snapshot.uptime_seconds = uptime(snapshot.started_at);
    }
    snapshot
}

/// State owned by one session task
struct Session {
    user_id: String,
    started_at: DateTime<Utc>,
    buffer: StreamBufferManager,
    status: watch::Sender<StreamStatus>,
}

impl Session {
    fn publish(&self, running: bool) {
        let status = StreamStatus::capture(&self.user_id, self.started_at, running, &self.buffer);
        // receivers live in the manager; none left means the session is being dropped
        let _ = self.status.send(status);
    }

    async fn run<S: SampleSource>(mut self, mut source: S, mut stop: watch::Receiver<bool>) -> SessionStats {
        let config = *self.buffer.config();
        let mut failures: u32 = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = stop.changed() => break,
                next = source.next_batch() => next,
            };

            match next {
                Ok(Some(samples)) => {
                    failures = 0;
                    if let Err(e) = self.buffer.ingest(&samples) {
                        error!("Session {} buffer error: {}", self.buffer.session_id(), e);
                    }
                    self.publish(true);
                }
                Ok(None) => {
                    info!("Source for session {} ended", self.buffer.session_id());
                    break;
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    counter!("stream_connection_failures_total").increment(1);
                    let delay = config.backoff(failures);
                    warn!(
                        "Session {} source failed (attempt {}): {}; retrying in {:?}",
                        self.buffer.session_id(),
                        failures,
                        e,
                        delay
                    );

                    tokio::select! {
                        biased;
                        _ = stop.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    if let Err(e) = source.reconnect().await {
                        warn!("Session {} reconnect failed: {}", self.buffer.session_id(), e);
                    }
                }
            }
        }

        self.buffer.clear();
        self.publish(false);
        self.buffer.stats().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{orchestrator, settings};
    use crate::{ChannelSource, SyntheticConfig, SyntheticSource};

    fn manager() -> StreamManager {
        let settings = settings();
        StreamManager::new(orchestrator(&settings), StreamConfig::from_settings(&settings))
    }

    #[tokio::test]
    async fn test_start_rejects_duplicates() {
        let manager = manager();
        let (_tx, source) = ChannelSource::channel(1);
        let status = manager.start("alice", source).await.unwrap();
        assert!(status.session_id.starts_with("stream_alice_"));
        assert_eq!(status.required_buffer_size, 2560);
        assert!(status.running);

        let (_tx2, again) = ChannelSource::channel(1);
        assert_eq!(
            manager.start("alice", again).await.unwrap_err(),
            StreamError::AlreadyRunning("alice".into())
        );
        manager.stop("alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_unknown_user() {
        let manager = manager();
        assert_eq!(
            manager.stop("nobody").await.unwrap_err(),
            StreamError::NotFound("nobody".into())
        );
        assert!(manager.status("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_synthetic_session_dispatches() {
        let manager = manager();
        let source = SyntheticSource::new(SyntheticConfig {
            batch_size: 1280,
            max_samples: Some(2560 * 2),
            seed: Some(4),
            ..SyntheticConfig::default()
        });
        manager.start("bob", source).await.unwrap();

        let mut rx = manager.subscribe("bob").await.unwrap();
        let finished = rx.wait_for(|s| !s.running).await.unwrap().clone();
        assert_eq!(finished.processed_batches, 2);
        assert_eq!(finished.buffer_size, 0);

        let stats = manager.stop("bob").await.unwrap();
        assert_eq!(stats.features_processed, 8);
        assert!(manager.active_users().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_all() {
        let manager = manager();
        let (_a, source_a) = ChannelSource::channel(1);
        let (_b, source_b) = ChannelSource::channel(1);
        manager.start("a", source_a).await.unwrap();
        manager.start("b", source_b).await.unwrap();
        assert_eq!(manager.statuses().await.len(), 2);

        assert_eq!(manager.stop_all().await, vec!["a".to_string(), "b".to_string()]);
        assert!(manager.active_users().await.is_empty());
    }
}
