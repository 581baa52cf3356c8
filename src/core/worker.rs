//! Background worker.
//!
//! One tokio task owns the [`ProfileManager`] and takes commands from a
//! channel, one at a time. Probe results come back on a second channel and
//! are settled on the same task, so the state never needs a lock.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use super::manager::{ProbeReport, ProfileManager};
use super::monitor;
use super::router::{self, Request, Response, Routed};
use crate::constants;
use crate::state::ApplicationState;

const COMMAND_QUEUE: usize = 64;

pub(super) enum Command {
    Request {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    HealthCheck,
}

/// Cloneable client of the worker.
#[derive(Clone)]
pub struct WorkerHandle {
    commands: mpsc::Sender<Command>,
    updates: broadcast::Sender<ApplicationState>,
}

impl WorkerHandle {
    /// Sends `request` and waits for its response.
    pub async fn request(&self, request: Request) -> Response {
        self.submit(request).await.response().await
    }

    /// Queues `request` without waiting for the response.
    ///
    /// Requests reach the worker in submission order even when their
    /// responses are awaited elsewhere.
    pub async fn submit(&self, request: Request) -> PendingResponse {
        let (reply, response) = oneshot::channel();
        let queued = self
            .commands
            .send(Command::Request { request, reply })
            .await
            .is_ok();
        PendingResponse(queued.then_some(response))
    }

    /// Subscribes to `PROXY_DATA_UPDATED` states.
    pub fn subscribe(&self) -> broadcast::Receiver<ApplicationState> {
        self.updates.subscribe()
    }
}

/// Response to a submitted request.
pub struct PendingResponse(Option<oneshot::Receiver<Response>>);

impl PendingResponse {
    pub async fn response(self) -> Response {
        match self.0 {
            Some(response) => response
                .await
                .unwrap_or_else(|_| Response::error(constants::MSG_WORKER_UNAVAILABLE)),
            None => Response::error(constants::MSG_WORKER_UNAVAILABLE),
        }
    }
}

/// Spawns the worker and its health monitor.
///
/// The worker serves requests until every [`WorkerHandle`] is dropped.
pub fn spawn(
    manager: ProfileManager,
    reports: mpsc::UnboundedReceiver<ProbeReport>,
    health_interval: Duration,
) -> (WorkerHandle, JoinHandle<()>) {
    let (commands, inbox) = mpsc::channel(COMMAND_QUEUE);
    let handle = WorkerHandle {
        commands: commands.clone(),
        updates: manager.store().broadcaster(),
    };

    monitor::spawn(commands.downgrade(), health_interval);
    let task = tokio::spawn(run(manager, inbox, reports));
    (handle, task)
}

async fn run(
    mut manager: ProfileManager,
    mut inbox: mpsc::Receiver<Command>,
    mut reports: mpsc::UnboundedReceiver<ProbeReport>,
) {
    log::info!(
        "[worker] Ready with {} profile(s), status {}",
        manager.state().profiles.len(),
        manager.state().connection_status
    );

    loop {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(Command::Request { request, reply }) => {
                    match router::route(&mut manager, request).await {
                        Routed::Done(response) => {
                            let _ = reply.send(response);
                        }
                        Routed::Probe(pending) => {
                            tokio::spawn(async move {
                                let _ = reply.send(pending.await);
                            });
                        }
                    }
                }
                Some(Command::HealthCheck) => {
                    manager.start_health_check();
                }
                None => break,
            },
            Some(report) = reports.recv() => manager.settle_probe(report),
        }
    }

    log::info!("[worker] All clients gone, stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::applier::ProxyApplier;
    use crate::core::manager::{ManagerSettings, ToggleStatus};
    use crate::core::prober::testing::ScriptedProber;
    use crate::core::prober::ProbeOutcome;
    use crate::core::router::ConnectionReport;
    use crate::core::store::testing::MemoryStorage;
    use crate::core::store::StateStore;
    use crate::platform::testing::RecordingBackend;
    use crate::state::{ConnectionStatus, PortInput, ProfileDraft};
    use std::sync::Arc;

    struct Fixture {
        handle: WorkerHandle,
        task: JoinHandle<()>,
        prober: Arc<ScriptedProber>,
    }

    fn start(health_interval: Duration) -> Fixture {
        let prober = Arc::new(ScriptedProber::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = ProfileManager::new(
            StateStore::new(Arc::new(MemoryStorage::default())),
            ProxyApplier::new(Arc::new(RecordingBackend::default())),
            prober.clone(),
            ManagerSettings {
                probe_timeout: Duration::from_secs(5),
                activation_probe_delay: Duration::from_millis(1500),
            },
            tx,
        );
        let (handle, task) = spawn(manager, rx, health_interval);
        Fixture {
            handle,
            task,
            prober,
        }
    }

    async fn save(handle: &WorkerHandle, host: &str) -> String {
        let response = handle
            .request(Request::SaveProfile {
                profile: ProfileDraft {
                    name: "P".to_string(),
                    host: host.to_string(),
                    port: PortInput::Text("3128".to_string()),
                    ..Default::default()
                },
            })
            .await;
        match response {
            Response::Saved { profile_id, .. } => profile_id,
            other => panic!("unexpected response {other:?}"),
        }
    }

    async fn state(handle: &WorkerHandle) -> ApplicationState {
        match handle.request(Request::GetProxyData).await {
            Response::State(state) => state,
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_flow_broadcasts_every_transition() {
        let fixture = start(Duration::from_secs(30));
        let handle = fixture.handle;
        let id = save(&handle, "proxy.example.com").await;
        let mut updates = handle.subscribe();

        let response = handle
            .request(Request::ToggleProxy {
                profile_id: id.clone(),
            })
            .await;
        assert_eq!(
            response,
            Response::Toggled {
                status: ToggleStatus::Enabled
            }
        );

        let connecting = updates.recv().await.unwrap();
        assert_eq!(connecting.connection_status, ConnectionStatus::Connecting);
        let connected = updates.recv().await.unwrap();
        assert_eq!(connected.connection_status, ConnectionStatus::Connected);
        assert_eq!(connected.last_ping_ms, Some(42));

        assert_eq!(state(&handle).await, connected);
    }

    #[tokio::test]
    async fn test_errors_are_returned_in_payload() {
        let fixture = start(Duration::from_secs(30));
        let response = fixture
            .handle
            .request(Request::ToggleProxy {
                profile_id: "missing".to_string(),
            })
            .await;
        assert_eq!(response.error_message(), Some("Profile not found"));

        let response = fixture
            .handle
            .request(Request::SaveProfile {
                profile: ProfileDraft::default(),
            })
            .await;
        assert_eq!(
            response.error_message(),
            Some("Name, host and port are required")
        );
    }

    #[tokio::test]
    async fn test_submitted_requests_run_in_order() {
        let fixture = start(Duration::from_secs(30));
        let saved = fixture
            .handle
            .submit(Request::SaveProfile {
                profile: ProfileDraft {
                    name: "P".to_string(),
                    host: "h".to_string(),
                    port: PortInput::Text("3128".to_string()),
                    ..Default::default()
                },
            })
            .await;
        let read = fixture.handle.submit(Request::GetProxyData).await;

        // Awaiting the read first must still observe the save.
        match read.response().await {
            Response::State(state) => assert_eq!(state.profiles.len(), 1),
            other => panic!("unexpected response {other:?}"),
        }
        assert!(matches!(saved.response().await, Response::Saved { .. }));
    }

    #[tokio::test]
    async fn test_delete_twice_succeeds() {
        let fixture = start(Duration::from_secs(30));
        let id = save(&fixture.handle, "h").await;
        for _ in 0..2 {
            let response = fixture
                .handle
                .request(Request::DeleteProfile {
                    profile_id: id.clone(),
                })
                .await;
            assert_eq!(response, Response::Deleted { success: true });
        }
        assert!(state(&fixture.handle).await.profiles.is_empty());
    }

    #[tokio::test]
    async fn test_connection_test_does_not_change_state() {
        let fixture = start(Duration::from_secs(30));
        fixture.prober.push(ProbeOutcome::Unreachable {
            reason: "dns".to_string(),
        });
        let before = state(&fixture.handle).await;

        let response = fixture.handle.request(Request::TestConnection).await;
        assert_eq!(
            response,
            Response::Connection(ConnectionReport::Error {
                error: "dns".to_string()
            })
        );
        assert_eq!(state(&fixture.handle).await, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_monitor_refreshes_ping() {
        let fixture = start(Duration::from_secs(30));
        let handle = fixture.handle;
        let id = save(&handle, "proxy.example.com").await;
        let mut updates = handle.subscribe();
        handle.request(Request::ToggleProxy { profile_id: id }).await;
        updates.recv().await.unwrap();
        updates.recv().await.unwrap();

        fixture.prober.push(ProbeOutcome::Reachable { rtt_ms: 9 });
        let refreshed = updates.recv().await.unwrap();
        assert_eq!(refreshed.connection_status, ConnectionStatus::Connected);
        assert_eq!(refreshed.last_ping_ms, Some(9));
    }

    #[tokio::test]
    async fn test_worker_stops_when_handles_drop() {
        let fixture = start(Duration::from_secs(30));
        drop(fixture.handle);
        fixture.task.await.unwrap();
    }
}
