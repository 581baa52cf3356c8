//! Profile lifecycle manager.
//!
//! Owns the [`ApplicationState`] and is the only code that mutates it. Every
//! mutation is built on a copy and committed through the [`StateStore`], so a
//! failed save leaves both the persisted and the in-memory state untouched.
//!
//! Activation applies the proxy, marks the profile `connecting` and schedules
//! a delayed probe. The probe runs in its own task and reports back through a
//! channel; [`ProfileManager::settle_probe`] applies the result only if the
//! activation it belongs to is still current.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::applier::{ConfigError, ProxyApplier, ProxyConfig};
use super::prober::{Probe, ProbeOutcome};
use super::store::StateStore;
use crate::config::AppConfig;
use crate::constants;
use crate::state::{
    ApplicationState, ConnectionStatus, ProfileDraft, ProxyProfile, ValidationError,
};

/// Errors returned to callers of the manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{}", constants::MSG_PROFILE_NOT_FOUND)]
    ProfileNotFound(String),
    #[error("{}", constants::MSG_ACTIVATION_FAILED)]
    Activation(#[source] ConfigError),
    #[error("{}", constants::MSG_DEACTIVATION_FAILED)]
    Deactivation(#[source] ConfigError),
}

/// Outcome of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleStatus {
    Enabled,
    Disabled,
}

/// Timing knobs for probes.
#[derive(Debug, Clone, Copy)]
pub struct ManagerSettings {
    pub probe_timeout: Duration,
    pub activation_probe_delay: Duration,
}

impl From<&AppConfig> for ManagerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            activation_probe_delay: Duration::from_millis(config.activation_probe_delay_ms),
        }
    }
}

/// Which check a probe result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// The delayed probe after an activation, tagged with its generation.
    Activation { generation: u64 },
    /// A periodic health check.
    Health,
}

/// A finished probe, sent back to whoever drives the manager.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub profile_id: String,
    pub kind: ProbeKind,
    pub outcome: ProbeOutcome,
}

struct PendingActivation {
    profile_id: String,
    generation: u64,
    cancel: CancellationToken,
}

pub struct ProfileManager {
    store: StateStore,
    state: ApplicationState,
    applier: ProxyApplier,
    prober: Arc<dyn Probe>,
    settings: ManagerSettings,
    reports: mpsc::UnboundedSender<ProbeReport>,
    pending: Option<PendingActivation>,
    generation: u64,
    health_in_flight: bool,
}

impl ProfileManager {
    /// Creates a manager over the state currently persisted in `store`.
    ///
    /// Probe results are delivered on `reports` and must be fed back through
    /// [`settle_probe`](Self::settle_probe).
    pub fn new(
        store: StateStore,
        applier: ProxyApplier,
        prober: Arc<dyn Probe>,
        settings: ManagerSettings,
        reports: mpsc::UnboundedSender<ProbeReport>,
    ) -> Self {
        let state = store.load();
        Self {
            store,
            state,
            applier,
            prober,
            settings,
            reports,
            pending: None,
            generation: 0,
            health_in_flight: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Reapplies the persisted active profile at startup.
    pub async fn restore(&mut self) {
        let mut next = self.state.clone();
        let Some(profile) = next.active_profile().cloned() else {
            self.commit(next);
            return;
        };

        log::info!("[manager] Restoring active profile '{}'", profile.name);
        match self.applier.apply(&profile).await {
            Ok(_) => {
                next.activate(&profile.id);
                if self.commit(next) {
                    self.schedule_activation_probe(&profile);
                }
            }
            Err(e) => {
                log::error!("[manager] Failed to apply proxy on startup: {e}");
                next.mark_error();
                self.commit(next);
            }
        }
    }

    /// Creates or updates a profile and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Validation`] for bad fields; the state is unchanged.
    pub async fn save_profile(&mut self, draft: ProfileDraft) -> Result<String, ManagerError> {
        let existing = draft
            .id
            .as_deref()
            .and_then(|id| self.state.profiles.iter().position(|p| p.id == id));

        let Some(index) = existing else {
            let profile = draft.validate(self.next_profile_id())?;
            let id = profile.id.clone();
            log::info!("[manager] Created profile '{}' ({id})", profile.name);
            let mut next = self.state.clone();
            next.profiles.push(profile);
            self.commit(next);
            return Ok(id);
        };

        let id = self.state.profiles[index].id.clone();
        let profile = draft.validate(id.clone())?;
        let mut next = self.state.clone();
        next.profiles[index] = profile.clone();
        log::info!("[manager] Updated profile '{}' ({id})", profile.name);

        if !next.is_active(&id) {
            self.commit(next);
            return Ok(id);
        }

        match self.applier.apply(&profile).await {
            Ok(_) => {
                next.activate(&id);
                if self.commit(next) {
                    self.schedule_activation_probe(&profile);
                } else {
                    self.revert_system_proxy().await;
                }
            }
            Err(e) => {
                log::error!("[manager] Failed to re-apply edited profile '{id}': {e}");
                next.mark_error();
                if self.commit(next) {
                    self.cancel_pending();
                }
            }
        }
        Ok(id)
    }

    /// Removes a profile, deactivating it first if it is active.
    ///
    /// Unknown ids are a no-op.
    pub async fn delete_profile(&mut self, id: &str) {
        let Some(index) = self.state.profiles.iter().position(|p| p.id == id) else {
            log::debug!("[manager] Delete of unknown profile '{id}' ignored");
            return;
        };

        let mut next = self.state.clone();
        let was_active = next.is_active(id);
        if was_active {
            if let Err(e) = self.applier.clear().await {
                log::error!("[manager] Failed to clear proxy settings: {e}");
            }
            next.deactivate();
        }

        let removed = next.profiles.remove(index);
        if !self.commit(next) {
            if was_active {
                self.revert_system_proxy().await;
            }
            return;
        }
        if was_active {
            self.cancel_pending();
        }
        log::info!("[manager] Deleted profile '{}' ({id})", removed.name);
    }

    /// Deactivates `id` if it is active, otherwise activates it.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::ProfileNotFound`] if `id` is not a saved profile.
    /// - [`ManagerError::Activation`] / [`ManagerError::Deactivation`] if the
    ///   system proxy could not be changed or the new state could not be
    ///   saved; the state and the system proxy are left as they were.
    pub async fn toggle(&mut self, id: &str) -> Result<ToggleStatus, ManagerError> {
        if self.state.is_active(id) {
            if let Err(e) = self.applier.clear().await {
                log::error!("[manager] Failed to clear proxy settings: {e}");
                return Err(ManagerError::Deactivation(e));
            }
            let mut next = self.state.clone();
            next.deactivate();
            if !self.commit(next) {
                self.revert_system_proxy().await;
                return Err(ManagerError::Deactivation(ConfigError::Unsaved));
            }
            self.cancel_pending();
            log::info!("[manager] Proxy disabled");
            return Ok(ToggleStatus::Disabled);
        }

        let profile = self
            .state
            .profile(id)
            .cloned()
            .ok_or_else(|| ManagerError::ProfileNotFound(id.to_string()))?;

        if let Err(e) = self.applier.apply(&profile).await {
            log::error!("[manager] Proxy activation error: {e}");
            return Err(ManagerError::Activation(e));
        }

        let mut next = self.state.clone();
        next.activate(id);
        if !self.commit(next) {
            self.revert_system_proxy().await;
            return Err(ManagerError::Activation(ConfigError::Unsaved));
        }
        log::info!("[manager] Proxy enabled: '{}'", profile.name);
        self.schedule_activation_probe(&profile);
        Ok(ToggleStatus::Enabled)
    }

    /// Builds a one-off probe through the active profile (or direct).
    ///
    /// The returned future owns everything it needs, so it can run on its own task.
    pub fn connection_test(&self) -> impl Future<Output = ProbeOutcome> + Send + 'static {
        let prober = Arc::clone(&self.prober);
        let route = self.state.active_profile().and_then(probe_route);
        let timeout = self.settings.probe_timeout;
        async move { prober.probe(route, timeout).await }
    }

    /// Starts a health probe if the active profile is connected and no
    /// health probe is already running. Returns whether one was started.
    pub fn start_health_check(&mut self) -> bool {
        if self.health_in_flight || self.state.connection_status != ConnectionStatus::Connected {
            return false;
        }
        let Some(profile) = self.state.active_profile().cloned() else {
            return false;
        };

        self.health_in_flight = true;
        let probe = self.connection_test();
        let reports = self.reports.clone();
        tokio::spawn(async move {
            let outcome = probe.await;
            let _ = reports.send(ProbeReport {
                profile_id: profile.id,
                kind: ProbeKind::Health,
                outcome,
            });
        });
        true
    }

    /// Applies a finished probe if it still describes the current activation.
    pub fn settle_probe(&mut self, report: ProbeReport) {
        match report.kind {
            ProbeKind::Activation { generation } => self.settle_activation(report, generation),
            ProbeKind::Health => self.settle_health(report),
        }
    }

    fn settle_activation(&mut self, report: ProbeReport, generation: u64) {
        let current = self.pending.as_ref().is_some_and(|p| {
            p.generation == generation
                && p.profile_id == report.profile_id
                && !p.cancel.is_cancelled()
        });
        if !current
            || !self.state.is_active(&report.profile_id)
            || self.state.connection_status != ConnectionStatus::Connecting
        {
            log::debug!(
                "[manager] Discarding stale activation probe for '{}'",
                report.profile_id
            );
            return;
        }
        self.pending = None;

        let mut next = self.state.clone();
        match report.outcome {
            ProbeOutcome::Reachable { rtt_ms } => {
                log::info!("[probe] Connected through '{}' ({rtt_ms}ms)", report.profile_id);
                next.mark_connected(rtt_ms);
            }
            ProbeOutcome::Unreachable { reason } => {
                log::warn!(
                    "[probe] Connectivity check through '{}' failed: {reason}",
                    report.profile_id
                );
                next.mark_error();
            }
        }
        self.commit(next);
    }

    fn settle_health(&mut self, report: ProbeReport) {
        self.health_in_flight = false;
        if !self.state.is_active(&report.profile_id)
            || self.state.connection_status != ConnectionStatus::Connected
        {
            log::debug!("[health] Discarding result for inactive profile");
            return;
        }

        match report.outcome {
            ProbeOutcome::Reachable { rtt_ms } => {
                log::debug!("[health] Ping {rtt_ms}ms");
                let mut next = self.state.clone();
                next.mark_connected(rtt_ms);
                self.commit(next);
            }
            ProbeOutcome::Unreachable { reason } => {
                log::warn!("[health] Check failed, keeping status: {reason}");
            }
        }
    }

    fn schedule_activation_probe(&mut self, profile: &ProxyProfile) {
        self.cancel_pending();
        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        self.pending = Some(PendingActivation {
            profile_id: profile.id.clone(),
            generation,
            cancel: cancel.clone(),
        });

        let prober = Arc::clone(&self.prober);
        let route = probe_route(profile);
        let timeout = self.settings.probe_timeout;
        let delay = self.settings.activation_probe_delay;
        let reports = self.reports.clone();
        let profile_id = profile.id.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = prober.probe(route, timeout) => outcome,
            };
            let _ = reports.send(ProbeReport {
                profile_id,
                kind: ProbeKind::Activation { generation },
                outcome,
            });
        });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
    }

    /// Puts the system proxy back in line with the recorded state after a
    /// change that could not be saved.
    async fn revert_system_proxy(&self) {
        let result = match self.state.active_profile() {
            Some(profile) => self.applier.apply(profile).await.map(|_| ()),
            None => self.applier.clear().await,
        };
        match result {
            Ok(()) => log::warn!("[manager] State not saved, previous proxy settings restored"),
            Err(e) => log::error!("[manager] Failed to restore previous proxy settings: {e}"),
        }
    }

    /// Persists `next` and adopts it on success.
    fn commit(&mut self, next: ApplicationState) -> bool {
        if self.store.save(&next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    /// Millisecond timestamp, bumped until it is unused.
    fn next_profile_id(&self) -> String {
        let mut candidate = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        while self.state.profile(&candidate.to_string()).is_some() {
            candidate = candidate.wrapping_add(1);
        }
        candidate.to_string()
    }
}

/// Proxy URL a probe for `profile` should travel through.
fn probe_route(profile: &ProxyProfile) -> Option<Url> {
    match ProxyConfig::from_profile(profile).and_then(|c| c.proxy_url()) {
        Ok(url) => Some(url),
        Err(e) => {
            log::warn!("[probe] Cannot route through '{}': {e}", profile.id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prober::testing::ScriptedProber;
    use crate::core::store::testing::MemoryStorage;
    use crate::platform::testing::RecordingBackend;
    use crate::state::PortInput;

    struct Harness {
        manager: ProfileManager,
        backend: Arc<RecordingBackend>,
        prober: Arc<ScriptedProber>,
        storage: Arc<MemoryStorage>,
        reports: mpsc::UnboundedReceiver<ProbeReport>,
    }

    fn harness_with(storage: MemoryStorage) -> Harness {
        let storage = Arc::new(storage);
        let backend = Arc::new(RecordingBackend::default());
        let prober = Arc::new(ScriptedProber::default());
        let (tx, reports) = mpsc::unbounded_channel();
        let manager = ProfileManager::new(
            StateStore::new(storage.clone()),
            ProxyApplier::new(backend.clone()),
            prober.clone(),
            ManagerSettings {
                probe_timeout: Duration::from_secs(5),
                activation_probe_delay: Duration::from_millis(1500),
            },
            tx,
        );
        Harness {
            manager,
            backend,
            prober,
            storage,
            reports,
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryStorage::default())
    }

    fn draft(name: &str, host: &str, port: &str) -> ProfileDraft {
        ProfileDraft {
            name: name.to_string(),
            host: host.to_string(),
            port: PortInput::Text(port.to_string()),
            ..Default::default()
        }
    }

    impl Harness {
        async fn add(&mut self, name: &str, host: &str) -> String {
            self.manager
                .save_profile(draft(name, host, "3128"))
                .await
                .unwrap()
        }

        async fn settle_next(&mut self) {
            let report = self.reports.recv().await.unwrap();
            self.manager.settle_probe(report);
        }

        fn persisted(&self) -> ApplicationState {
            serde_json::from_value(self.storage.raw(constants::PROXY_STORAGE_KEY).unwrap())
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_normalizes_port() {
        let mut h = harness();
        let mut updates = h.manager.store().subscribe();

        let id = h
            .manager
            .save_profile(draft("A", "1.2.3.4", "8080"))
            .await
            .unwrap();

        let state = h.manager.state();
        assert_eq!(state.profiles.len(), 1);
        assert_eq!(state.profiles[0].id, id);
        assert_eq!(state.profiles[0].port.to_string(), "8080");
        assert_eq!(h.persisted(), *state);
        assert_eq!(updates.try_recv().unwrap(), *state);
    }

    #[tokio::test]
    async fn test_resave_updates_in_place() {
        let mut h = harness();
        let first = h.add("A", "1.2.3.4").await;
        let second = h.add("B", "5.6.7.8").await;
        assert_ne!(first, second);

        let mut edit = draft("A", "9.9.9.9", "8080");
        edit.id = Some(first.clone());
        let id = h.manager.save_profile(edit).await.unwrap();

        assert_eq!(id, first);
        let state = h.manager.state();
        assert_eq!(state.profiles.len(), 2);
        assert_eq!(state.profiles[0].id, first);
        assert_eq!(state.profiles[0].host, "9.9.9.9");
        assert_eq!(state.profiles[1].id, second);
    }

    #[tokio::test]
    async fn test_save_with_unknown_id_creates_new_profile() {
        let mut h = harness();
        let mut d = draft("A", "1.2.3.4", "8080");
        d.id = Some("stale".to_string());
        let id = h.manager.save_profile(d).await.unwrap();
        assert_ne!(id, "stale");
        assert_eq!(h.manager.state().profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_ports_leave_state_unchanged() {
        let mut h = harness();
        h.add("A", "1.2.3.4").await;
        let before = h.manager.state().clone();

        for port in ["0", "65536", "abc", ""] {
            let err = h
                .manager
                .save_profile(draft("B", "5.6.7.8", port))
                .await
                .unwrap_err();
            assert!(matches!(err, ManagerError::Validation(_)), "port {port:?}");
        }
        assert_eq!(*h.manager.state(), before);
        assert_eq!(h.persisted(), before);
    }

    #[tokio::test]
    async fn test_validation_message_is_user_facing() {
        let mut h = harness();
        let err = h
            .manager
            .save_profile(draft("A", "h", "99999"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid port");
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_then_probe_connects() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;

        let status = h.manager.toggle(&id).await.unwrap();
        assert_eq!(status, ToggleStatus::Enabled);
        assert_eq!(h.manager.state().active_profile_id.as_deref(), Some(id.as_str()));
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connecting);

        let applied = h.backend.last_applied().unwrap();
        assert_eq!(applied.host, "proxy.example.com");
        assert_eq!(applied.port, 3128);
        assert_eq!(applied.bypass_list, vec!["<local>".to_string()]);

        h.settle_next().await;
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connected);
        assert_eq!(h.manager.state().last_ping_ms, Some(42));
        assert_eq!(h.persisted(), *h.manager.state());

        let routes = h.prober.routes();
        assert_eq!(
            routes[0].as_ref().map(Url::as_str),
            Some("http://proxy.example.com:3128/")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_probe_failure_sets_error() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.prober.push(ProbeOutcome::Unreachable {
            reason: "timed out".to_string(),
        });

        h.manager.toggle(&id).await.unwrap();
        h.settle_next().await;

        let state = h.manager.state();
        assert_eq!(state.connection_status, ConnectionStatus::Error);
        assert_eq!(state.last_ping_ms, None);
        assert!(state.is_active(&id));
    }

    #[tokio::test]
    async fn test_credentials_embedded_in_applied_host() {
        let mut h = harness();
        let mut d = draft("P", "proxy.example.com", "3128");
        d.username = Some("user".to_string());
        d.password = Some("p@ss".to_string());
        let id = h.manager.save_profile(d).await.unwrap();

        h.manager.toggle(&id).await.unwrap();
        assert_eq!(
            h.backend.last_applied().unwrap().host,
            "user:p%40ss@proxy.example.com"
        );
    }

    #[tokio::test]
    async fn test_toggle_active_deactivates() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();

        let status = h.manager.toggle(&id).await.unwrap();
        assert_eq!(status, ToggleStatus::Disabled);
        assert_eq!(h.backend.clear_calls(), 1);

        let state = h.manager.state();
        assert_eq!(state.active_profile_id, None);
        assert_eq!(state.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(state.last_ping_ms, None);
    }

    #[tokio::test]
    async fn test_toggle_other_switches_active_profile() {
        let mut h = harness();
        let a = h.add("A", "a.example.com").await;
        let b = h.add("B", "b.example.com").await;

        h.manager.toggle(&a).await.unwrap();
        let status = h.manager.toggle(&b).await.unwrap();

        assert_eq!(status, ToggleStatus::Enabled);
        assert!(h.manager.state().is_active(&b));
        assert!(!h.manager.state().is_active(&a));
        assert_eq!(h.backend.last_applied().unwrap().server, "b.example.com");
    }

    #[tokio::test]
    async fn test_toggle_unknown_profile() {
        let mut h = harness();
        let err = h.manager.toggle("nope").await.unwrap_err();
        assert!(matches!(err, ManagerError::ProfileNotFound(_)));
        assert_eq!(err.to_string(), "Profile not found");
    }

    #[tokio::test]
    async fn test_apply_failure_leaves_state_unchanged() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        let before = h.manager.state().clone();
        h.backend.fail_next("denied");

        let err = h.manager.toggle(&id).await.unwrap_err();
        assert!(matches!(err, ManagerError::Activation(_)));
        assert_eq!(err.to_string(), "Failed to connect. Check proxy settings.");
        assert_eq!(*h.manager.state(), before);
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_profile_active() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        let before = h.manager.state().clone();
        h.backend.fail_next("busy");

        let err = h.manager.toggle(&id).await.unwrap_err();
        assert!(matches!(err, ManagerError::Deactivation(_)));
        assert_eq!(*h.manager.state(), before);
    }

    #[tokio::test]
    async fn test_delete_active_profile_resets_connection() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        h.settle_next().await;
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connected);

        h.manager.delete_profile(&id).await;

        let state = h.manager.state();
        assert!(state.profiles.is_empty());
        assert_eq!(state.active_profile_id, None);
        assert_eq!(state.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(state.last_ping_ms, None);
        assert_eq!(h.backend.clear_calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_active_profile_when_clear_fails() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        h.backend.fail_next("busy");

        h.manager.delete_profile(&id).await;
        assert!(h.manager.state().profiles.is_empty());
        assert_eq!(h.manager.state().active_profile_id, None);
    }

    #[tokio::test]
    async fn test_delete_twice_is_idempotent() {
        let mut h = harness();
        let a = h.add("A", "a.example.com").await;
        h.add("B", "b.example.com").await;

        h.manager.delete_profile(&a).await;
        let after_first = h.manager.state().clone();
        h.manager.delete_profile(&a).await;

        assert_eq!(*h.manager.state(), after_first);
        assert_eq!(after_first.profiles.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivation_cancels_pending_probe() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        h.manager.toggle(&id).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.reports.try_recv().is_err());
        assert!(h.prober.routes().is_empty());
        assert_eq!(
            h.manager.state().connection_status,
            ConnectionStatus::Disconnected
        );
    }

    #[tokio::test]
    async fn test_stale_probe_report_is_ignored() {
        let mut h = harness();
        let a = h.add("A", "a.example.com").await;
        let b = h.add("B", "b.example.com").await;
        h.manager.toggle(&a).await.unwrap();
        h.manager.toggle(&b).await.unwrap();

        // A late result from the first activation must not touch the second.
        h.manager.settle_probe(ProbeReport {
            profile_id: a.clone(),
            kind: ProbeKind::Activation { generation: 1 },
            outcome: ProbeOutcome::Reachable { rtt_ms: 1 },
        });
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connecting);

        // Same for a result that arrives after the profile was deleted.
        h.manager.delete_profile(&b).await;
        h.manager.settle_probe(ProbeReport {
            profile_id: b,
            kind: ProbeKind::Activation { generation: 2 },
            outcome: ProbeOutcome::Reachable { rtt_ms: 1 },
        });
        assert_eq!(h.manager.state().active_profile_id, None);
        assert_eq!(
            h.manager.state().connection_status,
            ConnectionStatus::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_updates_ping_and_swallows_failures() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        h.settle_next().await;

        h.prober.push(ProbeOutcome::Unreachable {
            reason: "reset".to_string(),
        });
        assert!(h.manager.start_health_check());
        assert!(!h.manager.start_health_check());
        h.settle_next().await;
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connected);
        assert_eq!(h.manager.state().last_ping_ms, Some(42));

        h.prober.push(ProbeOutcome::Reachable { rtt_ms: 7 });
        assert!(h.manager.start_health_check());
        h.settle_next().await;
        assert_eq!(h.manager.state().last_ping_ms, Some(7));
    }

    #[tokio::test]
    async fn test_health_check_skipped_unless_connected() {
        let mut h = harness();
        assert!(!h.manager.start_health_check());

        let id = h.add("P", "proxy.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        // Still connecting.
        assert!(!h.manager.start_health_check());
    }

    #[tokio::test(start_paused = true)]
    async fn test_editing_active_profile_reapplies() {
        let mut h = harness();
        let id = h.add("P", "old.example.com").await;
        h.manager.toggle(&id).await.unwrap();
        h.settle_next().await;

        let mut edit = draft("P", "new.example.com", "8080");
        edit.id = Some(id.clone());
        h.manager.save_profile(edit).await.unwrap();

        assert_eq!(h.backend.history().len(), 2);
        assert_eq!(h.backend.last_applied().unwrap().server, "new.example.com");
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connecting);

        h.settle_next().await;
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_state() {
        let mut h = harness();
        let id = h.add("P", "proxy.example.com").await;
        let before = h.manager.state().clone();
        h.storage.set_fail_writes(true);

        h.manager.delete_profile(&id).await;
        assert_eq!(*h.manager.state(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsaved_switch_restores_previous_proxy() {
        let mut h = harness();
        let a = h.add("A", "a.example.com").await;
        let b = h.add("B", "b.example.com").await;
        h.manager.toggle(&a).await.unwrap();
        let before = h.manager.state().clone();
        assert_eq!(before.connection_status, ConnectionStatus::Connecting);

        h.storage.set_fail_writes(true);
        let result = h.manager.toggle(&b).await;
        assert!(matches!(result, Err(ManagerError::Activation(ConfigError::Unsaved))));
        assert_eq!(*h.manager.state(), before);
        assert_eq!(h.backend.last_applied().unwrap().server, "a.example.com");

        // The activation check for A is still live and settles normally.
        h.storage.set_fail_writes(false);
        h.settle_next().await;
        assert_eq!(h.manager.state().active_profile_id.as_deref(), Some(a.as_str()));
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsaved_deactivation_reapplies_profile() {
        let mut h = harness();
        let a = h.add("A", "a.example.com").await;
        h.manager.toggle(&a).await.unwrap();
        h.settle_next().await;
        let before = h.manager.state().clone();

        h.storage.set_fail_writes(true);
        let result = h.manager.toggle(&a).await;
        assert!(matches!(result, Err(ManagerError::Deactivation(ConfigError::Unsaved))));
        assert_eq!(*h.manager.state(), before);
        assert_eq!(h.backend.clear_calls(), 1);
        assert_eq!(h.backend.last_applied().unwrap().server, "a.example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsaved_delete_of_active_profile_keeps_proxy() {
        let mut h = harness();
        let a = h.add("A", "a.example.com").await;
        h.manager.toggle(&a).await.unwrap();
        let before = h.manager.state().clone();

        h.storage.set_fail_writes(true);
        h.manager.delete_profile(&a).await;
        assert_eq!(*h.manager.state(), before);
        assert_eq!(h.backend.last_applied().unwrap().server, "a.example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_reapplies_active_profile() {
        let storage = MemoryStorage::with_value(
            constants::PROXY_STORAGE_KEY,
            serde_json::json!({
                "profiles": [{"id": "1", "name": "P", "host": "proxy.example.com", "port": "3128"}],
                "activeProfileId": "1",
                "connectionStatus": "connected",
                "lastPingMs": 12
            }),
        );
        let mut h = harness_with(storage);

        h.manager.restore().await;
        assert_eq!(h.backend.last_applied().unwrap().server, "proxy.example.com");
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connecting);

        h.settle_next().await;
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_restore_marks_error_when_apply_fails() {
        let storage = MemoryStorage::with_value(
            constants::PROXY_STORAGE_KEY,
            serde_json::json!({
                "profiles": [{"id": "1", "name": "P", "host": "proxy.example.com", "port": "3128"}],
                "activeProfileId": "1",
                "connectionStatus": "connecting"
            }),
        );
        let mut h = harness_with(storage);
        h.backend.fail_next("denied");

        h.manager.restore().await;
        assert!(h.manager.state().is_active("1"));
        assert_eq!(h.manager.state().connection_status, ConnectionStatus::Error);
    }

    #[tokio::test]
    async fn test_connection_test_goes_direct_without_active_profile() {
        let h = harness();
        let outcome = h.manager.connection_test().await;
        assert!(matches!(outcome, ProbeOutcome::Reachable { .. }));
        assert_eq!(h.prober.routes(), vec![None]);
    }
}
