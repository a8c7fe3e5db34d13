//! Cache keepalive scheduler.
//!
//! Chat-provider tenants may pin their system prompt in an upstream context
//! cache that expires after a fixed TTL. The scheduler walks every tenant on a
//! timer shorter than that TTL and renews each cache, so live conversations
//! never fall back to uncached prompts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use streamgate_core::{CacheRenewer, TenantStore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Whether a sweep is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Sweeping,
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    /// Caches renewed successfully
    pub renewed: usize,
    /// Renewals that failed (logged, not retried)
    pub failed: usize,
    /// Tenants without a renewable cache
    pub skipped: usize,
    /// Set when listing tenants failed and the sweep did nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl SweepReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            renewed: 0,
            failed: 0,
            skipped: 0,
            aborted: None,
        }
    }
}

/// Periodically renews upstream context caches.
pub struct KeepaliveScheduler {
    store: Arc<dyn TenantStore>,
    renewer: Arc<dyn CacheRenewer>,
    interval: Duration,
    ttl: Duration,
    sweeping: AtomicBool,
}

/// Clears the in-flight flag even if the sweep future is dropped.
struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl KeepaliveScheduler {
    pub fn new(
        store: Arc<dyn TenantStore>,
        renewer: Arc<dyn CacheRenewer>,
        interval: Duration,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            renewer,
            interval,
            ttl,
            sweeping: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.sweeping.load(Ordering::Acquire) {
            SchedulerState::Sweeping
        } else {
            SchedulerState::Idle
        }
    }

    /// Renew every eligible tenant's cache once.
    ///
    /// Returns `None` without doing anything if another sweep is running.
    pub async fn sweep(&self) -> Option<SweepReport> {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Keepalive sweep already running, skipping");
            return None;
        }
        let _guard = SweepGuard(&self.sweeping);

        let mut report = SweepReport::new();

        let tenants = match self.store.list().await {
            Ok(tenants) => tenants,
            Err(e) => {
                warn!(error = %e, "Keepalive sweep aborted: cannot list tenants");
                report.aborted = Some(e.to_string());
                return Some(report);
            }
        };

        for tenant in &tenants {
            let Some(cache_id) = tenant.renewable_cache_id() else {
                report.skipped += 1;
                continue;
            };

            match self.renewer.renew_cache(tenant, cache_id, self.ttl).await {
                Ok(()) => report.renewed += 1,
                Err(e) => {
                    warn!(
                        tenant_id = %tenant.tenant_id,
                        cache_id,
                        error = %e,
                        "Cache renewal failed"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            renewed = report.renewed,
            failed = report.failed,
            skipped = report.skipped,
            "Keepalive sweep finished"
        );
        Some(report)
    }

    /// Sweep now and then every `interval` until the handle is aborted.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                interval_minutes = self.interval.as_secs() / 60,
                ttl_minutes = self.ttl.as_secs() / 60,
                "Cache keepalive started"
            );

            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use streamgate_core::error::{ProviderError, StoreError};
    use streamgate_core::{ProviderKind, ProviderParams, TenantProviderConfig};
    use tokio::sync::Notify;

    fn tenant(id: &str, provider: ProviderKind, cache_id: Option<&str>) -> TenantProviderConfig {
        let mut params = ProviderParams::new("m");
        params.cache_id = cache_id.map(String::from);
        TenantProviderConfig {
            tenant_id: id.into(),
            provider,
            api_key: format!("key-{id}"),
            api_url: None,
            base_prompt: String::new(),
            params,
        }
    }

    struct MockStore {
        tenants: Result<Vec<TenantProviderConfig>, StoreError>,
    }

    #[async_trait]
    impl TenantStore for MockStore {
        async fn get(&self, tenant_id: &str) -> Result<Option<TenantProviderConfig>, StoreError> {
            let tenants = self.tenants.clone()?;
            Ok(tenants.into_iter().find(|t| t.tenant_id == tenant_id))
        }

        async fn list(&self) -> Result<Vec<TenantProviderConfig>, StoreError> {
            self.tenants.clone()
        }
    }

    /// Records calls; fails for tenant ids in `failing`.
    #[derive(Default)]
    struct MockRenewer {
        calls: Mutex<Vec<(String, String, Duration)>>,
        failing: Vec<String>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl CacheRenewer for MockRenewer {
        async fn renew_cache(
            &self,
            config: &TenantProviderConfig,
            cache_id: &str,
            ttl: Duration,
        ) -> Result<(), ProviderError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.calls
                .lock()
                .unwrap()
                .push((config.tenant_id.clone(), cache_id.to_string(), ttl));
            if self.failing.contains(&config.tenant_id) {
                return Err(ProviderError::ApiError {
                    status_code: 404,
                    message: "cache not found".into(),
                });
            }
            Ok(())
        }
    }

    fn scheduler(store: MockStore, renewer: Arc<MockRenewer>) -> KeepaliveScheduler {
        KeepaliveScheduler::new(
            Arc::new(store),
            renewer,
            Duration::from_secs(55 * 60),
            Duration::from_secs(60 * 60),
        )
    }

    #[tokio::test]
    async fn failure_is_isolated_per_tenant() {
        let store = MockStore {
            tenants: Ok(vec![
                tenant("t1", ProviderKind::Chat, Some("c1")),
                tenant("t2", ProviderKind::Chat, Some("c2")),
                tenant("t3", ProviderKind::Chat, Some("c3")),
            ]),
        };
        let renewer = Arc::new(MockRenewer {
            failing: vec!["t2".into()],
            ..Default::default()
        });

        let report = scheduler(store, renewer.clone()).sweep().await.unwrap();
        assert_eq!(report.renewed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 0);

        let calls = renewer.calls.lock().unwrap();
        let ids: Vec<_> = calls.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
        assert!(calls.iter().all(|(_, _, ttl)| *ttl == Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn only_chat_tenants_with_cache_are_renewed() {
        let store = MockStore {
            tenants: Ok(vec![
                tenant("acme", ProviderKind::Completion, Some("ignored")),
                tenant("globex", ProviderKind::Chat, Some("cachedContents/g")),
                tenant("initech", ProviderKind::Chat, None),
                tenant("umbrella", ProviderKind::Chat, Some("  ")),
            ]),
        };
        let renewer = Arc::new(MockRenewer::default());

        let report = scheduler(store, renewer.clone()).sweep().await.unwrap();
        assert_eq!(report.renewed, 1);
        assert_eq!(report.skipped, 3);

        let calls = renewer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "globex");
        assert_eq!(calls[0].1, "cachedContents/g");
    }

    #[tokio::test]
    async fn list_failure_aborts_tick() {
        let store = MockStore {
            tenants: Err(StoreError::Unavailable("connection refused".into())),
        };
        let renewer = Arc::new(MockRenewer::default());
        let scheduler = scheduler(store, renewer.clone());

        let report = scheduler.sweep().await.unwrap();
        assert!(report.aborted.unwrap().contains("connection refused"));
        assert!(renewer.calls.lock().unwrap().is_empty());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn overlapping_sweep_is_skipped() {
        let gate = Arc::new(Notify::new());
        let store = MockStore {
            tenants: Ok(vec![tenant("globex", ProviderKind::Chat, Some("g"))]),
        };
        let renewer = Arc::new(MockRenewer {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let scheduler = Arc::new(scheduler(store, renewer));

        let first = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.sweep().await }
        });
        while scheduler.state() != SchedulerState::Sweeping {
            tokio::task::yield_now().await;
        }

        assert!(scheduler.sweep().await.is_none());

        gate.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.renewed, 1);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn start_sweeps_on_each_tick() {
        let store = MockStore {
            tenants: Ok(vec![tenant("globex", ProviderKind::Chat, Some("g"))]),
        };
        let renewer = Arc::new(MockRenewer::default());
        let scheduler = Arc::new(scheduler(store, renewer.clone()));

        let handle = scheduler.start();
        // Immediate tick plus two full intervals.
        tokio::time::sleep(Duration::from_secs(2 * 55 * 60 + 1)).await;
        handle.abort();

        assert_eq!(renewer.calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn report_serializes() {
        let report = SweepReport::new();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["renewed"], 0);
        assert!(json.get("aborted").is_none());
    }
}
