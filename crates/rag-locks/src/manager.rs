//! Lease table and conflict rules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rag_types::LockSettings;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::error::LockError;
use crate::guard::LeaseGuard;
use crate::tier::LockTier;
use crate::types::{ConflictCheck, Lease, LockStatus, LockType};

struct HeldLease {
    lease: Lease,
    expires_at: Instant,
}

impl HeldLease {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Per-tenant lease registry.
///
/// The table lives behind a std mutex that is never held across an await.
pub struct LockManager {
    settings: LockSettings,
    table: Mutex<HashMap<String, Vec<HeldLease>>>,
}

impl LockManager {
    pub fn new(settings: LockSettings) -> Self {
        Self {
            settings,
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Expiry timeout for a tier.
    pub fn timeout_for(&self, lock_type: LockType) -> Duration {
        let secs = match lock_type {
            LockType::BackgroundSync => self.settings.background_sync_timeout_secs,
            LockType::ManualSync => self.settings.manual_sync_timeout_secs,
            LockType::Reconnection => self.settings.reconnection_timeout_secs,
            LockType::Deletion => self.settings.deletion_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<String, Vec<HeldLease>>> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Force-remove expired leases for one store.
    fn sweep(table: &mut HashMap<String, Vec<HeldLease>>, store_id: &str, now: Instant) {
        let Some(leases) = table.get_mut(store_id) else {
            return;
        };
        leases.retain(|held| {
            if held.is_expired(now) {
                warn!(
                    store_id,
                    lease_id = %held.lease.lease_id,
                    lock_type = %held.lease.lock_type,
                    operation = %held.lease.operation,
                    "Removing expired lease"
                );
                false
            } else {
                true
            }
        });
        if leases.is_empty() {
            table.remove(store_id);
        }
    }

    fn blocking(leases: Option<&Vec<HeldLease>>, requested: LockType) -> Vec<Lease> {
        leases
            .map(|held| {
                held.iter()
                    .filter(|h| h.lease.lock_type.blocks(requested))
                    .map(|h| h.lease.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn conflict_reason(requested: LockType, blocking: &[Lease]) -> String {
        let now = Utc::now();
        let held: Vec<String> = blocking
            .iter()
            .map(|l| {
                let age = (now - l.acquired_at).num_seconds().max(0);
                format!("{} ({}) held for {}s", l.lock_type, l.operation, age)
            })
            .collect();
        format!("{} blocked by {}", requested, held.join(", "))
    }

    /// Try to take a lease. Never queues or retries.
    pub fn acquire(
        &self,
        store_id: &str,
        lock_type: LockType,
        operation: &str,
        reason: &str,
    ) -> Result<Lease, LockError> {
        let now = Instant::now();
        let mut table = self.lock_table();
        Self::sweep(&mut table, store_id, now);

        let blocking = Self::blocking(table.get(store_id), lock_type);
        if !blocking.is_empty() {
            let reason = Self::conflict_reason(lock_type, &blocking);
            info!(store_id, lock_type = %lock_type, operation, reason = %reason, "Lease denied");
            return Err(LockError::Conflict {
                store_id: store_id.to_string(),
                requested: lock_type,
                blocking_leases: blocking,
                reason,
            });
        }

        let lease = Lease {
            lease_id: Ulid::new().to_string(),
            store_id: store_id.to_string(),
            lock_type,
            operation: operation.to_string(),
            acquired_at: Utc::now(),
            process_id: std::process::id(),
            reason: reason.to_string(),
        };
        table.entry(store_id.to_string()).or_default().push(HeldLease {
            lease: lease.clone(),
            expires_at: now + self.timeout_for(lock_type),
        });

        debug!(store_id, lease_id = %lease.lease_id, lock_type = %lock_type, operation, "Lease granted");
        Ok(lease)
    }

    /// Take a lease that is released when the guard drops.
    pub fn acquire_guard(
        self: &Arc<Self>,
        store_id: &str,
        lock_type: LockType,
        operation: &str,
        reason: &str,
    ) -> Result<LeaseGuard, LockError> {
        let lease = self.acquire(store_id, lock_type, operation, reason)?;
        Ok(LeaseGuard::new(self.clone(), lease))
    }

    /// Release a lease. Returns false for unknown or already released leases.
    pub fn release(&self, store_id: &str, lease_id: &str) -> bool {
        let mut table = self.lock_table();
        let Some(leases) = table.get_mut(store_id) else {
            return false;
        };
        let before = leases.len();
        leases.retain(|h| h.lease.lease_id != lease_id);
        let released = leases.len() < before;
        if leases.is_empty() {
            table.remove(store_id);
        }
        if released {
            debug!(store_id, lease_id, "Lease released");
        }
        released
    }

    /// Read-only conflict check (expired leases are swept first).
    pub fn check_conflicts(&self, store_id: &str, lock_type: LockType) -> ConflictCheck {
        let mut table = self.lock_table();
        Self::sweep(&mut table, store_id, Instant::now());

        let held = table.get(store_id);
        let blocking = Self::blocking(held, lock_type);
        let reason = (!blocking.is_empty()).then(|| Self::conflict_reason(lock_type, &blocking));

        ConflictCheck {
            has_conflicts: held.map(|h| !h.is_empty()).unwrap_or(false),
            can_proceed: blocking.is_empty(),
            blocking_leases: blocking,
            reason,
        }
    }

    /// Poll until `lock_type` is available for the store or `timeout` passes.
    pub async fn wait_for_availability(
        &self,
        store_id: &str,
        lock_type: LockType,
        timeout: Duration,
    ) -> Result<(), LockError> {
        let poll = Duration::from_millis(self.settings.poll_interval_ms.max(1));
        let started = Instant::now();

        loop {
            if self.check_conflicts(store_id, lock_type).can_proceed {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= timeout {
                warn!(store_id, lock_type = %lock_type, waited_ms = waited.as_millis(), "Gave up waiting for lease");
                return Err(LockError::WaitTimeout {
                    store_id: store_id.to_string(),
                    lock_type,
                    waited,
                });
            }
            tokio::time::sleep(poll.min(timeout - waited)).await;
        }
    }

    /// Leases currently held for a store, oldest first.
    pub fn active_leases(&self, store_id: &str) -> Vec<Lease> {
        let now = Instant::now();
        self.lock_table()
            .get(store_id)
            .map(|held| {
                held.iter()
                    .filter(|h| !h.is_expired(now))
                    .map(|h| h.lease.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Snapshot of the whole table. Expired leases are hidden, not removed.
    pub fn status(&self) -> LockStatus {
        let now = Instant::now();
        let table = self.lock_table();
        let mut status = LockStatus::default();

        for (store_id, held) in table.iter() {
            let live: Vec<Lease> = held
                .iter()
                .filter(|h| !h.is_expired(now))
                .map(|h| h.lease.clone())
                .collect();
            if live.is_empty() {
                continue;
            }
            for lease in &live {
                *status.leases_by_type.entry(lease.lock_type).or_insert(0) += 1;
            }
            status.total_leases += live.len();
            status.tenants.insert(store_id.clone(), live);
        }
        status.total_tenants = status.tenants.len();
        status
    }

    /// Helper bound to one tier.
    pub fn tier(&self, lock_type: LockType) -> LockTier<'_> {
        LockTier::new(self, lock_type)
    }

    pub fn background_sync(&self) -> LockTier<'_> {
        self.tier(LockType::BackgroundSync)
    }

    pub fn manual_sync(&self) -> LockTier<'_> {
        self.tier(LockType::ManualSync)
    }

    pub fn reconnection(&self) -> LockTier<'_> {
        self.tier(LockType::Reconnection)
    }

    pub fn deletion(&self) -> LockTier<'_> {
        self.tier(LockType::Deletion)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(LockSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> LockManager {
        LockManager::default()
    }

    #[tokio::test]
    async fn test_equal_or_higher_lease_blocks() {
        for held in LockType::ALL {
            for requested in LockType::ALL {
                if requested > held {
                    continue;
                }
                let locks = manager();
                locks.acquire("s1", held, "op", "held").unwrap();
                let err = locks.acquire("s1", requested, "op", "check").unwrap_err();
                assert!(err.is_conflict(), "{held} must block {requested}");
                assert_eq!(err.blocking_leases()[0].lock_type, held);
            }
        }
    }

    #[tokio::test]
    async fn test_same_type_is_exclusive() {
        let locks = manager();
        let lease = locks.acquire("s1", LockType::ManualSync, "sync", "first").unwrap();
        assert!(locks.acquire("s1", LockType::ManualSync, "sync", "second").is_err());
        assert!(locks.release("s1", &lease.lease_id));
        assert!(locks.acquire("s1", LockType::ManualSync, "sync", "third").is_ok());
    }

    #[tokio::test]
    async fn test_higher_tier_is_granted_over_lower() {
        let locks = manager();
        locks.acquire("s1", LockType::BackgroundSync, "periodic-sync", "timer").unwrap();
        locks.acquire("s1", LockType::Reconnection, "reconnect", "token refresh").unwrap();
        locks.acquire("s1", LockType::Deletion, "delete", "uninstall").unwrap();
        assert_eq!(locks.active_leases("s1").len(), 3);
    }

    #[tokio::test]
    async fn test_background_blocks_manual() {
        let locks = manager();
        let background = locks.background_sync().acquire("s1", "periodic-sync", "timer").unwrap();

        let err = locks.manual_sync().acquire("s1", "manual-sync", "button").unwrap_err();
        match &err {
            LockError::Conflict { blocking_leases, reason, .. } => {
                assert_eq!(blocking_leases.len(), 1);
                assert_eq!(blocking_leases[0].lock_type, LockType::BackgroundSync);
                assert!(reason.contains("background_sync"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(locks.background_sync().release("s1", &background.lease_id));
        assert!(locks.manual_sync().acquire("s1", "manual-sync", "button").is_ok());
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let locks = manager();
        locks.acquire("s1", LockType::Deletion, "delete", "uninstall").unwrap();
        assert!(locks.acquire("s2", LockType::BackgroundSync, "sync", "timer").is_ok());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let locks = manager();
        let lease = locks.acquire("s1", LockType::Deletion, "delete", "x").unwrap();
        assert!(locks.release("s1", &lease.lease_id));
        assert!(!locks.release("s1", &lease.lease_id));
        assert!(!locks.release("other", "nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_is_swept() {
        let locks = manager();
        locks.acquire("s1", LockType::ManualSync, "sync", "stuck").unwrap();
        assert!(locks.acquire("s1", LockType::BackgroundSync, "sync", "timer").is_err());

        tokio::time::advance(Duration::from_secs(179)).await;
        assert!(!locks.check_conflicts("s1", LockType::BackgroundSync).can_proceed);

        tokio::time::advance(Duration::from_secs(2)).await;
        let check = locks.check_conflicts("s1", LockType::BackgroundSync);
        assert!(check.can_proceed);
        assert!(!check.has_conflicts);
        assert!(locks.acquire("s1", LockType::BackgroundSync, "sync", "timer").is_ok());
    }

    #[tokio::test]
    async fn test_check_conflicts_reports_non_blocking_leases() {
        let locks = manager();
        locks.acquire("s1", LockType::BackgroundSync, "sync", "timer").unwrap();

        let check = locks.check_conflicts("s1", LockType::Deletion);
        assert!(check.has_conflicts);
        assert!(check.can_proceed);
        assert!(check.blocking_leases.is_empty());
        assert!(check.reason.is_none());

        let check = locks.check_conflicts("s1", LockType::ManualSync);
        assert!(!check.can_proceed);
        assert!(check.reason.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_availability_times_out() {
        let locks = manager();
        locks.acquire("s1", LockType::Deletion, "delete", "x").unwrap();
        let err = locks
            .wait_for_availability("s1", LockType::ManualSync, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::WaitTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_availability_succeeds_after_release() {
        let locks = Arc::new(manager());
        let lease = locks.acquire("s1", LockType::ManualSync, "sync", "x").unwrap();

        let releaser = {
            let locks = locks.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(1200)).await;
                locks.release("s1", &lease.lease_id);
            })
        };

        locks
            .wait_for_availability("s1", LockType::ManualSync, Duration::from_secs(5))
            .await
            .unwrap();
        releaser.await.unwrap();
    }

    #[tokio::test]
    async fn test_status_counts() {
        let locks = manager();
        locks.acquire("s1", LockType::BackgroundSync, "sync", "timer").unwrap();
        locks.acquire("s1", LockType::Deletion, "delete", "x").unwrap();
        locks.acquire("s2", LockType::ManualSync, "sync", "button").unwrap();

        let status = locks.status();
        assert_eq!(status.total_tenants, 2);
        assert_eq!(status.total_leases, 3);
        assert_eq!(status.leases_by_type[&LockType::BackgroundSync], 1);
        assert_eq!(status.tenants["s1"].len(), 2);
        assert!(!status.leases_by_type.contains_key(&LockType::Reconnection));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_hides_but_keeps_expired() {
        let locks = manager();
        locks.acquire("s1", LockType::Deletion, "delete", "x").unwrap();
        tokio::time::advance(Duration::from_secs(121)).await;

        assert_eq!(locks.status().total_leases, 0);
        assert_eq!(locks.lock_table().get("s1").map(|l| l.len()), Some(1));
    }
}
