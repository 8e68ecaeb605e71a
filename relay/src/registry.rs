//! Pairing registry: the relay's only piece of real state.
//!
//! Keyed by endpoint host (the control-channel peer's IP literal). Backed
//! by two `DashMap`s rather than a hand-rolled `Mutex<HashMap>` pair so
//! reads/writes on unrelated hosts never contend — the documented lock
//! ordering (registry before heartbeat) is preserved by sequencing the
//! operations that touch both tables, not by an explicit held lock.
//!
//! The one exception is admission: the capacity check and the insert that
//! follows it must be one atomic step, or a burst of simultaneous HELLOs
//! from distinct hosts can all observe room under `MAX_CLIENTS` and all get
//! admitted. `admission_lock` serializes just that check-then-insert.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Registration ceiling. The 11th distinct host is rejected with `FULL`.
pub const MAX_CLIENTS: usize = 10;
/// How often the sweeper looks for expired registrations.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
/// A registration is evicted once its last heartbeat is older than this.
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(120);
/// Bound on a single control-channel read.
pub const TCP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Registration {
    pub listen_port: u32,
    pub target_host: String,
    pub target_port: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelloOutcome {
    Welcome,
    Full,
}

#[derive(Default)]
pub struct Registry {
    records: DashMap<String, Registration>,
    heartbeats: DashMap<String, Instant>,
    admission_lock: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or re-register `host`. Re-registration by an already-known
    /// host never counts against `MAX_CLIENTS` and always succeeds.
    pub fn hello(&self, host: &str, listen_port: u32, target_host: &str) -> HelloOutcome {
        // Holds the capacity check and the insert together so concurrent
        // first-time HELLOs can't all pass the check before any of them
        // lands in `records`.
        let _admission = self.admission_lock.lock().unwrap();

        let already_registered = self.records.contains_key(host);
        if !already_registered && self.records.len() >= MAX_CLIENTS {
            return HelloOutcome::Full;
        }

        // Resolve our target_port from the partner's existing registration, if any.
        let target_port = self.records.get(target_host).map(|r| r.listen_port);

        self.records.insert(
            host.to_string(),
            Registration {
                listen_port,
                target_host: target_host.to_string(),
                target_port,
            },
        );

        // Mutual resolution: if the partner already targets us, it can now
        // learn our listen_port too.
        if let Some(mut partner) = self.records.get_mut(target_host) {
            if partner.target_host == host {
                partner.target_port = Some(listen_port);
            }
        }

        self.heartbeats.insert(host.to_string(), Instant::now());
        HelloOutcome::Welcome
    }

    /// Refresh `last_heartbeat` for `host`. A heartbeat from a host with no
    /// registration is acknowledged but creates no heartbeat entry — there's
    /// nothing to keep alive.
    pub fn heartbeat(&self, host: &str) {
        if self.records.contains_key(host) {
            self.heartbeats.insert(host.to_string(), Instant::now());
        }
    }

    pub fn disconnect(&self, host: &str) {
        self.records.remove(host);
        self.heartbeats.remove(host);
    }

    /// The `(target_host, target_port)` to forward a datagram from `host`
    /// to, if `host` is registered and pairing has resolved.
    pub fn forward_target(&self, host: &str) -> Option<(String, u32)> {
        let record = self.records.get(host)?;
        let port = record.target_port?;
        Some((record.target_host.clone(), port))
    }

    /// Evict registrations whose last heartbeat is older than `timeout`.
    /// Registry is mutated before the heartbeat table so there is never a
    /// window where a swept record is still forwardable.
    pub fn sweep(&self, timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let victims: Vec<String> = self
            .heartbeats
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) > timeout)
            .map(|entry| entry.key().clone())
            .collect();

        for host in &victims {
            self.records.remove(host);
        }
        for host in &victims {
            self.heartbeats.remove(host);
        }
        victims
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_way_pairing_resolves_both_target_ports() {
        let reg = Registry::new();
        assert_eq!(reg.hello("10.0.0.1", 20000, "10.0.0.2"), HelloOutcome::Welcome);
        assert_eq!(reg.hello("10.0.0.2", 20001, "10.0.0.1"), HelloOutcome::Welcome);

        assert_eq!(reg.forward_target("10.0.0.1"), Some(("10.0.0.2".to_string(), 20001)));
        assert_eq!(reg.forward_target("10.0.0.2"), Some(("10.0.0.1".to_string(), 20000)));
    }

    #[test]
    fn unpaired_target_is_unresolved() {
        let reg = Registry::new();
        reg.hello("10.0.0.1", 20000, "10.0.0.2");
        assert_eq!(reg.forward_target("10.0.0.1"), None);
    }

    #[test]
    fn eleventh_distinct_host_is_rejected() {
        let reg = Registry::new();
        for i in 0..MAX_CLIENTS {
            let host = format!("10.0.0.{i}");
            assert_eq!(reg.hello(&host, 20000 + i as u32, "nobody"), HelloOutcome::Welcome);
        }
        assert_eq!(reg.len(), MAX_CLIENTS);
        assert_eq!(reg.hello("10.0.0.99", 30000, "nobody"), HelloOutcome::Full);
        assert_eq!(reg.len(), MAX_CLIENTS);
    }

    #[test]
    fn reregistration_by_known_host_bypasses_the_cap() {
        let reg = Registry::new();
        for i in 0..MAX_CLIENTS {
            let host = format!("10.0.0.{i}");
            reg.hello(&host, 20000 + i as u32, "nobody");
        }
        assert_eq!(reg.hello("10.0.0.0", 25000, "nobody"), HelloOutcome::Welcome);
        assert_eq!(reg.len(), MAX_CLIENTS);
    }

    #[test]
    fn disconnect_then_hello_is_a_fresh_registration() {
        let reg = Registry::new();
        reg.hello("10.0.0.1", 20000, "10.0.0.2");
        reg.disconnect("10.0.0.1");
        assert_eq!(reg.forward_target("10.0.0.1"), None);
        assert_eq!(reg.hello("10.0.0.1", 20000, "10.0.0.2"), HelloOutcome::Welcome);
    }

    #[test]
    fn heartbeat_without_registration_is_a_no_op() {
        let reg = Registry::new();
        reg.heartbeat("10.0.0.1");
        assert!(!reg.heartbeats.contains_key("10.0.0.1"));
    }

    #[test]
    fn sweep_evicts_only_expired_registrations() {
        let reg = Registry::new();
        reg.hello("10.0.0.1", 20000, "10.0.0.2");
        // Force the heartbeat far enough into the past to be swept.
        reg.heartbeats.insert("10.0.0.1".to_string(), Instant::now() - Duration::from_secs(200));
        let victims = reg.sweep(HEARTBEAT_TIMEOUT);
        assert_eq!(victims, vec!["10.0.0.1".to_string()]);
        assert!(reg.is_empty());
        assert_eq!(reg.forward_target("10.0.0.1"), None);
    }
}
