//! Per-source reputation tracking.
//!
//! Counts unmapped-route misses per source IP. Scores are monotonically
//! non-decreasing and live for the process lifetime; the gateway uses
//! them to apply a randomized delay to suspected probing sources.

use papaya::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

struct SourceRecord {
    score: AtomicU32,
    last_seen: AtomicU64,
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Tracks miss counts per source IP.
#[derive(Default)]
pub struct ReputationLedger {
    sources: HashMap<IpAddr, SourceRecord>,
}

impl ReputationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one unmapped-route miss and returns the new score.
    pub fn record_miss(&self, source: IpAddr) -> u32 {
        let now = epoch_now();
        let sources = self.sources.pin();
        if let Some(record) = sources.get(&source) {
            record.last_seen.store(now, Ordering::Relaxed);
            return record.score.fetch_add(1, Ordering::Relaxed) + 1;
        }
        sources.insert(
            source,
            SourceRecord {
                score: AtomicU32::new(1),
                last_seen: AtomicU64::new(now),
            },
        );
        1
    }

    /// Current score of a source; 0 for sources never seen missing.
    #[must_use]
    pub fn score(&self, source: IpAddr) -> u32 {
        self.sources
            .pin()
            .get(&source)
            .map_or(0, |r| r.score.load(Ordering::Relaxed))
    }

    /// Epoch seconds of the source's most recent miss, if any.
    #[must_use]
    pub fn last_seen(&self, source: IpAddr) -> Option<u64> {
        self.sources
            .pin()
            .get(&source)
            .map(|r| r.last_seen.load(Ordering::Relaxed))
    }

    /// Number of distinct sources with at least one recorded miss.
    #[must_use]
    pub fn tracked_sources(&self) -> usize {
        self.sources.pin().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_unknown_source_scores_zero() {
        let ledger = ReputationLedger::new();
        assert_eq!(ledger.score(ip(1)), 0);
        assert!(ledger.last_seen(ip(1)).is_none());
    }

    #[test]
    fn test_miss_increments_by_exactly_one() {
        let ledger = ReputationLedger::new();
        assert_eq!(ledger.record_miss(ip(2)), 1);
        assert_eq!(ledger.record_miss(ip(2)), 2);
        assert_eq!(ledger.record_miss(ip(2)), 3);
        assert_eq!(ledger.score(ip(2)), 3);
    }

    #[test]
    fn test_sources_independent() {
        let ledger = ReputationLedger::new();
        ledger.record_miss(ip(3));
        ledger.record_miss(ip(3));
        ledger.record_miss(ip(4));

        assert_eq!(ledger.score(ip(3)), 2);
        assert_eq!(ledger.score(ip(4)), 1);
        assert_eq!(ledger.tracked_sources(), 2);
    }

    #[test]
    fn test_last_seen_recorded() {
        let ledger = ReputationLedger::new();
        ledger.record_miss(ip(5));
        let seen = ledger.last_seen(ip(5)).unwrap();
        assert!(seen > 0);
    }

    #[test]
    fn test_scores_survive_concurrent_updates() {
        let ledger = std::sync::Arc::new(ReputationLedger::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    ledger.record_miss(ip(6));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.score(ip(6)), 800);
    }
}
