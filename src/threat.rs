//! Threat classification policy and per-run threat aggregation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Ordered threat severity assigned to a detected object class.
///
/// `Unknown` is a sentinel for unmapped classes: it is reported per detection
/// but never escalates the running tier of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    None,
    Low,
    High,
    Critical,
    Unknown,
}

impl ThreatLevel {
    /// Severity rank within the ordered tier set. `Unknown` is outside the
    /// ordering and yields no rank.
    pub fn severity(&self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Low => Some(1),
            Self::High => Some(2),
            Self::Critical => Some(3),
            Self::Unknown => None,
        }
    }

    /// Monotonic escalation: returns the higher of the two tiers. `Unknown`
    /// never changes the running tier, so once `Critical` is reached it is
    /// sticky for the remainder of the run.
    pub fn escalate(self, observed: ThreatLevel) -> ThreatLevel {
        match (self.severity(), observed.severity()) {
            (Some(cur), Some(obs)) if obs > cur => observed,
            _ => self,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::High => "High",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static class-name to threat-tier mapping.
///
/// This table is the single place threat policy is expressed. Keys are exact
/// lowercase class names; lookups normalize case but never substring-match.
/// Every deployment documents its own table; the default is the aerial
/// surveillance policy the pipeline was trained for.
#[derive(Debug, Clone)]
pub struct ThreatPolicy {
    table: HashMap<String, ThreatLevel>,
}

impl Default for ThreatPolicy {
    fn default() -> Self {
        Self::from_table([
            ("bird", ThreatLevel::Low),
            ("drone", ThreatLevel::High),
            ("missile", ThreatLevel::Critical),
            ("hot air balloon", ThreatLevel::High),
            ("paraglider", ThreatLevel::High),
            ("airplane", ThreatLevel::Critical),
            ("car", ThreatLevel::High),
            ("fighter jet", ThreatLevel::Critical),
            ("helicopter", ThreatLevel::Critical),
            ("landing deck", ThreatLevel::Critical),
            ("person", ThreatLevel::High),
            ("ship", ThreatLevel::High),
        ])
    }
}

impl ThreatPolicy {
    pub fn from_table<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ThreatLevel)>,
        S: Into<String>,
    {
        let table = entries
            .into_iter()
            .map(|(name, tier)| (name.into().to_lowercase(), tier))
            .collect();
        Self { table }
    }

    /// Map a class label to its threat tier. Case-insensitive exact match;
    /// unmapped labels resolve to [`ThreatLevel::Unknown`].
    pub fn classify(&self, class_name: &str) -> ThreatLevel {
        self.table
            .get(class_name.to_lowercase().as_str())
            .copied()
            .unwrap_or(ThreatLevel::Unknown)
    }

    /// Class names in the policy domain, for pre-initializing counters
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

/// Immutable snapshot of the running per-video threat state.
///
/// Serializes to the flat document shape consumers expect: one counter per
/// class plus the `highest_threat_level` scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSummary {
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
    pub highest_threat_level: ThreatLevel,
}

impl ThreatSummary {
    /// Total detections observed, across all classes
    pub fn total_detections(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Folds classified detections into a running per-video summary.
///
/// The running highest tier is non-decreasing over the life of a run.
#[derive(Debug, Clone)]
pub struct ThreatAggregator {
    policy: ThreatPolicy,
    counts: BTreeMap<String, u64>,
    highest: ThreatLevel,
}

impl ThreatAggregator {
    /// Create an aggregator with all policy-domain counters at zero and the
    /// running tier at `None`.
    pub fn new(policy: ThreatPolicy) -> Self {
        let counts = policy.classes().map(|name| (name.to_string(), 0)).collect();
        Self {
            policy,
            counts,
            highest: ThreatLevel::None,
        }
    }

    /// Record one classified detection: bump the per-class counter (created on
    /// first sight for classes outside the policy domain, so counter totals
    /// stay in step with frame records) and escalate the running tier.
    /// Returns the tier assigned to this observation.
    pub fn observe(&mut self, class_name: &str) -> ThreatLevel {
        let tier = self.policy.classify(class_name);
        *self.counts.entry(class_name.to_lowercase()).or_insert(0) += 1;
        let escalated = self.highest.escalate(tier);
        if escalated != self.highest {
            log::info!(
                "Threat level escalated {} -> {} (observed {})",
                self.highest,
                escalated,
                class_name
            );
            self.highest = escalated;
        }
        tier
    }

    pub fn policy(&self) -> &ThreatPolicy {
        &self.policy
    }

    /// Immutable copy of the current summary. Callable mid-run for streaming
    /// consumers as well as once at end-of-run for batch consumers.
    pub fn snapshot(&self) -> ThreatSummary {
        ThreatSummary {
            counts: self.counts.clone(),
            highest_threat_level: self.highest,
        }
    }
}

impl Default for ThreatAggregator {
    fn default() -> Self {
        Self::new(ThreatPolicy::default())
    }
}
