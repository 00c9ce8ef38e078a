use super::confidence::ConfidenceBreakdown;
use super::domains::{Collection, Domain, PriorityOverride};
use serde::Serialize;
use std::collections::BTreeMap;

/// Why a primary collection was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RouteReason {
    PriorityOverride(PriorityOverride),
    Scored(Domain),
    /// No primary-domain keyword matched
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub primary: Collection,
    pub confidence: f64,
    /// Primary first, then fallbacks
    pub candidates: Vec<Collection>,
    pub reason: RouteReason,
}

impl RoutingDecision {
    pub fn uses_fallbacks(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// Cumulative routing outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FallbackStats {
    pub total_routes: u64,
    pub high_confidence: u64,
    pub medium_confidence: u64,
    pub low_confidence: u64,
    pub fallbacks_used: u64,
    /// `fallbacks_used / total_routes`, 0 when nothing was routed
    pub fallback_rate: f64,
}

/// Detailed scoring breakdown for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingAnalysis {
    pub query: String,
    pub priority_override: Option<PriorityOverride>,
    pub domain_scores: BTreeMap<Domain, usize>,
    pub modifier_scores: BTreeMap<Domain, usize>,
    pub matched_keywords: BTreeMap<Domain, Vec<String>>,
    pub primary_domain: Option<Domain>,
    pub confidence: ConfidenceBreakdown,
    pub decision: RoutingDecision,
}
