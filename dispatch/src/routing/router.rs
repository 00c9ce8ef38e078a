//! AdaptiveCollectionRouter - picks knowledge collections for a free-text query.
//!
//! Resolution order:
//! 1. Priority overrides (identity, team enumeration, founder) go straight to
//!    the team directory with confidence 1.0.
//! 2. Keyword scoring across all domains.
//! 3. Primary domain = first domain reaching the max score; `general` if none.
//! 4. Modifier-driven sub-collection (tax, legal, property).
//! 5. Confidence and the fallback chain sized by confidence band.
//!
//! Routing never fails: an unmatched query lands on the general collection.

use super::confidence::{calculate_confidence, ConfidenceBreakdown};
use super::domains::{Collection, Domain, PriorityOverride};
use super::fallback::candidate_collections;
use super::scorer::{DomainScorer, DomainScores};
use super::types::{FallbackStats, RouteReason, RoutingAnalysis, RoutingDecision};
use crate::config::RouterConfig;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

pub struct AdaptiveCollectionRouter {
    scorer: DomainScorer,
    config: RouterConfig,
    stats: Mutex<FallbackStats>,
}

impl Default for AdaptiveCollectionRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl AdaptiveCollectionRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            scorer: DomainScorer::from_config(&config),
            config,
            stats: Mutex::new(FallbackStats::default()),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn scorer(&self) -> &DomainScorer {
        &self.scorer
    }

    /// Primary collection only. Does not touch the stats.
    pub fn route(&self, query: &str) -> Collection {
        self.decide(query).0.primary
    }

    /// Full decision; counted in the fallback stats.
    pub fn route_with_confidence(&self, query: &str) -> RoutingDecision {
        let (decision, _) = self.decide(query);
        self.record(&decision);
        debug!(
            collection = %decision.primary,
            confidence = decision.confidence,
            candidates = decision.candidates.len(),
            "routed query"
        );
        decision
    }

    /// Per-domain breakdown for debugging a routing decision. Pure.
    pub fn get_routing_stats(&self, query: &str) -> RoutingAnalysis {
        let (decision, scores) = self.decide(query);
        let confidence = match (&decision.reason, &scores) {
            (RouteReason::PriorityOverride(_), _) | (_, None) => ConfidenceBreakdown::certain(),
            (_, Some(scores)) => calculate_confidence(query, scores),
        };
        let scores = scores.unwrap_or_else(|| self.scorer.score(query));

        RoutingAnalysis {
            query: query.to_string(),
            priority_override: match decision.reason {
                RouteReason::PriorityOverride(o) => Some(o),
                _ => None,
            },
            domain_scores: scores.primary(),
            modifier_scores: scores.modifiers(),
            matched_keywords: self.scorer.matched_keywords(query),
            primary_domain: scores.top_primary().map(|(d, _)| d),
            confidence,
            decision,
        }
    }

    pub fn get_fallback_stats(&self) -> FallbackStats {
        let stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = stats.clone();
        snapshot.fallback_rate = if snapshot.total_routes == 0 {
            0.0
        } else {
            snapshot.fallbacks_used as f64 / snapshot.total_routes as f64
        };
        snapshot
    }

    pub fn reset_stats(&self) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        *stats = FallbackStats::default();
    }

    /// Scores are `None` when a priority override short-circuited scoring.
    fn decide(&self, query: &str) -> (RoutingDecision, Option<DomainScores>) {
        let lowered = query.to_lowercase();

        if let Some(priority) = PriorityOverride::detect(&lowered) {
            let primary = priority.collection();
            let decision = RoutingDecision {
                primary,
                confidence: 1.0,
                candidates: vec![primary],
                reason: RouteReason::PriorityOverride(priority),
            };
            return (decision, None);
        }

        let scores = self.scorer.score(query);
        let (primary, reason) = match scores.top_primary() {
            Some((domain, _)) => (sub_collection(domain, &scores), RouteReason::Scored(domain)),
            None => (Collection::GeneralKnowledge, RouteReason::Default),
        };
        let confidence = calculate_confidence(query, &scores).total;
        let decision = RoutingDecision {
            primary,
            confidence,
            candidates: candidate_collections(primary, confidence, &self.config),
            reason,
        };
        (decision, Some(scores))
    }

    fn record(&self, decision: &RoutingDecision) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.total_routes += 1;
        if decision.confidence >= self.config.high_confidence {
            stats.high_confidence += 1;
        } else if decision.confidence >= self.config.low_confidence {
            stats.medium_confidence += 1;
        } else {
            stats.low_confidence += 1;
        }
        if decision.uses_fallbacks() {
            stats.fallbacks_used += 1;
        }
    }
}

fn sub_collection(domain: Domain, scores: &DomainScores) -> Collection {
    let has = |modifier: Domain| scores.get(modifier) > 0;
    match domain {
        Domain::Visa => Collection::VisaKnowledge,
        Domain::BusinessClassification => Collection::BusinessClassification,
        Domain::Tax if has(Domain::Procedure) => Collection::TaxProcedures,
        Domain::Tax if has(Domain::Updates) => Collection::TaxUpdates,
        Domain::Tax => Collection::TaxKnowledge,
        Domain::Legal if has(Domain::Updates) => Collection::LegalUpdates,
        Domain::Legal => Collection::LegalKnowledge,
        Domain::Property if has(Domain::Listing) => Collection::PropertyListings,
        Domain::Property => Collection::PropertyKnowledge,
        Domain::Books => Collection::BooksLibrary,
        Domain::Team => Collection::TeamDirectory,
        Domain::Updates | Domain::Procedure | Domain::Listing => Collection::GeneralKnowledge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tax_sub_routing() {
        let router = AdaptiveCollectionRouter::default();
        assert_eq!(router.route("how to calculate pph 21"), Collection::TaxProcedures);
        assert_eq!(router.route("latest npwp news"), Collection::TaxUpdates);
        assert_eq!(router.route("what is ppn"), Collection::TaxKnowledge);
        // procedure wins over recency
        assert_eq!(
            router.route("latest steps for the tax return"),
            Collection::TaxProcedures
        );
    }

    #[test]
    fn test_legal_and_property_sub_routing() {
        let router = AdaptiveCollectionRouter::default();
        assert_eq!(router.route("notary requirements"), Collection::LegalKnowledge);
        assert_eq!(router.route("recent omnibus amendment"), Collection::LegalUpdates);
        assert_eq!(router.route("villa for rent in canggu"), Collection::PropertyListings);
        assert_eq!(router.route("leasehold vs freehold"), Collection::PropertyKnowledge);
    }

    #[test]
    fn test_unmatched_query_goes_general() {
        let router = AdaptiveCollectionRouter::default();
        let decision = router.route_with_confidence("hello");
        assert_eq!(decision.primary, Collection::GeneralKnowledge);
        assert_eq!(decision.reason, RouteReason::Default);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.candidates.len(), 4);
    }

    #[test]
    fn test_route_does_not_count() {
        let router = AdaptiveCollectionRouter::default();
        router.route("kitas");
        assert_eq!(router.get_fallback_stats().total_routes, 0);
    }

    #[test]
    fn test_stats_buckets() {
        let router = AdaptiveCollectionRouter::default();
        router.route_with_confidence("who am i");
        router.route_with_confidence("kitas");
        router.route_with_confidence("hello");

        let stats = router.get_fallback_stats();
        assert_eq!(stats.total_routes, 3);
        assert_eq!(stats.high_confidence, 1);
        assert_eq!(stats.medium_confidence, 1);
        assert_eq!(stats.low_confidence, 1);
        assert_eq!(stats.fallbacks_used, 2);
        assert!((stats.fallback_rate - 2.0 / 3.0).abs() < 1e-9);

        router.reset_stats();
        assert_eq!(router.get_fallback_stats(), FallbackStats::default());
    }

    #[test]
    fn test_routing_analysis_breakdown() {
        let router = AdaptiveCollectionRouter::default();
        let analysis = router.get_routing_stats("pph calculation for my villa");

        assert_eq!(analysis.priority_override, None);
        assert_eq!(analysis.domain_scores[&Domain::Tax], 1);
        assert_eq!(analysis.domain_scores[&Domain::Property], 1);
        assert_eq!(analysis.modifier_scores[&Domain::Procedure], 1);
        assert_eq!(analysis.primary_domain, Some(Domain::Tax));
        assert_eq!(analysis.decision.primary, Collection::TaxProcedures);
        assert_eq!(analysis.confidence.specificity, 0.0);
        assert_eq!(analysis.confidence.total, analysis.decision.confidence);
        assert_eq!(router.get_fallback_stats().total_routes, 0);
    }

    #[test]
    fn test_routing_analysis_for_override() {
        let router = AdaptiveCollectionRouter::default();
        let analysis = router.get_routing_stats("who founded the firm? any tax tips");
        assert_eq!(analysis.priority_override, Some(PriorityOverride::Founder));
        assert_eq!(analysis.confidence.total, 1.0);
        assert_eq!(analysis.domain_scores[&Domain::Tax], 1);
    }
}
