//! Adaptive collection routing: keyword scoring, confidence and fallback chains.

pub mod confidence;
pub mod domains;
pub mod fallback;
pub mod router;
pub mod scorer;
pub mod types;

pub use confidence::{calculate_confidence, ConfidenceBreakdown};
pub use domains::{Collection, Domain, PriorityOverride};
pub use fallback::{candidate_collections, fallbacks_for};
pub use router::AdaptiveCollectionRouter;
pub use scorer::{DomainScorer, DomainScores};
pub use types::{FallbackStats, RouteReason, RoutingAnalysis, RoutingDecision};
