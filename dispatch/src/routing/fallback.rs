//! Fixed fallback adjacency between collections.

use super::domains::Collection;
use crate::config::RouterConfig;

/// Ordered fallbacks for a collection, closest first.
pub fn fallbacks_for(collection: Collection) -> &'static [Collection] {
    use Collection::*;
    match collection {
        VisaKnowledge => &[LegalKnowledge, TaxKnowledge, BusinessClassification],
        BusinessClassification => &[LegalKnowledge, TaxKnowledge, VisaKnowledge],
        TaxProcedures => &[TaxKnowledge, TaxUpdates, LegalKnowledge],
        TaxUpdates => &[TaxKnowledge, TaxProcedures, LegalUpdates],
        TaxKnowledge => &[TaxProcedures, TaxUpdates, LegalKnowledge],
        LegalKnowledge => &[LegalUpdates, BusinessClassification, TaxKnowledge],
        LegalUpdates => &[LegalKnowledge, TaxUpdates, BusinessClassification],
        PropertyKnowledge => &[LegalKnowledge, PropertyListings, TaxKnowledge],
        PropertyListings => &[PropertyKnowledge, LegalKnowledge],
        BooksLibrary => &[GeneralKnowledge],
        TeamDirectory => &[],
        GeneralKnowledge => &[VisaKnowledge, BusinessClassification, TaxKnowledge],
    }
}

/// How many fallbacks a confidence level earns.
pub fn fallback_budget(confidence: f64, config: &RouterConfig) -> usize {
    if confidence >= config.high_confidence {
        0
    } else if confidence >= config.low_confidence {
        1.min(config.max_fallbacks)
    } else {
        config.max_fallbacks
    }
}

/// Primary first, then up to the budgeted number of fallbacks.
pub fn candidate_collections(
    primary: Collection,
    confidence: f64,
    config: &RouterConfig,
) -> Vec<Collection> {
    let budget = fallback_budget(confidence, config);
    std::iter::once(primary)
        .chain(fallbacks_for(primary).iter().copied().take(budget))
        .collect()
}
