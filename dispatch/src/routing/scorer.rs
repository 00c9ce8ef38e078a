//! Keyword scoring of free text against the domain tables.

use super::domains::Domain;
use crate::config::RouterConfig;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-domain count of matched keywords for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainScores {
    scores: BTreeMap<Domain, usize>,
}

impl DomainScores {
    pub fn get(&self, domain: Domain) -> usize {
        self.scores.get(&domain).copied().unwrap_or(0)
    }

    /// Highest-scoring primary domain; ties go to the earlier domain in
    /// [`Domain::PRIMARY`]. `None` when nothing matched.
    pub fn top_primary(&self) -> Option<(Domain, usize)> {
        let mut best: Option<(Domain, usize)> = None;
        for domain in Domain::PRIMARY {
            let score = self.get(domain);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((domain, score));
            }
        }
        best
    }

    /// Top and runner-up scores among primary domains.
    pub fn top_two(&self) -> (usize, usize) {
        let mut scores: Vec<usize> = Domain::PRIMARY.iter().map(|d| self.get(*d)).collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        (scores[0], scores[1])
    }

    pub fn primary(&self) -> BTreeMap<Domain, usize> {
        Domain::PRIMARY.iter().map(|d| (*d, self.get(*d))).collect()
    }

    pub fn modifiers(&self) -> BTreeMap<Domain, usize> {
        Domain::MODIFIERS.iter().map(|d| (*d, self.get(*d))).collect()
    }
}

/// Case-insensitive substring scorer.
#[derive(Debug, Clone)]
pub struct DomainScorer {
    keywords: BTreeMap<Domain, Vec<String>>,
}

impl Default for DomainScorer {
    fn default() -> Self {
        Self {
            keywords: Domain::ALL
                .iter()
                .map(|d| {
                    (
                        *d,
                        d.default_keywords().iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl DomainScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in tables with the per-domain replacements from `config.keywords`.
    /// Unknown domain names are ignored here; `RouterConfig` validation rejects them.
    pub fn from_config(config: &RouterConfig) -> Self {
        let mut scorer = Self::default();
        for (name, keywords) in &config.keywords {
            if let Some(domain) = Domain::from_name(name) {
                scorer.set_keywords(domain, keywords.iter().map(String::as_str));
            }
        }
        scorer
    }

    pub fn set_keywords<'a, I>(&mut self, domain: Domain, keywords: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        self.keywords.insert(domain, keywords);
    }

    pub fn keywords(&self, domain: Domain) -> &[String] {
        self.keywords.get(&domain).map_or(&[], Vec::as_slice)
    }

    pub fn score(&self, query: &str) -> DomainScores {
        let lowered = query.to_lowercase();
        let scores = self
            .keywords
            .iter()
            .map(|(domain, keywords)| {
                let hits = keywords.iter().filter(|k| lowered.contains(k.as_str())).count();
                (*domain, hits)
            })
            .collect();
        DomainScores { scores }
    }

    /// Keywords of each domain that occur in the query, for diagnostics.
    pub fn matched_keywords(&self, query: &str) -> BTreeMap<Domain, Vec<String>> {
        let lowered = query.to_lowercase();
        self.keywords
            .iter()
            .filter_map(|(domain, keywords)| {
                let matched: Vec<String> = keywords
                    .iter()
                    .filter(|k| lowered.contains(k.as_str()))
                    .cloned()
                    .collect();
                (!matched.is_empty()).then_some((*domain, matched))
            })
            .collect()
    }
}
