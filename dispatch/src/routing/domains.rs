//! Domain and collection taxonomy with the curated keyword tables.
//!
//! Keywords are matched as lower-case substrings, so short tokens that hide
//! inside common words ("vat" in "private", "rent" in "different") are avoided.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic domains scored for every query.
///
/// Declaration order is the tie-break order for primary selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Visa,
    BusinessClassification,
    Tax,
    Legal,
    Property,
    Books,
    Team,
    // Modifiers only steer sub-collection choice
    Updates,
    Procedure,
    Listing,
}

impl Domain {
    /// Domains eligible as primary, in tie-break order.
    pub const PRIMARY: [Domain; 7] = [
        Domain::Visa,
        Domain::BusinessClassification,
        Domain::Tax,
        Domain::Legal,
        Domain::Property,
        Domain::Books,
        Domain::Team,
    ];

    pub const MODIFIERS: [Domain; 3] = [Domain::Updates, Domain::Procedure, Domain::Listing];

    pub const ALL: [Domain; 10] = [
        Domain::Visa,
        Domain::BusinessClassification,
        Domain::Tax,
        Domain::Legal,
        Domain::Property,
        Domain::Books,
        Domain::Team,
        Domain::Updates,
        Domain::Procedure,
        Domain::Listing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Visa => "visa",
            Domain::BusinessClassification => "business_classification",
            Domain::Tax => "tax",
            Domain::Legal => "legal",
            Domain::Property => "property",
            Domain::Books => "books",
            Domain::Team => "team",
            Domain::Updates => "updates",
            Domain::Procedure => "procedure",
            Domain::Listing => "listing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "visa" => Some(Domain::Visa),
            "business_classification" | "business" => Some(Domain::BusinessClassification),
            "tax" => Some(Domain::Tax),
            "legal" => Some(Domain::Legal),
            "property" => Some(Domain::Property),
            "books" => Some(Domain::Books),
            "team" => Some(Domain::Team),
            "updates" | "recency" => Some(Domain::Updates),
            "procedure" => Some(Domain::Procedure),
            "listing" => Some(Domain::Listing),
            _ => None,
        }
    }

    pub fn is_modifier(&self) -> bool {
        Self::MODIFIERS.contains(self)
    }

    pub fn default_keywords(&self) -> &'static [&'static str] {
        match self {
            Domain::Visa => VISA_KEYWORDS,
            Domain::BusinessClassification => BUSINESS_KEYWORDS,
            Domain::Tax => TAX_KEYWORDS,
            Domain::Legal => LEGAL_KEYWORDS,
            Domain::Property => PROPERTY_KEYWORDS,
            Domain::Books => BOOKS_KEYWORDS,
            Domain::Team => TEAM_KEYWORDS,
            Domain::Updates => UPDATES_KEYWORDS,
            Domain::Procedure => PROCEDURE_KEYWORDS,
            Domain::Listing => LISTING_KEYWORDS,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VISA_KEYWORDS: &[&str] = &[
    "visa",
    "kitas",
    "kitap",
    "stay permit",
    "work permit",
    "residence permit",
    "immigration",
    "imigrasi",
    "overstay",
    "sponsor",
    "passport",
    "voa",
    "extension",
    "expat",
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "kbli",
    "business classification",
    "business code",
    "business license",
    "pt pma",
    "pt local",
    "foreign investment",
    "bkpm",
    "oss rba",
    "online single submission",
    "company setup",
    "company formation",
    "incorporat",
    "business entity",
    "nomor induk berusaha",
];

const TAX_KEYWORDS: &[&str] = &[
    "tax",
    "pajak",
    "npwp",
    "ppn",
    "pph",
    "value added",
    "withholding",
    "e-faktur",
    "efaktur",
    "tax return",
    "spt tahunan",
    "fiscal",
    "deductible",
];

const LEGAL_KEYWORDS: &[&str] = &[
    "legal",
    "law",
    "regulation",
    "contract",
    "notary",
    "court",
    "compliance",
    "dispute",
    "decree",
    "omnibus",
    "liability",
    "agreement",
];

const PROPERTY_KEYWORDS: &[&str] = &[
    "property",
    "villa",
    "real estate",
    "apartment",
    "house",
    "leasehold",
    "freehold",
    "hak pakai",
    "hgb",
    "land title",
    "land certificate",
    "plot of land",
    "building permit",
];

const BOOKS_KEYWORDS: &[&str] = &[
    "books",
    "book recommendation",
    "library",
    "novel",
    "ebook",
    "literature",
    "reading list",
    "written by",
];

const TEAM_KEYWORDS: &[&str] = &[
    "team",
    "staff",
    "employee",
    "consultant",
    "colleague",
    "contact person",
    "who handles",
    "department",
];

const UPDATES_KEYWORDS: &[&str] = &[
    "latest",
    "recent",
    "update",
    "news",
    "new rule",
    "new regulation",
    "amendment",
    "this year",
    "changes",
];

const PROCEDURE_KEYWORDS: &[&str] = &[
    "how to",
    "how do i",
    "calculat",
    "procedure",
    "step by step",
    "steps",
    "process",
    "filing",
    "requirements",
];

const LISTING_KEYWORDS: &[&str] = &[
    "for sale",
    "for rent",
    "listing",
    "to buy",
    "to rent",
    "available villa",
    "available property",
];

/// Knowledge partitions a query can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    VisaKnowledge,
    BusinessClassification,
    TaxProcedures,
    TaxUpdates,
    TaxKnowledge,
    LegalKnowledge,
    LegalUpdates,
    PropertyKnowledge,
    PropertyListings,
    BooksLibrary,
    TeamDirectory,
    GeneralKnowledge,
}

impl Collection {
    pub const ALL: [Collection; 12] = [
        Collection::VisaKnowledge,
        Collection::BusinessClassification,
        Collection::TaxProcedures,
        Collection::TaxUpdates,
        Collection::TaxKnowledge,
        Collection::LegalKnowledge,
        Collection::LegalUpdates,
        Collection::PropertyKnowledge,
        Collection::PropertyListings,
        Collection::BooksLibrary,
        Collection::TeamDirectory,
        Collection::GeneralKnowledge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::VisaKnowledge => "visa_knowledge",
            Collection::BusinessClassification => "business_classification",
            Collection::TaxProcedures => "tax_procedures",
            Collection::TaxUpdates => "tax_updates",
            Collection::TaxKnowledge => "tax_knowledge",
            Collection::LegalKnowledge => "legal_knowledge",
            Collection::LegalUpdates => "legal_updates",
            Collection::PropertyKnowledge => "property_knowledge",
            Collection::PropertyListings => "property_listings",
            Collection::BooksLibrary => "books_library",
            Collection::TeamDirectory => "team_directory",
            Collection::GeneralKnowledge => "general_knowledge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intents that bypass scoring entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityOverride {
    Identity,
    TeamEnumeration,
    Founder,
}

impl PriorityOverride {
    /// Checked in this order.
    pub const ORDER: [PriorityOverride; 3] = [
        PriorityOverride::Identity,
        PriorityOverride::TeamEnumeration,
        PriorityOverride::Founder,
    ];

    pub fn phrases(&self) -> &'static [&'static str] {
        match self {
            PriorityOverride::Identity => &[
                "who am i",
                "do you know me",
                "do you remember me",
                "what is my name",
                "what's my name",
                "remember who i am",
            ],
            PriorityOverride::TeamEnumeration => &[
                "who is on your team",
                "who is in your team",
                "who are your team",
                "list your team",
                "list the team",
                "team members",
                "meet the team",
                "who works at",
            ],
            PriorityOverride::Founder => &["founder", "who founded"],
        }
    }

    /// First override whose phrase occurs in the lower-cased query.
    pub fn detect(lowered_query: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|o| {
            o.phrases()
                .iter()
                .any(|phrase| lowered_query.contains(phrase))
        })
    }

    pub fn collection(&self) -> Collection {
        Collection::TeamDirectory
    }
}
