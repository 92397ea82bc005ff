//! Keyword heuristics for products with no structured pickup data.
//!
//! When the booking platform has no pickup list for a product (or the fetch
//! failed and nothing is cached), the only signal left is free text: the
//! product's name, category, and description. This module scans that text for
//! region-specific phrases and produces a best-effort region guess, clearly
//! labelled as heuristic so callers never confuse it with confirmed data.

use crate::region::Region;

/// Bumped whenever [`KEYWORD_TABLE`] changes, so stored heuristic results can
/// be recognized as derived from an older table and re-derived.
pub const KEYWORD_TABLE_VERSION: u32 = 3;

/// Region keyword table, most specific phrases first within each region.
///
/// Order matters for [`match_region`]: earlier entries win, so regions whose
/// phrases are substrings of another region's phrases ("coast" vs "sunshine
/// coast") must be listed after the more specific region.
pub const KEYWORD_TABLE: &[(Region, &[&str])] = &[
    (
        Region::Tamborine,
        &[
            "tamborine",
            "mount tamborine",
            "mt tamborine",
            "gallery walk",
            "curtis falls",
            "glow worm",
        ],
    ),
    (
        Region::SunshineCoast,
        &[
            "sunshine coast",
            "noosa",
            "mooloolaba",
            "maroochydore",
            "caloundra",
            "eumundi",
            "glass house mountains",
        ],
    ),
    (
        Region::GoldCoast,
        &[
            "gold coast",
            "surfers paradise",
            "broadbeach",
            "coolangatta",
            "burleigh",
            "currumbin",
        ],
    ),
    (
        Region::BrisbaneHotels,
        &["brisbane hotel", "hotel pickup brisbane", "cbd hotel"],
    ),
    (
        Region::BrisbaneCityLoop,
        &[
            "brisbane",
            "south bank",
            "southbank",
            "story bridge",
            "roma street",
            "howard smith",
        ],
    ),
    (
        Region::DoorToDoor,
        &[
            "door to door",
            "door-to-door",
            "private transfer",
            "your accommodation",
            "home pickup",
        ],
    ),
];

/// A single heuristic hit: which region matched and the phrase that did it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub region: Region,
    pub phrase: &'static str,
}

/// First keyword hit in `text`, scanning the table in declared order.
///
/// Returns `None` when nothing matches; callers decide whether that means
/// "exclude the product" or "fall through to the wildcard".
#[must_use]
pub fn match_region(text: &str) -> Option<KeywordMatch> {
    let haystack = text.to_lowercase();
    for (region, phrases) in KEYWORD_TABLE {
        for phrase in *phrases {
            if haystack.contains(phrase) {
                return Some(KeywordMatch {
                    region: *region,
                    phrase,
                });
            }
        }
    }
    None
}

/// Every region with at least one keyword hit in `text`, in table order,
/// each paired with the first phrase that matched it.
///
/// A product whose description mentions both Brisbane and the Gold Coast is
/// genuinely servable from both; the listing path wants the full set rather
/// than the first hit.
#[must_use]
pub fn match_regions(text: &str) -> Vec<KeywordMatch> {
    let haystack = text.to_lowercase();
    let mut hits = Vec::new();
    for (region, phrases) in KEYWORD_TABLE {
        if let Some(phrase) = phrases.iter().find(|phrase| haystack.contains(*phrase)) {
            hits.push(KeywordMatch {
                region: *region,
                phrase,
            });
        }
    }
    hits
}

/// First phrase of `region`'s keyword list found in `text`, if any.
///
/// Used when the question is "does this text look like it belongs to THIS
/// region" rather than "which region does this text belong to".
#[must_use]
pub fn match_in_region(text: &str, region: Region) -> Option<&'static str> {
    let haystack = text.to_lowercase();
    KEYWORD_TABLE
        .iter()
        .find(|(r, _)| *r == region)
        .and_then(|(_, phrases)| {
            phrases
                .iter()
                .find(|phrase| haystack.contains(*phrase))
                .copied()
        })
}
