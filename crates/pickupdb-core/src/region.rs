//! Canonical pickup regions and the registry of upstream pickup identifiers.
//!
//! The registry is static reference data: it maps every pickup identifier the
//! booking platform issues for our routes onto exactly one [`Region`]. The
//! mapping is many-to-one and never ambiguous; identifiers the registry does
//! not know resolve to `None` rather than an error.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Coarse geographic grouping of pickup points used to filter tours.
///
/// `All` is the wildcard: it matches every pickup identifier and is the
/// default for unrecognized user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    All,
    BrisbaneCityLoop,
    BrisbaneHotels,
    GoldCoast,
    Tamborine,
    SunshineCoast,
    DoorToDoor,
}

impl Region {
    /// Canonical kebab-case slug, stable across config, URLs, and analytics.
    #[must_use]
    pub fn as_slug(self) -> &'static str {
        match self {
            Region::All => "all",
            Region::BrisbaneCityLoop => "brisbane-city-loop",
            Region::BrisbaneHotels => "brisbane-hotels",
            Region::GoldCoast => "gold-coast",
            Region::Tamborine => "tamborine",
            Region::SunshineCoast => "sunshine-coast",
            Region::DoorToDoor => "door-to-door",
        }
    }

    /// Every canonical region, wildcard first. Used by the consistency
    /// checker's batch mode and the CLI.
    #[must_use]
    pub fn canonical() -> &'static [Region] {
        &[
            Region::All,
            Region::BrisbaneCityLoop,
            Region::BrisbaneHotels,
            Region::GoldCoast,
            Region::Tamborine,
            Region::SunshineCoast,
            Region::DoorToDoor,
        ]
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_slug())
    }
}

/// Static table of upstream pickup identifiers per region.
///
/// Identifiers are issued by the booking platform per pickup point or pickup
/// group; they are matched case-insensitively.
const REGION_PICKUP_IDS: &[(Region, &[&str])] = &[
    (
        Region::BrisbaneCityLoop,
        &[
            "bne-anzac-square",
            "bne-king-george-square",
            "bne-roma-st-station",
            "bne-southbank-cultural-centre",
            "bne-howard-smith-wharves",
        ],
    ),
    (
        Region::BrisbaneHotels,
        &[
            "bne-hotel-zone-cbd",
            "bne-hotel-zone-spring-hill",
            "bne-hotel-zone-southbank",
        ],
    ),
    (
        Region::GoldCoast,
        &[
            "gc-surfers-paradise-transit",
            "gc-broadbeach-mall",
            "gc-main-beach-tedder-ave",
            "gc-hotel-zone-surfers",
            "gc-coolangatta-griffith-st",
        ],
    ),
    (
        Region::Tamborine,
        &["tam-gallery-walk", "tam-visitor-centre-main-st"],
    ),
    (
        Region::SunshineCoast,
        &[
            "sun-mooloolaba-esplanade",
            "sun-maroochydore-station",
            "sun-caloundra-bulcock-st",
        ],
    ),
    (
        Region::DoorToDoor,
        &["door-to-door-service", "private-address-pickup"],
    ),
];

/// Lookup service over [`REGION_PICKUP_IDS`].
///
/// Constructed explicitly (no global instance) so tests can own isolated
/// copies. Construction is cheap; clone freely.
#[derive(Debug, Clone)]
pub struct RegionRegistry {
    by_id: HashMap<&'static str, Region>,
}

impl RegionRegistry {
    /// Builds the registry from the static identifier table.
    #[must_use]
    pub fn new() -> Self {
        let mut by_id = HashMap::new();
        for (region, ids) in REGION_PICKUP_IDS {
            for id in *ids {
                by_id.insert(*id, *region);
            }
        }
        Self { by_id }
    }

    /// Resolves a pickup identifier to its region.
    ///
    /// Pure and total: unknown identifiers return `None`, never an error.
    #[must_use]
    pub fn region_of(&self, pickup_id: &str) -> Option<Region> {
        let normalized = pickup_id.trim().to_lowercase();
        self.by_id.get(normalized.as_str()).copied()
    }

    /// Inverse lookup: every known identifier in `region`.
    ///
    /// `Region::All` returns the full identifier set.
    #[must_use]
    pub fn ids_in_region(&self, region: Region) -> HashSet<&'static str> {
        self.by_id
            .iter()
            .filter(|(_, r)| region == Region::All || **r == region)
            .map(|(id, _)| *id)
            .collect()
    }

    /// `true` when `region` is `All` or the identifier maps to `region`.
    #[must_use]
    pub fn is_in_region(&self, pickup_id: &str, region: Region) -> bool {
        if region == Region::All {
            return true;
        }
        self.region_of(pickup_id) == Some(region)
    }

    /// Number of known pickup identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// `true` when the registry holds no identifiers (never, in practice).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Synonyms accepted by [`normalize_region`], keyed by their collapsed form
/// (lowercase, alphanumerics only).
const REGION_SYNONYMS: &[(Region, &[&str])] = &[
    (Region::All, &["all", "any", "anywhere", "everywhere", "allregions"]),
    (
        Region::BrisbaneCityLoop,
        &[
            "brisbanecityloop",
            "brisbane",
            "brisbanecity",
            "brisbanecbd",
            "cityloop",
            "cbd",
            "bne",
        ],
    ),
    (
        Region::BrisbaneHotels,
        &["brisbanehotels", "brisbanehotel", "brisbanehotelpickup"],
    ),
    (
        Region::GoldCoast,
        &[
            "goldcoast",
            "gc",
            "surfers",
            "surfersparadise",
            "broadbeach",
            "coolangatta",
        ],
    ),
    (
        Region::Tamborine,
        &[
            "tamborine",
            "tamborinemountain",
            "mounttamborine",
            "mttamborine",
            "northtamborine",
        ],
    ),
    (
        Region::SunshineCoast,
        &[
            "sunshinecoast",
            "mooloolaba",
            "maroochydore",
            "caloundra",
            "noosa",
        ],
    ),
    (
        Region::DoorToDoor,
        &[
            "doortodoor",
            "hotelpickup",
            "hoteltransfer",
            "privatepickup",
            "homepickup",
        ],
    ),
];

/// Maps arbitrary user input, URL parameters, or UI labels to a canonical
/// [`Region`].
///
/// Tolerant of case, punctuation, and the synonyms each entry point has
/// historically used ("Gold Coast!", "gc", "Mount Tamborine"). Unrecognized
/// input defaults to `Region::All`, so a junk query degrades to "show
/// everything" rather than "show nothing". Idempotent on canonical slugs.
///
/// Every entry point that accepts a region string must route through this
/// function; it is the single point that lets disparate surfaces agree on
/// what region was asked for.
#[must_use]
pub fn normalize_region(input: &str) -> Region {
    let collapsed: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if collapsed.is_empty() {
        return Region::All;
    }

    for (region, keys) in REGION_SYNONYMS {
        if keys.contains(&collapsed.as_str()) {
            return *region;
        }
    }

    Region::All
}
