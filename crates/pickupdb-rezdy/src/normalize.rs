//! Conversion from the upstream wire shape to core pickup locations.

use pickupdb_core::PickupLocation;

use crate::types::WirePickupLocation;

/// Normalizes a page of wire locations into core [`PickupLocation`]s,
/// preserving upstream order.
///
/// Locations without a usable name are skipped (logged at debug). String
/// fields are trimmed; empty strings collapse to `None`. A missing upstream
/// `pickupId` falls back to a slug of the location name so the record still
/// has a stable key, even though such an identifier will not be known to the
/// region registry.
pub(crate) fn normalize_locations(
    product_code: &str,
    wire: Vec<WirePickupLocation>,
) -> Vec<PickupLocation> {
    let mut out = Vec::with_capacity(wire.len());
    for loc in wire {
        let Some(name) = loc
            .location_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            tracing::debug!(product_code, "skipping pickup location without a name");
            continue;
        };

        let pickup_id = loc
            .pickup_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| slug_of(name), str::to_owned);

        out.push(PickupLocation {
            name: name.to_owned(),
            pickup_id,
            address: trimmed(loc.address),
            latitude: loc.latitude,
            longitude: loc.longitude,
            minutes_prior: loc.minutes_prior.unwrap_or(0),
            instructions: trimmed(loc.additional_instructions),
        });
    }
    out
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// URL-safe slug of a location name: lowercase, ASCII alphanumerics kept,
/// whitespace collapsed to single dashes, everything else dropped.
fn slug_of(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
