//! Wire types for the booking platform's pickups endpoint.
//!
//! Field names mirror the upstream JSON exactly (camelCase). Everything
//! optional is `Option` or defaulted; the upstream omits fields freely and a
//! missing field must never fail the whole response.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PickupsResponse {
    pub request_status: RequestStatus,
    #[serde(default)]
    pub pickup_locations: Vec<WirePickupLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestStatus {
    pub success: bool,
    #[serde(default)]
    pub error: Option<RequestStatusError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestStatusError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl RequestStatus {
    /// Human-readable description of a failed envelope, for error reporting.
    pub(crate) fn describe_error(&self) -> String {
        match &self.error {
            Some(e) => {
                let code = e.error_code.as_deref().unwrap_or("unknown");
                let message = e.error_message.as_deref().unwrap_or("no message");
                format!("{code}: {message}")
            }
            None => "request failed with no error detail".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePickupLocation {
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub pickup_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub minutes_prior: Option<i32>,
    #[serde(default)]
    pub additional_instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_envelope() {
        let json = r#"{
            "requestStatus": { "success": true },
            "pickupLocations": [
                {
                    "locationName": "Anzac Square",
                    "pickupId": "bne-anzac-square",
                    "address": "228 Adelaide St, Brisbane City",
                    "latitude": -27.4662,
                    "longitude": 153.0262,
                    "minutesPrior": 15,
                    "additionalInstructions": "Meet at the Adelaide St entrance"
                }
            ]
        }"#;
        let parsed: PickupsResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.request_status.success);
        assert_eq!(parsed.pickup_locations.len(), 1);
        let loc = &parsed.pickup_locations[0];
        assert_eq!(loc.location_name.as_deref(), Some("Anzac Square"));
        assert_eq!(loc.pickup_id.as_deref(), Some("bne-anzac-square"));
        assert_eq!(loc.minutes_prior, Some(15));
    }

    #[test]
    fn missing_pickup_locations_defaults_to_empty() {
        let json = r#"{ "requestStatus": { "success": true } }"#;
        let parsed: PickupsResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.pickup_locations.is_empty());
    }

    #[test]
    fn describe_error_includes_code_and_message() {
        let json = r#"{
            "requestStatus": {
                "success": false,
                "error": { "errorCode": "10", "errorMessage": "API key not valid" }
            }
        }"#;
        let parsed: PickupsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.request_status.describe_error(),
            "10: API key not valid"
        );
    }

    #[test]
    fn describe_error_without_detail() {
        let json = r#"{ "requestStatus": { "success": false } }"#;
        let parsed: PickupsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.request_status.describe_error(),
            "request failed with no error detail"
        );
    }
}
