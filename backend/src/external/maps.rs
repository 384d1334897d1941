//! Google Maps client: road distance and address geocoding

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::GeoPoint;

use crate::config::MapsConfig;
use crate::error::{AppError, AppResult};

const MAPS_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct MapsClient {
    client: Client,
    server_key: Option<String>,
    distance_matrix_url: String,
    geocode_url: String,
}

/// A verified delivery address
#[derive(Debug, Clone, Serialize)]
pub struct GeocodedAddress {
    pub formatted_address: String,
    pub lat: f64,
    pub lng: f64,
    pub place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixRow {
    #[serde(default)]
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixElement {
    distance: Option<DistanceValue>,
}

#[derive(Debug, Deserialize)]
struct DistanceValue {
    /// Meters
    value: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    place_id: Option<String>,
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Debug, Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

impl DistanceMatrixResponse {
    fn first_distance_km(&self) -> Option<f64> {
        let meters = self.rows.first()?.elements.first()?.distance.as_ref()?.value;
        Some(meters / 1000.0)
    }
}

impl MapsClient {
    pub fn new(config: &MapsConfig) -> Self {
        Self {
            client: Client::new(),
            server_key: config.server_key.clone().filter(|k| !k.trim().is_empty()),
            distance_matrix_url: config.distance_matrix_url.clone(),
            geocode_url: config.geocode_url.clone(),
        }
    }

    fn key(&self) -> AppResult<&str> {
        self.server_key
            .as_deref()
            .ok_or_else(|| AppError::MapsService("GOOGLE_MAPS_SERVER_KEY is not set".into()))
    }

    /// Driving distance in kilometers
    pub async fn road_distance_km(&self, origin: GeoPoint, destination: GeoPoint) -> AppResult<f64> {
        let origins = format!("{},{}", origin.lat, origin.lng);
        let destinations = format!("{},{}", destination.lat, destination.lng);

        let response = self
            .client
            .get(&self.distance_matrix_url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("units", "metric"),
                ("key", self.key()?),
            ])
            .timeout(MAPS_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::MapsService(format!("Request failed: {}", e)))?;

        let data: DistanceMatrixResponse = response
            .json()
            .await
            .map_err(|e| AppError::MapsService(format!("Failed to parse response: {}", e)))?;

        data.first_distance_km()
            .ok_or_else(|| AppError::MapsService("No route distance in response".into()))
    }

    /// Resolve a free-form address to its canonical form and coordinates
    pub async fn geocode(&self, address: &str) -> AppResult<GeocodedAddress> {
        let response = self
            .client
            .get(&self.geocode_url)
            .query(&[("address", address), ("key", self.key()?)])
            .timeout(MAPS_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::MapsService(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::MapsService(format!(
                "Geocoding returned {}",
                response.status()
            )));
        }

        let data: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| AppError::MapsService(format!("Failed to parse response: {}", e)))?;

        let first = data
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::validation("address", "Invalid address. Please try again."))?;

        Ok(GeocodedAddress {
            formatted_address: first.formatted_address,
            lat: first.geometry.location.lat,
            lng: first.geometry.location.lng,
            place_id: first.place_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_matrix_parsing() {
        let data: DistanceMatrixResponse = serde_json::from_str(
            r#"{"rows":[{"elements":[{"distance":{"text":"12.3 km","value":12345},"status":"OK"}]}]}"#,
        )
        .unwrap();
        assert_eq!(data.first_distance_km(), Some(12.345));

        let not_found: DistanceMatrixResponse =
            serde_json::from_str(r#"{"rows":[{"elements":[{"status":"NOT_FOUND"}]}]}"#).unwrap();
        assert_eq!(not_found.first_distance_km(), None);

        let denied: DistanceMatrixResponse =
            serde_json::from_str(r#"{"status":"REQUEST_DENIED"}"#).unwrap();
        assert_eq!(denied.first_distance_km(), None);
    }

    #[test]
    fn test_geocode_parsing() {
        let data: GeocodeResponse = serde_json::from_str(
            r#"{"results":[{"formatted_address":"Chaguanas, Trinidad and Tobago",
                "place_id":"abc","geometry":{"location":{"lat":10.51,"lng":-61.41}}}],"status":"OK"}"#,
        )
        .unwrap();
        assert_eq!(data.results[0].geometry.location.lat, 10.51);
        assert_eq!(data.results[0].place_id.as_deref(), Some("abc"));
    }
}
