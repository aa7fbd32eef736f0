//! Radius search over approved markers.

use crate::{
    error::AppError,
    geo::{BoundingBox, Coordinates, haversine_km, validate_radius},
    models::Marker,
    repository::Repository,
};

/// Search radius used when the caller does not supply one.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// find_near
///
/// Two-phase search: the store returns approved candidates inside a bounding
/// box around the center, then every candidate is checked against the exact
/// haversine distance. A marker exactly `radius_km` away is included.
///
/// The result keeps the store's order; it is not sorted by distance.
pub async fn find_near(
    repo: &dyn Repository,
    lat: f64,
    lng: f64,
    radius_km: f64,
) -> Result<Vec<Marker>, AppError> {
    let center = Coordinates::new(lat, lng)?;
    let radius_km = validate_radius(radius_km)?;

    let bbox = BoundingBox::around(center, radius_km);
    let candidates = repo.list_approved_within(&bbox).await?;
    let candidate_count = candidates.len();

    let matches: Vec<Marker> = candidates
        .into_iter()
        .filter(|m| m.approved && is_within(center, m, radius_km))
        .collect();

    tracing::debug!(
        lat,
        lng,
        radius_km,
        candidates = candidate_count,
        matches = matches.len(),
        "nearby query"
    );
    Ok(matches)
}

fn is_within(center: Coordinates, marker: &Marker, radius_km: f64) -> bool {
    haversine_km(center.lat(), center.lng(), marker.lat, marker.lng) <= radius_km
}
