use thiserror::Error;

/// Mean Earth radius used for every great-circle distance in the service.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude used by the bounding-box prefilter.
pub const KM_PER_DEGREE: f64 = 111.0;

/// GeoError
///
/// Rejections raised while validating user-supplied positions and search radii.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),
}

/// Coordinates
///
/// A validated WGS84 position. Construction is the only place range checks
/// happen, so any `Coordinates` value is known to be on the globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Rejects NaN as well as out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// validate_radius
///
/// A search radius must be finite and strictly positive.
pub fn validate_radius(radius_km: f64) -> Result<f64, GeoError> {
    if radius_km.is_finite() && radius_km > 0.0 {
        Ok(radius_km)
    } else {
        Err(GeoError::InvalidRadius(radius_km))
    }
}

/// haversine_km
///
/// Great-circle distance in kilometres between two latitude/longitude pairs
/// given in degrees.
///
/// The haversine term is clamped to `[0, 1]` before the `atan2` step so that
/// rounding on near-antipodal inputs can never produce NaN. Identical points
/// yield exactly `0.0`, and swapping the arguments yields the same value.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// LongitudeSpan
///
/// The longitude side of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LongitudeSpan {
    /// Every longitude is a candidate (the box touches a pole).
    Full,
    /// `min <= lng <= max`.
    Range { min: f64, max: f64 },
    /// The box crosses the antimeridian: `lng >= min || lng <= max`.
    Wrapped { min: f64, max: f64 },
}

/// BoundingBox
///
/// Cheap rectangular prefilter computed around a search center.
///
/// The latitude half-width is `radius / 111` degrees. One degree of latitude is
/// really ~111.19 km, so this is slightly wider than needed and never drops a
/// point that is within the radius.
///
/// Longitude degrees shrink toward the poles, so a plain `radius / 111` box in
/// both axes misses true matches away from the equator: at 60°N a point 10 km
/// due east of the center is ~0.18° of longitude away, twice the 0.09° the
/// naive box allows. The longitude
/// half-width is therefore widened using the latitude of the box edge nearest a
/// pole, which keeps the box a superset of the exact circle at every latitude.
/// The box is still an approximation in the other direction: near the poles it
/// becomes very wide (up to the full globe) and lets through many candidates
/// that the exact haversine filter then discards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub lng: LongitudeSpan,
}

impl BoundingBox {
    pub fn around(center: Coordinates, radius_km: f64) -> Self {
        let half_lat = radius_km / KM_PER_DEGREE;

        Self {
            min_lat: (center.lat - half_lat).max(-90.0),
            max_lat: (center.lat + half_lat).min(90.0),
            lng: longitude_span(center, half_lat),
        }
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        if point.lat < self.min_lat || point.lat > self.max_lat {
            return false;
        }
        match self.lng {
            LongitudeSpan::Full => true,
            LongitudeSpan::Range { min, max } => point.lng >= min && point.lng <= max,
            LongitudeSpan::Wrapped { min, max } => point.lng >= min || point.lng <= max,
        }
    }
}

/// For two points at most `half_lat` (as an arc) apart whose latitudes both lie
/// within `edge_lat` of the equator, the haversine identity bounds the
/// longitude difference by `sin(Δλ/2) <= sin(half_lat/2) / cos(edge_lat)`.
fn longitude_span(center: Coordinates, half_lat: f64) -> LongitudeSpan {
    let edge_lat = center.lat.abs() + half_lat;
    if edge_lat >= 90.0 {
        return LongitudeSpan::Full;
    }

    let ratio = (half_lat.to_radians() / 2.0).sin() / edge_lat.to_radians().cos();
    if ratio >= 1.0 {
        return LongitudeSpan::Full;
    }

    let half_lng = 2.0 * ratio.asin().to_degrees();
    if half_lng >= 180.0 {
        return LongitudeSpan::Full;
    }

    let min = center.lng - half_lng;
    let max = center.lng + half_lng;
    if min < -180.0 {
        LongitudeSpan::Wrapped { min: min + 360.0, max }
    } else if max > 180.0 {
        LongitudeSpan::Wrapped { min, max: max - 360.0 }
    } else {
        LongitudeSpan::Range { min, max }
    }
}
