use chrono::{TimeZone, Utc};
use road_watch::{
    geo::GeoError,
    models::{
        Category, CreateMarkerRequest, MAX_DESCRIPTION_CHARS, Marker, MarkerValidationError,
        NewMarker, UnknownCategory, User, UserProfile,
    },
};
use rstest::rstest;

fn request(lat: f64, lng: f64, category: &str, description: Option<&str>) -> CreateMarkerRequest {
    CreateMarkerRequest {
        lat,
        lng,
        category: category.to_string(),
        description: description.map(str::to_string),
    }
}

// --- Category ---

#[rstest]
#[case("good", Category::Good)]
#[case("medium", Category::Medium)]
#[case("bad", Category::Bad)]
#[case("snow", Category::Snow)]
#[case("ice", Category::Ice)]
#[case("closed", Category::Closed)]
fn test_category_parses_wire_names(#[case] raw: &str, #[case] expected: Category) {
    assert_eq!(raw.parse::<Category>().unwrap(), expected);
    assert_eq!(expected.as_str(), raw);
}

#[rstest]
#[case("flood")]
#[case("Ice")]
#[case("")]
fn test_category_rejects_unknown_names(#[case] raw: &str) {
    assert_eq!(
        raw.parse::<Category>(),
        Err(UnknownCategory(raw.to_string()))
    );
}

// --- NewMarker validation ---

#[test]
fn test_new_marker_accepts_valid_request() {
    let marker = NewMarker::try_from(request(50.0, 14.0, "ice", Some("  black ice  "))).unwrap();

    assert_eq!(marker.position.lat(), 50.0);
    assert_eq!(marker.position.lng(), 14.0);
    assert_eq!(marker.category, Category::Ice);
    assert_eq!(marker.description.as_deref(), Some("black ice"));
}

#[test]
fn test_new_marker_rejects_unknown_category() {
    let err = NewMarker::try_from(request(50.0, 14.0, "flood", None)).unwrap_err();

    assert!(matches!(err, MarkerValidationError::Category(_)));
    assert!(err.to_string().contains("flood"));
}

#[rstest]
#[case(90.5, 14.0)]
#[case(-91.0, 14.0)]
#[case(50.0, 180.1)]
#[case(50.0, -200.0)]
#[case(f64::NAN, 14.0)]
fn test_new_marker_rejects_out_of_range_position(#[case] lat: f64, #[case] lng: f64) {
    let err = NewMarker::try_from(request(lat, lng, "snow", None)).unwrap_err();

    assert!(matches!(err, MarkerValidationError::Position(_)));
}

#[test]
fn test_new_marker_accepts_boundary_positions() {
    for (lat, lng) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
        assert!(NewMarker::try_from(request(lat, lng, "good", None)).is_ok());
    }
}

#[test]
fn test_blank_description_is_stored_as_absent() {
    let marker = NewMarker::try_from(request(50.0, 14.0, "bad", Some("   "))).unwrap();
    assert_eq!(marker.description, None);
}

#[test]
fn test_description_length_limit() {
    let at_limit = "x".repeat(MAX_DESCRIPTION_CHARS);
    let over_limit = "x".repeat(MAX_DESCRIPTION_CHARS + 1);

    assert!(NewMarker::try_from(request(50.0, 14.0, "bad", Some(&at_limit))).is_ok());
    assert_eq!(
        NewMarker::try_from(request(50.0, 14.0, "bad", Some(&over_limit))).unwrap_err(),
        MarkerValidationError::DescriptionTooLong
    );
}

#[test]
fn test_position_error_message_names_the_value() {
    let err = NewMarker::try_from(request(123.0, 14.0, "ice", None)).unwrap_err();
    assert_eq!(
        err,
        MarkerValidationError::Position(GeoError::LatitudeOutOfRange(123.0))
    );
}

// --- Wire format ---

#[test]
fn test_marker_serializes_category_as_type() {
    let marker = Marker {
        id: 7,
        user_id: 1,
        lat: 50.0,
        lng: 14.0,
        category: Category::Closed,
        description: None,
        approved: true,
        created_at: Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).unwrap(),
    };

    let json = serde_json::to_value(&marker).unwrap();

    assert_eq!(json["type"], "closed");
    assert!(json.get("category").is_none());
    assert_eq!(json["approved"], true);
}

#[test]
fn test_create_request_reads_type_key() {
    let req: CreateMarkerRequest =
        serde_json::from_str(r#"{"lat": 50.0, "lng": 14.0, "type": "snow"}"#).unwrap();

    assert_eq!(req.category, "snow");
    assert_eq!(req.description, None);
}

#[test]
fn test_user_debug_redacts_password_hash() {
    let user = User {
        id: 1,
        username: "driver".to_string(),
        password_hash: "$argon2id$v=19$secret".to_string(),
        is_admin: false,
    };

    let debug = format!("{user:?}");
    assert!(!debug.contains("secret"));

    let profile = UserProfile::from(&user);
    assert_eq!(profile.username, "driver");
}
