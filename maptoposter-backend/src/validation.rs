use maptoposter_render::{is_color_key, parse_hex_color, PosterRequest, ThemeProvider};
use serde::Serialize;

pub const DISTANCE_RANGE: std::ops::RangeInclusive<u32> = 1_000..=50_000;
pub const DIMENSION_RANGE: std::ops::RangeInclusive<u32> = 6..=48;
pub const DPI_OPTIONS: [u32; 3] = [150, 300, 600];

#[derive(Debug, Serialize, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub fn to_payload(issues: &[ValidationIssue]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for issue in issues {
        map.insert(
            issue.field.clone(),
            serde_json::json!({ "code": issue.code, "message": issue.message }),
        );
    }
    serde_json::json!({ "validation": serde_json::Value::Object(map) })
}

/// Check a poster request before a job is created for it.
pub fn validate_poster_request(
    request: &PosterRequest,
    themes: &dyn ThemeProvider,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if request.city.trim().is_empty() {
        issues.push(ValidationIssue::new("city", "required", "City is required"));
    }
    if request.country.trim().is_empty() {
        issues.push(ValidationIssue::new("country", "required", "Country is required"));
    }
    if !themes.has_theme(&request.theme) {
        issues.push(ValidationIssue::new(
            "theme",
            "unknown_theme",
            format!("Theme '{}' not found", request.theme),
        ));
    }
    if !DISTANCE_RANGE.contains(&request.distance) {
        issues.push(ValidationIssue::new(
            "distance",
            "out_of_range",
            "Distance must be between 1000 and 50000 meters",
        ));
    }
    if !DIMENSION_RANGE.contains(&request.width) {
        issues.push(ValidationIssue::new(
            "width",
            "out_of_range",
            "Width must be between 6 and 48 inches",
        ));
    }
    if !DIMENSION_RANGE.contains(&request.height) {
        issues.push(ValidationIssue::new(
            "height",
            "out_of_range",
            "Height must be between 6 and 48 inches",
        ));
    }
    if !DPI_OPTIONS.contains(&request.dpi) {
        issues.push(ValidationIssue::new(
            "dpi",
            "unsupported",
            "DPI must be 150, 300, or 600",
        ));
    }

    for (key, value) in request.custom_colors.iter().flatten() {
        let field = format!("customColors.{key}");
        if !is_color_key(key) {
            issues.push(ValidationIssue::new(
                field,
                "unknown_color",
                format!("'{key}' is not a theme colour"),
            ));
        } else if parse_hex_color(value).is_none() {
            issues.push(ValidationIssue::new(
                field,
                "invalid_color",
                "Colours must be #RRGGBB",
            ));
        }
    }

    issues
}
