use axum::Json;
use serde_json::{json, Value};

/// GET /presets
/// Common poster sizes, DPI choices and layer combinations for the frontend.
pub async fn get_presets() -> Json<Value> {
    Json(json!({
        "outputSizes": [
            { "name": "Standard Poster (12x16)", "width": 12, "height": 16 },
            { "name": "Square (12x12)", "width": 12, "height": 12 },
            { "name": "Landscape (16x12)", "width": 16, "height": 12 },
            { "name": "Large Portrait (18x24)", "width": 18, "height": 24 },
            { "name": "Extra Large (24x32)", "width": 24, "height": 32 },
        ],
        "dpiOptions": [
            { "name": "Preview (150 DPI)", "value": 150, "description": "Fast, good for previews" },
            { "name": "Standard (300 DPI)", "value": 300, "description": "High quality, recommended" },
            { "name": "Print (600 DPI)", "value": 600, "description": "Maximum quality, slower" },
        ],
        "featureSets": [
            { "name": "Minimal", "water": true, "parks": false, "buildings": false, "railways": false },
            { "name": "Standard", "water": true, "parks": true, "buildings": false, "railways": false },
            { "name": "Detailed", "water": true, "parks": true, "buildings": true, "railways": false },
            { "name": "Complete", "water": true, "parks": true, "buildings": true, "railways": true },
        ],
    }))
}
