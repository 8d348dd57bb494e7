//! Standalone Leaflet page with one marker per facility.

use crate::types::Facility;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const AWESOME_MARKERS_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css";
const AWESOME_MARKERS_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js";
const GLYPHICONS_CSS: &str = "https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap-glyphicons.css";

/// Mean facility coordinate as `[lat, lon]`.
pub fn map_center(facilities: &[Facility]) -> Option<[f64; 2]> {
    if facilities.is_empty() {
        return None;
    }
    let n = facilities.len() as f64;
    let lat = facilities.iter().map(|f| f.latitude).sum::<f64>() / n;
    let lon = facilities.iter().map(|f| f.longitude).sum::<f64>() / n;
    Some([lat, lon])
}

pub fn render_html(facilities: &[Facility], zoom_start: u8) -> String {
    let [lat, lon] = map_center(facilities).unwrap_or_else(|| {
        warn!("No facilities to centre the interactive map on, using 0,0");
        [0.0, 0.0]
    });

    let markers: String = facilities.iter()
        .map(|f| {
            format!(
                "    L.marker([{}, {}], {{icon: facilityIcon}}).bindPopup({}).addTo(map);\n",
                f.latitude,
                f.longitude,
                js_string(&escape_html(&f.name)),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Healthcare Facilities</title>
    <link rel="stylesheet" href="{leaflet_css}" />
    <link rel="stylesheet" href="{glyphicons_css}" />
    <link rel="stylesheet" href="{markers_css}" />
    <script src="{leaflet_js}"></script>
    <script src="{markers_js}"></script>
    <style>html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
    var map = L.map("map").setView([{lat}, {lon}], {zoom});
    L.tileLayer("https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
        maxZoom: 19,
        attribution: "&copy; OpenStreetMap contributors"
    }}).addTo(map);
    var facilityIcon = L.AwesomeMarkers.icon({{icon: "plus-sign", markerColor: "red", prefix: "glyphicon"}});
{markers}</script>
</body>
</html>
"#,
        leaflet_css = LEAFLET_CSS,
        glyphicons_css = GLYPHICONS_CSS,
        markers_css = AWESOME_MARKERS_CSS,
        leaflet_js = LEAFLET_JS,
        markers_js = AWESOME_MARKERS_JS,
        lat = lat,
        lon = lon,
        zoom = zoom_start,
        markers = markers,
    )
}

pub fn write_interactive_map(facilities: &[Facility], zoom_start: u8, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    fs::write(output_path, render_html(facilities, zoom_start))
        .with_context(|| format!("Failed to write interactive map: {:?}", output_path))?;
    info!("Interactive map with {} markers saved to {:?}", facilities.len(), output_path);
    Ok(())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// JSON-quoted string that is also safe inside a <script> block.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn facility(name: &str, lat: f64, lon: f64) -> Facility {
        Facility {
            name: name.to_string(),
            kind: "Hospital".to_string(),
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn one_marker_per_facility() {
        let facilities = vec![facility("A", 53.0, -6.0), facility("B", 52.0, -8.0)];
        let html = render_html(&facilities, 6);
        assert_eq!(html.matches("L.marker(").count(), 2);
        assert!(html.contains(r#"L.marker([53, -6], {icon: facilityIcon}).bindPopup("A").addTo(map);"#));
        assert!(html.contains("setView([52.5, -7], 6)"));
        assert!(html.contains(r#"markerColor: "red""#));
        assert!(html.contains(r#"icon: "plus-sign""#));
    }

    #[test]
    fn popup_names_are_escaped() {
        let html = render_html(&[facility("<script>alert(1)</script> & \"Co\"", 1.0, 2.0)], 6);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; &quot;Co&quot;"));
    }

    #[test]
    fn empty_facility_list_centres_on_origin() {
        let html = render_html(&[], 4);
        assert_eq!(html.matches("L.marker(").count(), 0);
        assert!(html.contains("setView([0, 0], 4)"));
        assert_eq!(map_center(&[]), None);
    }

    #[test]
    fn writes_file_into_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("interactive_health_map.html");
        write_interactive_map(&[facility("A", 1.0, 2.0)], 6, &path).unwrap();
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("L.marker(").count(), 1);
    }
}
