use crate::types::{Facility, RegionBoundary, RegionMetrics};
use anyhow::{anyhow, bail, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::Reader;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

pub fn load_facilities(path: &Path) -> Result<Vec<Facility>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open facilities CSV: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut facilities = Vec::new();
    for (row, result) in rdr.deserialize().enumerate() {
        let facility: Facility = result
            .with_context(|| format!("Invalid facility record at row {} of {:?}", row + 1, path))?;
        facilities.push(facility);
    }

    info!("Loaded {} facilities from {:?}", facilities.len(), path);
    Ok(facilities)
}

pub fn load_metrics(path: &Path, join_column: &str, indicators: &[String]) -> Result<Vec<RegionMetrics>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open metrics CSV: {:?}", path))?;
    // region keys are matched verbatim; indicator cells are trimmed in parse_indicator
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let join_col_idx = headers.iter().position(|h| h == join_column)
        .ok_or_else(|| anyhow!("Join column '{}' not found in {:?}", join_column, path))?;

    let indicator_idx: Vec<usize> = indicators.iter()
        .map(|name| {
            headers.iter().position(|h| h == name)
                .ok_or_else(|| anyhow!("Indicator column '{}' not found in {:?}", name, path))
        })
        .collect::<Result<_>>()?;

    let mut seen = HashSet::new();
    let mut metrics = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let region = record.get(join_col_idx).unwrap_or("").to_string();

        if region.is_empty() {
            debug!("Skipping metrics row {} with empty region key", row + 1);
            continue;
        }
        if !seen.insert(region.clone()) {
            bail!("Duplicate region '{}' in {:?}", region, path);
        }

        let mut values = Vec::with_capacity(indicator_idx.len());
        for (name, &idx) in indicators.iter().zip(&indicator_idx) {
            let raw = record.get(idx).unwrap_or("");
            let value = parse_indicator(raw)
                .with_context(|| format!("Column '{}' at row {} of {:?}", name, row + 1, path))?;
            values.push(value);
        }

        metrics.push(RegionMetrics { region, values });
    }

    info!("Loaded metrics for {} regions from {:?}", metrics.len(), path);
    Ok(metrics)
}

/// Empty, NA, NaN and null cells are missing values.
fn parse_indicator(raw: &str) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() || ["na", "nan", "null", "n/a"].contains(&raw.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    let value: f64 = raw.parse()
        .map_err(|_| anyhow!("'{}' is not a number", raw))?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

pub fn load_boundaries(path: &Path, join_column: &str) -> Result<Vec<RegionBoundary>> {
    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    let boundaries = match extension.as_str() {
        "shp" => load_shapefile(path, join_column)?,
        "json" | "geojson" => load_geojson(path, join_column)?,
        _ => return Err(anyhow!("Unsupported geometry format: {}", extension)),
    };

    let mut seen = HashSet::new();
    for boundary in &boundaries {
        if !seen.insert(boundary.region.as_str()) {
            bail!("Duplicate region '{}' in {:?}", boundary.region, path);
        }
    }

    info!("Loaded {} region boundaries from {:?}", boundaries.len(), path);
    Ok(boundaries)
}

fn load_shapefile(path: &Path, join_column: &str) -> Result<Vec<RegionBoundary>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut boundaries = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let key_value = record.get(join_column)
            .ok_or_else(|| anyhow!("Join column '{}' not found in Shapefile", join_column))?;

        let region = match key_value {
            shapefile::dbase::FieldValue::Character(Some(s)) => s.trim().to_string(),
            shapefile::dbase::FieldValue::Numeric(Some(n)) => format_numeric_key(*n),
            shapefile::dbase::FieldValue::Character(None)
            | shapefile::dbase::FieldValue::Numeric(None) => continue,
            _ => bail!("Shapefile join column must be a string or number"),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.into(),
            shapefile::Shape::PolygonM(polygon) => polygon.into(),
            shapefile::Shape::PolygonZ(polygon) => polygon.into(),
            _ => {
                debug!("Skipping non-polygon shape for region '{}'", region);
                continue;
            }
        };

        boundaries.push(RegionBoundary { region, geometry });
    }

    Ok(boundaries)
}

fn load_geojson(path: &Path, join_column: &str) -> Result<Vec<RegionBoundary>> {
    use geojson::GeoJson;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => bail!("GeoJSON must be a FeatureCollection"),
    };

    let mut boundaries = Vec::new();

    for feature in collection.features {
        let properties = feature.properties.as_ref()
            .ok_or_else(|| anyhow!("GeoJSON feature without properties"))?;
        let region = match properties.get(join_column) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(serde_json::Value::Null) => continue,
            Some(other) => bail!("GeoJSON join column must be a string or number, got {}", other),
            None => bail!("Join column '{}' not found in GeoJSON feature", join_column),
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        debug!("Skipping non-polygon geometry for region '{}'", region);
                        continue;
                    }
                }
            }
            None => continue,
        };

        boundaries.push(RegionBoundary { region, geometry });
    }

    Ok(boundaries)
}

// dBase numerics come back as f64; integral keys should read "12", not "12.0"
fn format_numeric_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
    use shapefile::record::EsriShape;
    use shapefile::{Point, PointM, PointZ, Polygon, PolygonM, PolygonRing, PolygonZ, Writer};
    use std::io::Write;
    use tempfile::{tempdir, Builder, NamedTempFile};

    fn indicators() -> Vec<String> {
        vec!["DiseaseRate".to_string(), "Income".to_string(), "Pollution".to_string()]
    }

    #[test]
    fn loads_facilities_with_extra_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Name,Type,Latitude,Longitude,Beds").unwrap();
        writeln!(file, "St Mary,Hospital,53.35,-6.26,120").unwrap();
        writeln!(file, "Corner Clinic,Clinic,52.1,-7.5,").unwrap();

        let facilities = load_facilities(file.path()).unwrap();
        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities[0].name, "St Mary");
        assert_eq!(facilities[1].kind, "Clinic");
        assert_eq!(facilities[1].longitude, -7.5);
    }

    #[test]
    fn facilities_missing_coordinate_column_fail() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Name,Type,Latitude").unwrap();
        writeln!(file, "St Mary,Hospital,53.35").unwrap();
        assert!(load_facilities(file.path()).is_err());
    }

    #[test]
    fn metrics_missing_values_become_none() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Region,DiseaseRate,Income,Pollution").unwrap();
        writeln!(file, "A,5,100,2").unwrap();
        writeln!(file, "B,,200,NA").unwrap();
        writeln!(file, ",1,1,1").unwrap();

        let metrics = load_metrics(file.path(), "Region", &indicators()).unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].values, vec![Some(5.0), Some(100.0), Some(2.0)]);
        assert_eq!(metrics[1].values, vec![None, Some(200.0), None]);
    }

    #[test]
    fn metrics_reject_missing_column_and_bad_numbers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Region,DiseaseRate,Income").unwrap();
        writeln!(file, "A,5,100").unwrap();
        let err = load_metrics(file.path(), "Region", &indicators()).unwrap_err();
        assert!(err.to_string().contains("Pollution"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Region,DiseaseRate,Income,Pollution").unwrap();
        writeln!(file, "A,high,100,2").unwrap();
        assert!(load_metrics(file.path(), "Region", &indicators()).is_err());
    }

    #[test]
    fn metrics_reject_duplicate_regions() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Region,DiseaseRate,Income,Pollution").unwrap();
        writeln!(file, "A,5,100,2").unwrap();
        writeln!(file, "A,6,110,3").unwrap();
        assert!(load_metrics(file.path(), "Region", &indicators()).is_err());
    }

    #[test]
    fn metrics_keys_are_not_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Region,DiseaseRate,Income,Pollution").unwrap();
        writeln!(file, "  A , 5 ,100,2").unwrap();

        let metrics = load_metrics(file.path(), "Region", &indicators()).unwrap();
        assert_eq!(metrics[0].region, "  A ");
        assert_eq!(metrics[0].values, vec![Some(5.0), Some(100.0), Some(2.0)]);
    }

    fn square<P>(x0: f64, point: impl Fn(f64, f64) -> P) -> Vec<P> {
        vec![point(x0, 0.0), point(x0, 1.0), point(x0 + 1.0, 1.0), point(x0 + 1.0, 0.0), point(x0, 0.0)]
    }

    fn write_shapefile<S: EsriShape>(path: &Path, table: TableWriterBuilder, rows: Vec<(S, FieldValue)>) {
        let mut writer = Writer::from_path(path, table).unwrap();
        for (shape, key) in rows {
            let mut record = Record::default();
            record.insert("Region".to_string(), key);
            writer.write_shape_and_record(&shape, &record).unwrap();
        }
    }

    #[test]
    fn loads_shapefile_numeric_keys_and_skips_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.shp");
        let table = TableWriterBuilder::new().add_numeric_field(FieldName::try_from("Region").unwrap(), 10, 0);
        write_shapefile(
            &path,
            table,
            vec![
                (Polygon::new(PolygonRing::Outer(square(0.0, Point::new))), FieldValue::Numeric(Some(12.0))),
                (Polygon::new(PolygonRing::Outer(square(2.0, Point::new))), FieldValue::Numeric(None)),
                (Polygon::new(PolygonRing::Outer(square(4.0, Point::new))), FieldValue::Numeric(Some(7.0))),
            ],
        );

        let boundaries = load_boundaries(&path, "Region").unwrap();
        let keys: Vec<&str> = boundaries.iter().map(|b| b.region.as_str()).collect();
        assert_eq!(keys, vec!["12", "7"]);
        assert_eq!(boundaries[0].geometry.0.len(), 1);
        assert_eq!(boundaries[0].geometry.0[0].exterior().coords().count(), 5);
    }

    #[test]
    fn loads_shapefile_measured_polygons_with_padded_text_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions_m.shp");
        let table = TableWriterBuilder::new().add_character_field(FieldName::try_from("Region").unwrap(), 20);
        write_shapefile(
            &path,
            table,
            vec![
                (
                    PolygonM::new(PolygonRing::Outer(square(0.0, |x, y| PointM::new(x, y, 0.0)))),
                    FieldValue::Character(Some("North".to_string())),
                ),
                (
                    PolygonM::new(PolygonRing::Outer(square(2.0, |x, y| PointM::new(x, y, 0.0)))),
                    FieldValue::Character(None),
                ),
            ],
        );

        let boundaries = load_boundaries(&path, "Region").unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].region, "North");
    }

    #[test]
    fn loads_shapefile_polygon_z() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions_z.shp");
        let table = TableWriterBuilder::new().add_character_field(FieldName::try_from("Region").unwrap(), 20);
        write_shapefile(
            &path,
            table,
            vec![(
                PolygonZ::new(PolygonRing::Outer(square(0.0, |x, y| PointZ::new(x, y, 10.0, 0.0)))),
                FieldValue::Character(Some("Upland".to_string())),
            )],
        );

        let boundaries = load_boundaries(&path, "Region").unwrap();
        assert_eq!(boundaries[0].region, "Upland");
        let rect = geo::BoundingRect::bounding_rect(&boundaries[0].geometry).unwrap();
        assert_eq!((rect.min().x, rect.max().x), (0.0, 1.0));
    }

    #[test]
    fn shapefile_missing_join_column_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("regions.shp");
        let mut writer = Writer::from_path(
            &path,
            TableWriterBuilder::new().add_character_field(FieldName::try_from("Name").unwrap(), 20),
        )
        .unwrap();
        let mut record = Record::default();
        record.insert("Name".to_string(), FieldValue::Character(Some("A".to_string())));
        writer
            .write_shape_and_record(&Polygon::new(PolygonRing::Outer(square(0.0, Point::new))), &record)
            .unwrap();
        drop(writer);

        let err = load_boundaries(&path, "Region").unwrap_err();
        assert!(err.to_string().contains("Region"));
    }

    #[test]
    fn loads_geojson_polygons_and_multipolygons() {
        let mut file = Builder::new().suffix(".geojson").tempfile().unwrap();
        write!(file, r#"{{
            "type": "FeatureCollection",
            "features": [
                {{"type": "Feature", "properties": {{"Region": "A"}},
                  "geometry": {{"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}}},
                {{"type": "Feature", "properties": {{"Region": 7}},
                  "geometry": {{"type": "MultiPolygon", "coordinates": [[[[2,2],[3,2],[3,3],[2,2]]]]}}}},
                {{"type": "Feature", "properties": {{"Region": "P"}},
                  "geometry": {{"type": "Point", "coordinates": [5,5]}}}}
            ]
        }}"#).unwrap();

        let boundaries = load_boundaries(file.path(), "Region").unwrap();
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].region, "A");
        assert_eq!(boundaries[0].geometry.0.len(), 1);
        assert_eq!(boundaries[1].region, "7");
    }

    #[test]
    fn geojson_missing_join_column_fails() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"type": "FeatureCollection", "features": [
            {{"type": "Feature", "properties": {{"Name": "A"}},
              "geometry": {{"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}}}
        ]}}"#).unwrap();
        assert!(load_boundaries(file.path(), "Region").is_err());
    }

    #[test]
    fn unsupported_extension_fails() {
        let file = Builder::new().suffix(".gpkg").tempfile().unwrap();
        let err = load_boundaries(file.path(), "Region").unwrap_err();
        assert!(err.to_string().contains("Unsupported geometry format"));
    }

    #[test]
    fn numeric_keys_drop_trailing_zero() {
        assert_eq!(format_numeric_key(12.0), "12");
        assert_eq!(format_numeric_key(12.5), "12.5");
    }
}
