use crate::analysis::{Clustering, CorrelationMatrix, IndicatorMatrix};
use crate::colormap::{self, Gradient, BLUES, COOLWARM, NO_DATA, REDS, REGION_FILL};
use crate::config::{AppConfig, UnclusteredPolicy};
use crate::types::{ClusterLabel, EnrichedRegion, Facility, Region, RegionTable};
use anyhow::{anyhow, Context, Result};
use geo::{BoundingRect, MultiPolygon, Rect};
use image::{Rgb, RgbImage};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;
const EARTH_RADIUS: f64 = 6_378_137.0;
const HALF_WORLD: f64 = PI * EARTH_RADIUS;
const MAX_LATITUDE: f64 = 85.051_128_78;
const MAX_ZOOM: u8 = 18;

const MAP_SIZE: (u32, u32) = (1200, 1000);
const LEGEND_WIDTH: u32 = 160;

type MapChart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Charts drawn before clustering: the facility overlay, the indicator
/// choropleth, the pair plot and the correlation heatmap.
pub fn render_exploratory(
    table: &RegionTable,
    facilities: &[Facility],
    matrix: &IndicatorMatrix,
    correlation: &CorrelationMatrix,
    config: &AppConfig,
) -> Result<Vec<PathBuf>> {
    let dir = output_dir(config)?;
    let mut written = Vec::new();

    let path = dir.join("facilities_map.png");
    facility_overlay_map(&table.regions, facilities, config.input.basemap_tiles.as_deref(), &path)?;
    written.push(path);

    let indicator = config.choropleth_indicator();
    let idx = table.indicator_index(indicator)
        .ok_or_else(|| anyhow!("Indicator '{}' not present in region table", indicator))?;
    let values: Vec<Option<f64>> = table.regions.iter().map(|r| r.indicators[idx]).collect();
    let path = dir.join(format!("{}_choropleth.png", snake_case(indicator)));
    choropleth(&table.regions, &values, REDS, &format!("{} by Region", split_camel(indicator)), &path)?;
    written.push(path);

    let path = dir.join("pairwise_relationships.png");
    pair_plot(matrix, &path)?;
    written.push(path);

    let path = dir.join("correlation_matrix.png");
    correlation_heatmap(correlation, &path)?;
    written.push(path);

    for path in &written {
        info!("Chart saved to {:?}", path);
    }
    Ok(written)
}

pub fn render_cluster_map(table: &RegionTable, clustering: &Clustering, config: &AppConfig) -> Result<PathBuf> {
    let path = output_dir(config)?.join("cluster_choropleth.png");
    cluster_choropleth(
        &table.regions,
        &clustering.labels,
        clustering.n_clusters,
        config.clustering.unclustered,
        &path,
    )?;
    info!("Chart saved to {:?}", path);
    Ok(path)
}

pub fn render_facility_counts(regions: &[EnrichedRegion], config: &AppConfig) -> Result<PathBuf> {
    let path = output_dir(config)?.join("facility_count_choropleth.png");
    let geometries: Vec<Region> = regions.iter().map(|r| r.region.clone()).collect();
    let values: Vec<Option<f64>> = regions.iter().map(|r| Some(r.facility_count as f64)).collect();
    choropleth(&geometries, &values, BLUES, "Number of Healthcare Facilities per Region", &path)?;
    info!("Chart saved to {:?}", path);
    Ok(path)
}

fn output_dir(config: &AppConfig) -> Result<&Path> {
    let dir = config.output.dir.as_path();
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    Ok(dir)
}

// ---------------------------------------------------------------------------
// Web Mercator
// ---------------------------------------------------------------------------

/// EPSG:4326 degrees to EPSG:3857 metres.
pub fn to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = lon.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + lat_rad / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

/// Tile index and pixel offset of a Web Mercator position at `zoom`.
fn mercator_to_tile_pixel(x: f64, y: f64, zoom: u8) -> Option<(u32, u32, u32, u32)> {
    let n = 2.0_f64.powi(zoom as i32);
    let x_t = (x + HALF_WORLD) / (2.0 * HALF_WORLD) * n;
    let y_t = (HALF_WORLD - y) / (2.0 * HALF_WORLD) * n;
    if !(0.0..n).contains(&x_t) || !(0.0..n).contains(&y_t) {
        return None;
    }

    let tx = x_t as u32;
    let ty = y_t as u32;

    let px = ((x_t - tx as f64) * TILE_SIZE as f64) as u32;
    let py = ((y_t - ty as f64) * TILE_SIZE as f64) as u32;

    Some((tx, ty, px.min(TILE_SIZE - 1), py.min(TILE_SIZE - 1)))
}

/// Largest zoom whose tiles are no coarser than the canvas resolution.
fn choose_zoom(extent_width: f64, canvas_width: u32) -> u8 {
    if extent_width <= 0.0 {
        return MAX_ZOOM;
    }
    let ratio = canvas_width as f64 * 2.0 * HALF_WORLD / (TILE_SIZE as f64 * extent_width);
    ratio.log2().floor().clamp(0.0, MAX_ZOOM as f64) as u8
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}

impl Extent {
    fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut extent: Option<Extent> = None;
        for (x, y) in points {
            extent = Some(match extent {
                None => Extent { x0: x, x1: x, y0: y, y1: y },
                Some(e) => Extent { x0: e.x0.min(x), x1: e.x1.max(x), y0: e.y0.min(y), y1: e.y1.max(y) },
            });
        }
        extent
    }

    /// Pads each side by `fraction` of the span, with `min_span` as a floor.
    fn padded(self, fraction: f64, min_span: f64) -> Self {
        let pad_x = ((self.x1 - self.x0) * fraction).max(min_span / 2.0);
        let pad_y = ((self.y1 - self.y0) * fraction).max(min_span / 2.0);
        Extent { x0: self.x0 - pad_x, x1: self.x1 + pad_x, y0: self.y0 - pad_y, y1: self.y1 + pad_y }
    }

    /// Grows the shorter side so the extent has the canvas aspect ratio.
    fn fit_aspect(self, width: u32, height: u32) -> Self {
        let target = width as f64 / height as f64;
        let (w, h) = (self.x1 - self.x0, self.y1 - self.y0);
        let (cx, cy) = ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0);
        if w / h > target {
            let h = w / target;
            Extent { y0: cy - h / 2.0, y1: cy + h / 2.0, ..self }
        } else {
            let w = h * target;
            Extent { x0: cx - w / 2.0, x1: cx + w / 2.0, ..self }
        }
    }
}

fn load_tile(root: &Path, zoom: u8, x: u32, y: u32) -> Option<RgbImage> {
    let path = root.join(zoom.to_string()).join(x.to_string()).join(format!("{}.png", y));
    match image::open(&path) {
        Ok(img) => Some(img.to_rgb8()),
        Err(e) => {
            debug!("Basemap tile {:?} unavailable: {}", path, e);
            None
        }
    }
}

/// Paints XYZ tiles from a local `{z}/{x}/{y}.png` tree under the canvas.
/// Returns the number of distinct tiles that were found.
fn composite_basemap(canvas: &mut RgbImage, tiles: &Path, extent: &Extent) -> usize {
    let (w, h) = canvas.dimensions();
    let zoom = choose_zoom(extent.x1 - extent.x0, w);
    let mut cache: HashMap<(u32, u32), Option<RgbImage>> = HashMap::new();

    for py in 0..h {
        let my = extent.y1 - (py as f64 + 0.5) / h as f64 * (extent.y1 - extent.y0);
        for px in 0..w {
            let mx = extent.x0 + (px as f64 + 0.5) / w as f64 * (extent.x1 - extent.x0);
            let Some((tx, ty, ox, oy)) = mercator_to_tile_pixel(mx, my, zoom) else {
                continue;
            };

            let tile = cache.entry((tx, ty)).or_insert_with(|| load_tile(tiles, zoom, tx, ty));
            if let Some(img) = tile {
                // tiles are not always 256px (retina sets are 512)
                let sx = (ox * img.width() / TILE_SIZE).min(img.width() - 1);
                let sy = (oy * img.height() / TILE_SIZE).min(img.height() - 1);
                canvas.put_pixel(px, py, *img.get_pixel(sx, sy));
            }
        }
    }

    let found = cache.values().filter(|t| t.is_some()).count();
    debug!("Basemap zoom {} used {} of {} tiles", zoom, found, cache.len());
    found
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// Regions in light grey with facilities as red dots, in Web Mercator.
pub fn facility_overlay_map(
    regions: &[Region],
    facilities: &[Facility],
    basemap_tiles: Option<&Path>,
    output_path: &Path,
) -> Result<()> {
    let (w, h) = MAP_SIZE;

    let region_points = regions.iter()
        .flat_map(|r| r.geometry.0.iter())
        .flat_map(|p| p.exterior().coords())
        .map(|c| to_web_mercator(c.x, c.y));
    let facility_points = facilities.iter().map(|f| to_web_mercator(f.longitude, f.latitude));

    let extent = Extent::from_points(region_points.chain(facility_points))
        .ok_or_else(|| anyhow!("Nothing to draw on the facility map"))?
        .padded(0.05, 1_000.0)
        .fit_aspect(w, h);

    let mut canvas = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    if let Some(tiles) = basemap_tiles {
        let found = composite_basemap(&mut canvas, tiles, &extent);
        info!("Composited {} basemap tiles from {:?}", found, tiles);
    }

    {
        let root = BitMapBackend::with_buffer(&mut canvas, (w, h)).into_drawing_area();

        let mut chart = ChartBuilder::on(&root)
            .build_cartesian_2d(extent.x0..extent.x1, extent.y0..extent.y1)?;

        let fill = REGION_FILL.mix(0.7).filled();
        for region in regions {
            draw_region(&mut chart, &region.geometry, Some(fill), &to_web_mercator)?;
        }

        chart
            .draw_series(facilities.iter().map(|f| {
                Circle::new(to_web_mercator(f.longitude, f.latitude), 4, RED.filled())
            }))?
            .label("Healthcare Facilities")
            .legend(|(x, y)| Circle::new((x + 5, y), 4, RED.filled()));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.draw(&Text::new(
            "Healthcare Facilities on Regional Map",
            (w as i32 / 2, 24),
            ("sans-serif", 28).into_font().color(&BLACK).pos(Pos::new(HPos::Center, VPos::Center)),
        ))?;

        root.present()?;
    }

    canvas.save(output_path)
        .with_context(|| format!("Failed to save map: {:?}", output_path))?;
    Ok(())
}

/// Regions shaded by a continuous value. `None` values are outlined only.
pub fn choropleth(
    regions: &[Region],
    values: &[Option<f64>],
    gradient: Gradient,
    title: &str,
    output_path: &Path,
) -> Result<()> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let root = BitMapBackend::new(output_path, MAP_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (map_area, legend_area) = root.split_horizontally(MAP_SIZE.0 - LEGEND_WIDTH);

    let mut chart = geographic_chart(&map_area, regions, title)?;
    for (region, value) in regions.iter().zip(values) {
        let fill = value.map(|v| gradient.scaled(v, min, max).filled());
        draw_region(&mut chart, &region.geometry, fill, &|x, y| (x, y))?;
    }

    if !present.is_empty() {
        draw_colorbar(&legend_area, gradient, min, max)?;
    }

    root.present()?;
    Ok(())
}

/// Regions shaded by cluster label, one label per region.
pub fn cluster_choropleth(
    regions: &[Region],
    labels: &[ClusterLabel],
    n_clusters: usize,
    unclustered: UnclusteredPolicy,
    output_path: &Path,
) -> Result<()> {
    let root = BitMapBackend::new(output_path, MAP_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (map_area, legend_area) = root.split_horizontally(MAP_SIZE.0 - LEGEND_WIDTH);

    let mut chart = geographic_chart(&map_area, regions, "Clustered Regions Based on Health Indicators")?;
    for (region, &label) in regions.iter().zip(labels) {
        let fill = cluster_color(label, unclustered).map(|c| c.filled());
        draw_region(&mut chart, &region.geometry, fill, &|x, y| (x, y))?;
    }

    draw_swatches(&legend_area, &cluster_legend(labels, n_clusters, unclustered))?;

    root.present()?;
    Ok(())
}

/// Fill for a cluster label; `None` leaves the region outlined only.
fn cluster_color(label: ClusterLabel, unclustered: UnclusteredPolicy) -> Option<RGBColor> {
    match (label, unclustered) {
        (ClusterLabel::Cluster(c), _) => Some(colormap::categorical(c)),
        (ClusterLabel::Unlabeled, UnclusteredPolicy::NoData) => Some(NO_DATA),
        (ClusterLabel::Unlabeled, UnclusteredPolicy::Omit) => None,
    }
}

fn cluster_legend(labels: &[ClusterLabel], n_clusters: usize, unclustered: UnclusteredPolicy) -> Vec<(String, RGBColor)> {
    let mut entries: Vec<(String, RGBColor)> = (0..n_clusters)
        .map(|c| (format!("Cluster {}", c), colormap::categorical(c)))
        .collect();
    if labels.contains(&ClusterLabel::Unlabeled) {
        if let Some(color) = cluster_color(ClusterLabel::Unlabeled, unclustered) {
            entries.push((ClusterLabel::Unlabeled.to_string(), color));
        }
    }
    entries
}

fn geographic_chart<'a, 'b>(
    area: &'a DrawingArea<BitMapBackend<'b>, Shift>,
    regions: &[Region],
    title: &str,
) -> Result<MapChart<'a, 'b>> {
    let rect = bounds(regions.iter().map(|r| &r.geometry))
        .ok_or_else(|| anyhow!("No region geometry to draw"))?;
    let extent = Extent { x0: rect.min().x, x1: rect.max().x, y0: rect.min().y, y1: rect.max().y }
        .padded(0.03, 0.01);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(extent.x0..extent.x1, extent.y0..extent.y1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Longitude")
        .y_desc("Latitude")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    Ok(chart)
}

fn bounds<'a>(geometries: impl Iterator<Item = &'a MultiPolygon<f64>>) -> Option<Rect<f64>> {
    geometries.filter_map(|g| g.bounding_rect()).reduce(|a, b| {
        Rect::new(
            geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        )
    })
}

fn draw_region(
    chart: &mut MapChart<'_, '_>,
    geometry: &MultiPolygon<f64>,
    fill: Option<ShapeStyle>,
    project: &dyn Fn(f64, f64) -> (f64, f64),
) -> Result<()> {
    for polygon in geometry.0.iter() {
        let exterior: Vec<(f64, f64)> = polygon.exterior().coords().map(|c| project(c.x, c.y)).collect();
        let interiors: Vec<Vec<(f64, f64)>> = polygon.interiors().iter()
            .map(|ring| ring.coords().map(|c| project(c.x, c.y)).collect())
            .collect();

        if let Some(style) = fill {
            chart.draw_series(std::iter::once(Polygon::new(exterior.clone(), style)))?;
            // plotters has no holes; paint them back over
            chart.draw_series(interiors.iter().map(|ring| Polygon::new(ring.clone(), WHITE.filled())))?;
        }

        chart.draw_series(std::iter::once(PathElement::new(exterior, BLACK.stroke_width(1))))?;
        chart.draw_series(interiors.into_iter().map(|ring| PathElement::new(ring, BLACK.stroke_width(1))))?;
    }
    Ok(())
}

fn draw_colorbar(area: &DrawingArea<BitMapBackend<'_>, Shift>, gradient: Gradient, min: f64, max: f64) -> Result<()> {
    let (lo, hi) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let steps = 100;
    let step = (hi - lo) / steps as f64;

    let mut bar = ChartBuilder::on(area)
        .margin_top(80)
        .margin_bottom(80)
        .margin_right(20)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..1f64, lo..hi)?;

    bar.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_labels(8)
        .draw()?;

    bar.draw_series((0..steps).map(|i| {
        let v0 = lo + step * i as f64;
        Rectangle::new([(0.0, v0), (1.0, v0 + step)], gradient.scaled(v0 + step / 2.0, lo, hi).filled())
    }))?;
    Ok(())
}

fn draw_swatches(area: &DrawingArea<BitMapBackend<'_>, Shift>, entries: &[(String, RGBColor)]) -> Result<()> {
    for (i, (label, color)) in entries.iter().enumerate() {
        let y = 80 + i as i32 * 30;
        area.draw(&Rectangle::new([(10, y), (30, y + 20)], color.filled()))?;
        area.draw(&Rectangle::new([(10, y), (30, y + 20)], BLACK.stroke_width(1)))?;
        area.draw(&Text::new(label.clone(), (38, y + 3), ("sans-serif", 16).into_font()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Statistics charts
// ---------------------------------------------------------------------------

fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if max > min { (max - min) * 0.05 } else { 0.5 };
    (min - pad, max + pad)
}

/// Scatter matrix of the indicators with histograms on the diagonal.
pub fn pair_plot(matrix: &IndicatorMatrix, output_path: &Path) -> Result<()> {
    let n = matrix.names.len();
    let side = 300 * n as u32;

    let root = BitMapBackend::new(output_path, (side, side + 40)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Pairwise Relationships", ("sans-serif", 28))?;
    let panels = root.split_evenly((n, n));

    let ranges: Vec<(f64, f64)> = (0..n).map(|c| padded_range(matrix.values.column(c).iter().copied())).collect();

    for (idx, panel) in panels.iter().enumerate() {
        let (row, col) = (idx / n, idx % n);
        let (x_lo, x_hi) = ranges[col];

        if row == col {
            let bins = histogram(matrix.values.column(col).iter().copied(), x_lo, x_hi, 10);
            let top = bins.iter().copied().max().unwrap_or(1).max(1) as f64 * 1.1;
            let width = (x_hi - x_lo) / bins.len() as f64;

            let mut chart = panel_chart(panel, &matrix.names, row, col, n, x_lo..x_hi, 0.0..top)?;
            chart.draw_series(bins.iter().enumerate().map(|(b, &count)| {
                let x0 = x_lo + width * b as f64;
                Rectangle::new([(x0, 0.0), (x0 + width, count as f64)], BLUE.mix(0.6).filled())
            }))?;
        } else {
            let (y_lo, y_hi) = ranges[row];
            let mut chart = panel_chart(panel, &matrix.names, row, col, n, x_lo..x_hi, y_lo..y_hi)?;
            chart.draw_series(
                matrix.values.column(col).iter()
                    .zip(matrix.values.column(row).iter())
                    .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.mix(0.7).filled())),
            )?;
        }
    }

    root.present()?;
    Ok(())
}

fn panel_chart<'a, 'b>(
    panel: &'a DrawingArea<BitMapBackend<'b>, Shift>,
    names: &[String],
    row: usize,
    col: usize,
    n: usize,
    x: std::ops::Range<f64>,
    y: std::ops::Range<f64>,
) -> Result<MapChart<'a, 'b>> {
    let mut chart = ChartBuilder::on(panel)
        .margin(8)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(x, y)?;

    {
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh().x_labels(4).y_labels(4);
        if row == n - 1 {
            mesh.x_desc(names[col].as_str());
        }
        if col == 0 {
            mesh.y_desc(names[row].as_str());
        }
        mesh.draw()?;
    }

    Ok(chart)
}

fn histogram(values: impl Iterator<Item = f64>, lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    let width = (hi - lo) / bins as f64;
    for v in values {
        let b = (((v - lo) / width).floor().max(0.0) as usize).min(bins - 1);
        counts[b] += 1;
    }
    counts
}

/// Annotated heatmap of the correlation matrix on [-1, 1].
pub fn correlation_heatmap(corr: &CorrelationMatrix, output_path: &Path) -> Result<()> {
    let n = corr.names.len();
    let size = n as f64;

    let root = BitMapBackend::new(output_path, (900, 760)).into_drawing_area();
    root.fill(&WHITE)?;
    let (grid_area, legend_area) = root.split_horizontally(900 - LEGEND_WIDTH);

    let mut chart = ChartBuilder::on(&grid_area)
        .caption("Correlation Matrix", ("sans-serif", 28))
        .margin(10)
        .margin_left(130)
        .margin_bottom(50)
        .build_cartesian_2d(0f64..size, 0f64..size)?;

    let centered = ("sans-serif", 20).into_font().color(&BLACK).pos(Pos::new(HPos::Center, VPos::Center));

    for i in 0..n {
        for j in 0..n {
            let value = corr.values[[i, j]];
            // row 0 at the top
            let y = (n - 1 - i) as f64;
            let x = j as f64;
            let (color, label) = heatmap_cell(value);

            chart.draw_series(std::iter::once(Rectangle::new([(x, y), (x + 1.0, y + 1.0)], color.filled())))?;
            chart.draw_series(std::iter::once(Text::new(label, (x + 0.5, y + 0.5), centered.clone())))?;
        }
    }

    for (k, name) in corr.names.iter().enumerate() {
        let (px, py) = chart.backend_coord(&(k as f64 + 0.5, 0.0));
        root.draw(&Text::new(
            name.clone(),
            (px, py + 10),
            ("sans-serif", 16).into_font().color(&BLACK).pos(Pos::new(HPos::Center, VPos::Top)),
        ))?;

        let (px, py) = chart.backend_coord(&(0.0, (n - 1 - k) as f64 + 0.5));
        root.draw(&Text::new(
            name.clone(),
            (px - 10, py),
            ("sans-serif", 16).into_font().color(&BLACK).pos(Pos::new(HPos::Right, VPos::Center)),
        ))?;
    }

    draw_colorbar(&legend_area, COOLWARM, -1.0, 1.0)?;

    root.present()?;
    Ok(())
}

/// Colour and annotation of one correlation cell; NaN cells are greyed out.
fn heatmap_cell(value: f64) -> (RGBColor, String) {
    if value.is_nan() {
        (NO_DATA, "nan".to_string())
    } else {
        (COOLWARM.scaled(value, -1.0, 1.0), format!("{:.2}", value))
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

fn split_camel(name: &str) -> String {
    let mut out = String::new();
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}
