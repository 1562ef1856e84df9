//! Route computation (OSRM) and map rendering (OSM slippy tiles).
//!
//! A driving route is fetched as a GeoJSON polyline, a zoom level is
//! chosen so the route's bounding box spans a reasonable number of
//! tiles, the tiles are stitched into one canvas, the polyline is
//! drawn on top, and the canvas is cropped to the bounding box.

use std::io::Cursor;

use async_trait::async_trait;
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use serde::Deserialize;
use tracing::debug;

use super::{EnrichError, RouteRenderer};

const TILE_SIZE: u32 = 256;
/// Zoom in until the box spans at least this many tiles.
const MIN_TILES: u64 = 10;
const MAX_ZOOM: u32 = 17;
const LINE_COLOR: Rgba<u8> = Rgba([220, 30, 30, 255]);
const LINE_HALF_WIDTH: i64 = 2;

/// Geographic bounding box, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BBox {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

/// Fractional slippy-tile coordinates for a point at a zoom level.
fn tile_f(lat: f64, lon: f64, zoom: u32) -> (f64, f64) {
    let n = f64::from(1u32 << zoom);
    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n;
    (x, y)
}

fn bbox(coords: &[(f64, f64)]) -> Option<BBox> {
    let first = coords.first()?;
    let mut b = BBox {
        west: first.1,
        south: first.0,
        east: first.1,
        north: first.0,
    };
    for &(lat, lon) in coords {
        b.west = b.west.min(lon);
        b.east = b.east.max(lon);
        b.south = b.south.min(lat);
        b.north = b.north.max(lat);
    }
    Some(b)
}

fn is_degenerate(b: BBox) -> bool {
    b.west == b.east || b.south == b.north
}

fn tiles_spanned(b: BBox, zoom: u32) -> u64 {
    let (x0, y0) = tile_f(b.north, b.west, zoom);
    let (x1, y1) = tile_f(b.south, b.east, zoom);
    let cols = x1.floor() as i64 - x0.floor() as i64 + 1;
    let rows = y1.floor() as i64 - y0.floor() as i64 + 1;
    (cols.max(1) * rows.max(1)) as u64
}

fn choose_zoom(b: BBox) -> u32 {
    for zoom in 2..MAX_ZOOM {
        if tiles_spanned(b, zoom) >= MIN_TILES {
            return zoom;
        }
    }
    MAX_ZOOM
}

pub struct OsmRenderer {
    http: reqwest::Client,
    osrm_base_url: String,
    tile_base_url: String,
    user_agent: String,
}

impl OsmRenderer {
    pub fn new(
        http: reqwest::Client,
        osrm_base_url: String,
        tile_base_url: String,
        user_agent: String,
    ) -> Self {
        Self { http, osrm_base_url, tile_base_url, user_agent }
    }

    /// Driving route through the waypoints, as (lat, lon) pairs.
    async fn route(&self, waypoints: &[(f64, f64)]) -> Result<Vec<(f64, f64)>, EnrichError> {
        let coords: Vec<String> = waypoints
            .iter()
            .map(|(lat, lon)| format!("{},{}", lon, lat))
            .collect();
        let payload = self
            .http
            .get(format!(
                "{}/route/v1/driving/{}",
                self.osrm_base_url,
                coords.join(";")
            ))
            .query(&[("geometries", "geojson"), ("overview", "full")])
            .send()
            .await?
            .error_for_status()?
            .json::<OsrmPayload>()
            .await?;
        let route = payload
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| EnrichError::Payload("osrm returned no routes".into()))?;
        Ok(route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lon, lat]| (lat, lon))
            .collect())
    }

    async fn fetch_tile(&self, zoom: u32, x: i64, y: i64) -> Result<RgbaImage, EnrichError> {
        let bytes = self
            .http
            .get(format!("{}/{}/{}/{}.png", self.tile_base_url, zoom, x, y))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }

    /// Stitch tiles covering the route, draw it, crop to its box.
    /// `None` when the box is degenerate (nothing to draw).
    async fn render(&self, line: &[(f64, f64)]) -> Result<Option<Vec<u8>>, EnrichError> {
        let Some(b) = bbox(line) else {
            return Ok(None);
        };
        if is_degenerate(b) {
            return Ok(None);
        }
        let zoom = choose_zoom(b);
        let (wx, ny) = tile_f(b.north, b.west, zoom);
        let (ex, sy) = tile_f(b.south, b.east, zoom);
        let (x0, y0) = (wx.floor() as i64, ny.floor() as i64);
        let (x1, y1) = (ex.floor() as i64, sy.floor() as i64);
        debug!(zoom, tiles = (x1 - x0 + 1) * (y1 - y0 + 1), "rendering map");

        let mut canvas = RgbaImage::new(
            ((x1 - x0 + 1) as u32) * TILE_SIZE,
            ((y1 - y0 + 1) as u32) * TILE_SIZE,
        );
        for x in x0..=x1 {
            for y in y0..=y1 {
                let tile = self.fetch_tile(zoom, x, y).await?;
                imageops::overlay(
                    &mut canvas,
                    &tile,
                    (x - x0) * i64::from(TILE_SIZE),
                    (y - y0) * i64::from(TILE_SIZE),
                );
            }
        }

        // Route polyline in canvas pixel coordinates.
        let px = |lat: f64, lon: f64| -> (i64, i64) {
            let (tx, ty) = tile_f(lat, lon, zoom);
            (
                ((tx - x0 as f64) * f64::from(TILE_SIZE)) as i64,
                ((ty - y0 as f64) * f64::from(TILE_SIZE)) as i64,
            )
        };
        for pair in line.windows(2) {
            let (ax, ay) = px(pair[0].0, pair[0].1);
            let (bx, by) = px(pair[1].0, pair[1].1);
            draw_segment(&mut canvas, (ax, ay), (bx, by));
        }

        // Crop to the geographic box.
        let left = ((wx - x0 as f64) * f64::from(TILE_SIZE)) as u32;
        let top = ((ny - y0 as f64) * f64::from(TILE_SIZE)) as u32;
        let right = ((ex - x0 as f64) * f64::from(TILE_SIZE)) as u32;
        let bottom = ((sy - y0 as f64) * f64::from(TILE_SIZE)) as u32;
        let cropped = imageops::crop_imm(
            &canvas,
            left,
            top,
            (right - left).max(1),
            (bottom - top).max(1),
        )
        .to_image();

        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(cropped)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        Ok(Some(out))
    }
}

/// Thick line segment, stepped densely enough to leave no gaps.
fn draw_segment(canvas: &mut RgbaImage, a: (i64, i64), b: (i64, i64)) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).max(1);
    for i in 0..=steps {
        let x = a.0 + (b.0 - a.0) * i / steps;
        let y = a.1 + (b.1 - a.1) * i / steps;
        for dx in -LINE_HALF_WIDTH..=LINE_HALF_WIDTH {
            for dy in -LINE_HALF_WIDTH..=LINE_HALF_WIDTH {
                let (px, py) = (x + dx, y + dy);
                if px >= 0
                    && py >= 0
                    && (px as u32) < canvas.width()
                    && (py as u32) < canvas.height()
                {
                    canvas.put_pixel(px as u32, py as u32, LINE_COLOR);
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmPayload {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: [lon, lat].
    coordinates: Vec<[f64; 2]>,
}

#[async_trait]
impl RouteRenderer for OsmRenderer {
    async fn trip_map(&self, waypoints: &[(f64, f64)]) -> Result<Vec<u8>, EnrichError> {
        let line = self.route(waypoints).await?;
        self.render(&line)
            .await?
            .ok_or_else(|| EnrichError::Payload("route has no extent".into()))
    }

    async fn route_map(
        &self,
        from: (f64, f64),
        to: (f64, f64),
    ) -> Result<Option<Vec<u8>>, EnrichError> {
        if from == to {
            return Ok(None);
        }
        let line = self.route(&[from, to]).await?;
        self.render(&line).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_math_at_origin() {
        // (0, 0) sits at the center of the tile grid at every zoom.
        let (x, y) = tile_f(0.0, 0.0, 1);
        assert_eq!((x, y), (1.0, 1.0));
        let (x, y) = tile_f(0.0, 0.0, 4);
        assert_eq!((x, y), (8.0, 8.0));
    }

    #[test]
    fn tile_x_grows_east_and_y_grows_south() {
        let (x_west, _) = tile_f(0.0, -10.0, 6);
        let (x_east, _) = tile_f(0.0, 10.0, 6);
        assert!(x_west < x_east);
        let (_, y_north) = tile_f(10.0, 0.0, 6);
        let (_, y_south) = tile_f(-10.0, 0.0, 6);
        assert!(y_north < y_south);
    }

    #[test]
    fn bbox_covers_all_points() {
        let b = bbox(&[(41.9, 12.5), (45.5, 9.2), (40.8, 14.3)]).unwrap();
        assert_eq!(b.west, 9.2);
        assert_eq!(b.east, 14.3);
        assert_eq!(b.south, 40.8);
        assert_eq!(b.north, 45.5);
    }

    #[test]
    fn single_point_box_is_degenerate() {
        let b = bbox(&[(41.9, 12.5), (41.9, 12.5)]).unwrap();
        assert!(is_degenerate(b));
    }

    #[test]
    fn zoom_increases_until_enough_tiles() {
        // Rome to Milan: a few degrees across.
        let b = bbox(&[(41.9, 12.5), (45.5, 9.2)]).unwrap();
        let zoom = choose_zoom(b);
        assert!(tiles_spanned(b, zoom) >= MIN_TILES);
        assert!(zoom > 2);
        assert!(zoom <= MAX_ZOOM);
    }

    #[test]
    fn tiny_box_caps_at_max_zoom() {
        let b = BBox {
            west: 12.5,
            east: 12.500001,
            south: 41.9,
            north: 41.900001,
        };
        assert_eq!(choose_zoom(b), MAX_ZOOM);
    }
}
