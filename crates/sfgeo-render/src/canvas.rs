//! Raster canvas with a world-space viewport

use image::{Rgba, RgbaImage};

use sfgeo_core::models::BoundingBox;

/// Default layer color (matplotlib's C0 blue).
pub const LAYER_COLOR: Rgba<u8> = Rgba([31, 119, 180, 255]);

/// A white RGBA canvas mapped onto a world-space bounding box.
#[derive(Debug, Clone)]
pub struct MapCanvas {
    pub image: RgbaImage,
    pub viewport: BoundingBox,
}

impl MapCanvas {
    pub fn new(width: u32, height: u32, viewport: BoundingBox) -> Self {
        let image = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([255, 255, 255, 255]));
        Self { image, viewport }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// World coordinates → pixel coordinates. The vertical axis flips: world
    /// north is pixel row zero.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let px = (x - self.viewport.minx) / self.viewport.width() * f64::from(self.width());
        let py = (self.viewport.maxy - y) / self.viewport.height() * f64::from(self.height());
        (px, py)
    }

    /// Source-over blend of `color` at the given opacity into one pixel.
    /// Out-of-bounds writes are ignored.
    pub fn blend_pixel(&mut self, px: i64, py: i64, color: Rgba<u8>, opacity: f32) {
        if px < 0 || py < 0 || px >= i64::from(self.width()) || py >= i64::from(self.height()) {
            return;
        }
        let (px, py) = (px as u32, py as u32);
        let alpha = (opacity * f32::from(color.0[3]) / 255.0).clamp(0.0, 1.0);
        let existing = self.image.get_pixel(px, py);
        let mut blended = [0u8; 4];
        for channel in 0..3 {
            let src = f32::from(color.0[channel]);
            let dst = f32::from(existing.0[channel]);
            blended[channel] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        blended[3] = 255;
        self.image.put_pixel(px, py, Rgba(blended));
    }

    /// Draw a line segment between two world coordinates.
    pub fn draw_line(
        &mut self,
        from: geo::Coord<f64>,
        to: geo::Coord<f64>,
        color: Rgba<u8>,
        opacity: f32,
    ) {
        let (x0, y0) = self.world_to_pixel(from.x, from.y);
        let (x1, y1) = self.world_to_pixel(to.x, to.y);

        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let px = (x0 + (x1 - x0) * t).round() as i64;
            let py = (y0 + (y1 - y0) * t).round() as i64;
            self.blend_pixel(px, py, color, opacity);
        }
    }

    /// Draw a filled disc at a world coordinate.
    pub fn draw_disc(
        &mut self,
        center: geo::Coord<f64>,
        radius_px: i64,
        color: Rgba<u8>,
        opacity: f32,
    ) {
        let (cx, cy) = self.world_to_pixel(center.x, center.y);
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        for dy in -radius_px..=radius_px {
            for dx in -radius_px..=radius_px {
                if dx * dx + dy * dy <= radius_px * radius_px {
                    self.blend_pixel(cx + dx, cy + dy, color, opacity);
                }
            }
        }
    }

    /// Fill a polygon with even-odd scanline filling, then stroke its rings.
    pub fn draw_polygon(&mut self, polygon: &geo::Polygon<f64>, color: Rgba<u8>, opacity: f32) {
        let rings: Vec<&geo::LineString<f64>> = std::iter::once(polygon.exterior())
            .chain(polygon.interiors().iter())
            .collect();

        // Fill: for each pixel row, collect the x positions where ring edges
        // cross the row center and fill between alternating pairs.
        for row in 0..self.height() {
            let scan_y = f64::from(row) + 0.5;
            let mut crossings: Vec<f64> = Vec::new();
            for ring in &rings {
                for edge in ring.lines() {
                    let (x0, y0) = self.world_to_pixel(edge.start.x, edge.start.y);
                    let (x1, y1) = self.world_to_pixel(edge.end.x, edge.end.y);
                    if (y0 <= scan_y && y1 > scan_y) || (y1 <= scan_y && y0 > scan_y) {
                        let t = (scan_y - y0) / (y1 - y0);
                        crossings.push(x0 + (x1 - x0) * t);
                    }
                }
            }
            crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            for pair in crossings.chunks_exact(2) {
                let start = pair[0].round().max(0.0) as i64;
                let end = pair[1].round() as i64;
                for px in start..end {
                    self.blend_pixel(px, i64::from(row), color, opacity * 0.5);
                }
            }
        }

        // Outline at full layer opacity so shapes stay legible.
        for ring in &rings {
            for edge in ring.lines() {
                self.draw_line(edge.start, edge.end, color, opacity);
            }
        }
    }

    /// Draw any geometry with the default style.
    pub fn draw_geometry(&mut self, geometry: &geo::Geometry<f64>, color: Rgba<u8>, opacity: f32) {
        match geometry {
            geo::Geometry::Point(point) => self.draw_disc(point.0, 3, color, opacity),
            geo::Geometry::MultiPoint(points) => {
                for point in points {
                    self.draw_disc(point.0, 3, color, opacity);
                }
            }
            geo::Geometry::Line(line) => self.draw_line(line.start, line.end, color, opacity),
            geo::Geometry::LineString(line) => {
                for edge in line.lines() {
                    self.draw_line(edge.start, edge.end, color, opacity);
                }
            }
            geo::Geometry::MultiLineString(lines) => {
                for line in lines {
                    for edge in line.lines() {
                        self.draw_line(edge.start, edge.end, color, opacity);
                    }
                }
            }
            geo::Geometry::Polygon(polygon) => self.draw_polygon(polygon, color, opacity),
            geo::Geometry::MultiPolygon(polygons) => {
                for polygon in polygons {
                    self.draw_polygon(polygon, color, opacity);
                }
            }
            geo::Geometry::Rect(rect) => self.draw_polygon(&rect.to_polygon(), color, opacity),
            geo::Geometry::Triangle(triangle) => {
                self.draw_polygon(&triangle.to_polygon(), color, opacity)
            }
            geo::Geometry::GeometryCollection(collection) => {
                for inner in collection {
                    self.draw_geometry(inner, color, opacity);
                }
            }
        }
    }
}
