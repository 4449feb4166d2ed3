//! Sheet/Region Detector
//!
//! Two-stage localisation of the drawing inside a photo:
//!
//! 1. **Coarse**: the vision model estimates where the sketch is
//!    (`CircuitLocation`). Paper held in a hand or lying on a cluttered desk
//!    rarely shows four clean corners, so the model's centroid is more reliable
//!    than geometric sheet detection on the full frame.
//! 2. **Fine**: contour extraction on the region of interest around that
//!    centroid, followed by rectification of the best contour.
//!
//! The stages run as a linear state machine:
//! `Localize -> ComputeROI -> Preprocess -> FindContour -> Rectify | NotFound`.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::ai::prompts::LOCATION_PROMPT;
use crate::ai::{ModelGateway, ModelRequest};
use crate::core::ExtractionError;
use crate::schema::CircuitLocation;

/// Contours at or below this area (px²) are treated as specks.
pub const MIN_CONTOUR_AREA: f64 = 1000.0;
/// Extra border kept around the drawing's bounding box.
pub const DEFAULT_MARGIN: u32 = 50;
/// Sigma matching a 5x5 Gaussian kernel with automatic sigma.
const BLUR_SIGMA: f32 = 1.1;
/// L-infinity radius 2 == 5x5 square structuring element.
const CLOSING_RADIUS: u8 = 2;

/// Contour acceptance and rectification strategy. One policy is chosen per
/// deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectificationPolicy {
    /// Hand-drawn region: bounding box aspect in `[0.5, 2.0]`, cropped with a
    /// margin around the bounding rectangle.
    #[default]
    Drawing,
    /// Paper sheet: four-vertex contour with A4-like aspect in `(0.65, 0.88)`,
    /// perspective-warped to a fronto-parallel canvas.
    Sheet,
}

impl RectificationPolicy {
    /// Canny (low, high) thresholds.
    pub fn canny_thresholds(&self) -> (f32, f32) {
        match self {
            RectificationPolicy::Drawing => (50.0, 150.0),
            RectificationPolicy::Sheet => (75.0, 200.0),
        }
    }

    pub fn accepts_aspect(&self, aspect: f64) -> bool {
        match self {
            RectificationPolicy::Drawing => (0.5..=2.0).contains(&aspect),
            RectificationPolicy::Sheet => aspect > 0.65 && aspect < 0.88,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RectificationPolicy::Drawing => "drawing",
            RectificationPolicy::Sheet => "sheet",
        }
    }
}

impl fmt::Display for RectificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RectificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drawing" | "region" => Ok(RectificationPolicy::Drawing),
            "sheet" | "a4" => Ok(RectificationPolicy::Sheet),
            other => Err(format!("expected 'drawing' or 'sheet', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub policy: RectificationPolicy,
    pub margin: u32,
    pub min_contour_area: f64,
    /// When set, intermediate images are written under `<dir>/<run id>/`
    pub debug_dir: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            policy: RectificationPolicy::Drawing,
            margin: DEFAULT_MARGIN,
            min_contour_area: MIN_CONTOUR_AREA,
            debug_dir: None,
        }
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Grow by `margin` on every side, clamped to `[0, max_width) x [0, max_height)`.
    pub fn expand(&self, margin: u32, max_width: u32, max_height: u32) -> PixelRect {
        let x0 = self.x.saturating_sub(margin);
        let y0 = self.y.saturating_sub(margin);
        let x1 = (self.x + self.width).saturating_add(margin).min(max_width);
        let y1 = (self.y + self.height).saturating_add(margin).min(max_height);
        PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    pub fn offset(&self, dx: u32, dy: u32) -> PixelRect {
        PixelRect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Tight bounds of a point set (inclusive pixel extent).
    pub fn bounding(points: &[Point<i32>]) -> Option<PixelRect> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        Some(PixelRect {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1).max(0) as u32,
            height: (max_y - min_y + 1).max(0) as u32,
        })
    }
}

/// Region of interest around the model's estimated centroid.
///
/// The window side is `min(W, H) * (1 - confidence * 0.5)`: a confident answer
/// shrinks the search area. The window is clamped to the image.
pub fn region_of_interest(location: &CircuitLocation, width: u32, height: u32) -> PixelRect {
    let (w, h) = (width as i64, height as i64);
    let center_x = (location.relative_x * width as f64) as i64;
    let center_y = (location.relative_y * height as f64) as i64;
    let side = (width.min(height) as f64 * (1.0 - location.confidence * 0.5)) as i64;
    let half = side / 2;

    let x0 = (center_x - half).clamp(0, w);
    let y0 = (center_y - half).clamp(0, h);
    let x1 = (center_x + half).clamp(0, w);
    let y1 = (center_y + half).clamp(0, h);

    PixelRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0).max(0) as u32,
        height: (y1 - y0).max(0) as u32,
    }
}

pub type Corner = (f32, f32);

/// Quadrilateral in canonical top-left, top-right, bottom-right, bottom-left order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: Corner,
    pub top_right: Corner,
    pub bottom_right: Corner,
    pub bottom_left: Corner,
}

impl Quad {
    /// Order four corners given in any order.
    ///
    /// Top-left has the smallest `x + y`, bottom-right the largest. With
    /// `d = y - x`, top-right has the smallest `d` and bottom-left the largest.
    pub fn from_corners(points: [Corner; 4]) -> Quad {
        let sum = |p: &Corner| p.0 + p.1;
        let diff = |p: &Corner| p.1 - p.0;
        Quad {
            top_left: pick(&points, sum, |a, b| a < b),
            bottom_right: pick(&points, sum, |a, b| a > b),
            top_right: pick(&points, diff, |a, b| a < b),
            bottom_left: pick(&points, diff, |a, b| a > b),
        }
    }

    pub fn corners(&self) -> [Corner; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Quad {
        let shift = |p: Corner| (p.0 + dx, p.1 + dy);
        Quad {
            top_left: shift(self.top_left),
            top_right: shift(self.top_right),
            bottom_right: shift(self.bottom_right),
            bottom_left: shift(self.bottom_left),
        }
    }

    /// Output size of the rectified quad: the longer of each pair of opposite
    /// edges, floored.
    pub fn rectified_size(&self) -> (u32, u32) {
        let width_bottom = distance(self.bottom_right, self.bottom_left);
        let width_top = distance(self.top_right, self.top_left);
        let height_right = distance(self.top_right, self.bottom_right);
        let height_left = distance(self.top_left, self.bottom_left);
        (
            (width_bottom.floor() as u32).max(width_top.floor() as u32),
            (height_right.floor() as u32).max(height_left.floor() as u32),
        )
    }

    fn bounds(&self) -> PixelRect {
        let xs = self.corners().map(|c| c.0);
        let ys = self.corners().map(|c| c.1);
        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min).max(0.0);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max).max(0.0);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min).max(0.0);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max).max(0.0);
        PixelRect {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x) as u32 + 1,
            height: (max_y - min_y) as u32 + 1,
        }
    }
}

// First point wins ties.
fn pick(points: &[Corner; 4], key: impl Fn(&Corner) -> f32, better: impl Fn(f32, f32) -> bool) -> Corner {
    let mut best = points[0];
    for p in &points[1..] {
        if better(key(p), key(&best)) {
            best = *p;
        }
    }
    best
}

fn distance(a: Corner, b: Corner) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Perspective-warp the quad onto an upright canvas of `quad.rectified_size()`.
///
/// Returns `None` for degenerate quads.
pub fn four_point_transform(image: &RgbImage, quad: &Quad) -> Option<RgbImage> {
    let (width, height) = quad.rectified_size();
    if width < 2 || height < 2 {
        return None;
    }
    let (right, bottom) = ((width - 1) as f32, (height - 1) as f32);
    let target = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];
    let projection = Projection::from_control_points(quad.corners(), target)?;

    let mut out = RgbImage::new(width, height);
    warp_into(image, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
    Some(out)
}

/// Grayscale edges of the region, with small stroke gaps bridged.
pub fn preprocess(region: &GrayImage, policy: RectificationPolicy) -> GrayImage {
    let (low, high) = policy.canny_thresholds();
    let blurred = imageproc::filter::gaussian_blur_f32(region, BLUR_SIGMA);
    let edges = imageproc::edges::canny(&blurred, low, high);
    imageproc::morphology::close(&edges, Norm::LInf, CLOSING_RADIUS)
}

/// Absolute polygon area (shoelace).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Douglas-Peucker simplification of a closed contour.
///
/// The contour is split at its two mutually farthest points, which are kept as
/// vertices, so both halves are open curves with distinct endpoints.
pub fn approximate_closed_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let farthest_from = |origin: usize| {
        let o = points[origin];
        let sq_dist = |p: &Point<i32>| {
            let (dx, dy) = ((p.x - o.x) as i64, (p.y - o.y) as i64);
            dx * dx + dy * dy
        };
        points
            .iter()
            .enumerate()
            .fold(origin, |best, (i, p)| if sq_dist(p) > sq_dist(&points[best]) { i } else { best })
    };
    let first = farthest_from(0);
    let second = farthest_from(first);
    if first == second {
        return vec![points[first]];
    }

    let n = points.len();
    let rotated: Vec<Point<i32>> = points[first..].iter().chain(&points[..first]).copied().collect();
    let split = (second + n - first) % n;

    let mut back = rotated[split..].to_vec();
    back.push(rotated[0]);

    let mut polygon = approximate_polygon_dp(&rotated[..=split], epsilon, false);
    polygon.pop();
    polygon.extend(approximate_polygon_dp(&back, epsilon, false));
    // closing point duplicates the first vertex
    polygon.pop();
    polygon.dedup();
    polygon
}

/// The contour picked as the drawing boundary.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub bounds: PixelRect,
    pub area: f64,
    /// Ordered corners, present under the sheet policy
    pub quad: Option<Quad>,
}

/// Largest external contour accepted by the policy, in edge-image coordinates.
pub fn find_candidate(
    edges: &GrayImage,
    policy: RectificationPolicy,
    min_area: f64,
) -> Option<Candidate> {
    let contours = find_contours::<i32>(edges);
    tracing::debug!("Found {} contours", contours.len());

    let mut best: Option<Candidate> = None;
    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        let area = polygon_area(&contour.points);
        if area <= min_area {
            continue;
        }
        let Some(candidate) = accept_contour(&contour.points, area, policy) else {
            continue;
        };
        if best.as_ref().map_or(true, |b| candidate.area > b.area) {
            best = Some(candidate);
        }
    }
    best
}

fn accept_contour(points: &[Point<i32>], area: f64, policy: RectificationPolicy) -> Option<Candidate> {
    match policy {
        RectificationPolicy::Drawing => {
            let bounds = PixelRect::bounding(points)?;
            policy.accepts_aspect(bounds.aspect_ratio()).then_some(Candidate {
                bounds,
                area,
                quad: None,
            })
        }
        RectificationPolicy::Sheet => {
            let epsilon = 0.02 * arc_length(points, true);
            let approx = approximate_closed_polygon(points, epsilon);
            if approx.len() != 4 {
                return None;
            }
            let bounds = PixelRect::bounding(&approx)?;
            if !policy.accepts_aspect(bounds.aspect_ratio()) {
                return None;
            }
            let corners = [0, 1, 2, 3].map(|i| (approx[i].x as f32, approx[i].y as f32));
            Some(Candidate {
                bounds,
                area,
                quad: Some(Quad::from_corners(corners)),
            })
        }
    }
}

/// Outcome of a detection run. `NotFound` is a normal result, not an error.
#[derive(Debug, Clone)]
pub enum Detection {
    Found {
        /// Rectified drawing, JPEG encoded
        image: Vec<u8>,
        /// Source-image area the drawing was taken from
        region: PixelRect,
    },
    NotFound,
}

impl Detection {
    pub fn is_found(&self) -> bool {
        matches!(self, Detection::Found { .. })
    }
}

/// Locates and rectifies the drawing region of a photo.
///
/// `run_id` names the extraction run so debug output can be matched to its logs.
#[async_trait]
pub trait RegionDetector: Send + Sync {
    async fn detect(&self, image: &[u8], run_id: Uuid) -> Result<Detection, ExtractionError>;
}

pub struct SheetDetector {
    gateway: Arc<ModelGateway>,
    config: DetectorConfig,
}

impl SheetDetector {
    pub fn new(gateway: Arc<ModelGateway>, config: DetectorConfig) -> Self {
        Self { gateway, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Ask the model where the sketch is in the whole photo.
    pub async fn locate(&self, image: &[u8]) -> Result<CircuitLocation, ExtractionError> {
        let location: CircuitLocation = self
            .gateway
            .communicate_structured(ModelRequest::new(LOCATION_PROMPT, image))
            .await?;
        tracing::debug!(
            "Model located circuit at ({:.2}, {:.2}) with confidence {:.2}",
            location.relative_x,
            location.relative_y,
            location.confidence
        );
        Ok(location)
    }

    /// Geometric stages for an already decoded photo and a known location.
    pub fn rectify(
        &self,
        source: &DynamicImage,
        location: &CircuitLocation,
        debug: &DebugSink,
    ) -> Result<Detection, ExtractionError> {
        let roi = region_of_interest(location, source.width(), source.height());
        if roi.is_empty() {
            tracing::info!("Region of interest is empty");
            return Ok(Detection::NotFound);
        }

        let roi_image = source.crop_imm(roi.x, roi.y, roi.width, roi.height);
        debug.save("2_roi", &roi_image);

        let edges = preprocess(&roi_image.to_luma8(), self.config.policy);
        debug.save_gray("3_preprocessed", &edges);

        let Some(candidate) = find_candidate(&edges, self.config.policy, self.config.min_contour_area)
        else {
            tracing::info!("No contour matched the {} policy", self.config.policy);
            return Ok(Detection::NotFound);
        };

        let (rectified, region) = match candidate.quad {
            Some(quad) => {
                let quad = quad.translate(roi.x as f32, roi.y as f32);
                let Some(warped) = four_point_transform(&source.to_rgb8(), &quad) else {
                    tracing::info!("Detected quadrilateral is degenerate");
                    return Ok(Detection::NotFound);
                };
                debug.save_outline("4_contour", source, &quad.corners());
                (DynamicImage::ImageRgb8(warped), quad.bounds())
            }
            None => {
                let region = candidate.bounds.offset(roi.x, roi.y).expand(
                    self.config.margin,
                    source.width(),
                    source.height(),
                );
                debug.save_box("4_contour", source, &candidate.bounds.offset(roi.x, roi.y));
                (source.crop_imm(region.x, region.y, region.width, region.height), region)
            }
        };
        debug.save("5_rectified", &rectified);

        tracing::info!(
            "Drawing rectified to {}x{} from region at ({}, {})",
            rectified.width(),
            rectified.height(),
            region.x,
            region.y
        );

        Ok(Detection::Found {
            image: encode_jpeg(&rectified)?,
            region,
        })
    }
}

#[async_trait]
impl RegionDetector for SheetDetector {
    async fn detect(&self, image: &[u8], run_id: Uuid) -> Result<Detection, ExtractionError> {
        let source = image::load_from_memory(image)?;
        let debug = DebugSink::for_run(self.config.debug_dir.as_ref(), run_id);
        if let Some(dir) = debug.dir() {
            tracing::info!("Writing debug images to {}", dir.display());
        }
        debug.save("1_original", &source);

        let location = self.locate(image).await?;
        self.rectify(&source, &location, &debug)
    }
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8()).write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}

/// Writes intermediate images for troubleshooting. Disabled unless a debug
/// directory is configured; failures are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct DebugSink {
    dir: Option<PathBuf>,
}

impl DebugSink {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Sink writing under `base/<run_id>`.
    pub fn for_run(base: Option<&PathBuf>, run_id: Uuid) -> Self {
        Self {
            dir: base.map(|b| b.join(run_id.to_string())),
        }
    }

    pub fn dir(&self) -> Option<&PathBuf> {
        self.dir.as_ref()
    }

    pub fn save(&self, name: &str, image: &DynamicImage) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = dir.join(format!("{}.png", name));
        let result = std::fs::create_dir_all(dir)
            .map_err(image::ImageError::IoError)
            .and_then(|_| image.save_with_format(&path, ImageFormat::Png));
        if let Err(e) = result {
            tracing::warn!("Failed to write debug image {}: {}", path.display(), e);
        }
    }

    fn save_gray(&self, name: &str, image: &GrayImage) {
        if self.dir.is_some() {
            self.save(name, &DynamicImage::ImageLuma8(image.clone()));
        }
    }

    fn save_box(&self, name: &str, source: &DynamicImage, bounds: &PixelRect) {
        if self.dir.is_none() || bounds.is_empty() {
            return;
        }
        let mut canvas = source.to_rgb8();
        let rect = Rect::at(bounds.x as i32, bounds.y as i32).of_size(bounds.width, bounds.height);
        draw_hollow_rect_mut(&mut canvas, rect, Rgb([0, 255, 0]));
        self.save(name, &DynamicImage::ImageRgb8(canvas));
    }

    fn save_outline(&self, name: &str, source: &DynamicImage, corners: &[Corner; 4]) {
        if self.dir.is_none() {
            return;
        }
        let mut canvas = source.to_rgb8();
        for i in 0..4 {
            draw_line_segment_mut(&mut canvas, corners[i], corners[(i + 1) % 4], Rgb([255, 0, 0]));
        }
        self.save(name, &DynamicImage::ImageRgb8(canvas));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;

    fn location(x: f64, y: f64, confidence: f64) -> CircuitLocation {
        CircuitLocation {
            relative_x: x,
            relative_y: y,
            confidence,
        }
    }

    #[test]
    fn test_roi_centered() {
        let roi = region_of_interest(&location(0.5, 0.5, 0.5), 400, 300);
        // side = 300 * 0.75 = 225, half = 112
        assert_eq!(roi, PixelRect { x: 88, y: 38, width: 224, height: 224 });
    }

    #[test]
    fn test_roi_clamped_at_corner() {
        let roi = region_of_interest(&location(0.0, 0.0, 0.0), 400, 300);
        assert_eq!(roi, PixelRect { x: 0, y: 0, width: 150, height: 150 });

        let roi = region_of_interest(&location(1.0, 1.0, 1.0), 400, 300);
        assert_eq!(roi, PixelRect { x: 325, y: 225, width: 75, height: 75 });
    }

    #[test]
    fn test_roi_shrinks_with_confidence() {
        let loose = region_of_interest(&location(0.5, 0.5, 0.0), 1000, 1000);
        let tight = region_of_interest(&location(0.5, 0.5, 1.0), 1000, 1000);
        assert!(tight.width < loose.width);
        assert_eq!(loose.width, 1000);
        assert_eq!(tight.width, 500);
    }

    #[test]
    fn test_corner_ordering_any_permutation() {
        let tl = (10.0, 12.0);
        let tr = (110.0, 8.0);
        let br = (115.0, 160.0);
        let bl = (5.0, 150.0);
        let expected = Quad {
            top_left: tl,
            top_right: tr,
            bottom_right: br,
            bottom_left: bl,
        };
        let corners = [tl, tr, br, bl];
        let mut checked = 0;
        for a in 0..4 {
            for b in (0..4).filter(|&b| b != a) {
                for c in (0..4).filter(|&c| c != a && c != b) {
                    let d = 6 - a - b - c;
                    let input = [corners[a], corners[b], corners[c], corners[d]];
                    assert_eq!(Quad::from_corners(input), expected, "order {:?}", [a, b, c, d]);
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 24);
    }

    #[test]
    fn test_rectified_size_uses_longer_edges() {
        let quad = Quad::from_corners([(0.0, 0.0), (100.0, 0.0), (103.0, 50.5), (0.0, 50.0)]);
        let (w, h) = quad.rectified_size();
        // bottom edge length = 103.0, right edge = sqrt(9 + 2550.25) ≈ 50.59
        assert_eq!(w, 103);
        assert_eq!(h, 50);
    }

    #[test]
    fn test_four_point_transform_size() {
        let image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        let quad = Quad::from_corners([(20.0, 30.0), (180.0, 30.0), (180.0, 130.0), (20.0, 130.0)]);
        let warped = four_point_transform(&image, &quad).unwrap();
        assert_eq!(warped.dimensions(), (160, 100));
        assert_eq!(warped.get_pixel(80, 50), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_four_point_transform_degenerate() {
        let image = RgbImage::new(10, 10);
        let quad = Quad::from_corners([(1.0, 1.0), (1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        assert!(four_point_transform(&image, &quad).is_none());
    }

    #[test]
    fn test_polygon_area_square() {
        let square = [Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)];
        assert_eq!(polygon_area(&square), 100.0);
    }

    #[test]
    fn test_approximate_closed_polygon_rectangle() {
        let mut points = Vec::new();
        for x in 0..=40 {
            points.push(Point::new(x, 0));
        }
        for y in 1..=30 {
            points.push(Point::new(40, y));
        }
        for x in (0..40).rev() {
            points.push(Point::new(x, 30));
        }
        for y in (1..30).rev() {
            points.push(Point::new(0, y));
        }
        let approx = approximate_closed_polygon(&points, 2.0);
        assert_eq!(approx.len(), 4);
        assert!(approx.contains(&Point::new(0, 0)));
        assert!(approx.contains(&Point::new(40, 30)));
    }

    #[test]
    fn test_expand_clamps_to_image() {
        let rect = PixelRect { x: 20, y: 10, width: 100, height: 50 };
        let grown = rect.expand(50, 150, 300);
        assert_eq!(grown, PixelRect { x: 0, y: 0, width: 150, height: 110 });
    }

    #[test]
    fn test_find_candidate_picks_drawing_outline() {
        let mut canvas = GrayImage::from_pixel(300, 240, Luma([255]));
        let black = Luma([0]);
        // 200x150 stroke outline of a circuit loop plus a speck
        for t in 0..3 {
            draw_hollow_rect_mut(&mut canvas, Rect::at(50 + t, 40 + t).of_size(200 - 2 * t as u32, 150 - 2 * t as u32), black);
        }
        draw_filled_rect_mut(&mut canvas, Rect::at(10, 10).of_size(4, 4), black);

        let edges = preprocess(&canvas, RectificationPolicy::Drawing);
        let candidate = find_candidate(&edges, RectificationPolicy::Drawing, MIN_CONTOUR_AREA).unwrap();
        assert!(candidate.quad.is_none());
        assert!((190..=215).contains(&candidate.bounds.width), "{:?}", candidate.bounds);
        assert!((140..=165).contains(&candidate.bounds.height), "{:?}", candidate.bounds);
    }

    #[test]
    fn test_find_candidate_blank_page() {
        let canvas = GrayImage::from_pixel(120, 120, Luma([255]));
        let edges = preprocess(&canvas, RectificationPolicy::Drawing);
        assert!(find_candidate(&edges, RectificationPolicy::Drawing, MIN_CONTOUR_AREA).is_none());
    }

    #[test]
    fn test_find_candidate_rejects_long_strip() {
        let mut canvas = GrayImage::from_pixel(400, 120, Luma([255]));
        draw_filled_rect_mut(&mut canvas, Rect::at(20, 50).of_size(360, 20), Luma([0]));
        let edges = preprocess(&canvas, RectificationPolicy::Drawing);
        assert!(find_candidate(&edges, RectificationPolicy::Drawing, MIN_CONTOUR_AREA).is_none());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("A4".parse::<RectificationPolicy>().unwrap(), RectificationPolicy::Sheet);
        assert_eq!("drawing".parse::<RectificationPolicy>().unwrap(), RectificationPolicy::Drawing);
        assert!("blob".parse::<RectificationPolicy>().is_err());
    }
}
