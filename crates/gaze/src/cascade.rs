//! Boosted Haar cascade classifier
//!
//! Evaluates OpenCV-format Haar cascades (`haarcascade_*.xml`) with the
//! Viola-Jones sliding-window scheme:
//! - integral and squared-integral images for O(1) rectangle sums
//! - variance-normalised decision stumps grouped into boosted stages
//! - multi-scale scanning by growing the detection window
//! - neighbour grouping of overlapping hits

use std::path::Path;

use image::GrayImage;
use imageproc::integral_image::{integral_image, integral_squared_image};
use tracing::{debug, info};

use crate::detector::{DetectionParams, ObjectDetector, Rect};
use crate::GazeError;

/// Relative tolerance used when grouping overlapping detections
const GROUP_EPS: f64 = 0.2;

/// A weighted rectangle inside the detection window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f64,
}

/// A Haar-like feature: two or three weighted rectangles
#[derive(Debug, Clone, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

/// Single-split weak classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
}

/// Boosted stage: passes when the stump votes reach the stage threshold
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub threshold: f64,
    pub stumps: Vec<Stump>,
}

/// Haar cascade classifier
#[derive(Debug, Clone)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

/// Feature rectangles resolved for one scale
struct ScaledFeature {
    rects: Vec<(Rect, f64)>,
}

/// Integral images of the frame being scanned
struct Integrals {
    stride: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl Integrals {
    fn new(gray: &GrayImage) -> Self {
        let sum = integral_image::<_, u64>(gray);
        let sq_sum = integral_squared_image::<_, u64>(gray);
        Self {
            stride: gray.width() as usize + 1,
            sum: sum.into_raw(),
            sq_sum: sq_sum.into_raw(),
        }
    }

    fn rect_total(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let a = table[y0 * stride + x0];
        let b = table[y0 * stride + x1];
        let c = table[y1 * stride + x0];
        let d = table[y1 * stride + x1];
        (d + a) as f64 - (b + c) as f64
    }

    fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::rect_total(&self.sum, self.stride, x, y, w, h)
    }

    fn sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::rect_total(&self.sq_sum, self.stride, x, y, w, h)
    }
}

impl HaarCascade {
    /// Build a cascade from already-parsed parts
    pub fn new(
        window_width: u32,
        window_height: u32,
        stages: Vec<Stage>,
        features: Vec<HaarFeature>,
    ) -> Result<Self, GazeError> {
        if window_width < 3 || window_height < 3 {
            return Err(GazeError::CascadeFormat(format!(
                "window {}x{} is too small",
                window_width, window_height
            )));
        }
        if stages.is_empty() {
            return Err(GazeError::CascadeFormat("cascade has no stages".into()));
        }
        for stump in stages.iter().flat_map(|s| s.stumps.iter()) {
            if stump.feature >= features.len() {
                return Err(GazeError::CascadeFormat(format!(
                    "stump references feature {} of {}",
                    stump.feature,
                    features.len()
                )));
            }
        }
        for rect in features.iter().flat_map(|f| f.rects.iter()) {
            if rect.x + rect.width > window_width || rect.y + rect.height > window_height {
                return Err(GazeError::CascadeFormat(format!(
                    "feature rect {:?} exceeds window {}x{}",
                    rect, window_width, window_height
                )));
            }
        }

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    /// Load an OpenCV cascade XML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GazeError> {
        let path = path.as_ref();
        info!("Loading Haar cascade from {}", path.display());
        let xml = std::fs::read_to_string(path)
            .map_err(|e| GazeError::ModelLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_xml(&xml)
    }

    /// Parse the OpenCV cascade XML format (BOOST stages, HAAR features)
    pub fn from_xml(xml: &str) -> Result<Self, GazeError> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| GazeError::CascadeFormat(e.to_string()))?;
        let cascade = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or_else(|| GazeError::CascadeFormat("missing <cascade> element".into()))?;

        let stage_type = child_text(cascade, "stageType")?;
        if stage_type != "BOOST" {
            return Err(GazeError::CascadeFormat(format!("unsupported stage type {}", stage_type)));
        }
        let feature_type = child_text(cascade, "featureType")?;
        if feature_type != "HAAR" {
            return Err(GazeError::CascadeFormat(format!(
                "unsupported feature type {}",
                feature_type
            )));
        }

        let window_width: u32 = parse_value(child_text(cascade, "width")?)?;
        let window_height: u32 = parse_value(child_text(cascade, "height")?)?;

        let mut stages = Vec::new();
        for stage_node in items(child(cascade, "stages")?) {
            let threshold: f64 = parse_value(child_text(stage_node, "stageThreshold")?)?;
            let mut stumps = Vec::new();
            for weak in items(child(stage_node, "weakClassifiers")?) {
                let nodes = parse_list::<f64>(child_text(weak, "internalNodes")?)?;
                let leaves = parse_list::<f64>(child_text(weak, "leafValues")?)?;
                if nodes.len() != 4 || leaves.len() != 2 {
                    return Err(GazeError::CascadeFormat(
                        "only depth-1 stump classifiers are supported".into(),
                    ));
                }
                stumps.push(Stump {
                    feature: nodes[2] as usize,
                    threshold: nodes[3],
                    left: leaves[0],
                    right: leaves[1],
                });
            }
            stages.push(Stage { threshold, stumps });
        }

        let mut features = Vec::new();
        for feature_node in items(child(cascade, "features")?) {
            if let Some(tilted) = feature_node.children().find(|n| n.has_tag_name("tilted")) {
                if tilted.text().map(str::trim) == Some("1") {
                    return Err(GazeError::CascadeFormat("tilted features are not supported".into()));
                }
            }
            let mut rects = Vec::new();
            for rect_node in items(child(feature_node, "rects")?) {
                let values = parse_list::<f64>(rect_node.text().unwrap_or_default())?;
                if values.len() != 5 {
                    return Err(GazeError::CascadeFormat(format!(
                        "feature rect needs 5 values, got {}",
                        values.len()
                    )));
                }
                rects.push(WeightedRect {
                    x: values[0] as u32,
                    y: values[1] as u32,
                    width: values[2] as u32,
                    height: values[3] as u32,
                    weight: values[4],
                });
            }
            features.push(HaarFeature { rects });
        }

        debug!(
            "Parsed cascade {}x{} with {} stages, {} features",
            window_width,
            window_height,
            stages.len(),
            features.len()
        );
        Self::new(window_width, window_height, stages, features)
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Resolve feature rectangles for a window of `win_w` x `win_h` at `scale`.
    ///
    /// Rounding changes rectangle areas, so the first rectangle's weight is
    /// recomputed to keep each feature zero-sum.
    fn scale_features(&self, scale: f64, win_w: u32, win_h: u32) -> Vec<ScaledFeature> {
        self.features
            .iter()
            .map(|feature| {
                let mut rects: Vec<(Rect, f64)> = feature
                    .rects
                    .iter()
                    .map(|r| {
                        let (x, width) = scale_span(r.x, r.width, scale, win_w);
                        let (y, height) = scale_span(r.y, r.height, scale, win_h);
                        (Rect::new(x, y, width, height), r.weight)
                    })
                    .collect();

                if let Some((first, rest)) = rects.split_first_mut() {
                    let area0 = first.0.area() as f64;
                    let rest_sum: f64 = rest.iter().map(|(r, w)| w * r.area() as f64).sum();
                    first.1 = if area0 > 0.0 { -rest_sum / area0 } else { 0.0 };
                }
                ScaledFeature { rects }
            })
            .collect()
    }

    /// Run every stage on the window at (x, y). `inner` is the scaled
    /// normalisation rectangle relative to the window origin.
    fn passes(
        &self,
        integrals: &Integrals,
        features: &[ScaledFeature],
        inner: Rect,
        x: u32,
        y: u32,
    ) -> bool {
        let nx = x + inner.x;
        let ny = y + inner.y;
        let area = inner.area() as f64;
        let sum = integrals.sum(nx, ny, inner.width, inner.height);
        let sq_sum = integrals.sq_sum(nx, ny, inner.width, inner.height);
        let nf = area * sq_sum - sum * sum;
        let norm = if nf > 0.0 { nf.sqrt() } else { 1.0 };

        for stage in &self.stages {
            let mut stage_sum = 0.0;
            for stump in &stage.stumps {
                let value: f64 = features[stump.feature]
                    .rects
                    .iter()
                    .map(|(r, w)| w * integrals.sum(x + r.x, y + r.y, r.width, r.height))
                    .sum();
                stage_sum += if value < stump.threshold * norm {
                    stump.left
                } else {
                    stump.right
                };
            }
            if stage_sum < stage.threshold {
                return false;
            }
        }
        true
    }

    /// Every window accepted by the cascade, before grouping
    pub fn raw_detections(&self, gray: &GrayImage, params: &DetectionParams) -> Vec<Rect> {
        let (img_w, img_h) = gray.dimensions();
        let mut hits = Vec::new();
        if img_w < self.window_width || img_h < self.window_height || params.scale_factor <= 1.0 {
            return hits;
        }

        let integrals = Integrals::new(gray);
        let mut scale = 1.0f64;
        loop {
            let win_w = (self.window_width as f64 * scale).round() as u32;
            let win_h = (self.window_height as f64 * scale).round() as u32;
            if win_w > img_w || win_h > img_h {
                break;
            }

            if win_w >= params.min_size.0 && win_h >= params.min_size.1 {
                let features = self.scale_features(scale, win_w, win_h);
                let (inner_x, inner_w) = scale_span(1, self.window_width - 2, scale, win_w);
                let (inner_y, inner_h) = scale_span(1, self.window_height - 2, scale, win_h);
                let inner = Rect::new(inner_x, inner_y, inner_w, inner_h);
                let step_f = if scale > 2.0 { scale } else { 2.0 * scale };
                let step = (step_f.round() as u32).max(1);

                let mut y = 0;
                while y + win_h <= img_h {
                    let mut x = 0;
                    while x + win_w <= img_w {
                        if self.passes(&integrals, &features, inner, x, y) {
                            hits.push(Rect::new(x, y, win_w, win_h));
                        }
                        x += step;
                    }
                    y += step;
                }
            }

            scale *= params.scale_factor;
        }
        hits
    }
}

impl ObjectDetector for HaarCascade {
    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<Rect>, GazeError> {
        let hits = self.raw_detections(gray, params);
        Ok(group_rectangles(&hits, params.min_neighbors, GROUP_EPS))
    }
}

/// Scale the span `[start, start + len)` and keep it inside `[0, limit]`.
///
/// Both ends are rounded, so adjacent spans stay adjacent after scaling.
fn scale_span(start: u32, len: u32, scale: f64, limit: u32) -> (u32, u32) {
    let begin = ((start as f64 * scale).round() as u32).min(limit);
    let end = (((start + len) as f64 * scale).round() as u32).clamp(begin, limit);
    (begin, end - begin)
}

/// Cluster overlapping detections and keep clusters with more than
/// `min_neighbors` members, averaged into one rectangle each. Small
/// clusters nested inside stronger ones are discarded.
pub fn group_rectangles(rects: &[Rect], min_neighbors: u32, eps: f64) -> Vec<Rect> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let labels = partition(rects, |a, b| similar(a, b, eps));
    let classes = labels.iter().copied().max().map_or(0, |m| m + 1);

    let mut totals = vec![[0u64; 4]; classes];
    let mut counts = vec![0u32; classes];
    for (rect, &label) in rects.iter().zip(&labels) {
        let t = &mut totals[label];
        t[0] += rect.x as u64;
        t[1] += rect.y as u64;
        t[2] += rect.width as u64;
        t[3] += rect.height as u64;
        counts[label] += 1;
    }

    let averaged: Vec<Rect> = totals
        .iter()
        .zip(&counts)
        .map(|(t, &n)| {
            let s = 1.0 / n as f64;
            Rect::new(
                (t[0] as f64 * s).round() as u32,
                (t[1] as f64 * s).round() as u32,
                (t[2] as f64 * s).round() as u32,
                (t[3] as f64 * s).round() as u32,
            )
        })
        .collect();

    let mut grouped = Vec::new();
    for i in 0..classes {
        let n1 = counts[i];
        if n1 <= min_neighbors {
            continue;
        }
        let r1 = averaged[i];
        let nested = (0..classes).any(|j| {
            let n2 = counts[j];
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let r2 = averaged[j];
            let dx = (r2.width as f64 * eps).round() as i64;
            let dy = (r2.height as f64 * eps).round() as i64;
            let inside = r1.x as i64 >= r2.x as i64 - dx
                && r1.y as i64 >= r2.y as i64 - dy
                && r1.right() as i64 <= r2.right() as i64 + dx
                && r1.bottom() as i64 <= r2.bottom() as i64 + dy;
            inside && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            grouped.push(r1);
        }
    }
    grouped
}

fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;
    close(a.x, b.x) && close(a.y, b.y) && close(a.right(), b.right()) && close(a.bottom(), b.bottom())
}

/// Equivalence-class labelling (union-find); labels are dense from 0
fn partition<F>(rects: &[Rect], same: F) -> Vec<usize>
where
    F: Fn(&Rect, &Rect) -> bool,
{
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut parent: Vec<usize> = (0..rects.len()).collect();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if same(&rects[i], &rects[j]) {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut dense = vec![usize::MAX; rects.len()];
    let mut next = 0;
    (0..rects.len())
        .map(|i| {
            let r = root(&mut parent, i);
            if dense[r] == usize::MAX {
                dense[r] = next;
                next += 1;
            }
            dense[r]
        })
        .collect()
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Result<roxmltree::Node<'a, 'input>, GazeError> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| GazeError::CascadeFormat(format!("missing <{}> element", name)))
}

fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Result<&'a str, GazeError> {
    Ok(child(node, name)?.text().unwrap_or_default().trim())
}

/// Element children of a sequence node (`<_>` items in OpenCV storage)
fn items<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn parse_value<T: std::str::FromStr>(text: &str) -> Result<T, GazeError> {
    text.trim()
        .parse()
        .map_err(|_| GazeError::CascadeFormat(format!("invalid number '{}'", text.trim())))
}

fn parse_list<T: std::str::FromStr>(text: &str) -> Result<Vec<T>, GazeError> {
    text.split_whitespace().map(parse_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use proptest::prelude::*;

    /// One stage, one stump: fires when the lower half is brighter
    const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>10</height>
  <width>10</width>
  <stageParams><maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams><maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 1.0000000149011612e-01</internalNodes>
          <leafValues>-1. 1.</leafValues>
        </_>
      </weakClassifiers>
    </_>
  </stages>
  <features>
    <_>
      <rects>
        <_>0 0 10 10 -1.</_>
        <_>0 5 10 5 2.</_>
      </rects>
    </_>
  </features>
</cascade>
</opencv_storage>
"#;

    fn split_image(width: u32, height: u32, split: u32, top: u8, bottom: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |_, y| if y < split { Luma([top]) } else { Luma([bottom]) })
    }

    fn exact_params() -> DetectionParams {
        DetectionParams {
            scale_factor: 1.1,
            min_neighbors: 0,
            min_size: (10, 10),
        }
    }

    #[test]
    fn test_parse_cascade_xml() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        assert_eq!(cascade.window_size(), (10, 10));
        assert_eq!(cascade.stage_count(), 1);
        assert_eq!(cascade.features[0].rects.len(), 2);
        assert_eq!(cascade.features[0].rects[0].weight, -1.0);
        let stump = cascade.stages[0].stumps[0];
        assert!((stump.threshold - 0.1).abs() < 1e-6);
        assert_eq!((stump.left, stump.right), (-1.0, 1.0));
    }

    #[test]
    fn test_rejects_tilted_features() {
        let xml = EDGE_CASCADE.replace("<rects>", "<tilted>1</tilted><rects>");
        assert!(matches!(HaarCascade::from_xml(&xml), Err(GazeError::CascadeFormat(_))));
    }

    #[test]
    fn test_rejects_wrong_feature_type() {
        let xml = EDGE_CASCADE.replace("<featureType>HAAR", "<featureType>LBP");
        assert!(HaarCascade::from_xml(&xml).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_feature_index() {
        let xml = EDGE_CASCADE.replace("0 -1 0 1.0000000149011612e-01", "0 -1 3 0.1");
        assert!(HaarCascade::from_xml(&xml).is_err());
    }

    #[test]
    fn test_rejects_malformed_xml() {
        assert!(HaarCascade::from_xml("<cascade><stageType>").is_err());
    }

    #[test]
    fn test_detects_matching_pattern() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = split_image(10, 10, 5, 0, 200);
        let hits = cascade.detect_multi_scale(&image, &exact_params()).unwrap();
        assert_eq!(hits, vec![Rect::new(0, 0, 10, 10)]);
    }

    #[test]
    fn test_rejects_inverted_pattern() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = split_image(10, 10, 5, 200, 0);
        assert!(cascade.detect_multi_scale(&image, &exact_params()).unwrap().is_empty());
    }

    #[test]
    fn test_image_smaller_than_window() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = split_image(8, 8, 4, 0, 200);
        assert!(cascade.raw_detections(&image, &exact_params()).is_empty());
    }

    #[test]
    fn test_min_size_skips_small_windows() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = split_image(10, 10, 5, 0, 200);
        let params = DetectionParams {
            min_size: (11, 11),
            ..exact_params()
        };
        assert!(cascade.raw_detections(&image, &params).is_empty());
    }

    #[test]
    fn test_scaled_window_at_frame_edge() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = split_image(11, 11, 5, 0, 200);
        let hits = cascade.raw_detections(&image, &exact_params());
        assert!(hits.contains(&Rect::new(0, 0, 10, 10)));
        assert!(hits.contains(&Rect::new(0, 0, 11, 11)));
    }

    #[test]
    fn test_scaled_features_stay_inside_window() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        for scale in [1.0f64, 1.1, 1.21, 1.5, 2.3, 3.7] {
            let win_w = (10.0 * scale).round() as u32;
            let win_h = win_w;
            for feature in cascade.scale_features(scale, win_w, win_h) {
                for (rect, _) in feature.rects {
                    assert!(rect.right() <= win_w, "scale {}: {:?}", scale, rect);
                    assert!(rect.bottom() <= win_h, "scale {}: {:?}", scale, rect);
                }
            }
        }
    }

    #[test]
    fn test_multi_scale_scan_of_larger_frame() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = split_image(64, 48, 24, 0, 200);
        let hits = cascade.raw_detections(&image, &exact_params());

        assert!(!hits.is_empty());
        assert!(hits.iter().all(|r| r.right() <= 64 && r.bottom() <= 48));
        let mut sizes: Vec<u32> = hits.iter().map(|r| r.width).collect();
        sizes.sort_unstable();
        sizes.dedup();
        assert!(sizes.len() > 1, "only scanned sizes {:?}", sizes);

        // Uniform regions never fire, so every hit straddles the edge
        assert!(hits.iter().all(|r| r.y < 24 && r.bottom() > 24));
    }

    #[test]
    fn test_scan_uniform_frame_finds_nothing() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let image = GrayImage::from_pixel(64, 48, Luma([120]));
        assert!(cascade.raw_detections(&image, &exact_params()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_scan_never_leaves_the_frame(
            width in 1u32..80,
            height in 1u32..80,
            split in 0u32..80,
            scale_factor in 1.05f64..2.0,
            min_neighbors in 0u32..4,
        ) {
            let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
            let image = split_image(width, height, split, 10, 220);
            let params = DetectionParams {
                scale_factor,
                min_neighbors,
                min_size: (10, 10),
            };
            let raw = cascade.raw_detections(&image, &params);
            prop_assert!(raw.iter().all(|r| r.right() <= width && r.bottom() <= height));
            let grouped = cascade.detect_multi_scale(&image, &params).unwrap();
            prop_assert!(grouped.len() <= raw.len());
        }
    }

    #[test]
    fn test_group_rectangles_merges_neighbours() {
        let rects = vec![
            Rect::new(100, 100, 50, 50),
            Rect::new(102, 101, 50, 50),
            Rect::new(98, 99, 52, 52),
            Rect::new(101, 100, 49, 49),
            Rect::new(300, 300, 40, 40),
        ];
        let grouped = group_rectangles(&rects, 3, GROUP_EPS);
        assert_eq!(grouped.len(), 1);
        let r = grouped[0];
        assert!((r.x as i64 - 100).abs() <= 1);
        assert!((r.width as i64 - 50).abs() <= 1);
    }

    #[test]
    fn test_group_rectangles_drops_weak_clusters() {
        let rects = vec![Rect::new(0, 0, 30, 30), Rect::new(1, 1, 30, 30)];
        assert!(group_rectangles(&rects, 5, GROUP_EPS).is_empty());
        assert_eq!(group_rectangles(&rects, 0, GROUP_EPS).len(), 2);
    }

    #[test]
    fn test_partition_labels_are_dense() {
        let rects = vec![
            Rect::new(0, 0, 10, 10),
            Rect::new(200, 200, 10, 10),
            Rect::new(1, 0, 10, 10),
        ];
        let labels = partition(&rects, |a, b| similar(a, b, GROUP_EPS));
        assert_eq!(labels, vec![0, 1, 0]);
    }
}
