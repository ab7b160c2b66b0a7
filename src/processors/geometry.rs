//! Geometric primitives used by cropping and deskewing.
//!
//! Points, polygons with shoelace area, Graham-scan convex hulls and the
//! rotating-calipers minimum-area rectangle whose angle drives deskewing.

use imageproc::contours::Contour;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle, inclusive of `x`/`y`, exclusive of
/// `x + width`/`y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A polygon represented by its vertices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Polygon {
    /// The vertices in traversal order.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Creates a new polygon from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a polygon from a traced contour.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|p| Point::new(p.x as f32, p.y as f32))
            .collect();
        Self { points }
    }

    /// Calculates the enclosed area using the shoelace formula.
    ///
    /// # Returns
    ///
    /// The area of the polygon. Returns 0.0 if the polygon has fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// The smallest pixel rectangle covering every vertex.
    ///
    /// Returns `None` for an empty polygon.
    pub fn pixel_bounds(&self) -> Option<PixelRect> {
        let (min_x, max_x) = self.points.iter().map(|p| p.x).minmax().into_option()?;
        let (min_y, max_y) = self.points.iter().map(|p| p.y).minmax().into_option()?;
        let x = min_x.max(0.0) as u32;
        let y = min_y.max(0.0) as u32;
        Some(PixelRect {
            x,
            y,
            width: (max_x.max(0.0) as u32) - x + 1,
            height: (max_y.max(0.0) as u32) - y + 1,
        })
    }

    /// Computes the convex hull using Graham's scan.
    ///
    /// Polygons with fewer than 3 points are returned unchanged.
    pub fn convex_hull(&self) -> Polygon {
        if self.points.len() < 3 {
            return self.clone();
        }

        let mut points = self.points.clone();

        // Lowest y, leftmost on ties
        let mut start_idx = 0;
        for i in 1..points.len() {
            if points[i].y < points[start_idx].y
                || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
            {
                start_idx = i;
            }
        }
        points.swap(0, start_idx);
        let start_point = points[0];

        points[1..].sort_by(|a, b| {
            let cross = Self::cross_product(&start_point, a, b);
            if cross == 0.0 {
                let dist_a = (a.x - start_point.x).powi(2) + (a.y - start_point.y).powi(2);
                let dist_b = (b.x - start_point.x).powi(2) + (b.y - start_point.y).powi(2);
                dist_a
                    .partial_cmp(&dist_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            } else if cross > 0.0 {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        let mut hull: Vec<Point> = Vec::new();
        for point in points {
            while hull.len() > 1
                && Self::cross_product(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
            {
                hull.pop();
            }
            hull.push(point);
        }

        Polygon::new(hull)
    }

    /// Positive for a counter-clockwise turn p1 → p2 → p3, zero when collinear.
    fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
        (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
    }

    /// Computes the minimum-area enclosing rectangle.
    ///
    /// Runs rotating calipers over the convex hull. The returned angle is the
    /// direction of the hull edge the rectangle is aligned with, in degrees
    /// within `(-180, 180]`, measured in image coordinates (y pointing down).
    /// Degenerate inputs (fewer than 3 points, or all points collinear)
    /// produce the axis-aligned bounds with angle 0.
    pub fn min_area_rect(&self) -> MinAreaRect {
        let empty = MinAreaRect {
            center: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };

        if self.points.len() < 3 {
            return self.axis_aligned_rect().unwrap_or(empty);
        }

        let hull = self.convex_hull();
        let hull_points = &hull.points;

        if hull_points.len() < 3 {
            return self.axis_aligned_rect().unwrap_or(empty);
        }

        let mut min_area = f32::MAX;
        let mut min_rect = empty;

        let n = hull_points.len();
        for i in 0..n {
            let j = (i + 1) % n;

            let edge_x = hull_points[j].x - hull_points[i].x;
            let edge_y = hull_points[j].y - hull_points[i].y;
            let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();

            if edge_length < f32::EPSILON {
                continue;
            }

            let nx = edge_x / edge_length;
            let ny = edge_y / edge_length;
            let px = -ny;
            let py = nx;

            let mut min_n = f32::MAX;
            let mut max_n = f32::MIN;
            let mut min_p = f32::MAX;
            let mut max_p = f32::MIN;

            for point in hull_points {
                let dx = point.x - hull_points[i].x;
                let dy = point.y - hull_points[i].y;

                let proj_n = nx * dx + ny * dy;
                min_n = min_n.min(proj_n);
                max_n = max_n.max(proj_n);

                let proj_p = px * dx + py * dy;
                min_p = min_p.min(proj_p);
                max_p = max_p.max(proj_p);
            }

            let width = max_n - min_n;
            let height = max_p - min_p;
            let area = width * height;

            if area < min_area {
                min_area = area;

                let center_n = (min_n + max_n) / 2.0;
                let center_p = (min_p + max_p) / 2.0;

                min_rect = MinAreaRect {
                    center: Point::new(
                        hull_points[i].x + center_n * nx + center_p * px,
                        hull_points[i].y + center_n * ny + center_p * py,
                    ),
                    width,
                    height,
                    angle: ny.atan2(nx).to_degrees(),
                };
            }
        }

        min_rect
    }

    fn axis_aligned_rect(&self) -> Option<MinAreaRect> {
        let (min_x, max_x) = self.points.iter().map(|p| p.x).minmax().into_option()?;
        let (min_y, max_y) = self.points.iter().map(|p| p.y).minmax().into_option()?;
        Some(MinAreaRect {
            center: Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            width: max_x - min_x,
            height: max_y - min_y,
            angle: 0.0,
        })
    }
}

/// A rotated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinAreaRect {
    /// Center of the rectangle.
    pub center: Point,
    /// Extent along the rectangle's own x axis.
    pub width: f32,
    /// Extent along the rectangle's own y axis.
    pub height: f32,
    /// Rotation in degrees.
    pub angle: f32,
}

/// Folds any rectangle angle into the half-open interval `(-45, 45]`.
///
/// A rectangle is symmetric under quarter turns, so adding or subtracting
/// 90 degrees describes the same box.
pub fn normalize_skew_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle % 180.0;
    while a > 45.0 {
        a -= 90.0;
    }
    while a <= -45.0 {
        a += 90.0;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotated_rect(cx: f32, cy: f32, w: f32, h: f32, deg: f32) -> Polygon {
        let (s, c) = deg.to_radians().sin_cos();
        let corners = [(-w / 2.0, -h / 2.0), (w / 2.0, -h / 2.0), (w / 2.0, h / 2.0), (-w / 2.0, h / 2.0)];
        Polygon::new(
            corners
                .iter()
                .map(|&(x, y)| Point::new(cx + x * c - y * s, cy + x * s + y * c))
                .collect(),
        )
    }

    #[test]
    fn test_shoelace_area() {
        let square = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 3.0),
            Point::new(0.0, 3.0),
        ]);
        assert!((square.area() - 12.0).abs() < 1e-6);
        assert_eq!(Polygon::new(vec![Point::new(1.0, 1.0)]).area(), 0.0);
    }

    #[test]
    fn test_pixel_bounds() {
        let poly = Polygon::new(vec![Point::new(3.0, 5.0), Point::new(9.0, 2.0), Point::new(4.0, 8.0)]);
        assert_eq!(
            poly.pixel_bounds(),
            Some(PixelRect { x: 3, y: 2, width: 7, height: 7 })
        );
        assert_eq!(Polygon::new(Vec::new()).pixel_bounds(), None);
    }

    #[test]
    fn test_min_area_rect_axis_aligned() {
        let rect = rotated_rect(50.0, 20.0, 80.0, 10.0, 0.0).min_area_rect();
        assert!((rect.width * rect.height - 800.0).abs() < 1.0);
        assert!(normalize_skew_angle(rect.angle).abs() < 1e-3);
    }

    #[test]
    fn test_min_area_rect_recovers_rotation() {
        for deg in [-30.0f32, -7.5, 5.0, 12.0, 33.0] {
            let rect = rotated_rect(100.0, 100.0, 120.0, 20.0, deg).min_area_rect();
            let got = normalize_skew_angle(rect.angle);
            assert!((got - deg).abs() < 0.05, "expected {}, got {}", deg, got);
            assert!((rect.center.x - 100.0).abs() < 0.05);
        }
    }

    #[test]
    fn test_min_area_rect_collinear_points() {
        let line = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)]);
        let rect = line.min_area_rect();
        assert_eq!(rect.angle, 0.0);
        assert_eq!(rect.width, 10.0);
    }

    #[test]
    fn test_normalize_skew_angle_range() {
        assert_eq!(normalize_skew_angle(0.0), 0.0);
        assert_eq!(normalize_skew_angle(45.0), 45.0);
        assert_eq!(normalize_skew_angle(-45.0), 45.0);
        assert_eq!(normalize_skew_angle(90.0), 0.0);
        assert_eq!(normalize_skew_angle(-90.0), 0.0);
        assert_eq!(normalize_skew_angle(180.0), 0.0);
        assert!((normalize_skew_angle(100.0) - 10.0).abs() < 1e-4);
        assert!((normalize_skew_angle(-170.0) - 10.0).abs() < 1e-4);
        assert!((normalize_skew_angle(60.0) + 30.0).abs() < 1e-4);
        for a in (-720..=720).map(|d| d as f32 * 0.5) {
            let n = normalize_skew_angle(a);
            assert!(n > -45.0 && n <= 45.0, "{} -> {}", a, n);
        }
    }
}
