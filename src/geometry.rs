//! Box geometry: representation conversions and overlap (IoU).
//!
//! Boxes arrive as `(left, top, width, height)` and are compared in corner
//! form `(x1, y1, x2, y2)`. Matrix forms hold one box per row.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Axis-aligned box given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.top, self.width, self.height]
    }

    /// Corner form of this box.
    #[inline]
    pub fn rect(&self) -> Rect {
        box_to_rect(self)
    }

    /// Center point `(cx, cy)`.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Axis-aligned box given by its min corner `(x1, y1)` and max corner `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// A rect with non-positive width or height.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Area, or 0 for a degenerate rect.
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width() * self.height()
        }
    }
}

/// `(left, top, w, h)` -> `(x1, y1, x2, y2)`.
pub fn box_to_rect(bbox: &BoundingBox) -> Rect {
    Rect {
        x1: bbox.left,
        y1: bbox.top,
        x2: bbox.left + bbox.width,
        y2: bbox.top + bbox.height,
    }
}

/// `(x1, y1, x2, y2)` -> `(left, top, w, h)`. Inverse of [`box_to_rect`].
pub fn rect_to_box(rect: &Rect) -> BoundingBox {
    BoundingBox {
        left: rect.x1,
        top: rect.y1,
        width: rect.x2 - rect.x1,
        height: rect.y2 - rect.y1,
    }
}

pub fn boxes_to_rects(boxes: &[BoundingBox]) -> Vec<Rect> {
    boxes.iter().map(box_to_rect).collect()
}

pub fn rects_to_boxes(rects: &[Rect]) -> Vec<BoundingBox> {
    rects.iter().map(rect_to_box).collect()
}

/// Row-wise [`box_to_rect`] over an `n x 4` matrix.
///
/// # Panics
/// If the matrix does not have exactly 4 columns.
pub fn box_to_rect_matrix(boxes: &DMatrix<f64>) -> DMatrix<f64> {
    assert_eq!(boxes.ncols(), 4, "boxes must have 4 columns (left, top, w, h)");
    let mut rects = boxes.clone();
    for i in 0..boxes.nrows() {
        rects[(i, 2)] = boxes[(i, 0)] + boxes[(i, 2)];
        rects[(i, 3)] = boxes[(i, 1)] + boxes[(i, 3)];
    }
    rects
}

/// Row-wise [`rect_to_box`] over an `n x 4` matrix.
///
/// # Panics
/// If the matrix does not have exactly 4 columns.
pub fn rect_to_box_matrix(rects: &DMatrix<f64>) -> DMatrix<f64> {
    assert_eq!(rects.ncols(), 4, "rects must have 4 columns (x1, y1, x2, y2)");
    let mut boxes = rects.clone();
    for i in 0..rects.nrows() {
        boxes[(i, 2)] = rects[(i, 2)] - rects[(i, 0)];
        boxes[(i, 3)] = rects[(i, 3)] - rects[(i, 1)];
    }
    boxes
}

/// `(left, top, w, h)` -> `(cx, cy, w, h)`.
pub fn box_to_centroid(bbox: &BoundingBox) -> [f64; 4] {
    let (cx, cy) = bbox.center();
    [cx, cy, bbox.width, bbox.height]
}

/// Intersection over union of two rects, in `[0, 1]`.
///
/// Degenerate rects have zero area; an empty union yields 0 rather than NaN.
pub fn overlap(a: &Rect, b: &Rect) -> f64 {
    let inter_w = a.x2.min(b.x2) - a.x1.max(b.x1);
    let inter_h = a.y2.min(b.y2) - a.y1.max(b.y1);
    let inter_area = if inter_w > 0.0 && inter_h > 0.0 {
        inter_w * inter_h
    } else {
        0.0
    };

    let union_area = a.area() + b.area() - inter_area;
    if union_area > 0.0 {
        (inter_area / union_area).min(1.0)
    } else {
        0.0
    }
}

/// Symmetric `n x n` overlap matrix of a rect list with itself.
pub fn pairwise_overlap(rects: &[Rect]) -> DMatrix<f64> {
    let n = rects.len();
    let mut result = DMatrix::zeros(n, n);

    for i in 0..n {
        result[(i, i)] = overlap(&rects[i], &rects[i]);
        for j in (i + 1)..n {
            let value = overlap(&rects[i], &rects[j]);
            result[(i, j)] = value;
            result[(j, i)] = value;
        }
    }

    result
}

/// `n x m` overlap matrix between two rect lists.
pub fn overlap_matrix(rows: &[Rect], cols: &[Rect]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |i, j| overlap(&rows[i], &cols[j]))
}

/// `n x m` Euclidean distances between the rows of two point matrices.
///
/// # Panics
/// If both sets are non-empty and their dimensionality differs.
pub fn euclidean_distance_matrix(observed: &DMatrix<f64>, predicted: &DMatrix<f64>) -> DMatrix<f64> {
    let n = observed.nrows();
    let m = predicted.nrows();

    if n == 0 || m == 0 {
        return DMatrix::zeros(n, m);
    }

    assert_eq!(
        observed.ncols(),
        predicted.ncols(),
        "Point dimensions must match"
    );

    DMatrix::from_fn(n, m, |i, j| (observed.row(i) - predicted.row(j)).norm())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_rect_round_trip() {
        let bbox = BoundingBox::new(3.0, 4.5, 10.0, 20.25);
        let rect = box_to_rect(&bbox);
        assert_eq!(rect, Rect::new(3.0, 4.5, 13.0, 24.75));
        assert_eq!(rect_to_box(&rect), bbox);

        let rect = Rect::new(-2.0, 1.0, 6.0, 9.5);
        assert_eq!(box_to_rect(&rect_to_box(&rect)), rect);
    }

    #[test]
    fn test_batch_conversion() {
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(5.0, 5.0, 2.0, 4.0),
        ];
        let rects = boxes_to_rects(&boxes);
        assert_eq!(rects[1], Rect::new(5.0, 5.0, 7.0, 9.0));
        assert_eq!(rects_to_boxes(&rects), boxes);
    }

    #[test]
    fn test_matrix_conversion() {
        let boxes = DMatrix::from_row_slice(2, 4, &[
            0.0, 0.0, 10.0, 10.0,
            5.0, 5.0, 2.0, 4.0,
        ]);
        let rects = box_to_rect_matrix(&boxes);
        assert_eq!(rects, DMatrix::from_row_slice(2, 4, &[
            0.0, 0.0, 10.0, 10.0,
            5.0, 5.0, 7.0, 9.0,
        ]));
        assert_eq!(rect_to_box_matrix(&rects), boxes);

        let empty = DMatrix::<f64>::zeros(0, 4);
        assert_eq!(box_to_rect_matrix(&empty).nrows(), 0);
    }

    #[test]
    fn test_centroid() {
        let bbox = BoundingBox::new(10.0, 20.0, 4.0, 6.0);
        assert_eq!(box_to_centroid(&bbox), [12.0, 23.0, 4.0, 6.0]);
    }

    #[test]
    fn test_overlap_identical() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(overlap(&rect, &rect), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_overlap_partial() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 15.0, 15.0);
        // Intersection: 5x5 = 25, Union: 100 + 100 - 25 = 175
        assert_relative_eq!(overlap(&a, &b), 25.0 / 175.0, epsilon = 1e-12);
        assert_relative_eq!(overlap(&a, &b), overlap(&b, &a), epsilon = 1e-12);
    }

    #[test]
    fn test_overlap_disjoint_and_touching() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(overlap(&a, &Rect::new(20.0, 20.0, 30.0, 30.0)), 0.0);
        // Shared edge has no area
        assert_eq!(overlap(&a, &Rect::new(10.0, 0.0, 20.0, 10.0)), 0.0);
    }

    #[test]
    fn test_overlap_degenerate() {
        let point = Rect::new(5.0, 5.0, 5.0, 5.0);
        let inverted = Rect::new(10.0, 10.0, 0.0, 0.0);
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);

        assert_eq!(point.area(), 0.0);
        assert_eq!(inverted.area(), 0.0);
        assert_eq!(overlap(&point, &point), 0.0);
        assert_eq!(overlap(&inverted, &a), 0.0);
        assert!(!overlap(&point, &inverted).is_nan());
    }

    #[test]
    fn test_overlap_contained() {
        let outer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let inner = Rect::new(2.0, 2.0, 7.0, 7.0);
        assert_relative_eq!(overlap(&outer, &inner), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_pairwise_overlap() {
        let rects = vec![
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.0, 5.0, 15.0, 15.0),
            Rect::new(3.0, 3.0, 3.0, 8.0),
        ];
        let matrix = pairwise_overlap(&rects);

        assert_eq!(matrix.shape(), (3, 3));
        assert_relative_eq!(matrix[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(matrix[(1, 1)], 1.0, epsilon = 1e-12);
        assert_eq!(matrix[(2, 2)], 0.0);
        assert_eq!(matrix, matrix.transpose());
        assert!(matrix.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_overlap_matrix_shape() {
        let rows = vec![Rect::new(0.0, 0.0, 10.0, 10.0)];
        let cols = vec![
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.0, 5.0, 15.0, 15.0),
        ];
        let matrix = overlap_matrix(&rows, &cols);
        assert_eq!(matrix.shape(), (1, 2));
        assert_relative_eq!(matrix[(0, 1)], 25.0 / 175.0, epsilon = 1e-12);

        assert_eq!(overlap_matrix(&[], &cols).shape(), (0, 2));
        assert_eq!(overlap_matrix(&rows, &[]).shape(), (1, 0));
    }

    #[test]
    fn test_euclidean_distance_matrix() {
        let observed = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 4.0]);
        let predicted = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
        let distances = euclidean_distance_matrix(&observed, &predicted);

        assert_eq!(distances.shape(), (2, 1));
        assert_relative_eq!(distances[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(distances[(1, 0)], 5.0, epsilon = 1e-12);

        let empty = DMatrix::<f64>::zeros(0, 2);
        assert_eq!(euclidean_distance_matrix(&empty, &predicted).shape(), (0, 1));
    }

    #[test]
    fn test_euclidean_distance_matrix_3d() {
        let observed = DMatrix::from_row_slice(1, 3, &[1.0, 2.0, 2.0]);
        let predicted = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 1.0, 2.0, 2.0]);
        let distances = euclidean_distance_matrix(&observed, &predicted);

        assert_eq!(distances.shape(), (1, 2));
        assert_relative_eq!(distances[(0, 0)], 3.0, epsilon = 1e-12);
        assert_relative_eq!(distances[(0, 1)], 0.0, epsilon = 1e-12);
    }
}
