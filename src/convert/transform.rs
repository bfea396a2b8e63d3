//! Coordinate transforms from circuit space into KiCad space.
//!
//! Circuit descriptions put the Y axis up and centre content around the
//! origin. KiCad puts the Y axis down and expects content on a page (the
//! schematic sheet or the board area). Each artifact therefore gets one
//! affine transform:
//!
//! ```text
//! kicad = translate(origin) · scale(s, -s) · translate(-centre) · input
//! ```
//!
//! - `centre` is the centre of the placed content's extent
//! - `s` converts the input unit into millimetres
//! - the negative Y scale flips the vertical axis
//!
//! Rotations are clockwise-positive degrees in the input. KiCad angles use
//! the opposite sign; magnitudes stay in degrees.

use crate::circuit::Point;

/// A 2D affine matrix.
///
/// ```text
/// | a c e |   x' = a·x + c·y + e
/// | b d f |   y' = b·x + d·y + f
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    /// X scale / rotation component.
    pub a: f64,
    /// Y shear / rotation component.
    pub b: f64,
    /// X shear / rotation component.
    pub c: f64,
    /// Y scale / rotation component.
    pub d: f64,
    /// X translation.
    pub e: f64,
    /// Y translation.
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// The identity transform.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// A translation.
    #[must_use]
    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::identity()
        }
    }

    /// A scale about the origin.
    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// Returns `self · other` (apply `other` first).
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        Self {
            a: self.a.mul_add(other.a, self.c * other.b),
            b: self.b.mul_add(other.a, self.d * other.b),
            c: self.a.mul_add(other.c, self.c * other.d),
            d: self.b.mul_add(other.c, self.d * other.d),
            e: self.a.mul_add(other.e, self.c.mul_add(other.f, self.e)),
            f: self.b.mul_add(other.e, self.d.mul_add(other.f, self.f)),
        }
    }

    /// Composes matrices left to right; the rightmost applies first.
    #[must_use]
    pub fn compose(matrices: &[Self]) -> Self {
        matrices
            .iter()
            .fold(Self::identity(), |acc, m| acc.multiply(m))
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a.mul_add(p.x, self.c.mul_add(p.y, self.e)),
            self.b.mul_add(p.x, self.d.mul_add(p.y, self.f)),
        )
    }

    /// Applies the linear part only (no translation), for offsets.
    #[must_use]
    pub fn apply_vector(&self, p: Point) -> Point {
        Point::new(
            self.a.mul_add(p.x, self.c * p.y),
            self.b.mul_add(p.x, self.d * p.y),
        )
    }

    /// Uniform length scale of the transform.
    #[must_use]
    pub fn length_scale(&self) -> f64 {
        self.a.mul_add(self.d, -(self.b * self.c)).abs().sqrt()
    }

    /// Returns the inverse transform, or `None` if it is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a.mul_add(self.d, -(self.b * self.c));
        if det.abs() < f64::EPSILON {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: self.c.mul_add(self.f, -(self.d * self.e)) / det,
            f: self.b.mul_add(self.e, -(self.a * self.f)) / det,
        })
    }
}

/// Axis-aligned bounding box of placed content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self::empty()
    }
}

impl Extent {
    /// An extent containing nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// Returns true if nothing has been included.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Grows the extent to contain `p`. Non-finite points are ignored.
    pub fn include(&mut self, p: Point) {
        if !p.x.is_finite() || !p.y.is_finite() {
            return;
        }
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Grows the extent to contain a rectangle given by centre and size.
    pub fn include_rect(&mut self, center: Point, width: f64, height: f64) {
        let hw = width.abs() / 2.0;
        let hh = height.abs() / 2.0;
        self.include(Point::new(center.x - hw, center.y - hh));
        self.include(Point::new(center.x + hw, center.y + hh));
    }

    /// Centre of the extent; the origin when empty.
    #[must_use]
    pub fn center(&self) -> Point {
        if self.is_empty() {
            return Point::default();
        }
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Width of the extent; zero when empty.
    #[must_use]
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    /// Height of the extent; zero when empty.
    #[must_use]
    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }
}

/// Builds the transform that centres `extent` on `origin` with a Y flip.
#[must_use]
pub fn centred_transform(extent: &Extent, scale: f64, origin: Point) -> Matrix {
    let centre = extent.center();
    Matrix::compose(&[
        Matrix::translate(origin.x, origin.y),
        Matrix::scale(scale, -scale),
        Matrix::translate(-centre.x, -centre.y),
    ])
}

/// Transform into schematic sheet space.
#[must_use]
pub fn schematic_transform(extent: &Extent, scale: f64, origin: Point) -> Matrix {
    centred_transform(extent, scale, origin)
}

/// Transform into board space (millimetres in, millimetres out).
#[must_use]
pub fn pcb_transform(extent: &Extent, origin: Point) -> Matrix {
    centred_transform(extent, 1.0, origin)
}

/// Normalises an angle into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if (normalized - 360.0).abs() < 1e-9 || normalized.abs() < 1e-9 {
        0.0
    } else {
        normalized
    }
}

/// Converts a clockwise-positive input angle into a KiCad angle.
#[must_use]
pub fn to_kicad_rotation(degrees: f64) -> f64 {
    normalize_degrees(-degrees)
}

/// Converts a counter-clockwise input angle into a KiCad angle.
#[must_use]
pub fn ccw_to_kicad_rotation(degrees: f64) -> f64 {
    normalize_degrees(degrees)
}

/// Maps a board-space offset into the local frame of an item rotated by
/// `kicad_degrees` (KiCad convention, Y down).
#[must_use]
pub fn rotate_into_local(dx: f64, dy: f64, kicad_degrees: f64) -> (f64, f64) {
    let (sin, cos) = kicad_degrees.to_radians().sin_cos();
    (dx.mul_add(cos, -(dy * sin)), dx.mul_add(sin, dy * cos))
}

/// Maps a local offset of an item rotated by `kicad_degrees` back into board space.
#[must_use]
pub fn rotate_from_local(dx: f64, dy: f64, kicad_degrees: f64) -> (f64, f64) {
    let (sin, cos) = kicad_degrees.to_radians().sin_cos();
    (dx.mul_add(cos, dy * sin), dy.mul_add(cos, -(dx * sin)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn compose_applies_right_to_left() {
        let m = Matrix::compose(&[Matrix::translate(10.0, 0.0), Matrix::scale(2.0, 2.0)]);
        let p = m.apply(Point::new(1.0, 1.0));
        assert!(approx_eq(p.x, 12.0));
        assert!(approx_eq(p.y, 2.0));
    }

    #[test]
    fn inverse_round_trips() {
        let m = Matrix::compose(&[
            Matrix::translate(100.0, 50.0),
            Matrix::scale(15.0, -15.0),
            Matrix::translate(-3.0, 2.0),
        ]);
        let inv = m.inverse().unwrap();
        let p = inv.apply(m.apply(Point::new(4.2, -1.3)));
        assert!(approx_eq(p.x, 4.2));
        assert!(approx_eq(p.y, -1.3));
        assert!(Matrix::scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn pcb_transform_centres_and_flips() {
        let mut extent = Extent::empty();
        extent.include_rect(Point::new(5.0, 5.0), 10.0, 10.0);
        let m = pcb_transform(&extent, Point::new(100.0, 100.0));

        let centre = m.apply(Point::new(5.0, 5.0));
        assert!(approx_eq(centre.x, 100.0));
        assert!(approx_eq(centre.y, 100.0));

        let above = m.apply(Point::new(5.0, 6.0));
        assert!(approx_eq(above.y, 99.0));
    }

    #[test]
    fn schematic_transform_scales() {
        let m = schematic_transform(&Extent::empty(), 15.0, Point::new(148.59, 105.41));
        let p = m.apply(Point::new(1.0, 1.0));
        assert!(approx_eq(p.x, 163.59));
        assert!(approx_eq(p.y, 90.41));
        assert!(approx_eq(m.length_scale(), 15.0));
    }

    #[test]
    fn empty_extent_centres_on_origin() {
        let extent = Extent::empty();
        assert!(extent.is_empty());
        let c = extent.center();
        assert!(c.x.is_finite() && c.y.is_finite());
        assert!(approx_eq(c.x, 0.0) && approx_eq(c.y, 0.0));
        assert!(approx_eq(extent.width(), 0.0));
    }

    #[test]
    fn non_finite_points_are_ignored() {
        let mut extent = Extent::empty();
        extent.include(Point::new(f64::NAN, 1.0));
        assert!(extent.is_empty());
    }

    #[test]
    fn rotation_conversion() {
        assert!(approx_eq(to_kicad_rotation(0.0), 0.0));
        assert!(approx_eq(to_kicad_rotation(90.0), 270.0));
        assert!(approx_eq(to_kicad_rotation(-90.0), 90.0));
        assert!(approx_eq(to_kicad_rotation(360.0), 0.0));
        assert!(approx_eq(to_kicad_rotation(450.0), 270.0));
    }

    #[test]
    fn local_rotation_round_trips() {
        let (lx, ly) = rotate_into_local(0.0, -1.0, 90.0);
        assert!(approx_eq(lx, 1.0));
        assert!(approx_eq(ly, 0.0));

        let (bx, by) = rotate_from_local(lx, ly, 90.0);
        assert!(approx_eq(bx, 0.0));
        assert!(approx_eq(by, -1.0));
    }
}
