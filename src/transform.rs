//! 2D affine transformation matrices for positioning page content.

use crate::units::*;

/// A 2D affine transformation, as used by PDF content streams, where (0,0) is
/// at the bottom-left of the page. The six coefficients correspond to the
/// matrix:
///
/// ```text
/// | a  b  0 |      a = horizontal scale    b = vertical shear
/// | c  d  0 |      c = horizontal shear    d = vertical scale
/// | e  f  1 |      e, f = translation
/// ```
///
/// A point is mapped as `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
///
/// Two composition orders exist and are not interchangeable:
/// [`prepend`](Transform::prepend) applies the new matrix *before* `self`
/// (how a child's local transform joins an accumulated parent transform),
/// while [`append`](Transform::append) applies `self` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity transform (no transformation)
    pub fn identity() -> Self {
        Transform {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Create a translation transform
    pub fn translation(x: Pt, y: Pt) -> Self {
        Transform {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: *x,
            f: *y,
        }
    }

    /// Create a scaling transform
    pub fn scaling(sx: f32, sy: f32) -> Self {
        Transform {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Create a counter-clockwise rotation transform. The angle is given in
    /// degrees.
    pub fn rotation(angle_degrees: f32) -> Self {
        let angle = angle_degrees.to_radians();
        let cos = angle.cos();
        let sin = angle.sin();
        Transform {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Compose `new` so that it applies *before* `self`. When accumulating
    /// transforms down a container tree, the parent's accumulated transform
    /// prepends the child's local transform.
    ///
    /// With row-vector points (`p' = p · M`), this is the matrix product
    /// `new · self`.
    pub fn prepend(self, new: Transform) -> Self {
        Transform {
            a: new.a * self.a + new.b * self.c,
            b: new.a * self.b + new.b * self.d,
            c: new.c * self.a + new.d * self.c,
            d: new.c * self.b + new.d * self.d,
            e: new.e * self.a + new.f * self.c + self.e,
            f: new.e * self.b + new.f * self.d + self.f,
        }
    }

    /// Compose `new` so that `self` applies first, then `new`. With
    /// row-vector points this is the matrix product `self · new`.
    pub fn append(self, new: Transform) -> Self {
        Transform {
            a: self.a * new.a + self.b * new.c,
            b: self.a * new.b + self.b * new.d,
            c: self.c * new.a + self.d * new.c,
            d: self.c * new.b + self.d * new.d,
            e: self.e * new.a + self.f * new.c + new.e,
            f: self.e * new.b + self.f * new.d + new.f,
        }
    }

    /// Prepend a rotation by the given angle in degrees
    pub fn rotate(self, angle_degrees: f32) -> Self {
        self.prepend(Transform::rotation(angle_degrees))
    }

    /// Prepend a translation
    pub fn with_translate(self, x: Pt, y: Pt) -> Self {
        self.prepend(Transform::translation(x, y))
    }

    /// Prepend a scale
    pub fn with_scale(self, sx: f32, sy: f32) -> Self {
        self.prepend(Transform::scaling(sx, sy))
    }

    /// Map the x-coordinate of a point through this transform
    pub fn transform_x(&self, x: Pt, y: Pt) -> Pt {
        Pt(self.a * *x + self.c * *y + self.e)
    }

    /// Map the y-coordinate of a point through this transform
    pub fn transform_y(&self, x: Pt, y: Pt) -> Pt {
        Pt(self.b * *x + self.d * *y + self.f)
    }

    /// True whenever the scale/shear part deviates from identity. A transform
    /// that only translates can be folded into drawn coordinates, so emitting
    /// a `cm` operator for it would be a no-op; this flag is the gate for
    /// that.
    pub fn is_scaled(&self) -> bool {
        self.a != 1.0 || self.d != 1.0 || self.b != 0.0 || self.c != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(m: Transform, n: Transform) -> bool {
        (m.a - n.a).abs() < 1e-5
            && (m.b - n.b).abs() < 1e-5
            && (m.c - n.c).abs() < 1e-5
            && (m.d - n.d).abs() < 1e-5
            && (m.e - n.e).abs() < 1e-5
            && (m.f - n.f).abs() < 1e-5
    }

    #[test]
    fn identity_round_trip() {
        let m = Transform::rotation(30.0)
            .with_scale(2.0, 0.5)
            .with_translate(Pt(10.0), Pt(-4.0));
        assert!(approx(Transform::identity().prepend(m), m));
        assert!(approx(m.append(Transform::identity()), m));
        assert!(approx(m.prepend(Transform::identity()), m));
    }

    #[test]
    fn rotation_and_inverse_cancel() {
        let m = Transform::identity().rotate(37.0).rotate(-37.0);
        assert!(approx(m, Transform::identity()));
    }

    #[test]
    fn prepend_and_append_differ() {
        // translation and scale do not commute
        let t = Transform::translation(Pt(10.0), Pt(0.0));
        let s = Transform::scaling(2.0, 2.0);
        let pre = s.prepend(t); // translate first, then scale: x' = 2(x + 10)
        let app = s.append(t); // scale first, then translate: x' = 2x + 10
        assert_eq!(*pre.transform_x(Pt(1.0), Pt(0.0)), 22.0);
        assert_eq!(*app.transform_x(Pt(1.0), Pt(0.0)), 12.0);
    }

    #[test]
    fn point_transform() {
        let m = Transform::rotation(90.0);
        assert!((*m.transform_x(Pt(1.0), Pt(0.0)) - 0.0).abs() < 1e-6);
        assert!((*m.transform_y(Pt(1.0), Pt(0.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn is_scaled_flag() {
        assert!(!Transform::identity().is_scaled());
        assert!(!Transform::translation(Pt(5.0), Pt(5.0)).is_scaled());
        assert!(Transform::scaling(2.0, 1.0).is_scaled());
        assert!(Transform::rotation(45.0).is_scaled());
    }
}
