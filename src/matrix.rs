//! Affine transforms used for the CTM and text matrices (§4.6).
//!
//! Both the current transformation matrix and the text/text-line matrices
//! are 3x3 affine matrices in PDF's row-major `[a b c d e f]` form. They
//! compose via the usual 3x3 affine multiply, implemented here through a
//! 2x3 representation (the third column is always `[0 0 1]`).

use serde_derive::{Deserialize, Serialize};

/// An affine transform `[a b c d e f]`, matching the operand order of the
/// PDF `cm` operator and `Tm` text-state operator.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix(pub [f32; 6]);

impl Default for Matrix {
    fn default() -> Self {
        Matrix::identity()
    }
}

impl Matrix {
    pub const fn identity() -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }

    pub const fn translate(tx: f32, ty: f32) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Matrix([sx, 0.0, 0.0, sy, 0.0, 0.0])
    }

    pub fn rotate_degrees(deg: f32) -> Self {
        let rad = deg.to_radians();
        let (s, c) = (rad.sin(), rad.cos());
        Matrix([c, s, -s, c, 0.0, 0.0])
    }

    pub fn as_array(&self) -> [f32; 6] {
        self.0
    }

    /// `self` applied first, then `other` — i.e. `self * other` in the
    /// convention where row-vectors are transformed on the left.
    pub fn combine(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    /// Apply this transform to a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate() {
        assert_eq!(Matrix::translate(150.0, 50.0).as_array(), [1.0, 0.0, 0.0, 1.0, 150.0, 50.0]);
    }

    #[test]
    fn test_scale() {
        assert_eq!(Matrix::scale(2.0, 4.0).as_array(), [2.0, 0.0, 0.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rotate() {
        let m = Matrix::rotate_degrees(30.0).as_array();
        assert!((m[0] - 0.8660254).abs() < 1e-5);
        assert!((m[1] - 0.5).abs() < 1e-5);
        assert!((m[2] - (-0.5)).abs() < 1e-5);
        assert!((m[3] - 0.8660254).abs() < 1e-5);
    }

    #[test]
    fn test_combine_translate_then_scale() {
        let t = Matrix::translate(10.0, 20.0);
        let s = Matrix::scale(2.0, 2.0);
        let combined = t.combine(&s);
        assert_eq!(combined.apply(0.0, 0.0), (20.0, 40.0));
    }
}
