//! Physical units used throughout the document model.
//!
//! All page-space coordinates in the PDF itself are points (`Pt`); `Mm`
//! and `Px` exist for convenience at the API boundary and convert freely.

use std::cmp::Ordering;
use std::num::FpCategory;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use serde_derive::{Deserialize, Serialize};

macro_rules! impl_partialeq {
    ($t:ty) => {
        impl PartialEq for $t {
            // float-tolerant compare: round to 3 decimal places
            fn eq(&self, other: &$t) -> bool {
                if (self.0.classify() == FpCategory::Zero || self.0.classify() == FpCategory::Normal)
                    && (other.0.classify() == FpCategory::Zero || other.0.classify() == FpCategory::Normal)
                {
                    (self.0 * 1000.0).round() == (other.0 * 1000.0).round()
                } else {
                    false
                }
            }
        }
    };
}

macro_rules! impl_ord {
    ($t:ty) => {
        impl Ord for $t {
            fn cmp(&self, other: &$t) -> Ordering {
                self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
            }
        }
    };
}

macro_rules! impl_arith {
    ($t:ident) => {
        impl Add for $t {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                Self(self.0 + other.0)
            }
        }
        impl AddAssign for $t {
            fn add_assign(&mut self, other: Self) {
                self.0 += other.0;
            }
        }
        impl Sub for $t {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }
        impl SubAssign for $t {
            fn sub_assign(&mut self, other: Self) {
                self.0 -= other.0;
            }
        }
        impl Mul<f32> for $t {
            type Output = Self;
            fn mul(self, other: f32) -> Self {
                Self(self.0 * other)
            }
        }
        impl MulAssign<f32> for $t {
            fn mul_assign(&mut self, other: f32) {
                self.0 *= other;
            }
        }
        impl Div<f32> for $t {
            type Output = Self;
            fn div(self, other: f32) -> Self {
                Self(self.0 / other)
            }
        }
        impl DivAssign<f32> for $t {
            fn div_assign(&mut self, other: f32) {
                self.0 /= other;
            }
        }
    };
}

/// Scale in millimeters.
#[derive(Debug, Default, Copy, Clone, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mm(pub f32);

/// Scale in points (1/72 inch) — the native PDF page-space unit.
#[derive(Debug, Default, Copy, Clone, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pt(pub f32);

/// Scale in device pixels at a given DPI.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Px(pub usize);

impl Mm {
    pub fn into_pt(self) -> Pt {
        self.into()
    }
}

impl Pt {
    pub fn into_mm(self) -> Mm {
        self.into()
    }

    pub fn into_px(self, dpi: f32) -> Px {
        let mm = self.0 / 2.834_646_f32;
        Px((mm * (dpi / 25.4_f32)).round() as usize)
    }
}

impl Px {
    pub fn into_pt(self, dpi: f32) -> Pt {
        Mm(self.0 as f32 * (25.4 / dpi)).into()
    }
}

impl From<Pt> for Mm {
    fn from(value: Pt) -> Mm {
        Mm(value.0 * 0.352_778_f32)
    }
}

impl From<Mm> for Pt {
    fn from(value: Mm) -> Pt {
        Pt(value.0 * 2.834_646_f32)
    }
}

impl Eq for Mm {}
impl Eq for Pt {}

impl_partialeq!(Mm);
impl_partialeq!(Pt);
impl_ord!(Mm);
impl_ord!(Pt);
impl_arith!(Mm);
impl_arith!(Pt);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_mm_conversion() {
        assert_eq!(Mm::from(Pt(1.0)), Mm(0.352778));
        assert_eq!(Mm::from(Pt(15.0)), Mm(5.29167));
    }

    #[test]
    fn mm_to_point_conversion() {
        assert_eq!(Pt::from(Mm(1.0)), Pt(2.834_647_4));
        assert_eq!(Pt::from(Mm(23.0)), Pt(65.1969));
    }

    #[test]
    fn mm_eq_zero() {
        assert_eq!(Mm(0.0), Mm(0.0));
    }

    #[test]
    fn max_pt() {
        let v = [Pt(0.0), Pt(1.0), Pt(2.0)];
        assert_eq!(v.iter().max().unwrap(), &Pt(2.0));
    }

    #[test]
    fn px_roundtrip() {
        let pt = Px(96).into_pt(96.0);
        assert_eq!(pt, Pt(72.0));
    }
}
