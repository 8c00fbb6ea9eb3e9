//! Standard page sizes (§6.4), in points at 72pt/in.

use crate::units::Pt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    A3,
    A5,
    Presentation16x9,
    Presentation4x3,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl PageSize {
    /// (width, height) in points, portrait orientation.
    fn portrait_dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A3 => (842.0, 1191.0),
            PageSize::A5 => (420.0, 595.0),
            PageSize::Presentation16x9 => (720.0, 405.0),
            PageSize::Presentation4x3 => (720.0, 540.0),
        }
    }

    pub fn dimensions(&self, orientation: Orientation) -> (Pt, Pt) {
        let (w, h) = self.portrait_dimensions();
        match orientation {
            Orientation::Portrait => (Pt(w), Pt(h)),
            Orientation::Landscape => (Pt(h), Pt(w)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_portrait() {
        assert_eq!(PageSize::A4.dimensions(Orientation::Portrait), (Pt(595.0), Pt(842.0)));
    }

    #[test]
    fn a4_landscape_swaps() {
        assert_eq!(PageSize::A4.dimensions(Orientation::Landscape), (Pt(842.0), Pt(595.0)));
    }
}
