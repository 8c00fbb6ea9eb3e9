//! Color values and color spaces (§4.3, §4.8).

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Color {
    Rgb { r: f32, g: f32, b: f32 },
    Cmyk { c: f32, m: f32, y: f32, k: f32 },
    Greyscale { g: f32 },
}

impl Color {
    /// Operand values for the `RG`/`rg` (stroke/fill) color operators, in
    /// the order the operator expects them.
    pub fn into_operands(self) -> Vec<f32> {
        match self {
            Color::Rgb { r, g, b } => vec![r, g, b],
            Color::Cmyk { c, m, y, k } => vec![c, m, y, k],
            Color::Greyscale { g } => vec![g],
        }
    }

    pub fn space(&self) -> ColorSpace {
        match self {
            Color::Rgb { .. } => ColorSpace::Rgb,
            Color::Cmyk { .. } => ColorSpace::Cmyk,
            Color::Greyscale { .. } => ColorSpace::Greyscale,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    Cmyk,
    Greyscale,
}

impl ColorSpace {
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::Rgb => "DeviceRGB",
            ColorSpace::Cmyk => "DeviceCMYK",
            ColorSpace::Greyscale => "DeviceGray",
        }
    }

    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Greyscale => 1,
        }
    }
}
