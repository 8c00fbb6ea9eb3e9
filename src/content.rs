//! L3: the content-stream operator builder (§4.3). A page owns a
//! monotonically growing buffer of these operators; `Op::write` appends
//! each operator's textual form.

use crate::color::Color;
use crate::matrix::Matrix;
use crate::object::{Name, StringFormat};
use crate::serializer::write_object;

/// Bézier approximation constant for quarter-circle arcs: 4*(sqrt(2)-1)/3.
pub const KAPPA: f32 = 0.552_284_75;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    SetLineWidth(f32),
    SetStrokeColor(Color),
    SetFillColor(Color),
    SetLineCap(u8),
    SetLineJoin(u8),
    SaveState,
    RestoreState,
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Rect(f32, f32, f32, f32),
    Stroke,
    Fill,
    FillStroke,
    BeginText,
    EndText,
    SetFont(Name, f32),
    TextPosition(f32, f32),
    ShowText(Vec<u8>, StringFormat),
    SetTextRenderMode(u8),
    ConcatMatrix(Matrix),
    DrawXObject(Name),
    BeginMarkedContentActualText(String),
    EndMarkedContent,
}

impl Op {
    pub fn write(&self, out: &mut Vec<u8>) {
        match self {
            Op::SetLineWidth(w) => write_nums(out, &[*w], "w"),
            Op::SetStrokeColor(c) => write_color(out, c, "RG", "K", "G"),
            Op::SetFillColor(c) => write_color(out, c, "rg", "k", "g"),
            Op::SetLineCap(c) => write_nums(out, &[*c as f32], "J"),
            Op::SetLineJoin(j) => write_nums(out, &[*j as f32], "j"),
            Op::SaveState => out.extend_from_slice(b"q\n"),
            Op::RestoreState => out.extend_from_slice(b"Q\n"),
            Op::MoveTo(x, y) => write_nums(out, &[*x, *y], "m"),
            Op::LineTo(x, y) => write_nums(out, &[*x, *y], "l"),
            Op::CurveTo(x1, y1, x2, y2, x3, y3) => write_nums(out, &[*x1, *y1, *x2, *y2, *x3, *y3], "c"),
            Op::Rect(x, y, w, h) => write_nums(out, &[*x, *y, *w, *h], "re"),
            Op::Stroke => out.extend_from_slice(b"S\n"),
            Op::Fill => out.extend_from_slice(b"f\n"),
            Op::FillStroke => out.extend_from_slice(b"B\n"),
            Op::BeginText => out.extend_from_slice(b"BT\n"),
            Op::EndText => out.extend_from_slice(b"ET\n"),
            Op::SetFont(name, size) => {
                out.push(b'/');
                out.extend_from_slice(name.0.as_bytes());
                out.push(b' ');
                out.extend_from_slice(format!("{size:.2}").as_bytes());
                out.extend_from_slice(b" Tf\n");
            }
            Op::TextPosition(x, y) => write_nums(out, &[*x, *y], "Td"),
            Op::ShowText(bytes, format) => {
                let obj = crate::object::Object::String(bytes.clone(), *format);
                write_object(out, &obj);
                out.extend_from_slice(b" Tj\n");
            }
            Op::SetTextRenderMode(mode) => write_nums(out, &[*mode as f32], "Tr"),
            Op::ConcatMatrix(m) => write_nums(out, &m.as_array(), "cm"),
            Op::DrawXObject(name) => {
                out.push(b'/');
                out.extend_from_slice(name.0.as_bytes());
                out.extend_from_slice(b" Do\n");
            }
            Op::BeginMarkedContentActualText(text) => {
                out.extend_from_slice(b"/Span << /ActualText ");
                let obj = crate::object::literal_string(text.as_bytes().to_vec());
                write_object(out, &obj);
                out.extend_from_slice(b" >> BDC\n");
            }
            Op::EndMarkedContent => out.extend_from_slice(b"EMC\n"),
        }
    }
}

fn write_nums(out: &mut Vec<u8>, nums: &[f32], op: &str) {
    for n in nums {
        out.extend_from_slice(format!("{n:.2}").as_bytes());
        out.push(b' ');
    }
    out.extend_from_slice(op.as_bytes());
    out.push(b'\n');
}

fn write_color(out: &mut Vec<u8>, c: &Color, rgb_op: &str, cmyk_op: &str, gray_op: &str) {
    let operands = c.into_operands();
    let op = match c {
        Color::Rgb { .. } => rgb_op,
        Color::Cmyk { .. } => cmyk_op,
        Color::Greyscale { .. } => gray_op,
    };
    write_nums(out, &operands, op);
}

/// Renders a full circle centered at `(cx, cy)` with radius `r` as four
/// cubic Bézier arcs, matching the `KAPPA` control-point approximation.
pub fn circle_ops(cx: f32, cy: f32, r: f32) -> Vec<Op> {
    let k = r * KAPPA;
    vec![
        Op::MoveTo(cx + r, cy),
        Op::CurveTo(cx + r, cy + k, cx + k, cy + r, cx, cy + r),
        Op::CurveTo(cx - k, cy + r, cx - r, cy + k, cx - r, cy),
        Op::CurveTo(cx - r, cy - k, cx - k, cy - r, cx, cy - r),
        Op::CurveTo(cx + k, cy - r, cx + r, cy - k, cx + r, cy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_text_ops() {
        let mut buf = Vec::new();
        Op::BeginText.write(&mut buf);
        Op::SetFont(Name::from("F1"), 12.0).write(&mut buf);
        Op::TextPosition(100.0, 700.0).write(&mut buf);
        Op::ShowText(b"Hello, World!".to_vec(), StringFormat::Literal).write(&mut buf);
        Op::EndText.write(&mut buf);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("BT"));
        assert!(text.contains("/F1 12.00 Tf"));
        assert!(text.contains("100.00 700.00 Td"));
        assert!(text.contains("(Hello, World!) Tj"));
        assert!(text.contains("ET"));
    }

    #[test]
    fn circle_has_four_curves() {
        let ops = circle_ops(0.0, 0.0, 10.0);
        assert_eq!(ops.iter().filter(|o| matches!(o, Op::CurveTo(..))).count(), 4);
    }
}
