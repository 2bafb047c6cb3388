//! A plotters drawing backend that records PDF vector operators.
//!
//! Plotters works in a top-left pixel space; one pixel here is one PDF point
//! and y is flipped on the way out. Text goes through the standard Helvetica
//! fonts by resource name, so the recorded stream must be placed in a context
//! whose resources define [`crate::font::FONT_REGULAR`] and
//! [`crate::font::FONT_BOLD`].

use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
    FontStyle, FontTransform,
};
use std::convert::Infallible;

use crate::font::{Face, encode_win_ansi, text_width};

/// Bezier handle length for a quarter circle
const KAPPA: f32 = 0.552_284_8;

pub struct PdfBackend<'a> {
    ops: &'a mut Vec<Operation>,
    size: (u32, u32),
}

impl<'a> PdfBackend<'a> {
    pub fn new(ops: &'a mut Vec<Operation>, size: (u32, u32)) -> Self {
        Self { ops, size }
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn x(&self, x: i32) -> f32 {
        x as f32
    }

    fn y(&self, y: i32) -> f32 {
        self.size.1 as f32 - y as f32
    }

    fn stroke_color(&mut self, color: BackendColor, width: u32) {
        let [r, g, b] = flatten(color);
        self.push("RG", vec![real(r), real(g), real(b)]);
        self.push("w", vec![real(width.max(1) as f32)]);
    }

    fn fill_color(&mut self, color: BackendColor) {
        let [r, g, b] = flatten(color);
        self.push("rg", vec![real(r), real(g), real(b)]);
    }

    fn path(&mut self, points: &[BackendCoord]) {
        for (i, &(px, py)) in points.iter().enumerate() {
            let op = if i == 0 { "m" } else { "l" };
            let (x, y) = (self.x(px), self.y(py));
            self.push(op, vec![real(x), real(y)]);
        }
    }
}

fn real(v: f32) -> Object {
    Object::Real(v)
}

/// PDF has no alpha without extended graphics state, so blend onto white
fn flatten(color: BackendColor) -> [f32; 3] {
    let a = color.alpha.clamp(0.0, 1.0) as f32;
    let (r, g, b) = color.rgb;
    [r, g, b].map(|c| (a * c as f32 + (1.0 - a) * 255.0) / 255.0)
}

fn face_of(style: FontStyle) -> Face {
    match style {
        FontStyle::Bold => Face::Bold,
        _ => Face::Regular,
    }
}

impl DrawingBackend for PdfBackend<'_> {
    type ErrorType = Infallible;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Infallible>> {
        Ok(())
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if color.alpha <= 0.0 {
            return Ok(());
        }
        self.fill_color(color);
        let (x, y) = (self.x(point.0), self.y(point.1 + 1));
        self.push("re", vec![real(x), real(y), real(1.0), real(1.0)]);
        self.push("f", vec![]);
        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        self.stroke_color(style.color(), style.stroke_width());
        self.path(&[from, to]);
        self.push("S", vec![]);
        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        let x = self.x(upper_left.0.min(bottom_right.0));
        let y = self.y(upper_left.1.max(bottom_right.1));
        let w = (bottom_right.0 - upper_left.0).abs() as f32;
        let h = (bottom_right.1 - upper_left.1).abs() as f32;
        if fill {
            self.fill_color(style.color());
            self.push("re", vec![real(x), real(y), real(w.max(0.5)), real(h.max(0.5))]);
            self.push("f", vec![]);
        } else {
            self.stroke_color(style.color(), style.stroke_width());
            self.push("re", vec![real(x), real(y), real(w), real(h)]);
            self.push("S", vec![]);
        }
        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let points: Vec<BackendCoord> = path.into_iter().collect();
        if points.len() < 2 || style.color().alpha <= 0.0 {
            return Ok(());
        }
        self.stroke_color(style.color(), style.stroke_width());
        self.push("J", vec![Object::Integer(1)]);
        self.push("j", vec![Object::Integer(1)]);
        self.path(&points);
        self.push("S", vec![]);
        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let points: Vec<BackendCoord> = vert.into_iter().collect();
        if points.len() < 3 || style.color().alpha <= 0.0 {
            return Ok(());
        }
        self.fill_color(style.color());
        self.path(&points);
        self.push("h", vec![]);
        self.push("f", vec![]);
        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        if style.color().alpha <= 0.0 {
            return Ok(());
        }
        let (cx, cy) = (self.x(center.0), self.y(center.1));
        let r = radius as f32;
        let k = r * KAPPA;

        if fill {
            self.fill_color(style.color());
        } else {
            self.stroke_color(style.color(), style.stroke_width());
        }
        self.push("m", vec![real(cx + r), real(cy)]);
        let quarters = [
            [cx + r, cy + k, cx + k, cy + r, cx, cy + r],
            [cx - k, cy + r, cx - r, cy + k, cx - r, cy],
            [cx - r, cy - k, cx - k, cy - r, cx, cy - r],
            [cx + k, cy - r, cx + r, cy - k, cx + r, cy],
        ];
        for q in quarters {
            self.push("c", q.iter().copied().map(real).collect());
        }
        self.push(if fill { "f" } else { "s" }, vec![]);
        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Infallible>> {
        let size = style.size() as f32;
        let face = face_of(style.style());
        let width = text_width(text, size, face);

        // offset of the baseline origin from the anchor, in text-local axes
        // (along the text, and perpendicular pointing down the glyphs)
        let anchor = style.anchor();
        let along = match anchor.h_pos {
            HPos::Left => 0.0,
            HPos::Center => -width / 2.0,
            HPos::Right => -width,
        };
        let down = match anchor.v_pos {
            VPos::Top => 0.75 * size,
            VPos::Center => 0.35 * size,
            VPos::Bottom => -0.2 * size,
        };

        let degrees: f32 = match style.transform() {
            FontTransform::None => 0.0,
            FontTransform::Rotate90 => 90.0,
            FontTransform::Rotate180 => 180.0,
            FontTransform::Rotate270 => 270.0,
        };
        let (sin, cos) = degrees.to_radians().sin_cos();

        // screen space, y grows downwards; rotation is clockwise on screen
        let sx = pos.0 as f32 + along * cos - down * sin;
        let sy = pos.1 as f32 + along * sin + down * cos;
        let (ox, oy) = (sx, self.size.1 as f32 - sy);

        self.push("BT", vec![]);
        self.fill_color(style.color());
        self.push("Tf", vec![Object::Name(face.resource().as_bytes().to_vec()), real(size)]);
        self.push(
            "Tm",
            vec![real(cos), real(-sin), real(sin), real(cos), real(ox), real(oy)],
        );
        self.push(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Infallible>> {
        let size = style.size() as f32;
        let width = text_width(text, size, face_of(style.style()));
        Ok((width.ceil() as u32, size.ceil() as u32))
    }
}
