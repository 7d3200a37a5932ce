use macroquad::prelude::*;

/// Minimal immediate-mode drawing surface: a transform stack plus filled and
/// outlined primitives, everything the renderer needs and nothing more. The
/// production backend pushes macroquad draw calls; tests swap in a recorder.
pub trait DrawContext {
    fn push(&mut self);
    fn pop(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    fn rotate_deg(&mut self, degrees: f32);
    fn scale(&mut self, x: f32, y: f32);
    fn fill_quad(&mut self, corners: [Vec2; 4], color: Color);
    fn line_loop(&mut self, corners: [Vec2; 4], color: Color);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.fill_quad(
            [
                vec2(x, y),
                vec2(x + w, y),
                vec2(x + w, y + h),
                vec2(x, y + h),
            ],
            color,
        );
    }
}

/// Stack of 2D affine transforms. New operations compose onto the top entry,
/// so a rotation applied inside a loop accumulates slot by slot.
pub struct TransformStack {
    saved: Vec<Mat3>,
    current: Mat3,
}

impl TransformStack {
    pub fn new() -> Self {
        Self {
            saved: Vec::new(),
            current: Mat3::IDENTITY,
        }
    }

    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Popping past the bottom resets to identity rather than panicking.
    pub fn pop(&mut self) {
        self.current = self.saved.pop().unwrap_or(Mat3::IDENTITY);
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.current = self.current * Mat3::from_translation(vec2(x, y));
    }

    pub fn rotate_deg(&mut self, degrees: f32) {
        self.current = self.current * Mat3::from_angle(degrees.to_radians());
    }

    pub fn scale(&mut self, x: f32, y: f32) {
        self.current = self.current * Mat3::from_scale(vec2(x, y));
    }

    pub fn apply(&self, point: Vec2) -> Vec2 {
        self.current.transform_point2(point)
    }
}

/// Macroquad-backed draw context. Vertices go through the transform stack on
/// the CPU; quads become two triangles, loops become four line segments.
pub struct ScreenDraw {
    transform: TransformStack,
}

impl ScreenDraw {
    pub fn new() -> Self {
        Self {
            transform: TransformStack::new(),
        }
    }
}

impl DrawContext for ScreenDraw {
    fn push(&mut self) {
        self.transform.push();
    }

    fn pop(&mut self) {
        self.transform.pop();
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.transform.translate(x, y);
    }

    fn rotate_deg(&mut self, degrees: f32) {
        self.transform.rotate_deg(degrees);
    }

    fn scale(&mut self, x: f32, y: f32) {
        self.transform.scale(x, y);
    }

    fn fill_quad(&mut self, corners: [Vec2; 4], color: Color) {
        let [a, b, c, d] = corners.map(|corner| self.transform.apply(corner));
        draw_triangle(a, b, c, color);
        draw_triangle(a, c, d, color);
    }

    fn line_loop(&mut self, corners: [Vec2; 4], color: Color) {
        let points = corners.map(|corner| self.transform.apply(corner));
        for index in 0..points.len() {
            let from = points[index];
            let to = points[(index + 1) % points.len()];
            draw_line(from.x, from.y, to.x, to.y, 1.0, color);
        }
    }
}

/// A draw command as it would land on screen, with the transform already
/// applied, so tests assert final coordinates.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect { corners: [Vec2; 4], color: Color },
    Quad { corners: [Vec2; 4], color: Color },
    LineLoop { corners: [Vec2; 4], color: Color },
}

#[cfg(test)]
pub struct RecordingDraw {
    transform: TransformStack,
    pub cmds: Vec<DrawCmd>,
}

#[cfg(test)]
impl RecordingDraw {
    pub fn new() -> Self {
        Self {
            transform: TransformStack::new(),
            cmds: Vec::new(),
        }
    }

    pub fn quads(&self) -> Vec<&DrawCmd> {
        self.cmds
            .iter()
            .filter(|cmd| matches!(cmd, DrawCmd::Quad { .. }))
            .collect()
    }

    pub fn line_loops(&self) -> Vec<&DrawCmd> {
        self.cmds
            .iter()
            .filter(|cmd| matches!(cmd, DrawCmd::LineLoop { .. }))
            .collect()
    }

    pub fn rects(&self) -> Vec<&DrawCmd> {
        self.cmds
            .iter()
            .filter(|cmd| matches!(cmd, DrawCmd::Rect { .. }))
            .collect()
    }
}

#[cfg(test)]
impl DrawContext for RecordingDraw {
    fn push(&mut self) {
        self.transform.push();
    }

    fn pop(&mut self) {
        self.transform.pop();
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.transform.translate(x, y);
    }

    fn rotate_deg(&mut self, degrees: f32) {
        self.transform.rotate_deg(degrees);
    }

    fn scale(&mut self, x: f32, y: f32) {
        self.transform.scale(x, y);
    }

    fn fill_quad(&mut self, corners: [Vec2; 4], color: Color) {
        let corners = corners.map(|corner| self.transform.apply(corner));
        self.cmds.push(DrawCmd::Quad { corners, color });
    }

    fn line_loop(&mut self, corners: [Vec2; 4], color: Color) {
        let corners = corners.map(|corner| self.transform.apply(corner));
        self.cmds.push(DrawCmd::LineLoop { corners, color });
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let corners = [
            vec2(x, y),
            vec2(x + w, y),
            vec2(x + w, y + h),
            vec2(x, y + h),
        ]
        .map(|corner| self.transform.apply(corner));
        self.cmds.push(DrawCmd::Rect { corners, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn translate_then_scale_compose_in_order() {
        let mut stack = TransformStack::new();
        stack.translate(10.0, 20.0);
        stack.scale(2.0, 2.0);
        assert!(close(stack.apply(vec2(1.0, 1.0)), vec2(12.0, 22.0)));
    }

    #[test]
    fn six_sixty_degree_rotations_return_home() {
        let mut stack = TransformStack::new();
        for _ in 0..6 {
            stack.rotate_deg(60.0);
        }
        assert!(close(stack.apply(vec2(100.0, 0.0)), vec2(100.0, 0.0)));
    }

    #[test]
    fn pop_restores_saved_transform() {
        let mut stack = TransformStack::new();
        stack.translate(5.0, 5.0);
        stack.push();
        stack.rotate_deg(90.0);
        stack.pop();
        assert!(close(stack.apply(vec2(1.0, 0.0)), vec2(6.0, 5.0)));
    }

    #[test]
    fn pop_on_empty_stack_resets_to_identity() {
        let mut stack = TransformStack::new();
        stack.translate(50.0, 0.0);
        stack.pop();
        assert!(close(stack.apply(vec2(1.0, 2.0)), vec2(1.0, 2.0)));
    }

    #[test]
    fn recording_rect_applies_active_transform() {
        let mut draw = RecordingDraw::new();
        draw.translate(100.0, 0.0);
        draw.fill_rect(0.0, 0.0, 10.0, 10.0, WHITE);
        match &draw.cmds[0] {
            DrawCmd::Rect { corners, .. } => {
                assert!(close(corners[0], vec2(100.0, 0.0)));
                assert!(close(corners[2], vec2(110.0, 10.0)));
            }
            other => panic!("expected rect, got {other:?}"),
        }
    }
}
