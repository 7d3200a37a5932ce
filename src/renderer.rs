use std::sync::atomic::{AtomicU64, Ordering};

use macroquad::prelude::*;

use crate::gfx::DrawContext;
use crate::model::{Mpd218Model, NUM_KNOBS};

/// Angular display slots do not follow the physical knob order: the Nth slot
/// around the hexagon shows the knob this table names, so the on-screen ring
/// matches the panel layout of the hardware rather than its CC numbering.
const HEX_SLOT_TO_KNOB: [usize; NUM_KNOBS] = [3, 1, 0, 2, 4, 5];

const SLOT_STEP_DEG: f32 = 360.0 / NUM_KNOBS as f32;
const HEX_INNER_RADIUS: f32 = 158.0;
const HEX_HALF_SIDE: f32 = 91.5;
const HEX_VALUE_REACH: f32 = 800.0;
const SIMPLE_HEX_RADIUS: f32 = 250.0;
const SIMPLE_HEX_HALF_WIDTH: f32 = 60.0;
const PAD_GRID_SPACING: f32 = 128.0;
const PAD_GRID_SIDE: f32 = 100.0;
const PAD_GRID_INSET: f32 = 500.0;
const BAR_WIDTH: f32 = 80.0;
const BAR_HEIGHT: f32 = 400.0;
const BREATH_RATE: f64 = 0.4;
const BREATH_DEPTH: f32 = 0.05;

/// Below this the flash is snapped to exactly zero so the overlay stops
/// re-rendering on floating-point tails.
const FLASH_FLOOR: f32 = 0.001;

/// Per-frame visual state machine for the control surface. Consumes a
/// read-only device snapshot plus a frame delta and issues draw calls in a
/// fixed order: flash wash (while active), hexagonal knob ring, pad grid.
pub struct Renderer {
    time: f64,
    scale: f32,
    flash: FlashPair,
    viewport_w: f32,
    viewport_h: f32,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            scale: 1.0,
            flash: FlashPair::new(),
            viewport_w: 0.0,
            viewport_h: 0.0,
        }
    }

    /// Stores the drawable dimensions verbatim; call on every resize.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_w = width;
        self.viewport_h = height;
    }

    /// Applies an external trigger tuple. Param 0 carries percentage-scaled
    /// flash intensity and decay; every other param is reserved and ignored.
    /// Values are not clamped, so an over-range intensity renders extra
    /// bright for a few frames. Safe to call from any thread.
    pub fn ingest_osc_message(&self, param: i32, val1: i32, val2: i32) {
        if param == 0 {
            self.flash.set(val1 as f32 / 100.0, val2 as f32 / 100.0);
        }
    }

    pub fn render(&mut self, dt: f64, model: &Mpd218Model, draw: &mut impl DrawContext) {
        self.time += dt;
        self.scale = 1.0 + BREATH_DEPTH * ((self.time * BREATH_RATE).sin() as f32);

        let intensity = self.flash.decay();
        if intensity > 0.0 {
            self.render_flash(intensity, draw);
        }
        self.render_hexagon(model, draw);
        self.render_pad_grid(model, draw);
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn flash_intensity(&self) -> f32 {
        self.flash.get().0
    }

    pub fn flash_decay(&self) -> f32 {
        self.flash.get().1
    }

    fn render_flash(&self, intensity: f32, draw: &mut impl DrawContext) {
        draw.fill_rect(
            0.0,
            0.0,
            self.viewport_w,
            self.viewport_h,
            Color::new(0.0, 0.0, 1.0, intensity),
        );
    }

    /// One quadrilateral spoke per slot: inner edge fixed on the hexagon,
    /// outer edge pushed out by the knob value. The whole ring breathes with
    /// the global scale. Slots repeat by composing one rotation per step;
    /// only the two half-angle outer vertices ever touch trigonometry.
    fn render_hexagon(&self, model: &Mpd218Model, draw: &mut impl DrawContext) {
        let half_angle = std::f32::consts::TAU / NUM_KNOBS as f32 * 0.5;

        draw.push();
        draw.translate(self.viewport_w * 0.5, self.viewport_h * 0.5);
        draw.scale(self.scale, self.scale);
        for slot in 0..NUM_KNOBS {
            let knob = HEX_SLOT_TO_KNOB[slot];
            let value = f32::from(model.knob_values[knob]) / 128.0;
            let color = if Some(knob) == model.knob_last_updated {
                Color::new(1.0, 0.0, 0.0, value)
            } else {
                Color::new(0.85, 0.85, 0.85, value)
            };
            let outer = HEX_INNER_RADIUS + HEX_VALUE_REACH * value;
            draw.fill_quad(
                [
                    vec2(HEX_INNER_RADIUS, -HEX_HALF_SIDE),
                    vec2(HEX_INNER_RADIUS, HEX_HALF_SIDE),
                    vec2(outer * half_angle.cos(), outer * half_angle.sin()),
                    vec2(outer * half_angle.cos(), -(outer * half_angle.sin())),
                ],
                color,
            );
            draw.rotate_deg(SLOT_STEP_DEG);
        }
        draw.pop();
    }

    /// 4x4 pad bank anchored off the viewport's bottom-right extent. Active
    /// pads fill red, idle pads stay faint outlines.
    fn render_pad_grid(&self, model: &Mpd218Model, draw: &mut impl DrawContext) {
        let grid_x = self.viewport_w - PAD_GRID_INSET;
        let grid_y = self.viewport_h - PAD_GRID_INSET;
        for yi in 0..4 {
            for xi in 0..4 {
                let pad = yi * 4 + xi;
                let x = grid_x + xi as f32 * PAD_GRID_SPACING;
                let y = grid_y + yi as f32 * PAD_GRID_SPACING;
                let corners = [
                    vec2(x, y),
                    vec2(x + PAD_GRID_SIDE, y),
                    vec2(x + PAD_GRID_SIDE, y + PAD_GRID_SIDE),
                    vec2(x, y + PAD_GRID_SIDE),
                ];
                if model.pads_active[pad] {
                    draw.fill_quad(corners, Color::new(1.0, 0.0, 0.0, 0.5));
                } else {
                    draw.line_loop(corners, Color::new(1.0, 1.0, 1.0, 0.1));
                }
            }
        }
    }

    /// Plain rectangle-spoke rendition of the knob ring. Diagnostic layer,
    /// not part of the main frame path.
    pub fn render_simple_hexagon(&self, model: &Mpd218Model, draw: &mut impl DrawContext) {
        draw.push();
        draw.translate(self.viewport_w * 0.5, self.viewport_h * 0.5);
        for slot in 0..NUM_KNOBS {
            let knob = HEX_SLOT_TO_KNOB[slot];
            let value = f32::from(model.knob_values[knob]) / 128.0;

            draw.fill_rect(
                SIMPLE_HEX_RADIUS - SIMPLE_HEX_HALF_WIDTH,
                -SIMPLE_HEX_HALF_WIDTH,
                SIMPLE_HEX_HALF_WIDTH * 2.0,
                SIMPLE_HEX_HALF_WIDTH * 2.0,
                Color::new(1.0, 1.0, 1.0, 0.1),
            );
            let color = if Some(knob) == model.knob_last_updated {
                Color::new(1.0, 0.0, 0.0, value)
            } else {
                Color::new(0.7, 0.7, 0.7, value)
            };
            draw.fill_rect(
                SIMPLE_HEX_RADIUS - SIMPLE_HEX_HALF_WIDTH,
                -SIMPLE_HEX_HALF_WIDTH,
                value * SIMPLE_HEX_HALF_WIDTH * 2.0,
                SIMPLE_HEX_HALF_WIDTH * 2.0,
                color,
            );
            draw.rotate_deg(SLOT_STEP_DEG);
        }
        draw.pop();
    }

    /// Six large vertical value bars in physical knob order, readable from
    /// across the room. Diagnostic layer, not part of the main frame path.
    pub fn render_bars(&self, model: &Mpd218Model, draw: &mut impl DrawContext) {
        let total_width = BAR_WIDTH * NUM_KNOBS as f32;

        draw.push();
        draw.translate(self.viewport_w * 0.5, self.viewport_h * 0.5);
        for (index, raw) in model.knob_values.iter().enumerate() {
            let value = f32::from(*raw) / 128.0;
            let x = total_width * -0.5 + index as f32 * BAR_WIDTH;
            let width = BAR_WIDTH * 0.97;

            draw.fill_rect(
                x,
                -BAR_HEIGHT * 0.5,
                width,
                BAR_HEIGHT,
                Color::new(1.0, 1.0, 1.0, 0.1),
            );
            let color = if Some(index) == model.knob_last_updated {
                Color::new(1.0, 0.0, 0.0, value)
            } else {
                Color::new(1.0, 1.0, 1.0, value)
            };
            let fill = BAR_HEIGHT * value;
            draw.fill_rect(x, BAR_HEIGHT * 0.5 - fill, width, fill, color);
        }
        draw.pop();
    }
}

/// Flash intensity and decay packed into one atomic word, so a trigger
/// arriving from the OSC thread can never tear the pair and is visible to
/// the next frame.
struct FlashPair(AtomicU64);

impl FlashPair {
    fn new() -> Self {
        Self(AtomicU64::new(pack_f32_pair(0.0, 0.0)))
    }

    fn get(&self) -> (f32, f32) {
        unpack_f32_pair(self.0.load(Ordering::Acquire))
    }

    fn set(&self, intensity: f32, decay: f32) {
        self.0.store(pack_f32_pair(intensity, decay), Ordering::Release);
    }

    /// One frame of geometric decay. Returns the intensity to draw with this
    /// frame; the stored value snaps to zero once it falls below the floor.
    /// If a trigger lands between the load and the store, the trigger wins
    /// and this frame's decay step is skipped.
    fn decay(&self) -> f32 {
        let old = self.0.load(Ordering::Acquire);
        let (intensity, rate) = unpack_f32_pair(old);
        let decayed = intensity * rate;
        let stored = if decayed > 0.0 && decayed < FLASH_FLOOR {
            0.0
        } else {
            decayed
        };
        let _ = self.0.compare_exchange(
            old,
            pack_f32_pair(stored, rate),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        decayed
    }
}

fn pack_f32_pair(a: f32, b: f32) -> u64 {
    ((a.to_bits() as u64) << 32) | b.to_bits() as u64
}

fn unpack_f32_pair(packed: u64) -> (f32, f32) {
    (
        f32::from_bits((packed >> 32) as u32),
        f32::from_bits(packed as u32),
    )
}
