use std::cell::Cell;

use crate::classifier::{Phase, PointerKind, PointerSample, TouchBatch, TouchContact, TouchKind};
use crate::config::LineStyle;
use crate::guard::PageLock;
use crate::render::InkCanvas;
use crate::Point;

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Allocate(u32, u32),
    Scale(f64),
    Style(LineStyle),
    Clear(f64, f64),
    LineWidth(f64),
    BeginPath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadraticTo(f64, f64, f64, f64),
    Stroke,
}

/// Canvas fake that records every call and tracks whether anything is painted.
#[derive(Default)]
pub struct RecordingCanvas {
    ops: Vec<Op>,
    backing: (u32, u32),
    inked: bool,
}

impl RecordingCanvas {
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.ops)
    }

    pub fn backing(&self) -> (u32, u32) {
        self.backing
    }

    pub fn has_ink(&self) -> bool {
        self.inked
    }
}

impl InkCanvas for RecordingCanvas {
    fn allocate(&mut self, width: u32, height: u32) {
        self.backing = (width, height);
        self.inked = false;
        self.ops.push(Op::Allocate(width, height));
    }

    fn set_scale(&mut self, ratio: f64) {
        self.ops.push(Op::Scale(ratio));
    }

    fn apply_style(&mut self, style: &LineStyle) {
        self.ops.push(Op::Style(style.clone()));
    }

    fn clear(&mut self, width: f64, height: f64) {
        self.inked = false;
        self.ops.push(Op::Clear(width, height));
    }

    fn set_line_width(&mut self, width: f64) {
        self.ops.push(Op::LineWidth(width));
    }

    fn begin_path(&mut self) {
        self.ops.push(Op::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(Op::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(Op::LineTo(x, y));
    }

    fn quadratic_curve_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.ops.push(Op::QuadraticTo(cx, cy, x, y));
    }

    fn stroke(&mut self) {
        self.inked = true;
        self.ops.push(Op::Stroke);
    }
}

#[derive(Default)]
pub struct RecordingLock {
    scroll: Cell<bool>,
    palm: Cell<bool>,
    scroll_suspensions: Cell<usize>,
    palm_blocks: Cell<usize>,
}

impl RecordingLock {
    pub fn scroll_suspended(&self) -> bool {
        self.scroll.get()
    }

    pub fn palm_blocked(&self) -> bool {
        self.palm.get()
    }

    pub fn scroll_suspensions(&self) -> usize {
        self.scroll_suspensions.get()
    }

    pub fn palm_blocks(&self) -> usize {
        self.palm_blocks.get()
    }
}

impl PageLock for RecordingLock {
    fn suspend_scroll(&self) {
        self.scroll.set(true);
        self.scroll_suspensions.set(self.scroll_suspensions.get() + 1);
    }

    fn restore_scroll(&self) {
        self.scroll.set(false);
    }

    fn block_palm(&self) {
        self.palm.set(true);
        self.palm_blocks.set(self.palm_blocks.get() + 1);
    }

    fn unblock_palm(&self) {
        self.palm.set(false);
    }
}

pub fn pointer(id: i32, kind: PointerKind, phase: Phase, x: f32, y: f32) -> PointerSample {
    let buttons = match phase {
        Phase::Start | Phase::Move => 1,
        Phase::End | Phase::Cancel => 0,
    };
    PointerSample {
        id,
        kind,
        phase,
        button: 0,
        buttons,
        point: Point::new(x, y),
        timestamp: 0.0,
    }
}

pub fn touch(id: i32, kind: TouchKind, x: f32, y: f32) -> TouchContact {
    TouchContact {
        id,
        kind,
        point: Point::new(x, y),
    }
}

pub fn touches(phase: Phase, changed: &[TouchContact], all: &[TouchContact]) -> TouchBatch {
    TouchBatch {
        phase,
        timestamp: 0.0,
        changed: changed.to_vec(),
        touches: all.to_vec(),
    }
}
