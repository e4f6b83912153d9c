use std::rc::Rc;

use crate::config::TouchPolicy;
use crate::guard::{DrawingGuard, PageLock};
use crate::Point;

const PRIMARY_BUTTON: i16 = 0;
const PRIMARY_BUTTON_MASK: u16 = 1;
/// How far (CSS px) a touch may land from the pointer it echoes.
const ECHO_RADIUS: f32 = 24.0;

/// Identity of one contact. Pointer ids and touch identifiers come from
/// different counters, so they are kept apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputId {
    Pointer(i32),
    Touch(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Pen,
    Mouse,
    Touch,
    Unknown,
}

impl PointerKind {
    pub fn from_pointer_type(value: &str) -> Self {
        match value {
            "pen" => PointerKind::Pen,
            "mouse" => PointerKind::Mouse,
            "touch" => PointerKind::Touch,
            _ => PointerKind::Unknown,
        }
    }
}

/// Touch-point classification, where the platform provides one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchKind {
    Stylus,
    Direct,
    Unreported,
}

impl TouchKind {
    pub fn from_touch_type(value: Option<&str>) -> Self {
        match value {
            Some("stylus") => TouchKind::Stylus,
            Some("direct") => TouchKind::Direct,
            _ => TouchKind::Unreported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Start,
    Move,
    End,
    Cancel,
}

#[derive(Clone, Copy, Debug)]
pub struct PointerSample {
    pub id: i32,
    pub kind: PointerKind,
    pub phase: Phase,
    /// Button that changed state (`PointerEvent.button`).
    pub button: i16,
    /// Buttons currently held (`PointerEvent.buttons`).
    pub buttons: u16,
    pub point: Point,
    pub timestamp: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct TouchContact {
    pub id: i32,
    pub kind: TouchKind,
    pub point: Point,
}

/// One touch event: the contacts that changed plus every contact still on the surface.
#[derive(Clone, Debug)]
pub struct TouchBatch {
    pub phase: Phase,
    pub timestamp: f64,
    pub changed: Vec<TouchContact>,
    pub touches: Vec<TouchContact>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Not a drawing input; the browser default (usually scrolling) proceeds.
    Pass,
    /// Belongs to the active gesture but carries nothing to draw.
    Absorb,
    Begin { id: InputId, point: Point },
    Extend(Point),
    Finish,
}

/// Pointer capture change the host should apply after a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capture {
    Keep,
    Acquire(i32),
    Release(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Pen,
    Mouse,
    Stylus,
    Finger,
}

impl Source {
    fn is_stylus(self) -> bool {
        matches!(self, Source::Pen | Source::Stylus)
    }
}

struct ActiveGesture {
    id: InputId,
    source: Source,
    last_timestamp: f64,
    last_point: Point,
    /// Touch identifier the browser reports for this same contact.
    echo: Option<i32>,
    _guard: DrawingGuard,
}

impl ActiveGesture {
    /// Pens and fingers tracked through pointer events also fire touch
    /// events. Those must be cancelled or Chromium pans the page.
    fn has_touch_echo(&self) -> bool {
        matches!(self.id, InputId::Pointer(_)) && matches!(self.source, Source::Pen | Source::Finger)
    }
}

enum GestureState {
    Idle,
    Drawing(ActiveGesture),
}

/// Decides per event whether it is ink or something the page should handle.
///
/// `Idle -> Drawing -> Idle`. Entering `Drawing` records the accepted identity
/// and takes a [`DrawingGuard`]; leaving it drops the guard.
pub struct InputClassifier {
    policy: TouchPolicy,
    palm_rejection: bool,
    lock: Rc<dyn PageLock>,
    state: GestureState,
}

impl InputClassifier {
    pub fn new(policy: TouchPolicy, palm_rejection: bool, lock: Rc<dyn PageLock>) -> Self {
        Self {
            policy,
            palm_rejection,
            lock,
            state: GestureState::Idle,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, GestureState::Drawing(_))
    }

    pub fn active_id(&self) -> Option<InputId> {
        match &self.state {
            GestureState::Drawing(active) => Some(active.id),
            GestureState::Idle => None,
        }
    }

    pub fn classify_pointer(&mut self, sample: &PointerSample) -> Decision {
        let id = InputId::Pointer(sample.id);
        match sample.phase {
            Phase::Start => {
                if self.is_drawing() {
                    tracing::trace!(?id, "start ignored, another gesture is active");
                    return Decision::Pass;
                }
                let source = match sample.kind {
                    PointerKind::Pen => Source::Pen,
                    PointerKind::Mouse if sample.button == PRIMARY_BUTTON => Source::Mouse,
                    PointerKind::Touch if self.policy == TouchPolicy::Always => Source::Finger,
                    kind => {
                        tracing::trace!(?kind, button = sample.button, "pointer rejected");
                        return Decision::Pass;
                    }
                };
                self.begin(id, source, sample.timestamp, sample.point)
            }
            Phase::Move => {
                let Some(active) = self.active_mut(id) else {
                    return Decision::Pass;
                };
                if active.source == Source::Mouse && sample.buttons & PRIMARY_BUTTON_MASK == 0 {
                    // The button came up somewhere we never heard about.
                    return self.finish();
                }
                advance(active, sample.timestamp, sample.point)
            }
            Phase::End | Phase::Cancel => {
                if self.active_id() != Some(id) {
                    return Decision::Pass;
                }
                self.finish()
            }
        }
    }

    pub fn classify_touches(&mut self, batch: &TouchBatch) -> Decision {
        if let Some(decision) = self.absorb_echo(batch) {
            return decision;
        }
        match batch.phase {
            Phase::Start => {
                if self.is_drawing() {
                    return stray_touches(batch);
                }
                let Some((contact, source)) = self.select_contact(batch) else {
                    tracing::trace!(touches = batch.touches.len(), "touch batch rejected");
                    return Decision::Pass;
                };
                self.begin(
                    InputId::Touch(contact.id),
                    source,
                    batch.timestamp,
                    contact.point,
                )
            }
            Phase::Move => {
                let Some(active_id) = self.active_id() else {
                    return Decision::Pass;
                };
                let Some(contact) = find_contact(&batch.changed, active_id) else {
                    return stray_touches(batch);
                };
                match self.active_mut(active_id) {
                    Some(active) => advance(active, batch.timestamp, contact.point),
                    None => Decision::Pass,
                }
            }
            Phase::End | Phase::Cancel => {
                let Some(active_id) = self.active_id() else {
                    return Decision::Pass;
                };
                if find_contact(&batch.changed, active_id).is_none() {
                    return Decision::Pass;
                }
                self.finish()
            }
        }
    }

    pub fn lost_capture(&mut self, id: InputId) -> Decision {
        if self.active_id() != Some(id) {
            return Decision::Pass;
        }
        tracing::debug!(?id, "pointer capture lost mid-gesture");
        self.finish()
    }

    /// Drops any active gesture. Returns the identity that was drawing, if any.
    pub fn release(&mut self) -> Option<InputId> {
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::Drawing(active) => Some(active.id),
            GestureState::Idle => None,
        }
    }

    /// Claims the touch that lands on the active pointer's position and
    /// swallows every batch that moves it.
    fn absorb_echo(&mut self, batch: &TouchBatch) -> Option<Decision> {
        let GestureState::Drawing(active) = &mut self.state else {
            return None;
        };
        if !active.has_touch_echo() {
            return None;
        }
        if active.echo.is_none() && batch.phase == Phase::Start {
            active.echo = nearest_contact(&batch.changed, active.last_point).map(|contact| contact.id);
            if let Some(echo) = active.echo {
                tracing::trace!(id = ?active.id, echo, "touch echo claimed");
            }
        }
        let echo = active.echo?;
        batch
            .changed
            .iter()
            .any(|contact| contact.id == echo)
            .then_some(Decision::Absorb)
    }

    fn select_contact<'a>(&self, batch: &'a TouchBatch) -> Option<(&'a TouchContact, Source)> {
        let reported = batch
            .touches
            .iter()
            .any(|contact| contact.kind != TouchKind::Unreported);
        if reported {
            if let Some(stylus) = batch
                .touches
                .iter()
                .find(|contact| contact.kind == TouchKind::Stylus)
            {
                return Some((stylus, Source::Stylus));
            }
            if self.policy != TouchPolicy::Always {
                return None;
            }
        } else if self.policy == TouchPolicy::Never {
            return None;
        }
        // Several unclassified contacts at once are a pinch or a scroll.
        match batch.touches.as_slice() {
            [only] => Some((only, Source::Finger)),
            _ => None,
        }
    }

    fn begin(&mut self, id: InputId, source: Source, timestamp: f64, point: Point) -> Decision {
        let Some(point) = point.normalize() else {
            return Decision::Pass;
        };
        let palm = self.palm_rejection && source.is_stylus();
        let guard = DrawingGuard::acquire(self.lock.clone(), palm);
        tracing::debug!(?id, ?source, "gesture started");
        self.state = GestureState::Drawing(ActiveGesture {
            id,
            source,
            last_timestamp: timestamp,
            last_point: point,
            echo: None,
            _guard: guard,
        });
        Decision::Begin { id, point }
    }

    fn finish(&mut self) -> Decision {
        if let Some(id) = self.release() {
            tracing::debug!(?id, "gesture finished");
        }
        Decision::Finish
    }

    fn active_mut(&mut self, id: InputId) -> Option<&mut ActiveGesture> {
        match &mut self.state {
            GestureState::Drawing(active) if active.id == id => Some(active),
            _ => None,
        }
    }
}

fn advance(active: &mut ActiveGesture, timestamp: f64, point: Point) -> Decision {
    if timestamp < active.last_timestamp {
        return Decision::Absorb;
    }
    active.last_timestamp = timestamp;
    match point.normalize() {
        Some(point) => {
            active.last_point = point;
            Decision::Extend(point)
        }
        None => Decision::Absorb,
    }
}

/// Touches that are not part of the active gesture. A pen that also reports
/// itself through touch events is already drawing via pointer events, so its
/// touches are swallowed to keep them from scrolling the page.
fn stray_touches(batch: &TouchBatch) -> Decision {
    if batch
        .changed
        .iter()
        .any(|contact| contact.kind == TouchKind::Stylus)
    {
        Decision::Absorb
    } else {
        Decision::Pass
    }
}

fn nearest_contact(contacts: &[TouchContact], point: Point) -> Option<&TouchContact> {
    contacts
        .iter()
        .map(|contact| {
            let dx = contact.point.x - point.x;
            let dy = contact.point.y - point.y;
            (contact, dx * dx + dy * dy)
        })
        .filter(|(_, distance)| *distance <= ECHO_RADIUS * ECHO_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(contact, _)| contact)
}

fn find_contact(contacts: &[TouchContact], id: InputId) -> Option<&TouchContact> {
    let InputId::Touch(touch_id) = id else {
        return None;
    };
    contacts.iter().find(|contact| contact.id == touch_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pointer, touch, touches, RecordingLock};

    fn classifier(policy: TouchPolicy) -> (InputClassifier, Rc<RecordingLock>) {
        let lock = Rc::new(RecordingLock::default());
        (InputClassifier::new(policy, true, lock.clone()), lock)
    }

    #[test]
    fn pen_is_always_accepted() {
        let (mut classifier, lock) = classifier(TouchPolicy::Never);
        let decision = classifier.classify_pointer(&pointer(1, PointerKind::Pen, Phase::Start, 4.0, 5.0));
        assert_eq!(
            decision,
            Decision::Begin {
                id: InputId::Pointer(1),
                point: Point::new(4.0, 5.0)
            }
        );
        assert!(lock.scroll_suspended());
        assert!(lock.palm_blocked());
    }

    #[test]
    fn mouse_secondary_button_never_begins() {
        let (mut classifier, lock) = classifier(TouchPolicy::Always);
        let mut sample = pointer(1, PointerKind::Mouse, Phase::Start, 0.0, 0.0);
        sample.button = 2;
        sample.buttons = 2;
        assert_eq!(classifier.classify_pointer(&sample), Decision::Pass);
        assert!(!classifier.is_drawing());
        assert!(!lock.scroll_suspended());
    }

    #[test]
    fn mouse_gesture_ends_when_primary_button_is_gone() {
        let (mut classifier, lock) = classifier(TouchPolicy::Never);
        classifier.classify_pointer(&pointer(1, PointerKind::Mouse, Phase::Start, 0.0, 0.0));
        assert!(!lock.palm_blocked());
        let mut moved = pointer(1, PointerKind::Mouse, Phase::Move, 3.0, 3.0);
        moved.buttons = 0;
        assert_eq!(classifier.classify_pointer(&moved), Decision::Finish);
        assert!(!lock.scroll_suspended());
    }

    #[test]
    fn finger_pointer_follows_policy() {
        let (mut classifier, _) = classifier(TouchPolicy::WhenUnreported);
        let start = pointer(3, PointerKind::Touch, Phase::Start, 0.0, 0.0);
        assert_eq!(classifier.classify_pointer(&start), Decision::Pass);

        let (mut classifier, _) = self::classifier(TouchPolicy::Always);
        assert!(matches!(
            classifier.classify_pointer(&start),
            Decision::Begin { .. }
        ));
    }

    #[test]
    fn unknown_pointer_type_is_rejected() {
        let (mut classifier, _) = classifier(TouchPolicy::Always);
        let start = pointer(1, PointerKind::Unknown, Phase::Start, 0.0, 0.0);
        assert_eq!(classifier.classify_pointer(&start), Decision::Pass);
    }

    #[test]
    fn other_identities_never_interrupt() {
        let (mut classifier, lock) = classifier(TouchPolicy::Always);
        classifier.classify_pointer(&pointer(1, PointerKind::Pen, Phase::Start, 0.0, 0.0));

        let finger = pointer(2, PointerKind::Touch, Phase::Start, 50.0, 50.0);
        assert_eq!(classifier.classify_pointer(&finger), Decision::Pass);
        let finger_up = pointer(2, PointerKind::Touch, Phase::End, 50.0, 50.0);
        assert_eq!(classifier.classify_pointer(&finger_up), Decision::Pass);
        let finger_cancel = pointer(2, PointerKind::Touch, Phase::Cancel, 50.0, 50.0);
        assert_eq!(classifier.classify_pointer(&finger_cancel), Decision::Pass);
        assert_eq!(classifier.lost_capture(InputId::Pointer(2)), Decision::Pass);

        assert_eq!(classifier.active_id(), Some(InputId::Pointer(1)));
        assert!(lock.scroll_suspended());
        let pen_move = pointer(1, PointerKind::Pen, Phase::Move, 1.0, 1.0);
        assert_eq!(
            classifier.classify_pointer(&pen_move),
            Decision::Extend(Point::new(1.0, 1.0))
        );
    }

    #[test]
    fn stale_events_are_absorbed() {
        let (mut classifier, _) = classifier(TouchPolicy::Never);
        let mut start = pointer(1, PointerKind::Pen, Phase::Start, 0.0, 0.0);
        start.timestamp = 10.0;
        classifier.classify_pointer(&start);
        let mut late = pointer(1, PointerKind::Pen, Phase::Move, 9.0, 9.0);
        late.timestamp = 5.0;
        assert_eq!(classifier.classify_pointer(&late), Decision::Absorb);
    }

    #[test]
    fn stylus_is_picked_out_of_a_mixed_batch() {
        let (mut classifier, lock) = classifier(TouchPolicy::WhenUnreported);
        let palm = touch(7, TouchKind::Direct, 100.0, 100.0);
        let pen = touch(8, TouchKind::Stylus, 10.0, 20.0);
        let decision = classifier.classify_touches(&touches(Phase::Start, &[pen], &[palm, pen]));
        assert_eq!(
            decision,
            Decision::Begin {
                id: InputId::Touch(8),
                point: Point::new(10.0, 20.0)
            }
        );
        assert!(lock.palm_blocked());

        let palm_moved = touch(7, TouchKind::Direct, 120.0, 100.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Move, &[palm_moved], &[palm_moved, pen])),
            Decision::Pass
        );
        let palm_up = touches(Phase::End, &[palm_moved], &[pen]);
        assert_eq!(classifier.classify_touches(&palm_up), Decision::Pass);
        assert!(classifier.is_drawing());

        let pen_up = touches(Phase::End, &[pen], &[]);
        assert_eq!(classifier.classify_touches(&pen_up), Decision::Finish);
        assert!(!lock.palm_blocked());
    }

    #[test]
    fn fingers_alone_never_draw_when_type_is_reported() {
        let (mut classifier, lock) = classifier(TouchPolicy::WhenUnreported);
        let a = touch(1, TouchKind::Direct, 0.0, 0.0);
        let b = touch(2, TouchKind::Direct, 5.0, 0.0);
        assert_eq!(classifier.classify_touches(&touches(Phase::Start, &[a], &[a])), Decision::Pass);
        assert_eq!(classifier.classify_touches(&touches(Phase::Start, &[b], &[a, b])), Decision::Pass);
        assert_eq!(classifier.classify_touches(&touches(Phase::Move, &[a, b], &[a, b])), Decision::Pass);
        assert_eq!(classifier.classify_touches(&touches(Phase::End, &[a, b], &[])), Decision::Pass);
        assert!(!classifier.is_drawing());
        assert_eq!(lock.scroll_suspensions(), 0);
    }

    #[test]
    fn unreported_single_touch_falls_back_to_drawing() {
        let (mut classifier, _) = classifier(TouchPolicy::WhenUnreported);
        let a = touch(1, TouchKind::Unreported, 3.0, 3.0);
        assert!(matches!(
            classifier.classify_touches(&touches(Phase::Start, &[a], &[a])),
            Decision::Begin { id: InputId::Touch(1), .. }
        ));
    }

    #[test]
    fn unreported_multi_touch_is_left_to_the_page() {
        let (mut classifier, _) = classifier(TouchPolicy::WhenUnreported);
        let a = touch(1, TouchKind::Unreported, 3.0, 3.0);
        let b = touch(2, TouchKind::Unreported, 9.0, 3.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Start, &[a, b], &[a, b])),
            Decision::Pass
        );
    }

    #[test]
    fn never_policy_blocks_the_fallback() {
        let (mut classifier, _) = classifier(TouchPolicy::Never);
        let a = touch(1, TouchKind::Unreported, 3.0, 3.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Start, &[a], &[a])),
            Decision::Pass
        );
    }

    #[test]
    fn always_policy_lets_a_lone_finger_draw() {
        let (mut classifier, lock) = classifier(TouchPolicy::Always);
        let a = touch(1, TouchKind::Direct, 3.0, 3.0);
        assert!(matches!(
            classifier.classify_touches(&touches(Phase::Start, &[a], &[a])),
            Decision::Begin { .. }
        ));
        assert!(lock.scroll_suspended());
        assert!(!lock.palm_blocked());
    }

    #[test]
    fn pen_echoed_as_touch_is_swallowed() {
        let (mut classifier, _) = classifier(TouchPolicy::WhenUnreported);
        classifier.classify_pointer(&pointer(1, PointerKind::Pen, Phase::Start, 0.0, 0.0));
        let echo = touch(9, TouchKind::Stylus, 0.0, 0.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Start, &[echo], &[echo])),
            Decision::Absorb
        );
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Move, &[echo], &[echo])),
            Decision::Absorb
        );
        assert_eq!(classifier.active_id(), Some(InputId::Pointer(1)));
    }

    #[test]
    fn unreported_echo_of_a_pen_is_swallowed_until_lifted() {
        let (mut classifier, _) = classifier(TouchPolicy::WhenUnreported);
        classifier.classify_pointer(&pointer(1, PointerKind::Pen, Phase::Start, 10.0, 10.0));
        let echo = touch(5, TouchKind::Unreported, 11.0, 9.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Start, &[echo], &[echo])),
            Decision::Absorb
        );

        // a second finger far from the pen still scrolls
        let other = touch(6, TouchKind::Unreported, 200.0, 200.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Start, &[other], &[echo, other])),
            Decision::Pass
        );

        let moved = touch(5, TouchKind::Unreported, 40.0, 9.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Move, &[moved], &[moved, other])),
            Decision::Absorb
        );
        assert_eq!(
            classifier.classify_touches(&touches(Phase::End, &[moved], &[other])),
            Decision::Absorb
        );
        assert_eq!(classifier.active_id(), Some(InputId::Pointer(1)));
    }

    #[test]
    fn mouse_gestures_claim_no_echo() {
        let (mut classifier, _) = classifier(TouchPolicy::WhenUnreported);
        classifier.classify_pointer(&pointer(1, PointerKind::Mouse, Phase::Start, 10.0, 10.0));
        let finger = touch(5, TouchKind::Unreported, 10.0, 10.0);
        assert_eq!(
            classifier.classify_touches(&touches(Phase::Start, &[finger], &[finger])),
            Decision::Pass
        );
    }

    #[test]
    fn lost_capture_ends_the_gesture() {
        let (mut classifier, lock) = classifier(TouchPolicy::Never);
        classifier.classify_pointer(&pointer(4, PointerKind::Pen, Phase::Start, 0.0, 0.0));
        assert_eq!(classifier.lost_capture(InputId::Pointer(4)), Decision::Finish);
        assert!(!classifier.is_drawing());
        assert!(!lock.scroll_suspended());
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let (mut classifier, lock) = classifier(TouchPolicy::Never);
        let start = pointer(1, PointerKind::Pen, Phase::Start, f32::NAN, 0.0);
        assert_eq!(classifier.classify_pointer(&start), Decision::Pass);
        assert_eq!(lock.scroll_suspensions(), 0);
    }
}
