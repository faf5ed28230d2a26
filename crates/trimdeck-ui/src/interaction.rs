//! Pointer handling for the timeline: trim handles, volume line, scrubbing.
//!
//! The drag kind is decided once at pointer-down and held until release, so
//! a handle drag that wanders over the volume line stays a handle drag.

use crate::renderer::{volume_to_y, y_to_volume, TimelineLayout};
use egui::{CursorIcon, Pos2};
use trimdeck_core::{EditorConfig, TimelineViewport, TrackKind, TrimEdge};
use trimdeck_timeline::TrimRange;

/// What a pointer-down grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Handle(TrimEdge),
    Volume,
    Scrub,
}

/// Editor operation produced by a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineAction {
    SelectTrack(TrackKind),
    /// Playback must not run while an edge moves.
    Pause,
    DragEdge(TrimEdge, f64),
    SetVolume(f32),
    Seek(f64),
}

/// Hit radii in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRadii {
    pub handle: f32,
    pub volume: f32,
}

impl HitRadii {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            handle: config.handle_hit_radius_px as f32,
            volume: config.volume_hit_radius_px as f32,
        }
    }
}

impl Default for HitRadii {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

/// Resolve a pointer-down position to a drag kind.
///
/// Priority: trim handle within radius (nearer edge wins), then the volume
/// line inside the audio lane, then scrubbing anywhere in the content area.
pub fn hit_test(
    pos: Pos2,
    layout: &TimelineLayout,
    viewport: &TimelineViewport,
    range: TrimRange,
    volume: Option<f32>,
    radii: HitRadii,
) -> Option<DragKind> {
    if !layout.content.contains(pos) {
        return None;
    }

    if layout.lanes().contains(pos) {
        let d_in = (pos.x - layout.time_to_x(viewport, range.in_point)).abs();
        let d_out = (pos.x - layout.time_to_x(viewport, range.out_point)).abs();
        let nearest = if d_out < d_in {
            (TrimEdge::Out, d_out)
        } else {
            (TrimEdge::In, d_in)
        };
        if nearest.1 <= radii.handle {
            return Some(DragKind::Handle(nearest.0));
        }
    }

    if let Some(volume) = volume {
        let lane = layout.audio_lane;
        if lane.contains(pos) && (pos.y - volume_to_y(lane, volume)).abs() <= radii.volume {
            return Some(DragKind::Volume);
        }
    }

    Some(DragKind::Scrub)
}

/// Pointer cursor while hovering or dragging.
pub fn cursor_for(kind: Option<DragKind>) -> CursorIcon {
    match kind {
        Some(DragKind::Handle(_)) => CursorIcon::ResizeHorizontal,
        Some(DragKind::Volume) => CursorIcon::ResizeVertical,
        Some(DragKind::Scrub) => CursorIcon::Text,
        None => CursorIcon::Default,
    }
}

/// Tracks the drag in progress between pointer-down and pointer-up.
#[derive(Debug, Default)]
pub struct DragController {
    active: Option<DragKind>,
    pub radii: HitRadii,
}

impl DragController {
    pub fn new(radii: HitRadii) -> Self {
        Self { active: None, radii }
    }

    pub fn active(&self) -> Option<DragKind> {
        self.active
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Start an interaction. `volume` is `None` when the volume line is hidden.
    pub fn pointer_down(
        &mut self,
        pos: Pos2,
        layout: &TimelineLayout,
        viewport: &TimelineViewport,
        range: TrimRange,
        volume: Option<f32>,
    ) -> Vec<TimelineAction> {
        let mut actions = Vec::new();
        if let Some(track) = layout.label_at(pos) {
            actions.push(TimelineAction::SelectTrack(track));
            return actions;
        }

        let Some(kind) = hit_test(pos, layout, viewport, range, volume, self.radii) else {
            return actions;
        };
        if let Some(track) = layout.track_at(pos) {
            actions.push(TimelineAction::SelectTrack(track));
        }
        self.active = Some(kind);
        match kind {
            DragKind::Handle(_) => actions.push(TimelineAction::Pause),
            DragKind::Volume => actions.push(TimelineAction::SetVolume(y_to_volume(layout.audio_lane, pos.y))),
            DragKind::Scrub => actions.push(TimelineAction::Seek(layout.x_to_time(viewport, pos.x))),
        }
        actions
    }

    /// Continue the current drag. The position may be outside the widget.
    pub fn pointer_move(
        &mut self,
        pos: Pos2,
        layout: &TimelineLayout,
        viewport: &TimelineViewport,
    ) -> Option<TimelineAction> {
        let t = layout.x_to_time(viewport, pos.x);
        match self.active? {
            DragKind::Handle(edge) => Some(TimelineAction::DragEdge(edge, t)),
            DragKind::Volume => Some(TimelineAction::SetVolume(y_to_volume(layout.audio_lane, pos.y))),
            DragKind::Scrub => Some(TimelineAction::Seek(t)),
        }
    }

    pub fn pointer_up(&mut self) -> Option<DragKind> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;
    use egui::{Rect, Vec2};
    use trimdeck_core::MediaKind;

    // 10 s over 200 px: 20 px per second, content starts at LABEL_WIDTH.
    fn setup(kind: MediaKind) -> (TimelineLayout, TimelineViewport, TrimRange) {
        let height = TimelineLayout::height(kind, 80.0);
        let layout = TimelineLayout::new(
            Rect::from_min_size(Pos2::ZERO, Vec2::new(Theme::LABEL_WIDTH + 200.0, height)),
            kind,
            80.0,
        );
        let range = TrimRange {
            in_point: 2.0,
            out_point: 8.0,
        };
        (layout, TimelineViewport::new(10.0, 200.0), range)
    }

    fn x(t: f32) -> f32 {
        Theme::LABEL_WIDTH + t * 20.0
    }

    #[test]
    fn test_handle_beats_volume_line() {
        let (layout, viewport, range) = setup(MediaKind::Audio);
        let y = volume_to_y(layout.audio_lane, 1.0);
        let kind = hit_test(Pos2::new(x(2.0) + 3.0, y), &layout, &viewport, range, Some(1.0), HitRadii::default());
        assert_eq!(kind, Some(DragKind::Handle(TrimEdge::In)));

        let kind = hit_test(Pos2::new(x(5.0), y), &layout, &viewport, range, Some(1.0), HitRadii::default());
        assert_eq!(kind, Some(DragKind::Volume));

        let kind = hit_test(Pos2::new(x(5.0), y), &layout, &viewport, range, None, HitRadii::default());
        assert_eq!(kind, Some(DragKind::Scrub));
    }

    #[test]
    fn test_nearer_edge_wins() {
        let (layout, viewport, _) = setup(MediaKind::Audio);
        let range = TrimRange {
            in_point: 5.0,
            out_point: 5.25,
        };
        let y = layout.audio_lane.top() + 4.0;
        let kind = hit_test(Pos2::new(x(5.25) + 1.0, y), &layout, &viewport, range, None, HitRadii::default());
        assert_eq!(kind, Some(DragKind::Handle(TrimEdge::Out)));
        let kind = hit_test(Pos2::new(x(5.0) - 1.0, y), &layout, &viewport, range, None, HitRadii::default());
        assert_eq!(kind, Some(DragKind::Handle(TrimEdge::In)));
    }

    #[test]
    fn test_ruler_only_scrubs() {
        let (layout, viewport, range) = setup(MediaKind::Video);
        let kind = hit_test(Pos2::new(x(2.0), 5.0), &layout, &viewport, range, Some(1.0), HitRadii::default());
        assert_eq!(kind, Some(DragKind::Scrub));
    }

    #[test]
    fn test_label_click_selects_without_drag() {
        let (layout, viewport, range) = setup(MediaKind::Video);
        let mut controller = DragController::default();
        let lane = layout.video_lane.unwrap();
        let actions = controller.pointer_down(Pos2::new(5.0, lane.center().y), &layout, &viewport, range, None);
        assert_eq!(actions, vec![TimelineAction::SelectTrack(TrackKind::Video)]);
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_handle_drag_pauses_and_stays_locked() {
        let (layout, viewport, range) = setup(MediaKind::Video);
        let mut controller = DragController::default();
        let lane = layout.audio_lane;
        let actions = controller.pointer_down(Pos2::new(x(8.0), lane.center().y), &layout, &viewport, range, Some(1.0));
        assert_eq!(
            actions,
            vec![TimelineAction::SelectTrack(TrackKind::Audio), TimelineAction::Pause]
        );

        // Moving over the volume line and past the right edge keeps the handle.
        let y = volume_to_y(lane, 1.0);
        let action = controller.pointer_move(Pos2::new(x(6.0), y), &layout, &viewport);
        assert_eq!(action, Some(TimelineAction::DragEdge(TrimEdge::Out, 6.0)));
        let action = controller.pointer_move(Pos2::new(x(20.0), -50.0), &layout, &viewport);
        assert_eq!(action, Some(TimelineAction::DragEdge(TrimEdge::Out, 10.0)));

        assert_eq!(controller.pointer_up(), Some(DragKind::Handle(TrimEdge::Out)));
        assert_eq!(controller.pointer_move(Pos2::new(x(1.0), y), &layout, &viewport), None);
    }

    #[test]
    fn test_scrub_seeks_on_every_move() {
        let (layout, viewport, range) = setup(MediaKind::Audio);
        let mut controller = DragController::default();
        let actions = controller.pointer_down(Pos2::new(x(1.0), 5.0), &layout, &viewport, range, None);
        assert_eq!(actions, vec![TimelineAction::Seek(1.0)]);
        assert_eq!(
            controller.pointer_move(Pos2::new(x(4.0), 300.0), &layout, &viewport),
            Some(TimelineAction::Seek(4.0))
        );
        assert_eq!(
            controller.pointer_move(Pos2::new(-100.0, 5.0), &layout, &viewport),
            Some(TimelineAction::Seek(0.0))
        );
    }

    #[test]
    fn test_volume_drag_maps_height() {
        let (layout, viewport, range) = setup(MediaKind::Audio);
        let mut controller = DragController::default();
        let lane = layout.audio_lane;
        let y = volume_to_y(lane, 1.0);
        let actions = controller.pointer_down(Pos2::new(x(5.0), y), &layout, &viewport, range, Some(1.0));
        assert_eq!(
            actions,
            vec![TimelineAction::SelectTrack(TrackKind::Audio), TimelineAction::SetVolume(1.0)]
        );
        assert_eq!(
            controller.pointer_move(Pos2::new(x(5.0), lane.top()), &layout, &viewport),
            Some(TimelineAction::SetVolume(2.0))
        );
        assert_eq!(
            controller.pointer_move(Pos2::new(x(5.0), lane.bottom() + 40.0), &layout, &viewport),
            Some(TimelineAction::SetVolume(0.0))
        );
    }

    #[test]
    fn test_cursor_icons() {
        assert_eq!(cursor_for(Some(DragKind::Handle(TrimEdge::In))), CursorIcon::ResizeHorizontal);
        assert_eq!(cursor_for(None), CursorIcon::Default);
    }
}
