/*
MIT License

Copyright (c) 2021, 2022, 2024, 2025 Vincent Hiribarren

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

use std::collections::VecDeque;

use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::Key as LogicalKey;

use crate::Dimensions;

/// Keys the interaction loop reacts to, matched on the layout-aware key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    W,
    A,
    S,
    D,
    Other,
}

impl Key {
    fn from_logical(key: &LogicalKey) -> Self {
        let LogicalKey::Character(text) = key else {
            return Self::Other;
        };
        match text.to_lowercase().as_str() {
            "w" => Self::W,
            "a" => Self::A,
            "s" => Self::S,
            "d" => Self::D,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    Quit,
    Resized(Dimensions),
    KeyDown(Key),
}

impl PlatformEvent {
    /// Maps the window events the loop cares about. Everything else, as well
    /// as resizes to an empty area, is dropped.
    #[must_use]
    pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
        match event {
            WindowEvent::CloseRequested => Some(Self::Quit),
            WindowEvent::Resized(size) => {
                let dimensions = Dimensions {
                    width: size.width,
                    height: size.height,
                };
                (!dimensions.is_empty()).then_some(Self::Resized(dimensions))
            }
            WindowEvent::KeyboardInput { event, .. } => Self::from_key_event(event),
            _ => None,
        }
    }

    fn from_key_event(event: &KeyEvent) -> Option<Self> {
        (event.state == ElementState::Pressed)
            .then(|| Self::KeyDown(Key::from_logical(&event.logical_key)))
    }
}

/// What the interaction loop pulls its input from.
pub trait EventSource {
    /// Next pending event, `None` once the queue is drained. Never blocks.
    fn poll_event(&mut self) -> Option<PlatformEvent>;
    /// Mouse motion accumulated since the previous call.
    fn relative_mouse_delta(&mut self) -> (f32, f32);
}

/// Input gathered between two ticks.
#[derive(Debug, Default)]
pub struct PlatformInput {
    pending: VecDeque<PlatformEvent>,
    mouse_delta: (f64, f64),
}

impl PlatformInput {
    pub fn push(&mut self, event: PlatformEvent) {
        self.pending.push_back(event);
    }
    pub fn accumulate_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl EventSource for PlatformInput {
    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.pending.pop_front()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn relative_mouse_delta(&mut self) -> (f32, f32) {
        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        (dx as f32, dy as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;
    use winit::keyboard::{NamedKey, SmolStr};

    #[test]
    fn events_are_polled_in_order_then_drained() {
        let mut input = PlatformInput::default();
        input.push(PlatformEvent::KeyDown(Key::W));
        input.push(PlatformEvent::Quit);
        assert_eq!(input.pending_count(), 2);
        assert_eq!(input.poll_event(), Some(PlatformEvent::KeyDown(Key::W)));
        assert_eq!(input.poll_event(), Some(PlatformEvent::Quit));
        assert_eq!(input.poll_event(), None);
    }

    #[test]
    fn mouse_delta_accumulates_and_resets_on_read() {
        let mut input = PlatformInput::default();
        input.accumulate_mouse_motion(3.0, -1.0);
        input.accumulate_mouse_motion(2.0, -4.0);
        assert_eq!(input.relative_mouse_delta(), (5.0, -5.0));
        assert_eq!(input.relative_mouse_delta(), (0.0, 0.0));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let upper = LogicalKey::Character(SmolStr::new("W"));
        let lower = LogicalKey::Character(SmolStr::new("d"));
        assert_eq!(Key::from_logical(&upper), Key::W);
        assert_eq!(Key::from_logical(&lower), Key::D);
        assert_eq!(
            Key::from_logical(&LogicalKey::Character(SmolStr::new("q"))),
            Key::Other
        );
        assert_eq!(Key::from_logical(&LogicalKey::Named(NamedKey::Escape)), Key::Other);
    }

    #[test]
    fn window_events_translate() {
        assert_eq!(
            PlatformEvent::from_window_event(&WindowEvent::CloseRequested),
            Some(PlatformEvent::Quit)
        );
        assert_eq!(
            PlatformEvent::from_window_event(&WindowEvent::Resized(PhysicalSize::new(640, 360))),
            Some(PlatformEvent::Resized(Dimensions {
                width: 640,
                height: 360
            }))
        );
        assert_eq!(
            PlatformEvent::from_window_event(&WindowEvent::Resized(PhysicalSize::new(0, 0))),
            None
        );
        assert_eq!(
            PlatformEvent::from_window_event(&WindowEvent::Focused(true)),
            None
        );
    }
}
