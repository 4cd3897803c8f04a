// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! macroquad window: the display pane, the "Detect" / "Save Detection" buttons and the
//! alert pane (egui).

use std::collections::VecDeque;
use std::time::Instant;

use egui_macroquad::egui;
use macroquad::prelude::*;

use crate::display::DisplaySink;
use crate::frame::Frame;
use crate::session::{SessionState, SessionStats};

/// Alert lines kept in the pane.
const MAX_ALERTS: usize = 500;

/// What the user asked for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiActions {
    pub detect: bool,
    pub save: bool,
    pub stop: bool,
}

pub struct Renderer {
    texture: Option<Texture2D>,
    with_log: bool,
    alerts: VecDeque<String>,
    status: String,
    render_count: u64,
    render_last: Instant,
    render_fps: f64,
}

impl Renderer {
    /// `with_log` adds the "Save Detection" button and the alert pane.
    pub fn new(with_log: bool) -> Self {
        Self {
            texture: None,
            with_log,
            alerts: VecDeque::new(),
            status: "Idle - press Detect".to_string(),
            render_count: 0,
            render_last: Instant::now(),
            render_fps: 0.0,
        }
    }

    pub fn push_alert(&mut self, line: impl Into<String>) {
        if self.alerts.len() == MAX_ALERTS {
            self.alerts.pop_front();
        }
        self.alerts.push_back(line.into());
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Draws the last frame letterboxed into the window.
    pub fn draw(&mut self) {
        clear_background(BLACK);

        if let Some(texture) = &self.texture {
            let scale = (screen_width() / texture.width()).min(screen_height() / texture.height());
            let w = texture.width() * scale;
            let h = texture.height() * scale;
            draw_texture_ex(
                texture,
                (screen_width() - w) / 2.0,
                (screen_height() - h) / 2.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(w, h)),
                    ..Default::default()
                },
            );
        }

        self.render_count += 1;
        let now = Instant::now();
        if now.duration_since(self.render_last).as_secs() >= 1 {
            self.render_fps =
                self.render_count as f64 / now.duration_since(self.render_last).as_secs_f64();
            self.render_count = 0;
            self.render_last = now;
        }
    }

    /// Buttons, status line and (with the log) the alert pane. Also reads the keyboard:
    /// `D` detect, `S` save, `Esc` stop.
    pub fn draw_ui(&mut self, state: SessionState, stats: SessionStats) -> UiActions {
        let mut actions = UiActions {
            detect: is_key_pressed(KeyCode::D),
            save: self.with_log && is_key_pressed(KeyCode::S),
            stop: is_key_pressed(KeyCode::Escape),
        };

        egui_macroquad::ui(|egui_ctx| {
            egui::Window::new("Fire Detection")
                .default_pos(egui::pos2(10.0, 10.0))
                .default_size(egui::vec2(320.0, 360.0))
                .resizable(true)
                .show(egui_ctx, |ui| {
                    ui.horizontal(|ui| {
                        let idle = state == SessionState::Idle;
                        if ui.add_enabled(idle, egui::Button::new("Detect")).clicked() {
                            actions.detect = true;
                        }
                        if ui.add_enabled(!idle, egui::Button::new("Stop")).clicked() {
                            actions.stop = true;
                        }
                        if self.with_log && ui.button("Save Detection").clicked() {
                            actions.save = true;
                        }
                    });

                    ui.label(&self.status);
                    ui.label(format!(
                        "cycles {} | fire {} | inference {:.1}ms | render {:.0}fps",
                        stats.cycles,
                        stats.positives,
                        stats.last_inference.as_secs_f64() * 1000.0,
                        self.render_fps
                    ));

                    if self.with_log {
                        ui.separator();
                        egui::ScrollArea::vertical()
                            .max_height(240.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for line in &self.alerts {
                                    ui.label(line);
                                }
                            });
                    }
                });
        });
        egui_macroquad::draw();

        actions
    }
}

/// Texture size for a frame, or `None` when a side does not fit a macroquad texture.
fn texture_dims(frame: &Frame) -> Option<(u16, u16)> {
    Some((u16::try_from(frame.width()).ok()?, u16::try_from(frame.height()).ok()?))
}

impl DisplaySink for Renderer {
    fn show(&mut self, frame: &Frame) {
        let Some((w, h)) = texture_dims(frame) else {
            tracing::warn!(
                "⚠️ frame {}x{} too large for display, skipped",
                frame.width(),
                frame.height()
            );
            return;
        };
        let rgba = frame.to_rgba();

        // rebuild only when the resolution changes
        let rebuild = match &self.texture {
            Some(tex) => tex.width() != w as f32 || tex.height() != h as f32,
            None => true,
        };
        if rebuild {
            let texture = Texture2D::from_rgba8(w, h, &rgba);
            texture.set_filter(FilterMode::Linear);
            self.texture = Some(texture);
        } else if let Some(tex) = &self.texture {
            tex.update(&Image {
                bytes: rgba,
                width: w,
                height: h,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_dims_rejects_oversized_frames() {
        assert_eq!(texture_dims(&Frame::filled(640, 480, [0, 0, 0])), Some((640, 480)));
        assert_eq!(
            texture_dims(&Frame::filled(u16::MAX as u32, 1, [0, 0, 0])),
            Some((u16::MAX, 1))
        );
        assert_eq!(texture_dims(&Frame::filled(u16::MAX as u32 + 1, 1, [0, 0, 0])), None);
        assert_eq!(texture_dims(&Frame::filled(1, 70_000, [0, 0, 0])), None);
    }
}
