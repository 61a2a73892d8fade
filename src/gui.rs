//! The egui debug overlay: frame timing plus the render settings.

use std::collections::VecDeque;

use egui::ViewportId;
use egui_wgpu::ScreenDescriptor;
use winit::{event::WindowEvent, window::Window};

use crate::{camera::CameraType, config::RenderConfig, ibl::Background};

/// Number of frames averaged by [`FrameStats`].
pub const FRAME_WINDOW: usize = 120;

/// Rolling average of the last [`FRAME_WINDOW`] frame times.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_times: VecDeque<f32>,
    total: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame that took `dt` seconds.
    pub fn push(&mut self, dt: f32) {
        if self.frame_times.len() == FRAME_WINDOW {
            if let Some(oldest) = self.frame_times.pop_front() {
                self.total -= oldest;
            }
        }
        self.frame_times.push_back(dt);
        self.total += dt;
    }

    pub fn frames(&self) -> usize {
        self.frame_times.len()
    }

    pub fn average_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.total / self.frame_times.len() as f32 * 1000.0
    }

    pub fn fps(&self) -> f32 {
        let ms = self.average_ms();
        if ms > 0.0 { 1000.0 / ms } else { 0.0 }
    }

    pub fn summary(&self) -> String {
        format!("{:.3} ms/frame ({:.0} fps)", self.average_ms(), self.fps())
    }
}

/// What the overlay edits. The renderer reads it every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiSettings {
    pub wireframe: bool,
    pub exposure: f32,
    pub background: Background,
    pub camera_type: CameraType,
}

impl UiSettings {
    pub fn new(render: &RenderConfig, camera_type: CameraType) -> Self {
        Self {
            wireframe: render.wireframe,
            exposure: render.exposure,
            background: Background::Environment,
            camera_type,
        }
    }
}

/// Limits the overlay needs to know about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiCapabilities {
    pub wireframe: bool,
    pub prefilter_max_lod: f32,
}

pub const EXPOSURE_RANGE: std::ops::RangeInclusive<f32> = 0.1..=5.0;

/// Lays out the overlay window.
pub fn settings_window(
    ctx: &egui::Context,
    stats: &FrameStats,
    capabilities: UiCapabilities,
    settings: &mut UiSettings,
) {
    egui::Window::new("IBL Renderer")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(stats.summary());
            ui.collapsing("Settings", |ui| {
                ui.add_enabled(
                    capabilities.wireframe,
                    egui::Checkbox::new(&mut settings.wireframe, "Wireframe"),
                );
                ui.add(egui::Slider::new(&mut settings.exposure, EXPOSURE_RANGE).text("Exposure"));

                let current = settings.background;
                let lod = match current {
                    Background::Prefilter { lod } => lod,
                    _ => 0.0,
                };
                egui::ComboBox::from_label("Background")
                    .selected_text(current.label())
                    .show_ui(ui, |ui| {
                        for choice in [
                            Background::Environment,
                            Background::Irradiance,
                            Background::Prefilter { lod },
                        ] {
                            let selected =
                                std::mem::discriminant(&choice) == std::mem::discriminant(&current);
                            if ui.selectable_label(selected, choice.label()).clicked() {
                                settings.background = choice;
                            }
                        }
                    });
                match &mut settings.background {
                    Background::Prefilter { lod } => {
                        ui.add(
                            egui::Slider::new(lod, 0.0..=capabilities.prefilter_max_lod)
                                .text("Prefilter LOD"),
                        );
                    }
                    _ => {
                        let mut unused = 0.0;
                        ui.add_enabled(
                            false,
                            egui::Slider::new(&mut unused, 0.0..=capabilities.prefilter_max_lod)
                                .text("Prefilter LOD"),
                        );
                    }
                }

                ui.horizontal(|ui| {
                    ui.label("Camera");
                    ui.radio_value(&mut settings.camera_type, CameraType::LookAt, "Look at");
                    ui.radio_value(&mut settings.camera_type, CameraType::FirstPerson, "First person");
                });
            });
        });
}

/// egui context, winit input state and wgpu renderer of the overlay.
pub struct DebugUi {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    pub stats: FrameStats,
    pub capabilities: UiCapabilities,
}

impl std::fmt::Debug for DebugUi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugUi")
            .field("stats", &self.stats)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl DebugUi {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        capabilities: UiCapabilities,
    ) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, color_format, None, 1, false);
        Self {
            ctx,
            state,
            renderer,
            stats: FrameStats::new(),
            capabilities,
        }
    }

    /// Feeds a window event to egui. Returns true if egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs the overlay for this frame and records its draw into `encoder`
    /// as a pass that loads the already rendered scene.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: [u32; 2],
        settings: &mut UiSettings,
    ) {
        let raw_input = self.state.take_egui_input(window);
        let stats = &self.stats;
        let capabilities = self.capabilities;
        let full_output = self.ctx.run(raw_input, |ctx| {
            settings_window(ctx, stats, capabilities, settings);
        });
        self.state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: size,
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        // Callback command buffers are unused; the overlay has no paint callbacks.
        let _ = self
            .renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("UI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut pass.forget_lifetime(), &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_stats_average_over_window() {
        let mut stats = FrameStats::new();
        assert_eq!(stats.average_ms(), 0.0);
        assert_eq!(stats.fps(), 0.0);

        for _ in 0..FRAME_WINDOW {
            stats.push(0.010);
        }
        assert!((stats.average_ms() - 10.0).abs() < 1e-3);
        assert!((stats.fps() - 100.0).abs() < 0.1);

        // A full window of slower frames pushes the fast ones out entirely.
        for _ in 0..FRAME_WINDOW {
            stats.push(0.020);
        }
        assert_eq!(stats.frames(), FRAME_WINDOW);
        assert!((stats.average_ms() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn frame_stats_summary_format() {
        let mut stats = FrameStats::new();
        stats.push(0.016);
        assert_eq!(stats.summary(), "16.000 ms/frame (62 fps)");
    }

    #[test]
    fn settings_follow_render_config() {
        let render = RenderConfig {
            exposure: 2.0,
            wireframe: true,
            vsync: false,
        };
        let settings = UiSettings::new(&render, CameraType::FirstPerson);
        assert!(settings.wireframe);
        assert_eq!(settings.exposure, 2.0);
        assert_eq!(settings.background, Background::Environment);
        assert_eq!(settings.camera_type, CameraType::FirstPerson);
    }

    #[test]
    fn idle_frame_leaves_settings_untouched() {
        let ctx = egui::Context::default();
        let stats = FrameStats::new();
        let mut settings = UiSettings::new(&RenderConfig::default(), CameraType::LookAt);
        let before = settings;
        let output = ctx.run(egui::RawInput::default(), |ctx| {
            settings_window(
                ctx,
                &stats,
                UiCapabilities {
                    wireframe: false,
                    prefilter_max_lod: 4.0,
                },
                &mut settings,
            );
        });
        assert_eq!(settings, before);
        assert!(!output.shapes.is_empty());
    }
}
