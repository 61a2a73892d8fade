//! The window and its event loop.
//!
//! Each redraw runs the same sequence: advance the camera, upload the
//! uniforms, draw the scene, draw the overlay, present.

use std::{iter, sync::Arc};

use anyhow::Context as _;
use instant::Instant;
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    config::Config,
    context::Context,
    gui::{DebugUi, UiCapabilities, UiSettings},
    render::PbrScene,
};

/// GPU context, scene and overlay of a live window.
#[derive(Debug)]
struct AppState {
    ctx: Context,
    scene: PbrScene,
    ui: DebugUi,
    settings: UiSettings,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &Config) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        let scene = PbrScene::load(
            &ctx.device,
            &ctx.queue,
            &ctx.camera.bind_group_layout,
            ctx.config.format,
            config,
        )
        .await?;
        let capabilities = UiCapabilities {
            wireframe: scene.supports_wireframe(),
            prefilter_max_lod: scene.skybox.prefilter_max_lod(),
        };
        let ui = DebugUi::new(&ctx.window, &ctx.device, ctx.config.format, capabilities);
        let mut settings = UiSettings::new(&config.render, ctx.camera.camera.camera_type);
        if settings.wireframe && !capabilities.wireframe {
            log::warn!("Wireframe requested but the adapter can't draw lines");
            settings.wireframe = false;
        }
        Ok(Self {
            ctx,
            scene,
            ui,
            settings,
        })
    }

    fn update(&mut self, dt: f32) {
        self.ui.stats.push(dt);
        let camera = &mut self.ctx.camera;
        if camera.camera.camera_type != self.settings.camera_type {
            camera.camera.set_camera_type(self.settings.camera_type);
        }
        camera.update(&self.ctx.queue, dt);
        self.scene.update(&self.ctx.queue, &self.settings);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.scene.render(
            &mut encoder,
            &view,
            &self.ctx.depth_texture.view,
            &self.ctx.camera.bind_group,
            &self.settings,
        );
        self.ui.render(
            &self.ctx.window,
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &view,
            self.ctx.size(),
            &mut self.settings,
        );

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    config: Config,
    runtime: Runtime,
    state: Option<AppState>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            runtime: Runtime::new().context("failed to start the async runtime")?,
            state: None,
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, anyhow::Error::new(e).context("failed to create a window")),
        };

        match self.runtime.block_on(AppState::new(window, &self.config)) {
            Ok(state) => {
                state.ctx.window.request_redraw();
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => self.fail(event_loop, e.context("failed to load the scene")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let consumed = state.ui.on_window_event(&state.ctx.window, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } if !consumed => event_loop.exit(),
            WindowEvent::Resized(size) => state.ctx.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_time).as_secs_f32();
                self.last_time = now;
                state.update(dt);

                match state.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.ctx.resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Dropped a frame: {}", e),
                }
            }
            other => {
                if !consumed {
                    let camera = &mut state.ctx.camera;
                    camera.controller.handle_window_event(&mut camera.camera, &other);
                }
            }
        }
    }
}

/// Opens the window and runs until it is closed.
pub fn run(config: Config) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new().context("failed to create an event loop")?;
    let mut app = App::new(config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
