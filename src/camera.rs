//! Orbit ("look at") and first person camera.
//!
//! [`Camera`] stores a position and Euler rotation in degrees and rebuilds its
//! view matrix whenever either changes. [`CameraController`] turns winit input
//! into rotations and translations. [`CameraUniform`] is the GPU copy shared by
//! every pipeline at bind group 0.

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, SquareMatrix, Vector3, Vector4};
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    data_structures::model::safe_normalize,
    shader::{BindingSlot, ShaderError, ShaderProgram},
};

/// cgmath builds OpenGL style clip space with z in [-1, 1]; wgpu wants [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Bind group shared by every pipeline that reads the camera.
pub const CAMERA_GROUP: u32 = 0;
/// Binding of the camera uniform inside [`CAMERA_GROUP`].
pub const CAMERA_BINDING: u32 = 0;

/// Fails unless `program` declares `camera` where the shared camera bind
/// group layout puts it.
pub fn check_camera_binding(program: &ShaderProgram) -> Result<(), ShaderError> {
    let binding = program.slot("camera", CAMERA_GROUP)?;
    if binding != CAMERA_BINDING {
        return Err(ShaderError::BindingConflict {
            name: "camera".to_string(),
            first: BindingSlot {
                group: CAMERA_GROUP,
                binding: CAMERA_BINDING,
            },
            second: BindingSlot {
                group: CAMERA_GROUP,
                binding,
            },
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    /// Rotates around the origin of the translated frame.
    #[default]
    #[serde(alias = "look_at")]
    LookAt,
    #[serde(alias = "first_person")]
    FirstPerson,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub perspective: Matrix4<f32>,
    pub view: Matrix4<f32>,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub camera_type: CameraType,
    rotation: Vector3<f32>,
    position: Vector3<f32>,
    view_pos: Vector4<f32>,
    pub rotation_speed: f32,
    pub movement_speed: f32,
    flip_y: bool,
    fov: f32,
    aspect: f32,
    znear: f32,
    zfar: f32,
    pub matrices: CameraMatrices,
    pub keys: MovementKeys,
    /// Set whenever the view changes; cleared by whoever uploads the uniform.
    pub updated: bool,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            camera_type: CameraType::LookAt,
            rotation: Vector3::new(0.0, 0.0, 0.0),
            position: Vector3::new(0.0, 0.0, 0.0),
            view_pos: Vector4::new(0.0, 0.0, 0.0, 1.0),
            rotation_speed: 1.0,
            movement_speed: 1.0,
            flip_y: false,
            fov: 45.0,
            aspect: 16.0 / 9.0,
            znear: 0.1,
            zfar: 256.0,
            matrices: CameraMatrices {
                perspective: Matrix4::identity(),
                view: Matrix4::identity(),
            },
            keys: MovementKeys::default(),
            updated: false,
        };
        camera.set_perspective(45.0, 16.0 / 9.0, 0.1, 256.0);
        camera.update_view_matrix();
        camera
    }
}

impl Camera {
    pub fn new(camera_type: CameraType) -> Self {
        let mut camera = Self::default();
        camera.camera_type = camera_type;
        camera.update_view_matrix();
        camera
    }

    fn update_view_matrix(&mut self) {
        let rx = if self.flip_y {
            -self.rotation.x
        } else {
            self.rotation.x
        };
        let rotation = Matrix4::from_angle_x(Deg(rx))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z));

        let mut translation = self.position;
        if self.flip_y {
            translation.y *= -1.0;
        }
        let translation = Matrix4::from_translation(translation);

        self.matrices.view = match self.camera_type {
            CameraType::FirstPerson => rotation * translation,
            CameraType::LookAt => translation * rotation,
        };

        // World space eye: the image of the view space origin.
        self.view_pos = match self.matrices.view.invert() {
            Some(inverse) => inverse * Vector4::new(0.0, 0.0, 0.0, 1.0),
            None => self.position.extend(1.0),
        };
        self.updated = true;
    }

    pub fn moving(&self) -> bool {
        self.keys.left || self.keys.right || self.keys.up || self.keys.down
    }

    pub fn near_clip(&self) -> f32 {
        self.znear
    }

    pub fn far_clip(&self) -> f32 {
        self.zfar
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    /// Mirrors the image vertically. Both matrices are rebuilt.
    pub fn set_flip_y(&mut self, flip_y: bool) {
        self.flip_y = flip_y;
        self.set_perspective(self.fov, self.aspect, self.znear, self.zfar);
        self.update_view_matrix();
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    /// Eye position in world space.
    pub fn view_pos(&self) -> Vector4<f32> {
        self.view_pos
    }

    /// `fov` is the vertical field of view in degrees.
    pub fn set_perspective(&mut self, fov: f32, aspect: f32, znear: f32, zfar: f32) {
        self.fov = fov;
        self.aspect = aspect;
        self.znear = znear;
        self.zfar = zfar;
        let mut perspective =
            OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(fov), aspect.max(f32::EPSILON), znear, zfar);
        if self.flip_y {
            perspective.y.y *= -1.0;
        }
        self.matrices.perspective = perspective;
        self.updated = true;
    }

    pub fn update_aspect_ratio(&mut self, aspect: f32) {
        self.set_perspective(self.fov, aspect, self.znear, self.zfar);
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.update_view_matrix();
    }

    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.rotation = rotation;
        self.update_view_matrix();
    }

    pub fn rotate(&mut self, delta: Vector3<f32>) {
        self.rotation += delta;
        self.update_view_matrix();
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
        self.update_view_matrix();
    }

    pub fn set_camera_type(&mut self, camera_type: CameraType) {
        self.camera_type = camera_type;
        self.update_view_matrix();
    }

    /// Direction the first person camera walks along for `up`/`down`.
    pub fn front(&self) -> Vector3<f32> {
        let rx = cgmath::Rad::from(Deg(self.rotation.x)).0;
        let ry = cgmath::Rad::from(Deg(self.rotation.y)).0;
        safe_normalize(Vector3::new(
            -rx.cos() * ry.sin(),
            rx.sin(),
            rx.cos() * ry.cos(),
        ))
    }

    /// Moves a first person camera according to the held keys.
    ///
    /// `dt` is in seconds. Look-at cameras ignore movement keys.
    pub fn update(&mut self, dt: f32) {
        if self.camera_type != CameraType::FirstPerson || !self.moving() {
            return;
        }
        let front = self.front();
        let right = safe_normalize(front.cross(Vector3::unit_y()));
        let speed = dt * self.movement_speed;

        if self.keys.up {
            self.position += front * speed;
        }
        if self.keys.down {
            self.position -= front * speed;
        }
        if self.keys.left {
            self.position -= right * speed;
        }
        if self.keys.right {
            self.position += right * speed;
        }
        self.update_view_matrix();
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_position: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Matrix4::identity().into(),
            view: Matrix4::identity().into(),
            projection: Matrix4::identity().into(),
            view_position: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera) {
        let view = camera.matrices.view;
        let projection = camera.matrices.perspective;
        self.view_proj = (projection * view).into();
        self.view = view.into();
        self.projection = projection.into();
        self.view_position = camera.view_pos().into();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// Translates window input into camera motion.
///
/// Left drag rotates, right drag zooms, middle drag pans and the wheel zooms
/// in steps of one unit per line. WASD and the arrow keys drive a first
/// person camera.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub buttons: MouseButtons,
    last_cursor: Option<(f32, f32)>,
    pub drag_speed: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            buttons: MouseButtons::default(),
            last_cursor: None,
            drag_speed: 0.005,
        }
    }

    /// Returns true when the event moved the camera or changed its input state.
    pub fn handle_window_event(&mut self, camera: &mut Camera, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.process_mouse_button(*button, *state == ElementState::Pressed)
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.process_cursor(camera, position.x as f32, position.y as f32);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 100.0,
                };
                self.process_scroll(camera, lines);
                true
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    self.process_key(camera, code, event.state == ElementState::Pressed)
                }
                PhysicalKey::Unidentified(_) => false,
            },
            _ => false,
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, pressed: bool) -> bool {
        match button {
            MouseButton::Left => self.buttons.left = pressed,
            MouseButton::Right => self.buttons.right = pressed,
            MouseButton::Middle => self.buttons.middle = pressed,
            _ => return false,
        }
        true
    }

    /// The first sample only records the position.
    pub fn process_cursor(&mut self, camera: &mut Camera, x: f32, y: f32) {
        let Some((last_x, last_y)) = self.last_cursor.replace((x, y)) else {
            return;
        };
        let dx = x - last_x;
        let dy = y - last_y;

        if self.buttons.left {
            camera.rotate(Vector3::new(
                dy * camera.rotation_speed,
                dx * camera.rotation_speed,
                0.0,
            ));
        }
        if self.buttons.right {
            camera.translate(Vector3::new(0.0, 0.0, dy * self.drag_speed));
        }
        if self.buttons.middle {
            camera.translate(Vector3::new(
                dx * self.drag_speed,
                -dy * self.drag_speed,
                0.0,
            ));
        }
    }

    pub fn process_scroll(&mut self, camera: &mut Camera, lines: f32) {
        camera.translate(Vector3::new(0.0, 0.0, lines));
    }

    pub fn process_key(&mut self, camera: &mut Camera, code: KeyCode, pressed: bool) -> bool {
        match code {
            KeyCode::KeyW | KeyCode::ArrowUp => camera.keys.up = pressed,
            KeyCode::KeyS | KeyCode::ArrowDown => camera.keys.down = pressed,
            KeyCode::KeyA | KeyCode::ArrowLeft => camera.keys.left = pressed,
            KeyCode::KeyD | KeyCode::ArrowRight => camera.keys.right = pressed,
            _ => return false,
        }
        true
    }
}

/// Camera state plus its GPU uniform and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera) -> Self {
        use wgpu::util::DeviceExt;

        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: CAMERA_BINDING,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: CAMERA_BINDING,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller: CameraController::new(),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Advances the camera and uploads the uniform if the view changed.
    pub fn update(&mut self, queue: &wgpu::Queue, dt: f32) {
        self.camera.update(dt);
        if self.camera.updated {
            self.uniform.update_view_proj(&self.camera);
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
            self.camera.updated = false;
        }
    }
}

/// Eye position implied by a view matrix.
pub fn eye_from_view(view: Matrix4<f32>) -> Option<Point3<f32>> {
    view.invert()
        .map(|inverse| Point3::from_vec((inverse * Vector4::new(0.0, 0.0, 0.0, 1.0)).truncate()))
}
