/*!
# Prism3D demo - two bouncing players

Renders one mesh twice, each instance driven by a physics-controlled
player object with platform collision and bouncing.

Controls: player 0 moves with W/A/D, player 1 with I/J/L; Escape closes
the window.

Usage: `prism3d_demo [path/to/mesh.gltf]`. The mesh defaults to
`assets/monkey.gltf` next to this crate, and the compiled SPIR-V shaders
are expected at `shaders/standard.vert.spv` and
`shaders/vertex_color.frag.spv` (sources in `shaders/`).
*/

mod input;
mod model;
mod player;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use prism_3d_engine::glam::{Mat4, Vec3};
use prism_3d_engine::prism3d::render::{
    BasicVertex, Config, ShaderStageFlags, UniformArrayData, UniformStructData,
};
use prism_3d_engine::prism3d::sim::{GameObjectSimulator, DEFAULT_FLOOR_Y};
use prism_3d_engine::prism3d::utils::FrameTimer;
use prism_3d_engine::prism3d::{Error, Result};
use prism_3d_engine::{engine_error, engine_info, engine_warn};
use prism_3d_engine_renderer_vulkan::{GeometryBuffer, ShaderModule, VulkanRenderer};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use input::{filter_player_input, KeyStates};
use player::PlayerController;

const WINDOW_WIDTH: u32 = 854;
const WINDOW_HEIGHT: u32 = 480;
const PLAYER_COUNT: usize = 2;
/// Frames per periodic performance report
const REPORT_WINDOW: usize = 1024;

/// Per-object shader transforms (one dynamic-offset instance per player)
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Transforms {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
}

/// Shared animation data
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct AnimationInfo {
    time: f32,
    _padding: [f32; 3],
}

type TransformHandle = Arc<Mutex<UniformArrayData<Transforms>>>;
type AnimationHandle = Arc<Mutex<UniformStructData<AnimationInfo>>>;

fn main() {
    let mesh_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/monkey.gltf")
        });

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            engine_error!("prism3d::demo", "Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::new(mesh_path);
    if let Err(e) = event_loop.run_app(&mut app) {
        engine_error!("prism3d::demo", "Event loop error: {}", e);
        std::process::exit(1);
    }
}

/// Everything the running demo owns
struct Scene {
    renderer: VulkanRenderer,
    // Kept alive for the whole run; the renderer references its device
    // buffer in the pre-recorded commands
    _geometry: GeometryBuffer<BasicVertex>,
    transform_uniforms: TransformHandle,
    animation_uniforms: AnimationHandle,
    sim: GameObjectSimulator,
    players: [PlayerController; PLAYER_COUNT],
}

struct DemoApp {
    mesh_path: PathBuf,
    window: Option<Arc<Window>>,
    scene: Option<Scene>,
    key_states: KeyStates,
    start_time: Instant,
    last_frame: Option<Instant>,
    global_timer: FrameTimer,
    local_timer: FrameTimer,
}

impl DemoApp {
    fn new(mesh_path: PathBuf) -> Self {
        Self {
            mesh_path,
            window: None,
            scene: None,
            key_states: KeyStates::default(),
            start_time: Instant::now(),
            last_frame: None,
            global_timer: FrameTimer::new(0),
            local_timer: FrameTimer::new(REPORT_WINDOW),
        }
    }

    /// Build renderer, geometry, shaders, uniforms and the simulation
    fn setup_scene(&mut self, window: &Arc<Window>) -> Result<Scene> {
        let size = window.inner_size();
        let mut renderer = VulkanRenderer::new(
            window.as_ref(),
            Config {
                app_name: "Prism3D Demo".to_string(),
                ..Config::default()
            },
            size.width,
            size.height,
        )?;

        // Geometry: load the mesh and upload it once; it is referenced
        // read-only afterwards
        let vertices = model::load_model(&self.mesh_path)?;
        let mut geometry = GeometryBuffer::new(vertices);
        geometry.update_device(Some(renderer.context()))?;
        renderer.set_vertex_input(BasicVertex::input_layout(0))?;
        renderer.set_geometry(&geometry)?;

        // Shaders: compiled SPIR-V next to this crate
        let shader_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        let vertex_module = load_shader_module(&renderer, &shader_dir.join("standard.vert.spv"))?;
        let fragment_module =
            load_shader_module(&renderer, &shader_dir.join("vertex_color.frag.spv"))?;
        renderer.set_vertex_shader("standard.vert", vertex_module)?;
        renderer.set_fragment_shader("vertex_color.frag", fragment_module)?;

        // Simulation: two players apart on the x axis, above the floor
        let mut sim = GameObjectSimulator::new(DEFAULT_FLOOR_Y);
        let player0 = PlayerController::new(sim.spawn(Vec3::new(-3.0, -7.0, -10.0), Vec3::ONE));
        let player1 = PlayerController::new(sim.spawn(Vec3::new(3.0, -7.0, -10.0), Vec3::ONE));

        // Uniforms: one Transforms instance per player behind a dynamic
        // offset, plus a shared animation block
        let transform_uniforms: TransformHandle = Arc::new(Mutex::new(UniformArrayData::new(
            vec![Transforms::zeroed(); PLAYER_COUNT],
        )));
        let animation_uniforms: AnimationHandle = Arc::new(Mutex::new(UniformStructData::new(
            AnimationInfo {
                time: 0.0,
                _padding: [0.0; 3],
            },
        )));
        renderer.bind_uniform_dynamic(
            0,
            transform_uniforms.clone(),
            ShaderStageFlags::default(),
            PLAYER_COUNT as u32,
        )?;
        renderer.bind_uniform(
            1,
            Some(animation_uniforms.clone()),
            ShaderStageFlags::default(),
        )?;

        renderer.init()?;

        Ok(Scene {
            renderer,
            _geometry: geometry,
            transform_uniforms,
            animation_uniforms,
            sim,
            players: [player0, player1],
        })
    }

    /// Simulate, push uniform values and render one frame
    fn frame(&mut self) -> Result<()> {
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        let delta_time = self
            .last_frame
            .map(|last| (now - last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        self.global_timer.frame_start();
        self.local_timer.frame_start();

        // Input and physics
        for (index, player) in scene.players.iter().enumerate() {
            let filtered = filter_player_input(index, &self.key_states);
            player.update(&mut scene.sim, &filtered);
        }
        scene.sim.step(delta_time);

        // Camera and per-object transforms
        let time = self.start_time.elapsed().as_secs_f32();
        let (width, height) = scene.renderer.framebuffer_size();
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0), Vec3::Y);
        let projection = perspective(width, height, 120.0_f32.to_radians(), 0.1, 150.0);

        if let Ok(mut transforms) = scene.transform_uniforms.lock() {
            for (index, player) in scene.players.iter().enumerate() {
                let model = scene.sim.model_matrix(player.object())
                    * Mat4::from_rotation_y(time)
                    * Mat4::from_rotation_z(std::f32::consts::PI);
                transforms.push_instance(
                    index,
                    Transforms {
                        model,
                        view,
                        projection,
                    },
                );
            }
        }
        if let Ok(mut animation) = scene.animation_uniforms.lock() {
            animation.push(AnimationInfo {
                time,
                _padding: [0.0; 3],
            });
        }

        scene.renderer.render_frame()?;

        self.global_timer.frame_finish();
        self.local_timer.frame_finish();
        if self.local_timer.is_window_full() {
            engine_info!("prism3d::demo", "{}", self.local_timer.report_string());
            self.local_timer.reset_window();
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(scene) = self.scene.as_ref() {
            // Make sure the GPU is done rendering before teardown
            if let Err(e) = scene.renderer.wait_idle() {
                engine_warn!("prism3d::demo", "Device wait on shutdown failed: {}", e);
            }
        }
        engine_info!(
            "prism3d::demo",
            "Average performance: {}",
            self.global_timer.report_string()
        );
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("Prism3D Demo")
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                engine_error!("prism3d::demo", "Failed to create window: {}", e);
                std::process::exit(1);
            }
        };

        match self.setup_scene(&window) {
            Ok(scene) => {
                self.scene = Some(scene);
                self.window = Some(window);
                engine_info!("prism3d::demo", "Demo initialized");
            }
            Err(e) => {
                // Configuration and resource failures are fatal at startup
                engine_error!("prism3d::demo", "Initialization failed: {}", e);
                std::process::exit(1);
            }
        }

        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(scene) = self.scene.as_mut() {
                    scene.renderer.notify_resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if code == KeyCode::Escape && event.state == ElementState::Pressed {
                        self.shutdown();
                        event_loop.exit();
                        return;
                    }
                    self.key_states
                        .set_key(code, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.frame() {
                    engine_error!("prism3d::demo", "Frame failed: {}", e);
                    std::process::exit(1);
                }
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Perspective projection with the y axis flipped for Vulkan clip space
fn perspective(width: u32, height: u32, fov_y: f32, near: f32, far: f32) -> Mat4 {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    let mut projection = Mat4::perspective_rh(fov_y, aspect, near, far);
    projection.y_axis.y *= -1.0;
    projection
}

/// Read a compiled SPIR-V file into a shader module
fn load_shader_module(renderer: &VulkanRenderer, path: &Path) -> Result<ShaderModule> {
    let bytes = std::fs::read(path).map_err(|e| {
        engine_error!("prism3d::demo", "Failed to read shader '{}': {}", path.display(), e);
        Error::InvalidResource(format!("Failed to read shader '{}': {}", path.display(), e))
    })?;
    ShaderModule::from_spirv_bytes(renderer.context(), &bytes)
}
