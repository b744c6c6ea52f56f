use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorIcon, Window, WindowId};

use sandbox_engine::coords::Vec2;
use sandbox_engine::device::{GpuInit, WgpuRenderer, WgpuRendererFactory};
use sandbox_scene::assets::FileAssetSource;
use sandbox_scene::builder::ButtonSpec;
use sandbox_scene::config::SceneConfig;
use sandbox_scene::graph::Cursor;
use sandbox_scene::host::Container;
use sandbox_scene::lifecycle::LifecycleController;
use sandbox_scene::selection::{play_button, selection_buttons, Choice, Horse, Selection};
use sandbox_scene::surface::SceneSurface;

use crate::container::WindowContainer;

const TITLE: &str = "Slot Sandbox";
const PANEL_GAP: f32 = 16.0;
const PANEL_MARGIN: f32 = 12.0;

/// Opens the window and runs until it closes.
pub fn run(config: SceneConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut studio = Studio::new(config);

    event_loop
        .run_app(&mut studio)
        .context("winit event loop terminated with error")?;

    Ok(())
}

type Controller = LifecycleController<WgpuRendererFactory, FileAssetSource>;

struct Mounted {
    window: Arc<Window>,
    container: Rc<WindowContainer>,
    controller: Controller,
    pointer: Vec2,
}

impl Mounted {
    fn surface(&self) -> Option<SceneSurface<WgpuRenderer>> {
        self.controller.surface()
    }
}

struct Studio {
    config: SceneConfig,
    selection: Selection<Horse>,
    scene: Option<Mounted>,
    exit_requested: bool,
}

impl Studio {
    fn new(config: SceneConfig) -> Self {
        Self {
            config,
            selection: Selection::new(),
            scene: None,
            exit_requested: false,
        }
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(960.0, 600.0));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);
        let container = WindowContainer::new(window.clone());

        let size = container.measure();
        let spec = self
            .config
            .mount_spec(|label| log::info!("{label} pressed"))
            .with_buttons(self.horse_panel(size.width, size.height));

        let mut factory = WgpuRendererFactory::new(window.clone(), GpuInit::default());
        match self.config.font_bytes()? {
            Some(font) => factory = factory.with_font(font),
            None => log::warn!("no label font found; set [text] font in the scene config"),
        }
        let source = FileAssetSource::new(&self.config.assets.base_dir);
        let controller = Controller::new(factory, source, spec);

        let mounted = Mounted { window, container, controller, pointer: Vec2::zero() };
        let result = pollster::block_on(mounted.controller.on_mount(Some(mounted.container.clone())));
        // Keep the scene around even on failure so unmount tears down whatever was built.
        self.scene = Some(mounted);

        let report = result.context("scene mount failed")?;
        for (id, failure) in &report.failures {
            log::warn!("`{id}` skipped: {failure}");
        }
        Ok(())
    }

    /// Horse buttons plus "Play", centered along the bottom edge.
    fn horse_panel(&self, width: f32, height: f32) -> Vec<ButtonSpec> {
        let count = Horse::ALL.len() + 1;
        let row = count as f32 * ButtonSpec::DEFAULT_SIZE.x + (count - 1) as f32 * PANEL_GAP;
        let origin = Vec2::new(
            ((width - row) * 0.5).max(PANEL_MARGIN),
            height - ButtonSpec::DEFAULT_SIZE.y - PANEL_MARGIN,
        );

        let mut buttons = selection_buttons(&self.selection, origin, PANEL_GAP);
        let play_at = Vec2::new(
            origin.x + Horse::ALL.len() as f32 * (ButtonSpec::DEFAULT_SIZE.x + PANEL_GAP),
            origin.y,
        );
        buttons.push(play_button(&self.selection, play_at, |horse| {
            log::info!("race started with {}", horse.label());
        }));
        buttons
    }

    fn unmount(&mut self) {
        if let Some(scene) = self.scene.take() {
            scene.controller.on_unmount();
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.unmount();
        self.exit_requested = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for Studio {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene.is_some() {
            return;
        }

        if let Err(e) = self.mount(event_loop) {
            log::error!("{e:#}");
            self.request_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        // The scene is static; frames are drawn on demand.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if scene.window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.request_exit(event_loop),

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                scene.container.resized(new_size);
                scene.window.request_redraw();
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                scene.container.resized(scene.window.inner_size());
                scene.window.request_redraw();
            }

            WindowEvent::CursorMoved { position, .. } => {
                scene.pointer = to_logical(&scene.window, position);
                if let Some(surface) = scene.surface() {
                    let icon = match surface.pointer_moved(scene.pointer) {
                        Cursor::Pointer => CursorIcon::Pointer,
                        Cursor::NotAllowed => CursorIcon::NotAllowed,
                        Cursor::Default => CursorIcon::Default,
                    };
                    scene.window.set_cursor(icon);
                }
            }

            WindowEvent::CursorLeft { .. } => {
                if let Some(surface) = scene.surface() {
                    surface.pointer_left();
                }
                scene.window.set_cursor(CursorIcon::Default);
            }

            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                if let Some(surface) = scene.surface() {
                    match state {
                        ElementState::Pressed => {
                            surface.pointer_down(scene.pointer);
                        }
                        ElementState::Released => {
                            if surface.pointer_up(scene.pointer) {
                                scene.window.request_redraw();
                            }
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(surface) = scene.surface().filter(SceneSurface::is_ready) {
                    if let Err(e) = surface.render() {
                        log::error!("{e}");
                    }
                }
            }

            _ => {}
        }
    }
}

fn to_logical(window: &Window, pos: PhysicalPosition<f64>) -> Vec2 {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    Vec2::new(logical.x as f32, logical.y as f32)
}
