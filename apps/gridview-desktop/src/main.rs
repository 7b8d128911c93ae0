mod keymap;

use anyhow::{Context, Result};
use clap::Parser;
use gridview_common::ViewerConfig;
use gridview_input::{Action, MoveKey};
use gridview_render_wgpu::WgpuSurface;
use gridview_scene::{FrameLoop, SystemClock};
use gridview_session::{Credentials, ScriptedGrid};
use gridview_viewer::Viewer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "gridview-desktop", about = "Gridview desktop viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Viewer configuration file
    #[arg(long, default_value = "gridview.json")]
    config: PathBuf,

    /// Log in as this user once the session starts
    #[arg(long, requires_all = ["last_name", "password"])]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    password: Option<String>,
}

impl Cli {
    fn credentials(&self) -> Option<Credentials> {
        Some(Credentials::new(
            self.first_name.as_deref()?,
            self.last_name.as_deref()?,
            self.password.as_deref()?,
        ))
    }
}

/// Pointer state for camera drags.
#[derive(Default)]
struct Pointer {
    position: (f64, f64),
    orbiting: bool,
    panning: bool,
}

struct App {
    config: ViewerConfig,
    credentials: Option<Credentials>,
    window: Option<Arc<Window>>,
    viewer: Option<Viewer<WgpuSurface, ScriptedGrid>>,
    frame_loop: FrameLoop<SystemClock>,
    pointer: Pointer,
    title: String,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig, credentials: Option<Credentials>) -> Self {
        Self {
            config,
            credentials,
            window: None,
            viewer: None,
            frame_loop: FrameLoop::new(SystemClock::new()).with_max_delta(0.1),
            pointer: Pointer::default(),
            title: String::new(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Gridview")
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );
        let size = window.inner_size();
        let surface = pollster::block_on(WgpuSurface::new(
            window.clone(),
            size.width,
            size.height,
        ))
        .context("failed to initialize GPU")?;

        let mut viewer = Viewer::new(&self.config, surface, ScriptedGrid::new());
        viewer.handle_action(Action::Resize {
            width: size.width,
            height: size.height,
        });
        if viewer.session_mut().start() {
            if let Some(credentials) = &self.credentials {
                viewer.session_mut().login(credentials);
            }
        }

        self.window = Some(window);
        self.viewer = Some(viewer);
        Ok(())
    }

    fn dispatch(&mut self, action: Action) {
        if let Some(viewer) = &mut self.viewer {
            viewer.handle_action(action);
        }
    }

    fn refresh_title(&mut self) {
        let (Some(window), Some(viewer)) = (&self.window, &self.viewer) else {
            return;
        };
        let session = viewer.session().reconciler();
        let title = match &session.view().region {
            Some(region) => format!("Gridview - {} - {region}", session.status_label()),
            None => format!("Gridview - {}", session.status_label()),
        };
        if title != self.title {
            window.set_title(&title);
            self.title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            tracing::error!("{e:#}");
            self.error = Some(e);
            event_loop.exit();
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
                if let Some(viewer) = &mut self.viewer {
                    viewer.session_mut().logout();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.dispatch(Action::Resize {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => self.dispatch(keymap::key_action(key, state == ElementState::Pressed)),
            WindowEvent::Focused(false) => {
                // Releases never arrive for keys held while focus leaves.
                for key in MoveKey::ALL {
                    self.dispatch(Action::Release(key));
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (px, py) = self.pointer.position;
                let (dx, dy) = ((position.x - px) as f32, (position.y - py) as f32);
                self.pointer.position = (position.x, position.y);
                if self.pointer.orbiting {
                    self.dispatch(Action::Orbit { dx, dy });
                } else if self.pointer.panning {
                    self.dispatch(Action::Pan { dx, dy });
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left if pressed => {
                        let Some(window) = &self.window else { return };
                        let size = window.inner_size();
                        let (x, y) = self.pointer.position;
                        let (x, y) = keymap::cursor_to_ndc(x, y, size.width, size.height);
                        self.dispatch(Action::Pick { x, y });
                    }
                    MouseButton::Right => self.pointer.orbiting = pressed,
                    MouseButton::Middle => self.pointer.panning = pressed,
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 50.0) as f32,
                };
                self.dispatch(Action::Zoom(steps));
            }
            WindowEvent::RedrawRequested => {
                let tick = self.frame_loop.tick();
                if let Some(viewer) = &mut self.viewer {
                    viewer.frame(tick.dt);
                }
                self.refresh_title();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = ViewerConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    tracing::info!("starting gridview desktop");
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, cli.credentials());
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
