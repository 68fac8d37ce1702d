//! SoundBites - sound sculptures from audio spectra
//!
//! Each spectrum frame becomes one slice of a surface: a ring, sphere,
//! cylinder or plane whose shape swells with the intensity of every
//! frequency. Sculptures can be watched live and exported for 3D printing.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use soundbites::audio::{analyse_wav, input_device_names, LiveInput};
use soundbites::camera::{drag_rotation, wheel_zoom, ViewCamera};
use soundbites::cli::Args;
use soundbites::params::{
    config::CONFIG_FILE, AnalyserConfig, HistoryConfig, ParamValue, RenderConfig, AUDIO_SOURCE,
    CAM_ROT, CAM_ZOOM,
};
use soundbites::remote::{ParamUpdate, RemoteListener, RemoteSender};
use soundbites::rendering::{screenshot_path, RenderSystem, Uniforms};
use soundbites::sculpture::{SculptureSettings, SculptureSystem};
use soundbites::spectrum::SpectrumHistory;

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    render_config: RenderConfig,

    // Scene
    sculpture: SculptureSystem,
    config_path: PathBuf,
    args: Args,

    // Inputs
    live: Option<LiveInput>,
    /// History length while sculpting live input
    live_slices: Option<usize>,
    remote: Option<(RemoteListener, Receiver<ParamUpdate>)>,
    reply: Option<RemoteSender>,

    // Mouse state
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl App {
    fn new(sculpture: SculptureSystem, args: Args) -> Self {
        let remote = if args.remote_port == 0 {
            None
        } else {
            match RemoteListener::spawn(("0.0.0.0", args.remote_port)) {
                Ok(remote) => Some(remote),
                Err(e) => {
                    warn!("Remote control disabled: {}", e);
                    None
                }
            }
        };
        let reply = args
            .remote_reply
            .as_deref()
            .and_then(|target| match RemoteSender::connect(target) {
                Ok(sender) => Some(sender),
                Err(e) => {
                    warn!("Cannot mirror parameters to {}: {}", target, e);
                    None
                }
            });

        Self {
            window: None,
            render_system: None,
            render_config: RenderConfig::default(),
            sculpture,
            config_path: args
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE)),
            args,
            live: None,
            live_slices: None,
            remote,
            reply,
            dragging: false,
            last_cursor: None,
        }
    }

    /// Attach live input from the `/audio/source` device, sizing the history
    /// to the analyser's band count and restarting at slice 0
    fn start_live_input(&mut self, slices: usize) {
        self.live_slices = Some(slices);
        // Close the old stream before opening another device
        self.live = None;

        let source = self.sculpture.params().int(AUDIO_SOURCE).unwrap_or(-1);
        match LiveInput::start(AnalyserConfig::default(), source) {
            Ok(live) => {
                let history = SpectrumHistory::zeroed(slices, live.band_count());
                if let Err(e) = self.sculpture.set_history(history) {
                    error!("Failed to size history for live input: {}", e);
                    return;
                }
                self.live = Some(live);
            }
            Err(e) => warn!("Live input unavailable: {}", e),
        }
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &winit::event_loop::ActiveEventLoop) {
        let result = match code {
            KeyCode::Escape => {
                event_loop.exit();
                Ok(())
            }
            KeyCode::KeyR => self
                .sculpture
                .cycle_render_mode()
                .map(|mode| info!("Render mode: {}", mode)),
            KeyCode::KeyS => self
                .sculpture
                .toggle_split()
                .map(|split| info!("Split mode: {}", if split { "on" } else { "off" })),
            KeyCode::KeyE => self.export_snapshot(),
            KeyCode::F5 => self.sculpture.save_config(&self.config_path),
            KeyCode::F9 => self.sculpture.load_config(&self.config_path),
            KeyCode::Space => self
                .sculpture
                .toggle_recording()
                .map(|on| info!("Recording {}", if on { "resumed" } else { "paused" })),
            _ => Ok(()),
        };
        if let Err(e) = result {
            error!("{:?} failed: {}", code, e);
        }
    }

    /// Write an STL named after the loaded file. Live recordings get a
    /// timestamped name and a screenshot so the model can be told apart later.
    fn export_snapshot(&mut self) -> soundbites::Result<()> {
        let path = PathBuf::from(format!("{}.stl", self.args.export_stem(chrono::Local::now())));
        self.sculpture.export_stl(&path)?;
        if self.args.is_live() {
            if let Some(render_system) = &mut self.render_system {
                render_system.request_capture(screenshot_path(&path));
            }
        }
        Ok(())
    }

    fn handle_drag(&mut self, x: f64, y: f64) {
        if let (true, Some((px, py))) = (self.dragging, self.last_cursor) {
            let params = self.sculpture.params_mut();
            let rotation = params.vec3(CAM_ROT).unwrap_or_default();
            let rotation = drag_rotation(rotation, (x - px, y - py), &self.render_config);
            if let Err(e) = params.set(CAM_ROT, ParamValue::Vec3(rotation)) {
                warn!("Camera rotation rejected: {}", e);
            }
        }
        self.last_cursor = Some((x, y));
    }

    fn handle_wheel(&mut self, notches: f32) {
        let params = self.sculpture.params_mut();
        let zoom = params.float(CAM_ZOOM).unwrap_or(1.0);
        let zoom = wheel_zoom(zoom, notches, &self.render_config);
        if let Err(e) = params.set(CAM_ZOOM, ParamValue::Float(zoom)) {
            warn!("Camera zoom rejected: {}", e);
        }
    }

    /// Pull pending inputs into the scene, then advance it one frame
    fn update_scene(&mut self) {
        if let Some((_, updates)) = &self.remote {
            for update in updates.try_iter() {
                let address = update.address.clone();
                if let Err(e) = self.sculpture.apply(update) {
                    warn!("Ignoring remote update for {}: {}", address, e);
                }
            }
        }

        if let Some(frame) = self.live.as_ref().and_then(LiveInput::take_frame) {
            if let Err(e) = self.sculpture.push_frame(&frame) {
                warn!("Dropped audio frame: {}", e);
            }
        }

        if let Err(e) = self.sculpture.tick(Instant::now()) {
            error!("Scene update failed: {}", e);
        }

        if let Some(source) = self.sculpture.take_source_change() {
            match self.live_slices {
                Some(slices) => {
                    info!("Switching audio input to source {}", source);
                    self.start_live_input(slices);
                }
                None => info!("Audio source {} noted; input comes from a file", source),
            }
        }

        let changes = self.sculpture.take_changed();
        if let (Some(reply), false) = (&self.reply, changes.is_empty()) {
            reply.broadcast(&changes);
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        self.update_scene();

        let Some(ref mut render_system) = self.render_system else {
            return;
        };

        let camera = ViewCamera::from_params(self.sculpture.params());
        let view_proj = camera.view_proj(&self.render_config);
        let (model, batches) = self.sculpture.render();
        let lit = self.sculpture.shaper().render_mode().is_lit();

        render_system.update_batches(&batches);
        render_system.update_uniforms(&Uniforms::new(
            view_proj,
            model,
            &self.render_config,
            lit,
        ));

        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = (
                    self.render_config.window_width,
                    self.render_config.window_height,
                );
                render_system.resize(width, height);
            }
            Err(e) => error!("Render error: {:?}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("SoundBites")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let render_system = match pollster::block_on(RenderSystem::new(Arc::clone(&window))) {
            Ok(render_system) => render_system,
            Err(e) => {
                error!("{}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.render_config.window_width = size.width.max(1);
        self.render_config.window_height = size.height.max(1);

        info!("SoundBites is running");
        info!("R: render mode, S: split, E: export STL, F5/F9: save/load config");
        info!("Space: pause recording, drag: rotate, wheel: zoom, ESC: quit");

        self.window = Some(window);
        self.render_system = Some(render_system);
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(code, event_loop),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = state == ElementState::Pressed,
            WindowEvent::CursorMoved { position, .. } => self.handle_drag(position.x, position.y),
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 40.0) as f32,
                };
                self.handle_wheel(notches);
            }
            WindowEvent::Resized(size) => {
                self.render_config.window_width = size.width.max(1);
                self.render_config.window_height = size.height.max(1);
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

/// Spectrum log, WAV analysis, or an empty history for live input
fn load_history(args: &Args) -> anyhow::Result<SpectrumHistory> {
    let limits = HistoryConfig::default();
    if let Some(path) = &args.spectrum {
        let file =
            File::open(path).with_context(|| format!("opening spectrum {}", path.display()))?;
        let history = SpectrumHistory::from_log(BufReader::new(file), limits.max_log_rows)
            .with_context(|| format!("reading spectrum {}", path.display()))?;
        info!(
            "Loaded {}: {} slices of {} frequencies",
            path.display(),
            history.len(),
            history.freq_count()
        );
        return Ok(history);
    }
    if let Some(path) = &args.wav {
        return analyse_wav(path, &AnalyserConfig::default(), limits.max_log_rows)
            .with_context(|| format!("analysing {}", path.display()));
    }
    Ok(SpectrumHistory::zeroed(
        args.history,
        AnalyserConfig::default().band_count,
    ))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = SculptureSettings {
        colour_map_dir: args.colour_maps.clone(),
        ..Default::default()
    };
    if let Some(scale) = args.scale {
        settings.export.stl_scale = scale;
    }

    let history = load_history(&args)?;
    let mut sculpture =
        SculptureSystem::with_settings(history, settings).context("building sculpture")?;
    if let Some(path) = args.config_to_load(Path::new(CONFIG_FILE)) {
        let loaded = sculpture
            .load_config(&path)
            .with_context(|| format!("loading config {}", path.display()));
        match loaded {
            // Only an explicitly requested config is fatal
            Err(e) if args.config.is_none() => warn!("{:#}", e),
            other => other?,
        }
    }
    args.apply_to(&mut sculpture)?;
    // A loaded config forces its rebuild, so this leaves the mesh final
    sculpture.tick(Instant::now())?;

    if args.is_headless() {
        if let Some(path) = &args.export_stl {
            sculpture
                .export_stl(path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        if let Some(path) = &args.export_obj {
            sculpture
                .export_obj(path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        return Ok(());
    }

    // Live input opens the configured source itself
    sculpture.take_source_change();
    let live = args.is_live();
    let slices = args.history;
    let mut app = App::new(sculpture, args);
    if live {
        match input_device_names() {
            Ok(names) => {
                for (i, name) in names.iter().enumerate() {
                    info!("Audio source {}: {}", i, name);
                }
            }
            Err(e) => warn!("{}", e),
        }
        app.start_live_input(slices);
    }

    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.run_app(&mut app).context("running viewer")?;
    Ok(())
}
