use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, Window, WindowId},
};

use hljt_core::TaskPhase;
use hljt_experiment::{TaskConfig, TaskEvent, TaskStateMachine};
use hljt_render::{load_font, SkiaRenderer};
use hljt_stimuli::StimulusBank;
use hljt_timing::HighPrecisionTimer;

use crate::report;

/// Completed trial rows land here, as a JSON array.
const RESULTS_PATH: &str = "hljt_results.json";

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    machine: TaskStateMachine<TaskPhase, HighPrecisionTimer, ThreadRng>,
    renderer: Option<SkiaRenderer>,
    current_size: Option<PhysicalSize<u32>>,
    scale_factor: f64,
    refresh_rate: Option<f64>,

    results_saved: bool,
    should_exit: bool,
}

impl App {
    pub fn new(config: TaskConfig) -> Result<Self> {
        config.validate()?;
        let timer = HighPrecisionTimer::new();
        let rng = rand::rng();
        let machine = TaskStateMachine::new(config, timer, rng);

        Ok(Self {
            window: None,
            pixels: None,
            machine,
            renderer: None,
            current_size: None,
            scale_factor: 1.0,
            refresh_rate: None,
            results_saved: false,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        #[cfg(target_os = "windows")]
        unsafe {
            windows::Win32::Media::timeBeginPeriod(1);
        }

        let event_loop = EventLoop::new()?;
        let config = &self.machine.config;
        println!("=== HAND LATERALITY JUDGEMENT TASK ===");
        println!("Platform: {}", std::env::consts::OS);
        println!(
            "Schedule: {} practice + {} x {} task trials",
            if config.practice_enabled() {
                config.practice_trials
            } else {
                0
            },
            config.blocks,
            config.trials_per_block
        );
        println!("Press ESC at any time to quit.\n");

        let result = event_loop.run_app(&mut self);

        #[cfg(target_os = "windows")]
        unsafe {
            windows::Win32::Media::timeEndPeriod(1);
        }

        result.map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("no monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let window_attributes = Window::default_attributes()
            .with_title("Hand Laterality Judgement Task")
            .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor.clone()))))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();
        self.current_size = Some(physical_size);
        self.scale_factor = window.scale_factor();

        println!("Display Configuration:");
        println!(
            "  Physical size: {}x{}",
            physical_size.width, physical_size.height
        );
        println!("  Scale factor: {:.2}", self.scale_factor);
        if let Some(refresh_rate) = self.refresh_rate {
            println!("  Refresh rate: {:.1} Hz", refresh_rate);
        }

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);

        // Degree-based sizes are derived from the real surface, not the
        // configured placeholder resolution.
        self.machine.config.screen.width_px = physical_size.width;
        self.machine.config.screen.height_px = physical_size.height;
        let config = self.machine.config.clone();

        let target_height = config.screen.deg_to_px(config.hand_size_deg);
        let bank = StimulusBank::load(&config.image_dir, &config.angles, target_height)
            .with_context(|| format!("loading hand images from {}", config.image_dir.display()))?;
        tracing::info!(stimuli = bank.len(), target_height, "stimulus bank ready");

        let font = load_font(&config.font_path)?;
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            font,
            &bank,
            self.machine.demo_hands(),
            &config,
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);

        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut())
        else {
            return Ok(());
        };

        let screen = self
            .machine
            .current_screen()
            .map(|s| (s, self.machine.screen_armed()));
        let fixation = self.machine.should_show_fixation();
        let stimulus = self.machine.current_stimulus();

        renderer.render_frame(screen, fixation, stimulus, pixels.frame_mut())?;
        pixels.render()?;

        // rt is anchored to the first frame that actually shows the hand,
        // so the onset report comes after the present.
        if self.machine.stimulus_onset_pending() {
            self.machine.mark_stimulus_onset();
        }

        Ok(())
    }

    fn update(&mut self) {
        for event in self.machine.update() {
            self.on_event(event);
        }
    }

    fn on_event(&mut self, event: TaskEvent) {
        if matches!(event, TaskEvent::SessionComplete) {
            self.save_and_summarize(Path::new(RESULTS_PATH));
            self.should_exit = true;
        }
    }

    fn handle_input(&mut self, key: Key, event_loop: &ActiveEventLoop) {
        if key == Key::Named(NamedKey::Escape) {
            self.cleanup_and_exit(event_loop);
            return;
        }

        // Unmapped keys still reach the machine; any-key screens take them.
        let ch = match &key {
            Key::Character(text) => text.chars().next(),
            Key::Named(NamedKey::Space) => Some(' '),
            _ => None,
        };
        for event in self.machine.handle_key(ch) {
            self.on_event(event);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>, event_loop: &ActiveEventLoop) {
        self.current_size = Some(new_size);
        let mut buffer_failed = false;
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                eprintln!("Failed to resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                eprintln!("Failed to resize buffer: {e}");
                buffer_failed = true;
            }
        }
        if buffer_failed {
            // the canvas and the frame buffer must stay the same size
            self.cleanup_and_exit(event_loop);
            return;
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height);
        }
        tracing::debug!(
            width = new_size.width,
            height = new_size.height,
            "display resized"
        );
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.set_cursor_visible(true);
        }
        self.save_and_summarize(Path::new(RESULTS_PATH));
        self.should_exit = true;
        event_loop.exit();
    }

    fn save_and_summarize(&mut self, path: &Path) {
        if self.results_saved {
            return;
        }
        self.results_saved = true;

        let results = self.machine.results();
        if results.is_empty() {
            println!("\nNo trials completed.");
            return;
        }
        match report::save_results(path, results) {
            Ok(()) => println!("\nResults saved to {}", path.display()),
            Err(e) => eprintln!("Failed to save results: {e:#}"),
        }
        report::print_summary(results);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                eprintln!("Failed to create window and surface: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    // collected rows still get exported on the way out
                    eprintln!("Render failed: {e:#}");
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                self.update();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.logical_key, event_loop);
            }
            WindowEvent::Resized(size) => self.handle_resize(size, event_loop),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = scale_factor;
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size(), event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
