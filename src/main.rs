//! Demo host: one glider airspeed indicator in a window, fed by a
//! simulated airspeed that random-walks until a value arrives on stdin.
//!
//! Pipe knots one-per-line to drive the gauge externally:
//! `while sleep 0.1; do echo 75; done | glider-asi`
//! Keys: `s` toggles the pointer shadow, `p` toggles panel power.

use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Instant;

use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use rand::Rng;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::WindowBuilder;

use glider_asi::{
    AirspeedGauge, Bitmap, GaugeConfig, Identity, RenderOptions, SimVarRegistry,
};

/// Airspeed piped on stdin, in knots scaled by 1000.
/// `u32::MAX` means nothing has been piped yet.
static PIPE_VALUE: AtomicU32 = AtomicU32::new(u32::MAX);

/// Random-walk airspeed used until a piped value takes over.
struct SimulatedFeed {
    knots: f64,
    target: f64,
}

impl SimulatedFeed {
    fn new() -> Self {
        Self {
            knots: 0.0,
            target: 60.0,
        }
    }

    fn step(&mut self, rng: &mut impl Rng) {
        // Occasionally pick a new target, then ease toward it so the
        // pointer sweeps instead of jumping.
        if rng.random_range(0.0..1.0) < 0.01 {
            self.target = rng.random_range(0.0..160.0);
        }
        self.knots += (self.target - self.knots) * 0.05;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut size: u32 = 800;
    let mut title = "Glider ASI".to_string();
    let mut art_path = PathBuf::from("asi-glider.png");
    let mut shadows = true;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--size" => {
                if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                    size = value;
                }
            }
            "--title" => {
                if let Some(value) = args.next() {
                    title = value;
                }
            }
            "--art" => {
                if let Some(value) = args.next() {
                    art_path = PathBuf::from(value);
                }
            }
            "--no-shadows" => shadows = false,
            other => info!("ignoring unknown argument {other}"),
        }
    }

    let config = GaugeConfig::builder()
        .size(size)
        .window_width(size)
        .window_height(size)
        .title(title)
        .art_path(art_path)
        .shadows(shadows)
        .build();

    let mut registry = SimVarRegistry::new();
    let mut gauge = AirspeedGauge::new(&config, Identity::Standalone, &mut registry);
    let mut options = RenderOptions {
        shadows: config.shadows,
        power_on: config.power_on,
    };
    if !gauge.is_active() {
        info!(
            "art sheet {} not found; the gauge stays dark until it appears",
            config.art_path.display()
        );
    }

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(LogicalSize::new(
            config.window_width as f64,
            config.window_height as f64,
        ))
        .with_resizable(false)
        .build(&event_loop)?;
    let window = std::sync::Arc::new(window);
    let window_clone = window.clone();

    let inner = window.inner_size();
    let mut pixels = {
        let surface_texture = SurfaceTexture::new(inner.width, inner.height, window.clone());
        Pixels::new(inner.width, inner.height, surface_texture)?
    };
    let mut screen = Bitmap::new(inner.width, inner.height);

    // Values piped on stdin override the simulated feed.
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if let Ok(knots) = line.trim().parse::<f64>() {
                PIPE_VALUE.store((knots.max(0.0) * 1000.0).round() as u32, Ordering::Relaxed);
            }
        }
    });

    let mut feed = SimulatedFeed::new();
    let mut rng = rand::rng();
    let frame_duration = std::time::Duration::from_secs_f64(1.0 / config.max_framerate);
    let mut last_frame = Instant::now();

    event_loop.run(move |event, window_target| {
        window_target.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    let _ = pixels.resize_buffer(new_size.width, new_size.height);
                    let _ = pixels.resize_surface(new_size.width, new_size.height);
                    screen = Bitmap::new(new_size.width, new_size.height);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        match event.logical_key.as_ref() {
                            Key::Character("s") => {
                                options.shadows = !options.shadows;
                                info!("shadows {}", if options.shadows { "on" } else { "off" });
                            }
                            Key::Character("p") => {
                                options.power_on = !options.power_on;
                                info!("power {}", if options.power_on { "on" } else { "off" });
                            }
                            _ => {}
                        }
                    }
                }
                WindowEvent::RedrawRequested => {
                    // One simulation tick per frame.
                    let piped = PIPE_VALUE.load(Ordering::Relaxed);
                    if piped == u32::MAX {
                        feed.step(&mut rng);
                        registry.set_airspeed(feed.knots);
                    } else {
                        registry.set_airspeed(piped as f64 / 1000.0);
                    }
                    gauge.update(&mut registry);

                    screen.fill([0x00, 0x00, 0x00, 0xff]);
                    gauge.render(&mut screen, &options);

                    let frame = pixels.frame_mut();
                    if frame.len() == screen.data().len() {
                        frame.copy_from_slice(screen.data());
                    }
                    if let Err(err) = pixels.render() {
                        error!("surface render failed: {err}");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                // Limit redraws to the configured frame rate.
                let elapsed = last_frame.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
                last_frame = Instant::now();
                window_clone.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
