//! Gauge and host configuration.

use std::path::PathBuf;

use bon::Builder;

/// Everything needed to place one airspeed gauge and run the demo host.
#[derive(Debug, Clone, Builder)]
pub struct GaugeConfig {
    /// Top-left screen coordinate of the composited output.
    #[builder(default = 0)]
    pub x: i32,
    #[builder(default = 0)]
    pub y: i32,
    /// Edge length in pixels of the square output.
    #[builder(default = 800)]
    pub size: u32,
    /// Art sheet the dial, pointer and shadow regions are cut from.
    #[builder(default = PathBuf::from("asi-glider.png"))]
    pub art_path: PathBuf,
    /// Draw the multiply-blended pointer shadow layer.
    #[builder(default = true)]
    pub shadows: bool,
    /// Electrical state at startup; an unpowered gauge renders dimmed.
    #[builder(default = true)]
    pub power_on: bool,

    // Host window settings
    #[builder(default = 800)]
    pub window_width: u32,
    #[builder(default = 800)]
    pub window_height: u32,
    #[builder(default = 60.0)]
    pub max_framerate: f64,
    #[builder(default = "Glider ASI".to_string())]
    pub title: String,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
