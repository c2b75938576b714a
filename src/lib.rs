//! Glider airspeed indicator: a layered-bitmap cockpit gauge.
//!
//! The gauge pulls an indicated airspeed from a [`SimVarRegistry`],
//! converts it to km/h, maps it through a piecewise-linear calibration
//! to a pointer angle, and composites pre-scaled art-sheet layers onto
//! the host framebuffer: dial face, optional multiply-blended pointer
//! shadow, rotated pointer, and a dim overlay when the panel is
//! unpowered.
//!
//! `update` runs once per simulation tick (pulls live value and stored
//! geometry, recomputes the angle, resizes if the stored size changed);
//! `render` runs once per display frame and is a pure function of the
//! current state.

pub mod config;
pub mod raster;
pub mod registry;

pub use config::GaugeConfig;
pub use raster::{Bitmap, BlendMode, RasterError};
pub use registry::{Geometry, SimVarRegistry};

use std::path::PathBuf;

use log::{debug, warn};

/// Authoring resolution of the art sheet; the dial region is this many
/// pixels square.
const REFERENCE_SIZE: f64 = 800.0;

/// Indicated airspeed arrives in knots; the dial reads km/h.
pub const KNOTS_TO_KMPH: f64 = 1.852;

/// Registry name a standalone gauge registers under.
pub const GAUGE_NAME: &str = "ASI Glider";

/// The one measured quantity this gauge consumes.
const AIRSPEED_VAR: &str = "Airspeed Indicated";

/// Rotation anchor inside the pointer and shadow strips, in strip pixels.
const PIVOT: (f64, f64) = (24.0, 374.0);

/// Pointer/shadow strip allocation. The sheet regions are 48 wide; the
/// destination clips the two rightmost columns.
const STRIP_WIDTH: u32 = 46;
const STRIP_HEIGHT: u32 = 554;

/// Readings below this have no meaning on the dial and are floored.
const KMPH_FLOOR: f64 = 20.0;

/// Opacity of the black overlay drawn over an unpowered gauge.
const DIM_LEVEL: f32 = 0.6;

/// How a gauge binds to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Owns its registration under [`GAUGE_NAME`].
    Standalone,
    /// Visual clone adopting a previously configured instance's name,
    /// sharing that instance's backing data. Registers nothing.
    Linked { parent: String },
}

/// Position, size and name shared by every panel instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentFrame {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

/// Host-owned render switches, borrowed per frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Draw the multiply-blended pointer shadow layer.
    pub shadows: bool,
    /// Electrical state; when off, the gauge is dimmed after compositing.
    pub power_on: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            shadows: true,
            power_on: true,
        }
    }
}

/// The five derived surfaces, present only after a successful resize.
/// Dropping the whole set at once keeps "all five or none" structural.
#[derive(Debug, Clone)]
struct GaugeBitmaps {
    /// Original art sheet, the immutable source of all regions.
    sheet: Bitmap,
    /// Composition target, `size` x `size`.
    dest: Bitmap,
    /// Dial face pre-scaled to `size` x `size`.
    dial: Bitmap,
    /// Pointer strip at native resolution; scaled at draw time.
    pointer: Bitmap,
    /// Pointer shadow strip, same native size as the pointer.
    shadow: Bitmap,
}

/// One rendered glider airspeed indicator.
pub struct AirspeedGauge {
    frame: InstrumentFrame,
    identity: Identity,
    art_path: PathBuf,
    bitmaps: Option<GaugeBitmaps>,
    scale_factor: f64,
    kmph: f64,
    angle: f64,
}

impl AirspeedGauge {
    /// Build a gauge and derive its surfaces. A standalone gauge
    /// registers its airspeed variable; a linked gauge adopts its
    /// parent's name and registers nothing. A missing art sheet is not
    /// an error: the gauge constructs disabled and retries on the next
    /// resize.
    pub fn new(config: &GaugeConfig, identity: Identity, registry: &mut SimVarRegistry) -> Self {
        let name = match &identity {
            Identity::Linked { parent } => parent.clone(),
            Identity::Standalone => {
                registry.add_var(GAUGE_NAME, AIRSPEED_VAR, false, 1.0, 0);
                GAUGE_NAME.to_string()
            }
        };
        let mut gauge = Self {
            frame: InstrumentFrame {
                name,
                x: config.x,
                y: config.y,
                size: config.size,
            },
            identity,
            art_path: config.art_path.clone(),
            bitmaps: None,
            scale_factor: config.size as f64 / REFERENCE_SIZE,
            kmph: 0.0,
            angle: 0.0,
        };
        gauge.resize();
        gauge
    }

    pub fn frame(&self) -> &InstrumentFrame {
        &self.frame
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Current pointer rotation in degrees.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Last computed display-unit airspeed, after the floor clamp.
    pub fn kmph(&self) -> f64 {
        self.kmph
    }

    /// Ratio of the rendered size to the art sheet's authoring size.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Whether the surfaces are present and render will draw.
    pub fn is_active(&self) -> bool {
        self.bitmaps.is_some()
    }

    /// Drop and rebuild every surface at the current size. Safe to call
    /// repeatedly; this is the only place bitmap ownership changes. On a
    /// failed sheet load the gauge stays disabled until the next resize.
    pub fn resize(&mut self) {
        self.bitmaps = None;
        self.scale_factor = self.frame.size as f64 / REFERENCE_SIZE;

        let sheet = match Bitmap::load(&self.art_path) {
            Ok(sheet) => sheet,
            Err(err) => {
                warn!("{}: art sheet unavailable, gauge disabled: {err}", self.frame.name);
                return;
            }
        };

        let size = self.frame.size;
        let dest = Bitmap::new(size, size);

        let mut dial = Bitmap::new(size, size);
        dial.blit_scaled(&sheet, (0, 0, 800, 800), (0, 0, size, size));

        let mut pointer = Bitmap::new(STRIP_WIDTH, STRIP_HEIGHT);
        pointer.blit_region(&sheet, 800, 28, 48, 554, 0, 0);

        let mut shadow = Bitmap::new(STRIP_WIDTH, STRIP_HEIGHT);
        shadow.blit_region(&sheet, 848, 28, 48, 554, 0, 0);

        debug!(
            "{}: surfaces rebuilt at {size}px (scale {:.3})",
            self.frame.name, self.scale_factor
        );
        self.bitmaps = Some(GaugeBitmaps {
            sheet,
            dest,
            dial,
            pointer,
            shadow,
        });
    }

    /// Pull stored geometry and the live airspeed, recompute the pointer
    /// angle. A stored size change triggers a resize; a position change
    /// is adopted as-is.
    pub fn update(&mut self, registry: &mut SimVarRegistry) {
        let geometry =
            registry.read_settings(&self.frame.name, self.frame.x, self.frame.y, self.frame.size);
        self.frame.x = geometry.x;
        self.frame.y = geometry.y;
        if self.frame.size != geometry.size {
            self.frame.size = geometry.size;
            self.resize();
        }

        let mut kmph = registry.airspeed() * KNOTS_TO_KMPH;
        if kmph < KMPH_FLOOR {
            kmph = KMPH_FLOOR;
        }
        self.kmph = kmph;
        self.angle = pointer_angle(kmph);
    }

    /// Composite the gauge onto `screen` at its stored position. Reads
    /// nothing from the outside; a disabled gauge draws nothing at all.
    pub fn render(&mut self, screen: &mut Bitmap, options: &RenderOptions) {
        let Some(bitmaps) = &mut self.bitmaps else {
            return;
        };
        let scale = self.scale_factor;
        let radians = self.angle.to_radians();

        // Assemble the layers in the composition target.
        bitmaps.dest.blit(&bitmaps.dial, 0, 0);

        if options.shadows {
            // The shadow anchor sits off the pointer axis so the cast
            // reads as depth once the pointer covers it.
            bitmaps.dest.blit_rotated(
                &bitmaps.shadow,
                PIVOT,
                (410.0 * scale, 410.0 * scale),
                scale,
                radians,
                BlendMode::Multiply,
            );
        }

        bitmaps.dest.blit_rotated(
            &bitmaps.pointer,
            PIVOT,
            (400.0 * scale, 400.0 * scale),
            scale,
            radians,
            BlendMode::Alpha,
        );

        // Place the finished composition on the host surface.
        screen.blit(&bitmaps.dest, self.frame.x, self.frame.y);

        if !options.power_on {
            screen.dim(
                self.frame.x,
                self.frame.y,
                self.frame.size,
                self.frame.size,
                DIM_LEVEL,
            );
        }
    }
}

/// Pointer angle in degrees for a km/h reading at or above the floor.
///
/// Three linear segments traced against the printed dial; which formula
/// owns a breakpoint matters, the segments are not one global curve.
pub fn pointer_angle(kmph: f64) -> f64 {
    if kmph <= 100.0 {
        124.0 + kmph * 2.3
    } else if kmph <= 150.0 {
        154.0 + kmph * 2.0
    } else {
        217.0 + kmph * 1.58
    }
}
