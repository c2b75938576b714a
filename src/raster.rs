//! Software raster surfaces for the gauge compositor.
//!
//! Everything is plain RGBA8 in CPU memory, the same layout `pixels`
//! hands out for its frame buffer. All blits clip against the
//! destination, so callers never pre-validate rectangles.

use std::path::Path;

use log::debug;
use thiserror::Error;

/// Failure to produce a usable bitmap from an art asset.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("pixel buffer does not match {width}x{height}")]
    BufferSize { width: u32, height: u32 },
}

/// Per-pixel compositing rule for layered draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-over: the usual alpha compositing.
    Alpha,
    /// Destination darkened by the source; a white source pixel leaves
    /// the destination untouched.
    Multiply,
}

/// An owned RGBA8 surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Decode a PNG art asset from disk.
    pub fn load(path: &Path) -> Result<Self, RasterError> {
        let image = image::open(path)
            .map_err(|source| RasterError::Load {
                path: path.display().to_string(),
                source,
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();
        debug!("loaded {} ({width}x{height})", path.display());
        Ok(Self {
            width,
            height,
            data: image.into_raw(),
        })
    }

    /// Wrap an existing RGBA8 buffer.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(RasterError::BufferSize { width, height });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    fn put(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Flood the whole surface with one color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    /// Source-over blit of the whole of `src` with its top-left at
    /// `(dx, dy)`.
    pub fn blit(&mut self, src: &Bitmap, dx: i32, dy: i32) {
        for sy in 0..src.height {
            let ty = dy as i64 + sy as i64;
            if ty < 0 || ty >= self.height as i64 {
                continue;
            }
            for sx in 0..src.width {
                let tx = dx as i64 + sx as i64;
                if tx < 0 || tx >= self.width as i64 {
                    continue;
                }
                let out = blend(
                    BlendMode::Alpha,
                    self.pixel(tx as u32, ty as u32),
                    src.pixel(sx, sy),
                );
                self.put(tx as u32, ty as u32, out);
            }
        }
    }

    /// Verbatim copy of a source rectangle, clipped against both surfaces.
    pub fn blit_region(
        &mut self,
        src: &Bitmap,
        sx: u32,
        sy: u32,
        sw: u32,
        sh: u32,
        dx: u32,
        dy: u32,
    ) {
        for row in 0..sh {
            if sy + row >= src.height || dy + row >= self.height {
                break;
            }
            for col in 0..sw {
                if sx + col >= src.width || dx + col >= self.width {
                    break;
                }
                self.put(dx + col, dy + row, src.pixel(sx + col, sy + row));
            }
        }
    }

    /// Nearest-neighbour scale of a source rectangle into a destination
    /// rectangle, source-over.
    pub fn blit_scaled(
        &mut self,
        src: &Bitmap,
        (sx, sy, sw, sh): (u32, u32, u32, u32),
        (dx, dy, dw, dh): (u32, u32, u32, u32),
    ) {
        if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
            return;
        }
        for row in 0..dh {
            let ty = dy + row;
            let source_y = sy + (row as u64 * sh as u64 / dh as u64) as u32;
            if ty >= self.height || source_y >= src.height {
                break;
            }
            for col in 0..dw {
                let tx = dx + col;
                let source_x = sx + (col as u64 * sw as u64 / dw as u64) as u32;
                if tx >= self.width || source_x >= src.width {
                    break;
                }
                let out = blend(
                    BlendMode::Alpha,
                    self.pixel(tx, ty),
                    src.pixel(source_x, source_y),
                );
                self.put(tx, ty, out);
            }
        }
    }

    /// Draw `src` scaled and rotated so that `pivot` (in source pixels)
    /// lands on `anchor` (in destination pixels). `radians` rotates
    /// clockwise in screen coordinates.
    pub fn blit_rotated(
        &mut self,
        src: &Bitmap,
        pivot: (f64, f64),
        anchor: (f64, f64),
        scale: f64,
        radians: f64,
        mode: BlendMode,
    ) {
        if scale <= 0.0 {
            return;
        }
        let (cos, sin) = (radians.cos(), radians.sin());

        // Destination bounding box of the transformed source quad.
        let corners = [
            (0.0, 0.0),
            (src.width as f64, 0.0),
            (0.0, src.height as f64),
            (src.width as f64, src.height as f64),
        ];
        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for (px, py) in corners {
            let lx = (px - pivot.0) * scale;
            let ly = (py - pivot.1) * scale;
            let tx = anchor.0 + lx * cos - ly * sin;
            let ty = anchor.1 + lx * sin + ly * cos;
            min_x = min_x.min(tx);
            min_y = min_y.min(ty);
            max_x = max_x.max(tx);
            max_y = max_y.max(ty);
        }
        let x0 = min_x.floor().clamp(0.0, self.width as f64) as u32;
        let y0 = min_y.floor().clamp(0.0, self.height as f64) as u32;
        let x1 = max_x.ceil().clamp(0.0, self.width as f64) as u32;
        let y1 = max_y.ceil().clamp(0.0, self.height as f64) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                // Inverse-map the destination pixel centre into the strip.
                let rx = x as f64 + 0.5 - anchor.0;
                let ry = y as f64 + 0.5 - anchor.1;
                let sxf = (rx * cos + ry * sin) / scale + pivot.0;
                let syf = (-rx * sin + ry * cos) / scale + pivot.1;
                if sxf < 0.0 || syf < 0.0 || sxf >= src.width as f64 || syf >= src.height as f64 {
                    continue;
                }
                let out = blend(
                    mode,
                    self.pixel(x, y),
                    src.pixel(sxf as u32, syf as u32),
                );
                self.put(x, y, out);
            }
        }
    }

    /// Darken a region toward black; `level` 0.0 leaves it unchanged,
    /// 1.0 blacks it out. Alpha is preserved.
    pub fn dim(&mut self, x: i32, y: i32, w: u32, h: u32, level: f32) {
        let keep = 1.0 - level.clamp(0.0, 1.0);
        for row in 0..h as i64 {
            let ty = y as i64 + row;
            if ty < 0 || ty >= self.height as i64 {
                continue;
            }
            for col in 0..w as i64 {
                let tx = x as i64 + col;
                if tx < 0 || tx >= self.width as i64 {
                    continue;
                }
                let [r, g, b, a] = self.pixel(tx as u32, ty as u32);
                let scaled = |v: u8| (v as f32 * keep).round() as u8;
                self.put(tx as u32, ty as u32, [scaled(r), scaled(g), scaled(b), a]);
            }
        }
    }
}

fn blend(mode: BlendMode, dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    match mode {
        BlendMode::Alpha => {
            let sa = src[3] as f32 / 255.0;
            let da = dst[3] as f32 / 255.0;
            let oa = sa + da * (1.0 - sa);
            if oa == 0.0 {
                return [0, 0, 0, 0];
            }
            let ch = |s: u8, d: u8| {
                ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / oa).round() as u8
            };
            [
                ch(src[0], dst[0]),
                ch(src[1], dst[1]),
                ch(src[2], dst[2]),
                (oa * 255.0).round() as u8,
            ]
        }
        BlendMode::Multiply => {
            // Source alpha acts as coverage: a transparent pixel leaves
            // the destination alone, white multiplies to identity.
            let sa = src[3] as f32 / 255.0;
            let ch = |s: u8, d: u8| {
                let s = 255.0 + (s as f32 - 255.0) * sa;
                (s * d as f32 / 255.0).round() as u8
            };
            [ch(src[0], dst[0]), ch(src[1], dst[1]), ch(src[2], dst[2]), dst[3]]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Bitmap {
        let mut bitmap = Bitmap::new(width, height);
        bitmap.fill(rgba);
        bitmap
    }

    #[test]
    fn region_blit_clips_to_destination() {
        let sheet = solid(10, 10, [1, 2, 3, 255]);
        let mut dest = Bitmap::new(4, 4);
        dest.blit_region(&sheet, 0, 0, 8, 8, 0, 0);
        assert_eq!(dest.pixel(0, 0), [1, 2, 3, 255]);
        assert_eq!(dest.pixel(3, 3), [1, 2, 3, 255]);
    }

    #[test]
    fn region_blit_copies_verbatim() {
        let src = solid(4, 4, [10, 20, 30, 40]);
        let mut dest = solid(4, 4, [200, 200, 200, 255]);
        dest.blit_region(&src, 1, 1, 2, 2, 0, 0);
        // No blending: the half-transparent source replaces the pixel.
        assert_eq!(dest.pixel(0, 0), [10, 20, 30, 40]);
        assert_eq!(dest.pixel(2, 2), [200, 200, 200, 255]);
    }

    #[test]
    fn alpha_blit_over_transparent_copies_source() {
        let src = solid(2, 2, [10, 20, 30, 255]);
        let mut dest = Bitmap::new(4, 4);
        dest.blit(&src, 1, 1);
        assert_eq!(dest.pixel(1, 1), [10, 20, 30, 255]);
        assert_eq!(dest.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn alpha_blit_blends_semitransparent_source() {
        let src = solid(1, 1, [255, 255, 255, 128]);
        let mut dest = solid(1, 1, [0, 0, 0, 255]);
        dest.blit(&src, 0, 0);
        assert_eq!(dest.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn scaled_blit_fills_the_destination_rectangle() {
        let src = solid(8, 8, [5, 6, 7, 255]);
        let mut dest = Bitmap::new(4, 4);
        dest.blit_scaled(&src, (0, 0, 8, 8), (0, 0, 4, 4));
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(dest.pixel(x, y), [5, 6, 7, 255]);
            }
        }
    }

    #[test]
    fn multiply_white_is_identity() {
        let white = solid(2, 2, [255, 255, 255, 255]);
        let mut dest = solid(2, 2, [100, 150, 200, 255]);
        dest.blit_rotated(&white, (0.0, 0.0), (0.0, 0.0), 1.0, 0.0, BlendMode::Multiply);
        assert_eq!(dest.pixel(0, 0), [100, 150, 200, 255]);
        assert_eq!(dest.pixel(1, 1), [100, 150, 200, 255]);
    }

    #[test]
    fn multiply_grey_darkens() {
        let grey = solid(1, 1, [128, 128, 128, 255]);
        let mut dest = solid(1, 1, [200, 100, 255, 255]);
        dest.blit_rotated(&grey, (0.0, 0.0), (0.0, 0.0), 1.0, 0.0, BlendMode::Multiply);
        assert_eq!(dest.pixel(0, 0), [100, 50, 128, 255]);
    }

    #[test]
    fn rotation_at_zero_maps_pivot_to_anchor() {
        let mut src = solid(3, 3, [9, 9, 9, 255]);
        let mark = solid(1, 1, [200, 0, 0, 255]);
        src.blit_region(&mark, 0, 0, 1, 1, 1, 1);

        let mut dest = Bitmap::new(9, 9);
        dest.blit_rotated(&src, (1.0, 1.0), (5.0, 5.0), 1.0, 0.0, BlendMode::Alpha);
        assert_eq!(dest.pixel(5, 5), [200, 0, 0, 255]);
        assert_eq!(dest.pixel(4, 4), [9, 9, 9, 255]);
        assert_eq!(dest.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn rotation_scales_the_footprint() {
        let src = solid(2, 2, [1, 1, 1, 255]);
        let mut dest = Bitmap::new(8, 8);
        dest.blit_rotated(&src, (0.0, 0.0), (0.0, 0.0), 2.0, 0.0, BlendMode::Alpha);
        let covered = dest
            .data()
            .chunks_exact(4)
            .filter(|px| px[3] != 0)
            .count();
        assert_eq!(covered, 16);
    }

    #[test]
    fn dim_darkens_only_the_region() {
        let mut surface = solid(4, 4, [100, 100, 100, 255]);
        surface.dim(0, 0, 2, 2, 0.5);
        assert_eq!(surface.pixel(0, 0), [50, 50, 50, 255]);
        assert_eq!(surface.pixel(3, 3), [100, 100, 100, 255]);
    }

    #[test]
    fn from_rgba_rejects_mismatched_buffers() {
        assert!(Bitmap::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(Bitmap::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let missing = Path::new("/nonexistent/glider-asi-sheet.png");
        assert!(Bitmap::load(missing).is_err());
    }

    #[test]
    fn load_round_trips_a_png() {
        let path = std::env::temp_dir().join(format!(
            "glider-asi-raster-roundtrip-{}.png",
            std::process::id()
        ));
        image::RgbaImage::from_pixel(6, 5, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("write test png");
        let bitmap = Bitmap::load(&path).expect("load test png");
        assert_eq!(bitmap.dimensions(), (6, 5));
        assert_eq!(bitmap.pixel(5, 4), [1, 2, 3, 255]);
        std::fs::remove_file(path).ok();
    }
}
