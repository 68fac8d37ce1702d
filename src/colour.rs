//! Colour mapping from spectrum intensities to per-vertex colours.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;
use log::{info, warn};

use crate::error::{Result, SculptError};

/// Packed colour, `0xAARRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const WHITE: Rgba = Rgba(0xFFFF_FFFF);
    pub const BLACK: Rgba = Rgba(0xFF00_0000);

    pub fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self((a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32)
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Normalised `[r, g, b, a]` for GPU upload
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
            self.a() as f32 / 255.0,
        ]
    }

    /// Component-wise linear blend, `t` in [0, 1]
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba::from_rgba(
            mix(self.r(), other.r()),
            mix(self.g(), other.g()),
            mix(self.b(), other.b()),
            mix(self.a(), other.a()),
        )
    }
}

/// Maps one entry of a spectrum to a colour
pub trait ColourMapper: Send + Sync {
    fn name(&self) -> &str;

    /// Colour for intensity `spectrum[idx]`
    fn map_spectrum(&self, spectrum: &[f32], idx: usize) -> Rgba;
}

/// Single colour regardless of intensity
#[derive(Debug, Clone)]
pub struct PlainColourMapper {
    name: String,
    colour: Rgba,
}

impl PlainColourMapper {
    pub fn new(name: impl Into<String>, colour: Rgba) -> Self {
        Self {
            name: name.into(),
            colour,
        }
    }

    pub fn colour(&self) -> Rgba {
        self.colour
    }
}

impl ColourMapper for PlainColourMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn map_spectrum(&self, _spectrum: &[f32], _idx: usize) -> Rgba {
        self.colour
    }
}

/// Lookup table image: intensity selects the column, frequency the row
pub struct ImageColourMapper {
    name: String,
    image: RgbaImage,
}

impl ImageColourMapper {
    pub fn load(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path.as_ref())?.to_rgba8();
        Ok(Self::from_image(name, image))
    }

    pub fn from_image(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }
}

impl ColourMapper for ImageColourMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn map_spectrum(&self, spectrum: &[f32], idx: usize) -> Rgba {
        let (w, h) = self.image.dimensions();
        if spectrum.is_empty() || w == 0 || h == 0 {
            return Rgba::WHITE;
        }
        let intensity = clamp_unit(spectrum.get(idx).copied().unwrap_or(0.0));
        let x = (intensity * (w - 1) as f32) as u32;
        let y = (idx.min(spectrum.len() - 1) * (h - 1) as usize / spectrum.len()) as u32;
        let [r, g, b, a] = self.image.get_pixel(x, y).0;
        Rgba::from_rgba(r, g, b, a)
    }
}

/// Piecewise linear gradient over intensity
#[derive(Debug, Clone)]
pub struct GradientColourMapper {
    name: String,
    /// (intensity, colour) stops sorted by intensity
    stops: Vec<(f32, Rgba)>,
}

impl GradientColourMapper {
    pub fn new(name: impl Into<String>, mut stops: Vec<(f32, Rgba)>) -> Self {
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            name: name.into(),
            stops,
        }
    }

    fn sample(&self, t: f32) -> Rgba {
        let Some(&(first_t, first)) = self.stops.first() else {
            return Rgba::WHITE;
        };
        if t <= first_t {
            return first;
        }
        for pair in self.stops.windows(2) {
            let (t0, c0) = pair[0];
            let (t1, c1) = pair[1];
            if t <= t1 {
                let span = t1 - t0;
                let f = if span > 0.0 { (t - t0) / span } else { 1.0 };
                return c0.lerp(c1, f);
            }
        }
        self.stops[self.stops.len() - 1].1
    }
}

impl ColourMapper for GradientColourMapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn map_spectrum(&self, spectrum: &[f32], idx: usize) -> Rgba {
        let intensity = clamp_unit(spectrum.get(idx).copied().unwrap_or(0.0));
        self.sample(intensity)
    }
}

/// Clamp an intensity into [0, 1]; NaN maps to 0
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Selectable colour mappers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColourMapperKind {
    #[default]
    White,
    Brown,
    Greyscale,
    Transparent,
    Spectrum,
    Fire,
    Ice,
}

impl ColourMapperKind {
    pub const ALL: [ColourMapperKind; 7] = [
        Self::White,
        Self::Brown,
        Self::Greyscale,
        Self::Transparent,
        Self::Spectrum,
        Self::Fire,
        Self::Ice,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::White => "WHITE",
            Self::Brown => "BROWN",
            Self::Greyscale => "GREYSCALE",
            Self::Transparent => "TRANSPARENT",
            Self::Spectrum => "SPECTRUM",
            Self::Fire => "FIRE",
            Self::Ice => "ICE",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Lookup image file name for the image-backed mappers
    fn image_file(self) -> Option<&'static str> {
        match self {
            Self::Greyscale => Some("GreyMap.png"),
            Self::Transparent => Some("TransparentMap.png"),
            Self::Spectrum => Some("SpectrumMap.png"),
            Self::Fire => Some("FireMap.png"),
            Self::Ice => Some("IceMap.png"),
            Self::White | Self::Brown => None,
        }
    }

    /// Built-in mapper for this kind
    pub fn instance(self) -> Arc<dyn ColourMapper> {
        let name = self.to_string();
        match self {
            Self::White => Arc::new(PlainColourMapper::new(name, Rgba::WHITE)),
            Self::Brown => Arc::new(PlainColourMapper::new(name, Rgba(0xFF60_3000))),
            Self::Greyscale => Arc::new(GradientColourMapper::new(
                name,
                vec![(0.0, Rgba(0xFF20_2020)), (1.0, Rgba::WHITE)],
            )),
            Self::Transparent => Arc::new(GradientColourMapper::new(
                name,
                vec![(0.0, Rgba(0x00FF_FFFF)), (1.0, Rgba::WHITE)],
            )),
            Self::Spectrum => Arc::new(GradientColourMapper::new(
                name,
                vec![
                    (0.0, Rgba(0xFF00_00FF)),
                    (0.25, Rgba(0xFF00_FFFF)),
                    (0.5, Rgba(0xFF00_FF00)),
                    (0.75, Rgba(0xFFFF_FF00)),
                    (1.0, Rgba(0xFFFF_0000)),
                ],
            )),
            Self::Fire => Arc::new(GradientColourMapper::new(
                name,
                vec![
                    (0.0, Rgba(0xFF10_0000)),
                    (0.4, Rgba(0xFFC0_2000)),
                    (0.8, Rgba(0xFFFF_C000)),
                    (1.0, Rgba(0xFFFF_FFE0)),
                ],
            )),
            Self::Ice => Arc::new(GradientColourMapper::new(
                name,
                vec![
                    (0.0, Rgba(0xFF00_1030)),
                    (0.5, Rgba(0xFF30_80D0)),
                    (1.0, Rgba(0xFFE0_F8FF)),
                ],
            )),
        }
    }

    /// Image mapper from `dir` when its lookup file exists, otherwise the built-in one
    pub fn load(self, dir: Option<&Path>) -> Arc<dyn ColourMapper> {
        if let (Some(dir), Some(file)) = (dir, self.image_file()) {
            let path = dir.join(file);
            if path.exists() {
                match ImageColourMapper::load(self.to_string(), &path) {
                    Ok(mapper) => {
                        info!("Loaded colour map {}", path.display());
                        return Arc::new(mapper);
                    }
                    Err(e) => warn!("Could not load image colour map {}: {}", path.display(), e),
                }
            }
        }
        self.instance()
    }
}

impl fmt::Display for ColourMapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::White => "White",
            Self::Brown => "Brown",
            Self::Greyscale => "Greyscale",
            Self::Transparent => "Transparent",
            Self::Spectrum => "Spectrum",
            Self::Fire => "Fire",
            Self::Ice => "Ice",
        };
        f.write_str(name)
    }
}

impl FromStr for ColourMapperKind {
    type Err = SculptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SculptError::invalid(format!("unknown colour mapper '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba as Pixel;

    #[test]
    fn test_rgba_packing() {
        let c = Rgba::from_rgba(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.0, 0x7812_3456);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (0x12, 0x34, 0x56, 0x78));
        assert_eq!(Rgba::WHITE.to_f32(), [1.0; 4]);
    }

    #[test]
    fn test_plain_mapper_ignores_intensity() {
        let mapper = ColourMapperKind::Brown.instance();
        assert_eq!(mapper.map_spectrum(&[0.0, 1.0], 1), Rgba(0xFF60_3000));
        assert_eq!(mapper.name(), "Brown");
    }

    #[test]
    fn test_gradient_endpoints_and_midpoint() {
        let mapper = GradientColourMapper::new(
            "test",
            vec![(1.0, Rgba::WHITE), (0.0, Rgba::BLACK)],
        );
        assert_eq!(mapper.map_spectrum(&[0.0], 0), Rgba::BLACK);
        assert_eq!(mapper.map_spectrum(&[1.0], 0), Rgba::WHITE);
        assert_eq!(mapper.map_spectrum(&[0.5], 0), Rgba::from_rgba(128, 128, 128, 255));
        // Out of range and NaN intensities clamp
        assert_eq!(mapper.map_spectrum(&[7.0], 0), Rgba::WHITE);
        assert_eq!(mapper.map_spectrum(&[f32::NAN], 0), Rgba::BLACK);
    }

    #[test]
    fn test_image_mapper_lookup() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Pixel([10, 0, 0, 255]));
        img.put_pixel(1, 0, Pixel([20, 0, 0, 255]));
        img.put_pixel(0, 1, Pixel([30, 0, 0, 255]));
        img.put_pixel(1, 1, Pixel([40, 0, 0, 255]));
        let mapper = ImageColourMapper::from_image("img", img);

        let spectrum = [0.0, 1.0];
        // idx 0 -> row 0, intensity 0 -> column 0
        assert_eq!(mapper.map_spectrum(&spectrum, 0).r(), 10);
        // idx 1 -> row 1*1/2 = 0, intensity 1 -> column 1
        assert_eq!(mapper.map_spectrum(&spectrum, 1).r(), 20);
    }

    #[test]
    fn test_mapper_kind_parse_and_cycle() {
        assert_eq!("fire".parse::<ColourMapperKind>().unwrap(), ColourMapperKind::Fire);
        assert!(matches!(
            "plasma".parse::<ColourMapperKind>(),
            Err(SculptError::InvalidArgument(_))
        ));
        assert_eq!(ColourMapperKind::Ice.next(), ColourMapperKind::White);
    }

    #[test]
    fn test_load_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = ColourMapperKind::Fire.load(Some(dir.path()));
        assert_eq!(mapper.name(), "Fire");
    }
}
