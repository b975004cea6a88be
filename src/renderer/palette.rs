//! 256-colour palettes and a software [`PaletteService`].

use serde::{Deserialize, Serialize};

use super::{PaletteService, Rgba};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `percent` (clamped to 0..=100).
    pub fn faded(self, percent: u16) -> Rgb {
        let p = percent.min(100) as u32;
        let f = |c: u8| ((c as u32 * p) / 100) as u8;
        Rgb::new(f(self.r), f(self.g), f(self.b))
    }

    #[inline]
    pub fn to_rgba(self) -> Rgba {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub colors: [Rgb; 256],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: [Rgb::default(); 256],
        }
    }
}

impl Palette {
    /// Palette from `(index, colour)` pairs; unset entries are black.
    pub fn from_entries(entries: &[(u8, Rgb)]) -> Self {
        let mut pal = Palette::default();
        for &(i, c) in entries {
            pal.colors[i as usize] = c;
        }
        pal
    }
}

/// Palette service without remapping: keeps a per-index fade table and
/// produces the faded hardware palette on [`PaletteService::update_hardware`].
#[derive(Debug, Clone)]
pub struct SoftPalette {
    source: Palette,
    fade: [u16; 256],
    hardware: [Rgba; 256],
    dirty: bool,
    uploads: u32,
}

impl Default for SoftPalette {
    fn default() -> Self {
        Self {
            source: Palette::default(),
            fade: [100; 256],
            hardware: [0; 256],
            dirty: true,
            uploads: 0,
        }
    }
}

impl SoftPalette {
    pub fn new(source: Palette) -> Self {
        let mut pal = Self {
            source,
            ..Self::default()
        };
        pal.update_hardware(false);
        pal
    }

    /// Colours as last sent to the hardware.
    pub fn hardware(&self) -> &[Rgba; 256] {
        &self.hardware
    }

    pub fn fade_percent(&self, index: u8) -> u16 {
        self.fade[index as usize]
    }

    /// How many times the hardware palette actually changed.
    pub fn uploads(&self) -> u32 {
        self.uploads
    }
}

impl PaletteService for SoftPalette {
    fn set_fade(&mut self, percent: i16, from: u8, to: u8) {
        let percent = percent.max(0) as u16;
        for i in from..=to {
            if self.fade[i as usize] != percent {
                self.fade[i as usize] = percent;
                self.dirty = true;
            }
        }
    }

    fn submit(&mut self, palette: &Palette) {
        if self.source != *palette {
            self.source = palette.clone();
            self.dirty = true;
        }
    }

    fn update_for_frame(&mut self) -> bool {
        false
    }

    fn update_hardware(&mut self, _suppress_blit: bool) {
        if !self.dirty {
            return;
        }
        for (i, out) in self.hardware.iter_mut().enumerate() {
            *out = self.source.colors[i].faded(self.fade[i]).to_rgba();
        }
        self.dirty = false;
        self.uploads += 1;
    }

    fn remap_count(&self) -> usize {
        0
    }

    fn remap(&self, _color: u8, _under: u8) -> Option<u8> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_scales_hardware_colours() {
        let mut pal = SoftPalette::new(Palette::from_entries(&[(1, Rgb::new(200, 100, 50))]));
        assert_eq!(pal.hardware()[1], 0x00C8_6432);

        pal.set_fade(50, 0, 255);
        pal.update_hardware(false);
        assert_eq!(pal.hardware()[1], 0x0064_3219);
        assert_eq!(pal.fade_percent(7), 50);
    }

    #[test]
    fn unchanged_palette_is_not_reuploaded() {
        let mut pal = SoftPalette::new(Palette::default());
        let before = pal.uploads();
        pal.set_fade(100, 0, 255);
        pal.submit(&Palette::default());
        pal.update_hardware(false);
        assert_eq!(pal.uploads(), before);
    }
}
