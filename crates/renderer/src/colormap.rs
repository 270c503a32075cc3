//! Indexed color ramp for byte-scaled NO2 rasters.

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Stops of the NO2 ramp: transparent, then dark blue to red with rising column density.
pub const NO2_ANCHORS: [(u8, Color); 6] = [
    (0, Color::transparent()),
    (1, Color::new(0, 0, 140, 255)),     // Dark blue
    (64, Color::new(0, 120, 255, 255)),  // Blue
    (128, Color::new(0, 255, 170, 255)), // Green
    (192, Color::new(255, 255, 0, 255)), // Yellow
    (255, Color::new(255, 0, 0, 255)),   // Red
];

/// Index reserved for "no valid measurement".
pub const NODATA_INDEX: u8 = 0;

/// A 256-entry lookup table from byte index to RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    entries: [Color; 256],
}

impl ColorRamp {
    /// Build the table by piecewise-linear interpolation between anchors.
    ///
    /// Anchors must be sorted by index. Indices before the first anchor are
    /// transparent and indices after the last keep the last anchor's color.
    pub fn from_anchors(anchors: &[(u8, Color)]) -> Self {
        let mut entries = [Color::transparent(); 256];

        for pair in anchors.windows(2) {
            let (start_idx, start_color) = pair[0];
            let (end_idx, end_color) = pair[1];
            let span = (end_idx as usize).saturating_sub(start_idx as usize).max(1);
            for i in 0..span {
                let t = i as f64 / span as f64;
                entries[start_idx as usize + i] = interpolate_color(start_color, end_color, t);
            }
        }

        if let Some(&(last_idx, last_color)) = anchors.last() {
            for entry in entries.iter_mut().skip(last_idx as usize) {
                *entry = last_color;
            }
        }

        Self { entries }
    }

    /// The transparent-blue-green-yellow-red NO2 ramp.
    pub fn no2() -> Self {
        Self::from_anchors(&NO2_ANCHORS)
    }

    pub fn get(&self, index: u8) -> Color {
        self.entries[index as usize]
    }

    pub fn entries(&self) -> &[Color; 256] {
        &self.entries
    }

    /// Expand indexed pixels to RGBA bytes (4 per pixel).
    pub fn apply(&self, indices: &[u8]) -> Vec<u8> {
        let mut pixels = Vec::with_capacity(indices.len() * 4);
        for &idx in indices {
            pixels.extend_from_slice(&self.get(idx).to_array());
        }
        pixels
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::no2()
    }
}

/// Linear color interpolation, rounding half to even per channel.
pub fn interpolate_color(color1: Color, color2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: u8, b: u8| -> u8 {
        let v = a as f64 + t * (b as f64 - a as f64);
        v.round_ties_even().clamp(0.0, 255.0) as u8
    };

    Color::new(
        channel(color1.r, color2.r),
        channel(color1.g, color2.g),
        channel(color1.b, color2.b),
        channel(color1.a, color2.a),
    )
}
