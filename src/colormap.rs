use plotters::style::RGBColor;

pub const NO_DATA: RGBColor = RGBColor(200, 200, 200);
pub const REGION_FILL: RGBColor = RGBColor(211, 211, 211);

/// Piecewise-linear colour ramp over [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct Gradient {
    stops: &'static [(u8, u8, u8)],
}

pub const REDS: Gradient = Gradient {
    stops: &[(255, 245, 240), (252, 187, 161), (251, 106, 74), (203, 24, 29), (103, 0, 13)],
};

pub const BLUES: Gradient = Gradient {
    stops: &[(247, 251, 255), (198, 219, 239), (107, 174, 214), (33, 113, 181), (8, 48, 107)],
};

pub const COOLWARM: Gradient = Gradient {
    stops: &[(59, 76, 192), (141, 176, 254), (221, 221, 221), (244, 154, 123), (180, 4, 38)],
};

const SET2: [RGBColor; 8] = [
    RGBColor(102, 194, 165),
    RGBColor(252, 141, 98),
    RGBColor(141, 160, 203),
    RGBColor(231, 138, 195),
    RGBColor(166, 216, 84),
    RGBColor(255, 217, 47),
    RGBColor(229, 196, 148),
    RGBColor(179, 179, 179),
];

impl Gradient {
    pub fn at(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(self.stops.len() - 2);
        let frac = pos - i as f64;

        let (r0, g0, b0) = self.stops[i];
        let (r1, g1, b1) = self.stops[i + 1];
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }

    /// Colour for `value` on the range [min, max].
    pub fn scaled(&self, value: f64, min: f64, max: f64) -> RGBColor {
        if max > min {
            self.at((value - min) / (max - min))
        } else {
            self.at(0.5)
        }
    }
}

pub fn categorical(index: usize) -> RGBColor {
    SET2[index % SET2.len()]
}
