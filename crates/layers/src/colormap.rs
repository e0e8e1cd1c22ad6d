use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Result<Self, GradientError> {
        let h = hex.trim().trim_start_matches('#');
        let invalid = || GradientError::InvalidHex(hex.to_string());
        if h.len() != 6 || !h.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&h[range], 16).map_err(|_| invalid())
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = GradientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub value: f64,
    pub color: Rgb,
}

impl GradientStop {
    pub const fn new(value: f64, color: Rgb) -> Self {
        Self { value, color }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradientError {
    TooFewStops { count: usize },
    NotIncreasing { index: usize },
    InvalidHex(String),
}

impl std::fmt::Display for GradientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GradientError::TooFewStops { count } => {
                write!(f, "gradient needs at least two stops, got {count}")
            }
            GradientError::NotIncreasing { index } => {
                write!(f, "gradient stop {index} is not strictly greater than its predecessor")
            }
            GradientError::InvalidHex(s) => write!(f, "invalid #rrggbb color: {s:?}"),
        }
    }
}

impl std::error::Error for GradientError {}

/// Piecewise-linear color ramp over strictly increasing stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GradientStop>", into = "Vec<GradientStop>")]
pub struct ColorGradient {
    stops: Vec<GradientStop>,
}

impl ColorGradient {
    pub fn new(stops: Vec<GradientStop>) -> Result<Self, GradientError> {
        if stops.len() < 2 {
            return Err(GradientError::TooFewStops { count: stops.len() });
        }
        for (index, pair) in stops.windows(2).enumerate() {
            // `!(a < b)` also rejects NaN values.
            if !(pair[0].value < pair[1].value) || !pair[1].value.is_finite() {
                return Err(GradientError::NotIncreasing { index: index + 1 });
            }
        }
        if !stops[0].value.is_finite() {
            return Err(GradientError::NotIncreasing { index: 0 });
        }
        Ok(Self { stops })
    }

    /// Blue → green → yellow → orange → red over -30..45 °C.
    pub fn temperature() -> Self {
        Self {
            stops: vec![
                GradientStop::new(-30.0, Rgb::new(0x2b, 0x83, 0xba)),
                GradientStop::new(0.0, Rgb::new(0xab, 0xdd, 0xa4)),
                GradientStop::new(15.0, Rgb::new(0xff, 0xff, 0xbf)),
                GradientStop::new(30.0, Rgb::new(0xfd, 0xae, 0x61)),
                GradientStop::new(45.0, Rgb::new(0xd7, 0x19, 0x1c)),
            ],
        }
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.stops[0].value, self.stops[self.stops.len() - 1].value)
    }

    /// Maps `v` to a color, clamping to the first/last stop outside the domain.
    /// NaN maps to the first stop.
    pub fn value_to_color(&self, v: f64) -> Rgb {
        let (min, max) = self.domain();
        if v.is_nan() {
            return self.stops[0].color;
        }
        let t = v.clamp(min, max);

        let mut k = 0;
        while k < self.stops.len() - 2 && t > self.stops[k + 1].value {
            k += 1;
        }
        let a = self.stops[k];
        let b = self.stops[k + 1];
        let u = (t - a.value) / (b.value - a.value);

        Rgb::new(
            lerp_channel(a.color.r, b.color.r, u),
            lerp_channel(a.color.g, b.color.g, u),
            lerp_channel(a.color.b, b.color.b, u),
        )
    }
}

impl Default for ColorGradient {
    fn default() -> Self {
        Self::temperature()
    }
}

impl TryFrom<Vec<GradientStop>> for ColorGradient {
    type Error = GradientError;

    fn try_from(stops: Vec<GradientStop>) -> Result<Self, Self::Error> {
        ColorGradient::new(stops)
    }
}

impl From<ColorGradient> for Vec<GradientStop> {
    fn from(value: ColorGradient) -> Self {
        value.stops
    }
}

fn lerp_channel(a: u8, b: u8, u: f64) -> u8 {
    let v = a as f64 + (b as f64 - a as f64) * u;
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::{ColorGradient, GradientError, GradientStop, Rgb};

    const BLUE: Rgb = Rgb::new(0x2b, 0x83, 0xba);
    const GREEN: Rgb = Rgb::new(0xab, 0xdd, 0xa4);
    const YELLOW: Rgb = Rgb::new(0xff, 0xff, 0xbf);
    const RED: Rgb = Rgb::new(0xd7, 0x19, 0x1c);

    #[test]
    fn hex_round_trip() {
        assert_eq!(Rgb::from_hex("#fdae61").unwrap(), Rgb::new(253, 174, 97));
        assert_eq!(Rgb::from_hex("2B83BA").unwrap(), BLUE);
        assert_eq!(BLUE.to_hex(), "#2b83ba");
        assert!(matches!(Rgb::from_hex("#12345"), Err(GradientError::InvalidHex(_))));
        assert!(Rgb::from_hex("#zz0000").is_err());
    }

    #[test]
    fn stops_hit_exactly() {
        let g = ColorGradient::temperature();
        assert_eq!(g.value_to_color(-30.0), BLUE);
        assert_eq!(g.value_to_color(0.0), GREEN);
        assert_eq!(g.value_to_color(15.0), YELLOW);
        assert_eq!(g.value_to_color(45.0), RED);
    }

    #[test]
    fn clamps_outside_domain() {
        let g = ColorGradient::temperature();
        assert_eq!(g.value_to_color(50.0), g.value_to_color(45.0));
        assert_eq!(g.value_to_color(-100.0), BLUE);
        assert_eq!(g.value_to_color(f64::INFINITY), RED);
        assert_eq!(g.value_to_color(f64::NAN), BLUE);
    }

    #[test]
    fn interpolates_linearly_within_bracket() {
        let g = ColorGradient::temperature();
        // Halfway between blue (43,131,186) and green (171,221,164).
        assert_eq!(g.value_to_color(-15.0), Rgb::new(107, 176, 175));

        let two = ColorGradient::new(vec![
            GradientStop::new(0.0, Rgb::new(0, 0, 0)),
            GradientStop::new(10.0, Rgb::new(100, 200, 250)),
        ])
        .unwrap();
        for step in 0..=10 {
            let c = two.value_to_color(step as f64);
            assert_eq!(c, Rgb::new(step * 10, step * 20, step * 25));
        }
    }

    #[test]
    fn channels_are_monotonic_inside_each_bracket() {
        let g = ColorGradient::temperature();
        for pair in g.stops().windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let mut prev = g.value_to_color(a.value);
            for s in 1..=20 {
                let v = a.value + (b.value - a.value) * s as f64 / 20.0;
                let c = g.value_to_color(v);
                for (p, n, from, to) in [
                    (prev.r, c.r, a.color.r, b.color.r),
                    (prev.g, c.g, a.color.g, b.color.g),
                    (prev.b, c.b, a.color.b, b.color.b),
                ] {
                    if to >= from {
                        assert!(n >= p);
                    } else {
                        assert!(n <= p);
                    }
                }
                prev = c;
            }
        }
    }

    #[test]
    fn rejects_bad_stop_lists() {
        let c = Rgb::new(0, 0, 0);
        assert_eq!(
            ColorGradient::new(vec![GradientStop::new(0.0, c)]),
            Err(GradientError::TooFewStops { count: 1 })
        );
        assert_eq!(
            ColorGradient::new(vec![GradientStop::new(1.0, c), GradientStop::new(1.0, c)]),
            Err(GradientError::NotIncreasing { index: 1 })
        );
        assert!(
            ColorGradient::new(vec![GradientStop::new(f64::NAN, c), GradientStop::new(1.0, c)])
                .is_err()
        );
    }

    #[test]
    fn deserializes_from_hex_stops() {
        let g: ColorGradient = serde_json::from_str(
            r##"[{"value": -30, "color": "#2b83ba"}, {"value": 45, "color": "#d7191c"}]"##,
        )
        .unwrap();
        assert_eq!(g.domain(), (-30.0, 45.0));
        let bad: Result<ColorGradient, _> =
            serde_json::from_str(r##"[{"value": 0, "color": "#000000"}]"##);
        assert!(bad.is_err());
    }
}
