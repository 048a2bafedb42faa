/// A colour, expressed in RGB, CMYK, or grey colour spaces
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Colour {
    /// DeviceRGB colour; r, g, b range from 0.0 to 1.0
    RGB { r: f32, g: f32, b: f32 },
    /// DeviceCMYK colour; c, m, y, and k range from 0.0 to 1.0
    CMYK { c: f32, m: f32, y: f32, k: f32 },
    /// DeviceGray colour; g ranges from 0.0 to 1.0
    Grey { g: f32 },
}

impl Colour {
    /// Create a new colour in the RGB space. r, g, and b range from 0.0 to 1.0
    pub fn new_rgb(r: f32, g: f32, b: f32) -> Colour {
        Colour::RGB { r, g, b }
    }

    /// Create a new colour in the RGB space. r, g, and b range from 0 to 255
    pub fn new_rgb_bytes(r: u8, g: u8, b: u8) -> Colour {
        Colour::RGB {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Create a new colour in the CMYK space. c, m, y, and k range from 0.0 to 1.0
    pub fn new_cmyk(c: f32, m: f32, y: f32, k: f32) -> Colour {
        Colour::CMYK { c, m, y, k }
    }

    /// Create a new colour in the Gray space, g ranges from 0.0 to 1.0
    pub fn new_grey(g: f32) -> Colour {
        Colour::Grey { g }
    }

    /// The components of this colour formatted for a canonical property key:
    /// fixed three-decimal, culture-invariant formatting, with a stable token
    /// for NaN so broken values still key deterministically.
    pub(crate) fn key_fragment(&self) -> String {
        fn num(v: f32) -> String {
            if v.is_nan() {
                "NaN".to_string()
            } else {
                format!("{v:.3}")
            }
        }
        match self {
            Colour::RGB { r, g, b } => format!("rgb:{};{};{}", num(*r), num(*g), num(*b)),
            Colour::CMYK { c, m, y, k } => {
                format!("cmyk:{};{};{};{}", num(*c), num(*m), num(*y), num(*k))
            }
            Colour::Grey { g } => format!("grey:{}", num(*g)),
        }
    }
}

impl<T: Into<f32>> From<(T, T, T)> for Colour {
    fn from(c: (T, T, T)) -> Self {
        Colour::RGB {
            r: c.0.into(),
            g: c.1.into(),
            b: c.2.into(),
        }
    }
}

impl<T: Into<f32>> From<[T; 3]> for Colour {
    fn from(c: [T; 3]) -> Self {
        let [r, g, b] = c;
        Colour::RGB {
            r: r.into(),
            g: g.into(),
            b: b.into(),
        }
    }
}

/// A list of pre-defined colour constants
pub mod colours {
    use super::*;

    pub const BLACK: Colour = Colour::Grey { g: 0.0 };
    pub const WHITE: Colour = Colour::Grey { g: 1.0 };
    pub const RED: Colour = Colour::RGB {
        r: 1.0,
        g: 0.0,
        b: 0.0,
    };
    pub const GREEN: Colour = Colour::RGB {
        r: 0.0,
        g: 1.0,
        b: 0.0,
    };
    pub const BLUE: Colour = Colour::RGB {
        r: 0.0,
        g: 0.0,
        b: 1.0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_fragments_are_fixed_precision() {
        assert_eq!(
            Colour::new_rgb(1.0, 0.5, 0.0).key_fragment(),
            "rgb:1.000;0.500;0.000"
        );
        assert_eq!(Colour::new_grey(0.25).key_fragment(), "grey:0.250");
    }

    #[test]
    fn nan_keys_are_stable() {
        let a = Colour::new_grey(f32::NAN).key_fragment();
        let b = Colour::new_grey(f32::NAN).key_fragment();
        assert_eq!(a, "grey:NaN");
        assert_eq!(a, b);
    }
}
