use derive_more::{
    Add, AddAssign, Deref, DerefMut, Display, Div, From, Into, Mul, MulAssign, Sub, SubAssign, Sum,
};

/// A measurement in points, where 72 points = 1 inch. This is the native unit
/// of PDF user space, and the unit all layout in this crate is performed in.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    PartialOrd,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Mul,
    MulAssign,
    Div,
    Sum,
    Deref,
    DerefMut,
    Display,
    From,
    Into,
)]
pub struct Pt(pub f32);

impl Pt {
    pub const ZERO: Pt = Pt(0.0);

    /// Create a measurement from a value in inches
    pub fn from_inches(inches: f32) -> Pt {
        Pt(inches * 72.0)
    }

    /// Create a measurement from a value in millimetres
    pub fn from_mm(mm: f32) -> Pt {
        Pt(mm * 72.0 / 25.4)
    }

    pub fn max(self, other: Pt) -> Pt {
        Pt(self.0.max(other.0))
    }

    pub fn min(self, other: Pt) -> Pt {
        Pt(self.0.min(other.0))
    }
}

impl std::ops::Neg for Pt {
    type Output = Pt;

    fn neg(self) -> Pt {
        Pt(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Pt::from_inches(1.0), Pt(72.0));
        assert!((*Pt::from_mm(25.4) - 72.0).abs() < 1e-4);
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Pt(1.0) + Pt(2.0), Pt(3.0));
        assert_eq!(Pt(3.0) - Pt(2.0), Pt(1.0));
        assert_eq!(Pt(2.0) * 3.0, Pt(6.0));
        assert_eq!(Pt(6.0) / 3.0, Pt(2.0));
        assert_eq!(-Pt(1.0), Pt(-1.0));
        assert!(Pt(1.0) < Pt(2.0));
    }
}
