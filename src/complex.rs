use std::{cmp::Ordering, fmt, ops::*};

use enum_iterator::{all, Sequence};
use serde::*;

/// Strata's complex number type
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex {
    /// The real part
    pub re: f64,
    /// The imaginary part
    pub im: f64,
}

impl Complex {
    /// The imaginary unit
    pub const I: Self = Self { re: 0.0, im: 1.0 };
    /// Zero
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };
    /// One
    pub const ONE: Self = Self { re: 1.0, im: 0.0 };
    /// Create a new complex number
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
    /// Get the floor of the real and imaginary parts of a complex number
    pub fn floor(self) -> Self {
        Self::new(self.re.floor(), self.im.floor())
    }
    /// Get the ceiling of the real and imaginary parts of a complex number
    pub fn ceil(self) -> Self {
        Self::new(self.re.ceil(), self.im.ceil())
    }
    /// Round the real and imaginary parts of a complex number
    pub fn round(self) -> Self {
        Self::new(self.re.round(), self.im.round())
    }
    /// Get the magnitude of a complex number
    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }
    /// Get the angle of a complex number
    pub fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }
    /// Whether both parts are zero
    pub fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
    /// Get the unit complex number in the same direction, or zero
    pub fn normalize(self) -> Self {
        let abs = self.abs();
        if abs == 0.0 {
            Self::ZERO
        } else {
            self / abs
        }
    }
    /// Create a complex number from polar coordinates
    pub fn from_polar(r: f64, theta: f64) -> Self {
        Self::new(r * theta.cos(), r * theta.sin())
    }
    /// Raise a complex number to a complex power
    pub fn powc(self, power: impl Into<Self>) -> Self {
        let power = power.into();
        if power.is_zero() {
            return Self::ONE;
        }
        if self.is_zero() {
            return Self::ZERO;
        }
        let (r, theta) = (self.abs(), self.arg());
        let ln_r = r.ln();
        Self::from_polar(
            (power.re * ln_r - power.im * theta).exp(),
            power.im * ln_r + power.re * theta,
        )
    }
    /// Get the principal square root of a complex number
    pub fn sqrt(self) -> Self {
        Self::from_polar(self.abs().sqrt(), self.arg() / 2.0)
    }
    /// Compare by real part, then imaginary part
    pub fn lexicographic_cmp(&self, other: &Self) -> Ordering {
        (self.re.total_cmp(&other.re)).then_with(|| self.im.total_cmp(&other.im))
    }
}

impl From<f64> for Complex {
    fn from(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl From<i64> for Complex {
    fn from(re: i64) -> Self {
        Self::from(re as f64)
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |f: &mut fmt::Formatter<'_>, x: f64| {
            if x < 0.0 {
                write!(f, "¯{}", -x)
            } else {
                write!(f, "{x}")
            }
        };
        part(f, self.re)?;
        write!(f, "r")?;
        part(f, self.im)?;
        write!(f, "i")
    }
}

impl Add for Complex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

impl Mul<f64> for Complex {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.re * rhs, self.im * rhs)
    }
}

impl Div for Complex {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        let denom = rhs.re * rhs.re + rhs.im * rhs.im;
        Self {
            re: (self.re * rhs.re + self.im * rhs.im) / denom,
            im: (self.im * rhs.re - self.re * rhs.im) / denom,
        }
    }
}

impl Div<f64> for Complex {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.re / rhs, self.im / rhs)
    }
}

impl Neg for Complex {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.re, -self.im)
    }
}

/// How complex numbers behave where real-number semantics do not carry over
///
/// Equality always compares both parts exactly, and modulus of complex
/// numbers is always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplexSemantics {
    /// How `⌊`, `⌈`, and `⁅` treat complex numbers
    pub rounding: ComplexRounding,
    /// How `<`, `≤`, `>`, `≥`, `↧`, and `↥` treat complex numbers
    pub ordering: ComplexOrdering,
}

/// How rounding primitives treat complex numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexRounding {
    /// Round the real and imaginary parts separately
    #[default]
    Componentwise,
    /// Rounding a complex number is an error
    Reject,
}

/// How ordering primitives treat complex numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexOrdering {
    /// Ordering complex numbers is an error
    #[default]
    Reject,
    /// Order by real part, then by imaginary part
    Lexicographic,
}

impl ComplexRounding {
    /// The name used in configuration
    pub fn name(self) -> &'static str {
        match self {
            ComplexRounding::Componentwise => "componentwise",
            ComplexRounding::Reject => "reject",
        }
    }
    /// Find a rounding mode by its name
    pub fn from_name(name: &str) -> Option<Self> {
        all::<Self>().find(|mode| mode.name() == name)
    }
}

impl ComplexOrdering {
    /// The name used in configuration
    pub fn name(self) -> &'static str {
        match self {
            ComplexOrdering::Reject => "reject",
            ComplexOrdering::Lexicographic => "lexicographic",
        }
    }
    /// Find an ordering mode by its name
    pub fn from_name(name: &str) -> Option<Self> {
        all::<Self>().find(|mode| mode.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Complex::new(1.0, 2.0);
        let b = Complex::new(3.0, -1.0);
        assert_eq!(a + b, Complex::new(4.0, 1.0));
        assert_eq!(a * b, Complex::new(5.0, 5.0));
        assert_eq!((a * b) / b, a);
        assert_eq!(Complex::I * Complex::I, Complex::new(-1.0, 0.0));
    }

    #[test]
    fn powers_and_roots() {
        let z = Complex::new(-4.0, 0.0).sqrt();
        assert!((z.re).abs() < 1e-12 && (z.im - 2.0).abs() < 1e-12, "{z}");
        let sq = Complex::new(1.0, 1.0).powc(2.0);
        assert!((sq.re).abs() < 1e-12 && (sq.im - 2.0).abs() < 1e-12, "{sq}");
        assert_eq!(Complex::ZERO.powc(0.0), Complex::ONE);
    }

    #[test]
    fn lexicographic_order() {
        let a = Complex::new(1.0, 5.0);
        let b = Complex::new(2.0, 0.0);
        let c = Complex::new(1.0, 6.0);
        assert_eq!(a.lexicographic_cmp(&b), Ordering::Less);
        assert_eq!(a.lexicographic_cmp(&c), Ordering::Less);
        assert_eq!(c.lexicographic_cmp(&a), Ordering::Greater);
    }

    #[test]
    fn display() {
        assert_eq!(Complex::new(1.0, -2.0).to_string(), "1r¯2i");
        assert_eq!(ComplexSemantics::default().ordering, ComplexOrdering::Reject);
    }

    #[test]
    fn mode_names() {
        for mode in all::<ComplexRounding>() {
            assert_eq!(ComplexRounding::from_name(mode.name()), Some(mode));
        }
        for mode in all::<ComplexOrdering>() {
            assert_eq!(ComplexOrdering::from_name(mode.name()), Some(mode));
        }
        assert_eq!(ComplexOrdering::from_name("partial"), None);
    }
}
