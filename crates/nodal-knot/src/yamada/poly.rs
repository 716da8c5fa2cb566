//! Laurent polynomials with integer coefficients in one formal variable.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg};

/// Exponent → coefficient map; zero coefficients are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Laurent {
    terms: BTreeMap<i32, i64>,
}

impl Laurent {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::monomial(0, 1)
    }

    pub fn monomial(exp: i32, coeff: i64) -> Self {
        let mut terms = BTreeMap::new();
        if coeff != 0 {
            terms.insert(exp, coeff);
        }
        Self { terms }
    }

    /// Build from `(exponent, coefficient)` pairs; repeated exponents add up.
    pub fn from_terms<I: IntoIterator<Item = (i32, i64)>>(terms: I) -> Self {
        let mut out = Self::zero();
        for (e, c) in terms {
            out.add_term(e, c);
        }
        out
    }

    fn add_term(&mut self, exp: i32, coeff: i64) {
        if coeff == 0 {
            return;
        }
        let c = self.terms.entry(exp).or_insert(0);
        *c += coeff;
        if *c == 0 {
            self.terms.remove(&exp);
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, exp: i32) -> i64 {
        self.terms.get(&exp).copied().unwrap_or(0)
    }

    pub fn terms(&self) -> &BTreeMap<i32, i64> {
        &self.terms
    }

    pub fn min_exponent(&self) -> Option<i32> {
        self.terms.keys().next().copied()
    }

    /// Multiply by `A^k`.
    pub fn shift(&self, k: i32) -> Self {
        Self {
            terms: self.terms.iter().map(|(&e, &c)| (e + k, c)).collect(),
        }
    }

    /// Substitute `A → A⁻¹`.
    pub fn mirror(&self) -> Self {
        Self {
            terms: self.terms.iter().map(|(&e, &c)| (-e, c)).collect(),
        }
    }

    pub fn pow(&self, n: u32) -> Self {
        (0..n).fold(Self::one(), |acc, _| &acc * self)
    }

    /// Multiply by `±A^k` so the lowest exponent is 0 with a positive coefficient.
    pub fn normalized(&self) -> Self {
        let Some(lo) = self.min_exponent() else {
            return Self::zero();
        };
        let shifted = self.shift(-lo);
        if shifted.coefficient(0) < 0 {
            -shifted
        } else {
            shifted
        }
    }

    /// Human-readable form in the variable `var`, highest exponent first.
    pub fn display_with<'a>(&'a self, var: &'a str) -> impl fmt::Display + 'a {
        Pretty { poly: self, var }
    }
}

struct Pretty<'a> {
    poly: &'a Laurent,
    var: &'a str,
}

impl fmt::Display for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.poly.is_zero() {
            return f.write_str("0");
        }
        for (i, (&e, &c)) in self.poly.terms.iter().rev().enumerate() {
            let mag = c.unsigned_abs();
            match (i, c < 0) {
                (0, true) => f.write_str("-")?,
                (0, false) => {}
                (_, true) => f.write_str(" - ")?,
                (_, false) => f.write_str(" + ")?,
            }
            if e == 0 {
                write!(f, "{mag}")?;
                continue;
            }
            if mag != 1 {
                write!(f, "{mag}")?;
            }
            f.write_str(self.var)?;
            if e != 1 {
                write!(f, "^{e}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Laurent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with("A"))
    }
}

impl Add for &Laurent {
    type Output = Laurent;

    fn add(self, rhs: &Laurent) -> Laurent {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl Add for Laurent {
    type Output = Laurent;

    fn add(mut self, rhs: Laurent) -> Laurent {
        self += &rhs;
        self
    }
}

impl AddAssign<&Laurent> for Laurent {
    fn add_assign(&mut self, rhs: &Laurent) {
        for (&e, &c) in &rhs.terms {
            self.add_term(e, c);
        }
    }
}

impl Mul for &Laurent {
    type Output = Laurent;

    fn mul(self, rhs: &Laurent) -> Laurent {
        let mut out = Laurent::zero();
        for (&a, &x) in &self.terms {
            for (&b, &y) in &rhs.terms {
                out.add_term(a + b, x * y);
            }
        }
        out
    }
}

impl Mul for Laurent {
    type Output = Laurent;

    fn mul(self, rhs: Laurent) -> Laurent {
        &self * &rhs
    }
}

impl Neg for Laurent {
    type Output = Laurent;

    fn neg(self) -> Laurent {
        Laurent {
            terms: self.terms.into_iter().map(|(e, c)| (e, -c)).collect(),
        }
    }
}

/// A computed Yamada polynomial together with the name of its variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct YamadaPolynomial {
    poly: Laurent,
    variable: String,
}

impl YamadaPolynomial {
    pub fn new(poly: Laurent, variable: impl Into<String>) -> Self {
        Self {
            poly,
            variable: variable.into(),
        }
    }

    pub fn poly(&self) -> &Laurent {
        &self.poly
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn terms(&self) -> &BTreeMap<i32, i64> {
        self.poly.terms()
    }

    pub fn normalized(&self) -> Self {
        Self::new(self.poly.normalized(), self.variable.clone())
    }

    /// Same polynomial, compared without the variable name.
    pub fn same_value(&self, other: &Self) -> bool {
        self.poly == other.poly
    }
}

impl fmt::Display for YamadaPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.poly.display_with(&self.variable))
    }
}
