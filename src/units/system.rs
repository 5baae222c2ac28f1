//! Unit system trait and the default SI implementation

use crate::{PlotError, Result};

/// Converts between unit expressions
///
/// Implementations decide which expressions they understand. The plot engine
/// only ever asks for the factor that turns a value in `native` into a value
/// in `requested`.
pub trait UnitSystem: std::fmt::Debug + Send + Sync {
    /// Factor `f` such that `value_in_requested = value_in_native * f`
    ///
    /// Returns `Ok(None)` when both expressions are valid but describe
    /// different dimensions, and an error when an expression cannot be parsed.
    fn scale_factor(&self, native: &str, requested: &str) -> Result<Option<f64>>;
}

/// Number of base dimensions tracked: length, time, energy, magnetic flux density, current
const DIMENSIONS: usize = 5;

/// Base units: symbol, value in coherent units, dimension exponents
const BASE_UNITS: &[(&str, f64, [i32; DIMENSIONS])] = &[
    ("m", 1.0, [1, 0, 0, 0, 0]),
    ("s", 1.0, [0, 1, 0, 0, 0]),
    ("Hz", 1.0, [0, -1, 0, 0, 0]),
    ("eV", 1.0, [0, 0, 1, 0, 0]),
    ("T", 1.0, [0, 0, 0, 1, 0]),
    ("A", 1.0, [0, 0, 0, 0, 1]),
    ("C", 1.0, [0, 1, 0, 0, 1]),
    ("rad", 1.0, [0; DIMENSIONS]),
    ("deg", std::f64::consts::PI / 180.0, [0; DIMENSIONS]),
];

/// Juxtaposed symbols read as products rather than as prefixed units
const COMPOUND_UNITS: &[(&str, &str)] = &[("Tm", "T*m")];

const PREFIXES: &[(&str, f64)] = &[
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("µ", 1e-6),
    ("μ", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
];

/// SI units with decimal prefixes
///
/// Understands products and quotients of prefixed base units with integer
/// powers, e.g. `mm`, `1/m^2`, `T*m`, `GeV`, `mrad`, `us`, `%`.
/// Angles are dimensionless. Products are written with `*`; the one
/// exception is the magnetic rigidity `Tm`, which means `T*m` and not
/// terametre.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiUnits;

impl SiUnits {
    pub fn new() -> Self {
        Self
    }
}

impl UnitSystem for SiUnits {
    fn scale_factor(&self, native: &str, requested: &str) -> Result<Option<f64>> {
        let native = Quantity::parse(native)?;
        let requested = Quantity::parse(requested)?;
        if native.dims != requested.dims {
            return Ok(None);
        }
        Ok(Some(native.value / requested.value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Quantity {
    value: f64,
    dims: [i32; DIMENSIONS],
}

impl Quantity {
    const ONE: Quantity = Quantity {
        value: 1.0,
        dims: [0; DIMENSIONS],
    };

    fn parse(expr: &str) -> Result<Quantity> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Ok(Quantity::ONE);
        }

        let mut result = Quantity::ONE;
        let mut divide = false;
        let mut term = String::new();
        // Trailing '*' flushes the last term
        for c in trimmed.chars().chain(std::iter::once('*')) {
            match c {
                '*' | '/' | '·' => {
                    let q = Self::parse_term(term.trim(), expr)?;
                    result = if divide { result.div(q) } else { result.mul(q) };
                    divide = c == '/';
                    term.clear();
                }
                _ => term.push(c),
            }
        }
        Ok(result)
    }

    fn parse_term(term: &str, expr: &str) -> Result<Quantity> {
        if term.is_empty() {
            return Err(PlotError::UnitError(format!(
                "Empty factor in unit expression '{}'",
                expr
            )));
        }

        let (symbol, power) = match term.split_once('^') {
            Some((symbol, power)) => {
                let power = power.trim().parse::<i32>().map_err(|_| {
                    PlotError::UnitError(format!("Invalid exponent in unit '{}'", term))
                })?;
                (symbol.trim(), power)
            }
            None => (term, 1),
        };

        let base = match symbol {
            "1" => Quantity::ONE,
            "%" => Quantity {
                value: 0.01,
                dims: [0; DIMENSIONS],
            },
            _ => Self::lookup(symbol).ok_or_else(|| {
                PlotError::UnitError(format!("Unknown unit '{}' in '{}'", symbol, expr))
            })?,
        };
        Ok(base.pow(power))
    }

    fn lookup(symbol: &str) -> Option<Quantity> {
        let base = |name: &str| {
            BASE_UNITS
                .iter()
                .find(|(s, _, _)| *s == name)
                .map(|(_, value, dims)| Quantity {
                    value: *value,
                    dims: *dims,
                })
                .or_else(|| {
                    COMPOUND_UNITS
                        .iter()
                        .find(|(s, _)| *s == name)
                        .and_then(|(_, product)| Quantity::parse(product).ok())
                })
        };

        // Exact symbols win over prefixed readings ("T" is tesla, "m" is metre)
        if let Some(q) = base(symbol) {
            return Some(q);
        }
        PREFIXES.iter().find_map(|(prefix, scale)| {
            symbol
                .strip_prefix(prefix)
                .and_then(base)
                .map(|q| Quantity {
                    value: q.value * scale,
                    dims: q.dims,
                })
        })
    }

    fn mul(self, other: Quantity) -> Quantity {
        let mut dims = self.dims;
        for (d, o) in dims.iter_mut().zip(other.dims) {
            *d += o;
        }
        Quantity {
            value: self.value * other.value,
            dims,
        }
    }

    fn div(self, other: Quantity) -> Quantity {
        self.mul(other.pow(-1))
    }

    fn pow(self, power: i32) -> Quantity {
        Quantity {
            value: self.value.powi(power),
            dims: self.dims.map(|d| d * power),
        }
    }
}
