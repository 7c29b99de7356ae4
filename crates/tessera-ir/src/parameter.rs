//! Gate angle expressions.
//!
//! An angle is either a number or a small expression tree over named
//! parameters. Symbols are resolved with [`ParameterExpression::bind`] (or
//! [`bind_all`](ParameterExpression::bind_all)) before a numeric value is
//! needed; [`evaluate`](ParameterExpression::evaluate) refuses to coerce an
//! expression that still contains a free symbol.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{IrError, IrResult};

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A named parameter.
    Symbol(String),
    /// The constant π.
    Pi,
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Addition.
    Add(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Subtraction.
    Sub(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Multiplication.
    Mul(Box<ParameterExpression>, Box<ParameterExpression>),
    /// Division.
    Div(Box<ParameterExpression>, Box<ParameterExpression>),
}

#[derive(Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
        }
    }

    fn build(self, a: ParameterExpression, b: ParameterExpression) -> ParameterExpression {
        let (a, b) = (Box::new(a), Box::new(b));
        match self {
            BinOp::Add => ParameterExpression::Add(a, b),
            BinOp::Sub => ParameterExpression::Sub(a, b),
            BinOp::Mul => ParameterExpression::Mul(a, b),
            BinOp::Div => ParameterExpression::Div(a, b),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a named parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// The constant π.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// `π * num / den`, the shape most catalog angles take.
    pub fn pi_times(num: f64, den: f64) -> Self {
        if num == 1.0 && den == 1.0 {
            return ParameterExpression::Pi;
        }
        let scaled = if num == 1.0 {
            ParameterExpression::Pi
        } else {
            ParameterExpression::Mul(Box::new(num.into()), Box::new(ParameterExpression::Pi))
        };
        if den == 1.0 {
            scaled
        } else {
            ParameterExpression::Div(Box::new(scaled), Box::new(den.into()))
        }
    }

    fn binary(&self) -> Option<(BinOp, &Self, &Self)> {
        match self {
            ParameterExpression::Add(a, b) => Some((BinOp::Add, a, b)),
            ParameterExpression::Sub(a, b) => Some((BinOp::Sub, a, b)),
            ParameterExpression::Mul(a, b) => Some((BinOp::Mul, a, b)),
            ParameterExpression::Div(a, b) => Some((BinOp::Div, a, b)),
            _ => None,
        }
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            other => other
                .binary()
                .is_some_and(|(_, a, b)| a.is_symbolic() || b.is_symbolic()),
        }
    }

    /// Evaluate to a number.
    ///
    /// Fails with [`IrError::UnboundParameter`] naming the first free symbol
    /// encountered in a left-to-right walk.
    pub fn evaluate(&self) -> IrResult<f64> {
        match self {
            ParameterExpression::Constant(v) => Ok(*v),
            ParameterExpression::Pi => Ok(PI),
            ParameterExpression::Symbol(name) => Err(IrError::UnboundParameter(name.clone())),
            ParameterExpression::Neg(e) => Ok(-e.evaluate()?),
            ParameterExpression::Add(a, b) => Ok(a.evaluate()? + b.evaluate()?),
            ParameterExpression::Sub(a, b) => Ok(a.evaluate()? - b.evaluate()?),
            ParameterExpression::Mul(a, b) => Ok(a.evaluate()? * b.evaluate()?),
            ParameterExpression::Div(a, b) => Ok(a.evaluate()? / b.evaluate()?),
        }
    }

    /// Evaluate to a finite number, or `None` if symbols remain or the result
    /// is not finite.
    pub fn as_f64(&self) -> Option<f64> {
        self.evaluate().ok().filter(|v| v.is_finite())
    }

    /// All free symbol names, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            other => {
                if let Some((_, a, b)) = other.binary() {
                    a.collect_symbols(set);
                    b.collect_symbols(set);
                }
            }
        }
    }

    /// Replace every occurrence of `name` with `replacement`.
    pub fn substitute(&self, name: &str, replacement: &ParameterExpression) -> Self {
        match self {
            ParameterExpression::Symbol(n) if n == name => replacement.clone(),
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Symbol(_) => self.clone(),
            ParameterExpression::Neg(e) => {
                ParameterExpression::Neg(Box::new(e.substitute(name, replacement)))
            }
            other => match other.binary() {
                Some((op, a, b)) => op.build(
                    a.substitute(name, replacement),
                    b.substitute(name, replacement),
                ),
                None => other.clone(),
            },
        }
    }

    /// Bind a symbol to a value, returning a new (possibly still partial)
    /// expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.substitute(name, &ParameterExpression::Constant(value))
    }

    /// Bind every symbol present in `values`; unknown symbols stay free.
    pub fn bind_all(&self, values: &FxHashMap<String, f64>) -> Self {
        match self {
            ParameterExpression::Symbol(n) => match values.get(n) {
                Some(v) => ParameterExpression::Constant(*v),
                None => self.clone(),
            },
            ParameterExpression::Constant(_) | ParameterExpression::Pi => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.bind_all(values))),
            other => match other.binary() {
                Some((op, a, b)) => op.build(a.bind_all(values), b.bind_all(values)),
                None => other.clone(),
            },
        }
    }

    /// Fold constant subexpressions.
    ///
    /// A bare `Pi` is kept symbolic so printed angles stay readable.
    pub fn simplify(&self) -> Self {
        match self {
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Symbol(_) => self.clone(),
            ParameterExpression::Neg(e) => match e.simplify() {
                ParameterExpression::Constant(v) => ParameterExpression::Constant(-v),
                ParameterExpression::Neg(inner) => *inner,
                e => ParameterExpression::Neg(Box::new(e)),
            },
            other => match other.binary() {
                Some((op, a, b)) => {
                    let (a, b) = (a.simplify(), b.simplify());
                    match (a.as_f64(), b.as_f64()) {
                        (Some(av), Some(bv)) if op.apply(av, bv).is_finite() => {
                            ParameterExpression::Constant(op.apply(av, bv))
                        }
                        _ => op.build(a, b),
                    }
                }
                None => other.clone(),
            },
        }
    }

    /// LaTeX rendering used for `texparams` in the structured export.
    pub fn to_latex(&self) -> String {
        match self {
            ParameterExpression::Constant(v) => format_number(*v),
            ParameterExpression::Symbol(name) => name.clone(),
            ParameterExpression::Pi => "\\pi".to_string(),
            ParameterExpression::Neg(e) => format!("- {}", e.to_latex()),
            ParameterExpression::Div(a, b) => {
                format!("\\frac{{{}}}{{{}}}", a.to_latex(), b.to_latex())
            }
            ParameterExpression::Mul(a, b) => format!("{} \\cdot {}", a.to_latex(), b.to_latex()),
            other => match other.binary() {
                Some((op, a, b)) => format!("{} {} {}", a.to_latex(), op.symbol(), b.to_latex()),
                None => String::new(),
            },
        }
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Renders in OpenQASM 2.0 expression syntax (`pi`, infix operators).
impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{}", format_number(*v)),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            other => match other.binary() {
                Some((op, a, b)) => write!(f, "({a} {} {b})", op.symbol()),
                None => Ok(()),
            },
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl From<&str> for ParameterExpression {
    fn from(name: &str) -> Self {
        ParameterExpression::Symbol(name.to_string())
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Mul(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.evaluate().unwrap(), 1.5);
    }

    #[test]
    fn test_unbound_symbol_refuses_evaluation() {
        let p = ParameterExpression::symbol("theta") * ParameterExpression::constant(2.0);
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        match p.evaluate() {
            Err(IrError::UnboundParameter(name)) => assert_eq!(name, "theta"),
            other => panic!("expected UnboundParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_partial() {
        let p = ParameterExpression::symbol("a") + ParameterExpression::symbol("b");
        let partial = p.bind("a", 1.0);
        assert!(partial.is_symbolic());
        assert_eq!(partial.symbols().into_iter().collect::<Vec<_>>(), vec!["b"]);

        let full = partial.bind("b", 2.0);
        assert_eq!(full.evaluate().unwrap(), 3.0);
    }

    #[test]
    fn test_bind_all() {
        let p = ParameterExpression::symbol("phi") / ParameterExpression::symbol("n");
        let mut values = FxHashMap::default();
        values.insert("phi".to_string(), PI);
        values.insert("n".to_string(), 2.0);
        let v = p.bind_all(&values).evaluate().unwrap();
        assert!((v - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_substitute_expression() {
        let p = -ParameterExpression::symbol("x");
        let q = p.substitute("x", &ParameterExpression::pi_times(1.0, 4.0));
        assert!((q.evaluate().unwrap() + PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_simplify_keeps_symbols() {
        let p = (ParameterExpression::constant(2.0) * ParameterExpression::constant(3.0))
            + ParameterExpression::symbol("t");
        let s = p.simplify();
        assert_eq!(
            s,
            ParameterExpression::constant(6.0) + ParameterExpression::symbol("t")
        );
    }

    #[test]
    fn test_qasm_and_latex_rendering() {
        let half_pi = ParameterExpression::pi_times(1.0, 2.0);
        assert_eq!(half_pi.to_string(), "(pi / 2.0)");
        assert_eq!(half_pi.to_latex(), "\\frac{\\pi}{2.0}");
        assert_eq!(ParameterExpression::constant(0.0).to_string(), "0.0");
    }
}
