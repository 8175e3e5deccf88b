//! Rule expression language
//!
//! Formula and conditional rules carry small expressions over project fields,
//! e.g. `general.grossArea / numberOfExits <= 500` or
//! `computed.sprinklersRequired and not present(hasSprinklers)`.
//! Expressions are parsed into a typed tree and interpreted; nothing is ever
//! executed dynamically, and every failure is a typed [`ExprError`].

mod parser;

pub use parser::parse;

use serde::{Deserialize, Serialize};
use shared_types::FieldValue;
use thiserror::Error;

/// Errors raised while parsing or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("undefined field '{0}'")]
    UnknownField(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("'{op}' expects {expected}, got {found}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("division by zero")]
    DivisionByZero,
}

/// Source of field values for expression evaluation
pub trait Resolver {
    /// Value at `path`, or `None` when the field is not defined
    fn resolve(&self, path: &str) -> Option<FieldValue>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Option<FieldValue>,
{
    fn resolve(&self, path: &str) -> Option<FieldValue> {
        self(path)
    }
}

/// Comparison operators, shared with threshold rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Apply the operator to two values.
    ///
    /// Numbers (and numeric text) compare numerically, text compares
    /// case-insensitively for equality only, booleans compare for equality.
    pub fn holds(&self, left: &FieldValue, right: &FieldValue) -> Result<bool, ExprError> {
        if let (Some(a), Some(b)) = (numeric(left), numeric(right)) {
            return Ok(match self {
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
                CompareOp::Eq => (a - b).abs() < 1e-9,
                CompareOp::Ne => (a - b).abs() >= 1e-9,
            });
        }

        let equal = match (left, right) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => {
                a.trim().eq_ignore_ascii_case(b.trim())
            }
            (FieldValue::Bool(a), other) | (other, FieldValue::Bool(a)) => {
                match other.as_bool() {
                    Some(b) => *a == b,
                    None => return Err(mismatch(self.symbol(), "comparable values", other)),
                }
            }
            (a, b) => {
                return Err(ExprError::TypeMismatch {
                    op: self.symbol(),
                    expected: "comparable values",
                    found: format!("{} and {}", a.type_name(), b.type_name()),
                })
            }
        };

        match self {
            CompareOp::Eq => Ok(equal),
            CompareOp::Ne => Ok(!equal),
            _ => Err(mismatch(self.symbol(), "numbers", left)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Min,
    Max,
    Abs,
    Ceil,
    Floor,
    Round,
}

impl Function {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "abs" => Some(Function::Abs),
            "ceil" => Some(Function::Ceil),
            "floor" => Some(Function::Floor),
            "round" => Some(Function::Round),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Abs => "abs",
            Function::Ceil => "ceil",
            Function::Floor => "floor",
            Function::Round => "round",
        }
    }

    fn check_arity(&self, found: usize) -> Result<(), ExprError> {
        let (ok, expected) = match self {
            Function::Min | Function::Max => (found >= 1, "at least 1"),
            _ => (found == 1, "1"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExprError::Arity {
                function: self.name(),
                expected,
                found,
            })
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(FieldValue),
    Field(String),
    /// `present(path)`: whether the field is defined
    Present(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Logic(LogicOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
}

impl Expr {
    /// Operands of a top-level comparison
    pub fn as_comparison(&self) -> Option<(CompareOp, &Expr, &Expr)> {
        match self {
            Expr::Compare(op, left, right) => Some((*op, left, right)),
            _ => None,
        }
    }

    /// Every field path the expression reads
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(path) | Expr::Present(path) => out.push(path),
            Expr::Neg(e) | Expr::Not(e) => e.collect_fields(out),
            Expr::Arith(_, l, r) | Expr::Compare(_, l, r) | Expr::Logic(_, l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_fields(out)),
        }
    }

    pub fn eval(&self, ctx: &dyn Resolver) -> Result<FieldValue, ExprError> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Field(path) => ctx
                .resolve(path)
                .ok_or_else(|| ExprError::UnknownField(path.clone())),
            Expr::Present(path) => Ok(FieldValue::Bool(ctx.resolve(path).is_some())),
            Expr::Neg(e) => Ok(FieldValue::Number(-number("-", &e.eval(ctx)?)?)),
            Expr::Not(e) => Ok(FieldValue::Bool(!boolean("not", &e.eval(ctx)?)?)),
            Expr::Arith(op, l, r) => {
                let a = number(op.symbol(), &l.eval(ctx)?)?;
                let b = number(op.symbol(), &r.eval(ctx)?)?;
                let v = match op {
                    ArithOp::Add => a + b,
                    ArithOp::Sub => a - b,
                    ArithOp::Mul => a * b,
                    ArithOp::Div if b == 0.0 => return Err(ExprError::DivisionByZero),
                    ArithOp::Div => a / b,
                };
                Ok(FieldValue::Number(v))
            }
            Expr::Compare(op, l, r) => Ok(FieldValue::Bool(op.holds(&l.eval(ctx)?, &r.eval(ctx)?)?)),
            Expr::Logic(op, l, r) => {
                let (name, short_circuit) = match op {
                    LogicOp::And => ("and", false),
                    LogicOp::Or => ("or", true),
                };
                if boolean(name, &l.eval(ctx)?)? == short_circuit {
                    return Ok(FieldValue::Bool(short_circuit));
                }
                Ok(FieldValue::Bool(boolean(name, &r.eval(ctx)?)?))
            }
            Expr::Call(function, args) => {
                function.check_arity(args.len())?;
                let values = args
                    .iter()
                    .map(|a| number(function.name(), &a.eval(ctx)?))
                    .collect::<Result<Vec<f64>, ExprError>>()?;
                let v = match function {
                    Function::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                    Function::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    Function::Abs => values[0].abs(),
                    Function::Ceil => values[0].ceil(),
                    Function::Floor => values[0].floor(),
                    Function::Round => values[0].round(),
                };
                Ok(FieldValue::Number(v))
            }
        }
    }

    /// Evaluate and require a boolean result
    pub fn eval_bool(&self, ctx: &dyn Resolver) -> Result<bool, ExprError> {
        boolean("condition", &self.eval(ctx)?)
    }
}

fn numeric(v: &FieldValue) -> Option<f64> {
    match v {
        FieldValue::Bool(_) => None,
        other => other.as_number(),
    }
}

fn number(op: &'static str, v: &FieldValue) -> Result<f64, ExprError> {
    numeric(v).ok_or_else(|| mismatch(op, "a number", v))
}

fn boolean(op: &'static str, v: &FieldValue) -> Result<bool, ExprError> {
    v.as_bool().ok_or_else(|| mismatch(op, "a boolean", v))
}

fn mismatch(op: &'static str, expected: &'static str, found: &FieldValue) -> ExprError {
    ExprError::TypeMismatch {
        op,
        expected,
        found: format!("{} '{}'", found.type_name(), found),
    }
}
