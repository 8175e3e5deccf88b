//! Tokenizer and recursive-descent parser for rule expressions
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons (non-associative),
//! `+ -`, `* /`, unary minus.

use super::{ArithOp, CompareOp, Expr, ExprError, Function, LogicOp};
use lazy_static::lazy_static;
use regex::Regex;
use shared_types::FieldValue;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(
        r#"^(?:(?P<num>\d+(?:\.\d+)?)|(?P<str>'[^']*'|"[^"]*")|(?P<sym><=|>=|==|!=|&&|\|\||[-+*/()<>!,])|(?P<ident>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*))"#
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Sym(&'static str),
    Ident(String),
    End,
}

const SYMBOLS: [&str; 16] = [
    "<=", ">=", "==", "!=", "&&", "||", "-", "+", "*", "/", "(", ")", "<", ">", "!", ",",
];

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];
        let trimmed = rest.trim_start();
        pos += rest.len() - trimmed.len();
        if trimmed.is_empty() {
            break;
        }

        let caps = TOKEN.captures(trimmed).ok_or_else(|| ExprError::Parse {
            position: pos,
            message: format!(
                "unexpected character '{}'",
                trimmed.chars().next().unwrap_or(' ')
            ),
        })?;

        let token = if let Some(m) = caps.name("num") {
            let value = m.as_str().parse::<f64>().map_err(|_| ExprError::Parse {
                position: pos,
                message: format!("invalid number '{}'", m.as_str()),
            })?;
            Token::Number(value)
        } else if let Some(m) = caps.name("str") {
            let quoted = m.as_str();
            Token::Str(quoted[1..quoted.len() - 1].to_string())
        } else if let Some(m) = caps.name("sym") {
            let sym = SYMBOLS
                .iter()
                .copied()
                .find(|s| *s == m.as_str())
                .unwrap_or(",");
            Token::Sym(sym)
        } else {
            Token::Ident(caps["ident"].to_string())
        };

        tokens.push((token, pos));
        pos += caps[0].len();
    }

    tokens.push((Token::End, src.len()));
    Ok(tokens)
}

/// Deepest expression tree the parser builds, counting both parentheses and
/// chained operators
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
    depth: usize,
}

impl Parser {
    /// One level deeper; callers reset `depth` once their subtree is built
    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.error("expression nested too deeply");
        }
        Ok(())
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index].0
    }

    fn position(&self) -> usize {
        self.tokens[self.index].1
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].0.clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ExprError> {
        Err(ExprError::Parse {
            position: self.position(),
            message: message.into(),
        })
    }

    /// Consume the current token if it is one of `symbols` or `keywords`
    fn eat(&mut self, symbols: &[&str], keywords: &[&str]) -> bool {
        let matched = match self.peek() {
            Token::Sym(s) => symbols.contains(s),
            Token::Ident(name) => keywords.contains(&name.as_str()),
            _ => false,
        };
        if matched {
            self.advance();
        }
        matched
    }

    fn expect(&mut self, symbol: &str) -> Result<(), ExprError> {
        if self.eat(&[symbol], &[]) {
            Ok(())
        } else {
            self.error(format!("expected '{}'", symbol))
        }
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.and()?;
        while self.eat(&["||"], &["or"]) {
            self.enter()?;
            let right = self.and()?;
            left = Expr::Logic(LogicOp::Or, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.not()?;
        while self.eat(&["&&"], &["and"]) {
            self.enter()?;
            let right = self.not()?;
            left = Expr::Logic(LogicOp::And, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&["!"], &["not"]) {
            self.enter()?;
            let inner = self.not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.additive()?;
        let op = match self.peek() {
            Token::Sym("<") => CompareOp::Lt,
            Token::Sym("<=") => CompareOp::Le,
            Token::Sym(">") => CompareOp::Gt,
            Token::Sym(">=") => CompareOp::Ge,
            Token::Sym("==") => CompareOp::Eq,
            Token::Sym("!=") => CompareOp::Ne,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        if matches!(
            self.peek(),
            Token::Sym("<" | "<=" | ">" | ">=" | "==" | "!=")
        ) {
            return self.error("comparisons cannot be chained");
        }
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Sym("+") => ArithOp::Add,
                Token::Sym("-") => ArithOp::Sub,
                _ => {
                    self.depth = base;
                    return Ok(left);
                }
            };
            self.advance();
            self.enter()?;
            let right = self.term()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Sym("*") => ArithOp::Mul,
                Token::Sym("/") => ArithOp::Div,
                _ => {
                    self.depth = base;
                    return Ok(left);
                }
            };
            self.advance();
            self.enter()?;
            let right = self.unary()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&["-"], &[]) {
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let start = self.position();
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(FieldValue::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(FieldValue::Text(s))),
            Token::Sym("(") => {
                self.enter()?;
                let inner = self.or()?;
                self.expect(")")?;
                self.depth -= 1;
                Ok(inner)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(FieldValue::Bool(true))),
                "false" => Ok(Expr::Literal(FieldValue::Bool(false))),
                "and" | "or" | "not" => Err(ExprError::Parse {
                    position: start,
                    message: format!("unexpected keyword '{}'", name),
                }),
                _ if matches!(self.peek(), Token::Sym("(")) => self.call(name),
                _ => Ok(Expr::Field(name)),
            },
            Token::End => Err(ExprError::Parse {
                position: start,
                message: "unexpected end of expression".to_string(),
            }),
            Token::Sym(s) => Err(ExprError::Parse {
                position: start,
                message: format!("unexpected '{}'", s),
            }),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, ExprError> {
        self.expect("(")?;

        if name == "present" {
            let path = match self.advance() {
                Token::Ident(path) => path,
                _ => return self.error("present() takes a field path"),
            };
            self.expect(")")?;
            return Ok(Expr::Present(path));
        }

        let function = Function::parse(&name).ok_or(ExprError::UnknownFunction(name))?;
        self.enter()?;
        let mut args = Vec::new();
        if !self.eat(&[")"], &[]) {
            loop {
                args.push(self.or()?);
                if self.eat(&[")"], &[]) {
                    break;
                }
                self.expect(",")?;
            }
        }
        function.check_arity(args.len())?;
        self.depth -= 1;
        Ok(Expr::Call(function, args))
    }
}

/// Parse an expression
///
/// # Errors
///
/// [`ExprError::Parse`] with the byte offset of the offending token,
/// [`ExprError::UnknownFunction`] or [`ExprError::Arity`] for bad calls.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser {
        tokens: tokenize(src)?,
        index: 0,
        depth: 0,
    };
    let expr = parser.or()?;
    if parser.peek() != &Token::End {
        return parser.error("unexpected trailing input");
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal(FieldValue::Number(n)))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3").unwrap(),
            Expr::Arith(
                ArithOp::Add,
                num(1.0),
                Box::new(Expr::Arith(ArithOp::Mul, num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn test_keywords_and_symbols_are_equivalent() {
        assert_eq!(
            parse("a.x and not b.y or c").unwrap(),
            parse("a.x && !b.y || c").unwrap()
        );
    }

    #[test]
    fn test_paths_and_literals() {
        assert_eq!(
            parse("fireSafety.usageType == 'IV'").unwrap(),
            Expr::Compare(
                CompareOp::Eq,
                Box::new(Expr::Field("fireSafety.usageType".to_string())),
                Box::new(Expr::Literal(FieldValue::Text("IV".to_string())))
            )
        );
        assert_eq!(
            parse("present(computed.riskCategory)").unwrap(),
            Expr::Present("computed.riskCategory".to_string())
        );
    }

    #[test]
    fn test_parse_errors_carry_position() {
        assert_eq!(
            parse("a.x >= "),
            Err(ExprError::Parse {
                position: 7,
                message: "unexpected end of expression".to_string()
            })
        );
        assert!(matches!(
            parse("a.x = 3"),
            Err(ExprError::Parse { position: 4, .. })
        ));
        assert!(matches!(parse("(1 + 2"), Err(ExprError::Parse { .. })));
        assert!(matches!(parse("1 < 2 < 3"), Err(ExprError::Parse { .. })));
        assert!(matches!(parse("1 2"), Err(ExprError::Parse { .. })));
    }

    #[test]
    fn test_function_errors() {
        assert_eq!(
            parse("sqrt(4)"),
            Err(ExprError::UnknownFunction("sqrt".to_string()))
        );
        assert!(matches!(
            parse("abs(1, 2)"),
            Err(ExprError::Arity { function: "abs", .. })
        ));
        assert!(matches!(parse("min()"), Err(ExprError::Arity { .. })));
    }

    fn too_deep(result: Result<Expr, ExprError>) -> bool {
        matches!(result, Err(ExprError::Parse { message, .. }) if message.contains("too deeply"))
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let deep = format!("{}1{} > 0", "(".repeat(50_000), ")".repeat(50_000));
        assert!(too_deep(parse(&deep)));
        assert!(too_deep(parse(&format!("{}a.x", "not ".repeat(10_000)))));
        assert!(too_deep(parse(&format!("{}1", "-".repeat(10_000)))));
        assert!(too_deep(parse(&vec!["1"; 10_000].join(" + "))));
        assert!(too_deep(parse(&vec!["a.x"; 10_000].join(" and "))));
        assert!(too_deep(parse(&format!("{}1{}", "abs(".repeat(1_000), ")".repeat(1_000)))));
    }

    #[test]
    fn test_moderate_nesting_parses() {
        let nested = format!("{}1{} > 0", "(".repeat(60), ")".repeat(60));
        assert!(parse(&nested).is_ok());
        assert!(parse(&vec!["a.x"; 60].join(" + ")).is_ok());
        // parentheses closed before the next operand do not add up
        let grouped = vec!["(a.x > 1)"; 100].join(" or ");
        assert!(parse(&grouped).is_ok());
    }
}
