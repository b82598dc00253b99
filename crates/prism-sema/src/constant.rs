//! Compile-time constant values and the folding operations the checker
//! performs over them.
//!
//! The canonical spelling produced by `Display` feeds constant interning
//! keys and duplicate-case detection, so it must stay stable: bools as
//! `true`/`false`, ints as signed decimal, floats with six fractional
//! digits.

use std::fmt;

use prism_frontend::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Folding failure; the checker reports it as a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstError {
    DivisionByZero,
}

impl ConstValue {
    pub fn as_int(self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ConstValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn unary_op(self, op: TokenKind) -> ConstValue {
        match (op, self) {
            (TokenKind::Plus, v) => v,
            (TokenKind::Minus, ConstValue::Int(v)) => ConstValue::Int(v.wrapping_neg()),
            (TokenKind::Minus, ConstValue::Float(v)) => ConstValue::Float(-v),
            (TokenKind::Bang, ConstValue::Bool(v)) => ConstValue::Bool(!v),
            (TokenKind::Caret, ConstValue::Int(v)) => ConstValue::Int(!v),
            _ => unreachable!("unary fold on a value the checker let through"),
        }
    }

    pub fn binary_op(self, op: TokenKind, rhs: ConstValue) -> Result<ConstValue, ConstError> {
        use ConstValue::*;
        Ok(match (self, rhs) {
            (Int(a), Int(b)) => match op {
                TokenKind::Plus => Int(a.wrapping_add(b)),
                TokenKind::Minus => Int(a.wrapping_sub(b)),
                TokenKind::Star => Int(a.wrapping_mul(b)),
                TokenKind::Slash => {
                    if b == 0 {
                        return Err(ConstError::DivisionByZero);
                    }
                    Int(a.wrapping_div(b))
                }
                TokenKind::Percent => {
                    if b == 0 {
                        return Err(ConstError::DivisionByZero);
                    }
                    Int(a.wrapping_rem(b))
                }
                TokenKind::Amp => Int(a & b),
                TokenKind::Pipe => Int(a | b),
                TokenKind::Caret => Int(a ^ b),
                TokenKind::AmpCaret => Int(a & !b),
                _ => unreachable!("binary fold on ints with operator {op:?}"),
            },
            (Float(a), Float(b)) => match op {
                TokenKind::Plus => Float(a + b),
                TokenKind::Minus => Float(a - b),
                TokenKind::Star => Float(a * b),
                TokenKind::Slash => {
                    if b == 0.0 {
                        return Err(ConstError::DivisionByZero);
                    }
                    Float(a / b)
                }
                _ => unreachable!("binary fold on floats with operator {op:?}"),
            },
            (Bool(a), Bool(b)) => match op {
                TokenKind::AmpAmp => Bool(a && b),
                TokenKind::PipePipe => Bool(a || b),
                _ => unreachable!("binary fold on bools with operator {op:?}"),
            },
            _ => unreachable!("binary fold on mismatched constant kinds"),
        })
    }

    pub fn compare(self, op: TokenKind, rhs: ConstValue) -> ConstValue {
        use ConstValue::*;
        use std::cmp::Ordering;
        let ord = match (self, rhs) {
            (Int(a), Int(b)) => a.cmp(&b),
            (Float(a), Float(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Less),
            (Bool(a), Bool(b)) => a.cmp(&b),
            _ => unreachable!("comparison fold on mismatched constant kinds"),
        };
        let result = match op {
            TokenKind::EqEq => ord == Ordering::Equal,
            TokenKind::BangEq => ord != Ordering::Equal,
            TokenKind::Lt => ord == Ordering::Less,
            TokenKind::LtEq => ord != Ordering::Greater,
            TokenKind::Gt => ord == Ordering::Greater,
            TokenKind::GtEq => ord != Ordering::Less,
            _ => unreachable!("comparison fold with operator {op:?}"),
        };
        Bool(result)
    }

    /// Shift fold; the checker has already rejected negative amounts.
    pub fn shift(self, op: TokenKind, amount: u32) -> ConstValue {
        let ConstValue::Int(value) = self else {
            unreachable!("shift fold on a non-integer constant");
        };
        let shifted = match op {
            TokenKind::LessLess => {
                if amount >= 64 {
                    0
                } else {
                    value.wrapping_shl(amount)
                }
            }
            TokenKind::GreaterGreater => {
                if amount >= 64 {
                    if value < 0 {
                        -1
                    } else {
                        0
                    }
                } else {
                    value >> amount
                }
            }
            _ => unreachable!("shift fold with operator {op:?}"),
        };
        ConstValue::Int(shifted)
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v:.6}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_folding() {
        let v = ConstValue::Int(2)
            .binary_op(TokenKind::Star, ConstValue::Int(3))
            .unwrap()
            .binary_op(TokenKind::Plus, ConstValue::Int(1))
            .unwrap();
        assert_eq!(v, ConstValue::Int(7));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            ConstValue::Int(1).binary_op(TokenKind::Slash, ConstValue::Int(0)),
            Err(ConstError::DivisionByZero)
        );
        assert_eq!(
            ConstValue::Int(1).binary_op(TokenKind::Percent, ConstValue::Int(0)),
            Err(ConstError::DivisionByZero)
        );
    }

    #[test]
    fn comparison_yields_bools() {
        assert_eq!(
            ConstValue::Int(1).compare(TokenKind::Lt, ConstValue::Int(2)),
            ConstValue::Bool(true)
        );
        assert_eq!(
            ConstValue::Float(1.5).compare(TokenKind::EqEq, ConstValue::Float(1.5)),
            ConstValue::Bool(true)
        );
    }

    #[test]
    fn shifts() {
        assert_eq!(
            ConstValue::Int(1).shift(TokenKind::LessLess, 4),
            ConstValue::Int(16)
        );
        assert_eq!(
            ConstValue::Int(-8).shift(TokenKind::GreaterGreater, 2),
            ConstValue::Int(-2)
        );
    }

    #[test]
    fn canonical_spellings() {
        assert_eq!(ConstValue::Bool(true).to_string(), "true");
        assert_eq!(ConstValue::Int(-7).to_string(), "-7");
        assert_eq!(ConstValue::Float(3.0).to_string(), "3.000000");
    }
}
