//! Column value types and their textual descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Widest integer representable in a machine word.
pub const MAX_INT_BITS: u32 = 64;
/// Mantissa bits of an IEEE 754 double.
pub const MAX_FLOAT_MANTISSA: u32 = 53;
pub const MAX_DECIMAL_PRECISION: u32 = 38;
pub const MAX_TIME_DIGITS: u32 = 9;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_DECIMAL_PRECISION: u32 = 18;
const DEFAULT_TIME_DIGITS: u32 = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeParseError {
    #[error("Empty type descriptor")]
    Empty,
    #[error("Unknown type: {0:?}")]
    Unknown(String),
    #[error("Malformed type descriptor: {0:?}")]
    Malformed(String),
    #[error("Invalid argument {arg:?} in {descriptor:?}")]
    InvalidArgument { descriptor: String, arg: String },
    #[error("int with {0} bits not supported (max {MAX_INT_BITS})")]
    IntWidth(u32),
    #[error("float with {0} mantissa bits not supported (max {MAX_FLOAT_MANTISSA})")]
    FloatMantissa(u32),
    #[error("time with {0} fractional digits not supported (max {MAX_TIME_DIGITS})")]
    TimeDigits(u32),
    #[error("decimal({precision},{scale}) not supported")]
    Decimal { precision: u32, scale: u32 },
    #[error("length must be at least 1")]
    ZeroLength,
    #[error("nullable type cannot be nullable again")]
    DoubleNullable,
}

/// Whether a string or byte column has a fixed or variable length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    Fixed(u32),
    /// Variable length with an optional upper bound.
    Variable(Option<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Boolean,
    Integer { bits: u32 },
    Float { mantissa: u32 },
    String(Length),
    /// Smallest representable step: one day for dates.
    Time { precision: Duration },
    Bytes(Length),
    Decimal { precision: u32, scale: u32 },
    Nullable(Box<ValueType>),
}

impl ValueType {
    pub fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable(_))
    }

    /// The type with any nullable wrapper removed.
    pub fn base(&self) -> &ValueType {
        match self {
            Self::Nullable(inner) => inner.base(),
            other => other,
        }
    }

    /// Whether a time type only carries a calendar date.
    pub fn is_date(&self) -> bool {
        matches!(self.base(), Self::Time { precision } if *precision >= DAY)
    }

    /// Fractional second digits of a time type, `None` for dates.
    pub fn time_digits(&self) -> Option<u32> {
        match self.base() {
            Self::Time { precision } if *precision < DAY => {
                let mut nanos = precision.as_nanos().max(1);
                let mut digits = MAX_TIME_DIGITS;
                while nanos >= 10 && digits > 0 {
                    nanos /= 10;
                    digits -= 1;
                }
                Some(digits)
            }
            _ => None,
        }
    }
}

/// Parse a textual type descriptor.
pub fn parse_type(descriptor: &str) -> Result<ValueType, TypeParseError> {
    let lower = descriptor.trim().to_lowercase();
    if lower.is_empty() {
        return Err(TypeParseError::Empty);
    }

    if let Some(inner) = lower.strip_suffix('?') {
        return wrap_nullable(parse_type(inner)?);
    }
    if let Some(rest) = lower.strip_prefix("nullable") {
        let rest = rest.trim_start();
        if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            return wrap_nullable(parse_type(inner)?);
        }
        return Err(TypeParseError::Malformed(descriptor.to_string()));
    }

    let (base, args) = split_args(&lower)?;
    parse_base(base, &args, descriptor)
}

fn wrap_nullable(inner: ValueType) -> Result<ValueType, TypeParseError> {
    if inner.is_nullable() {
        return Err(TypeParseError::DoubleNullable);
    }
    Ok(ValueType::Nullable(Box::new(inner)))
}

/// Split `name(a, b)` into its name and argument list.
fn split_args(lower: &str) -> Result<(&str, Vec<&str>), TypeParseError> {
    let Some(open) = lower.find('(') else {
        return Ok((lower, Vec::new()));
    };
    let close = lower
        .rfind(')')
        .filter(|&close| close > open && lower[close + 1..].trim().is_empty())
        .ok_or_else(|| TypeParseError::Malformed(lower.to_string()))?;

    let base = lower[..open].trim();
    let args = lower[open + 1..close].split(',').map(str::trim).collect();
    Ok((base, args))
}

fn parse_base(base: &str, args: &[&str], descriptor: &str) -> Result<ValueType, TypeParseError> {
    let numbers = args
        .iter()
        .map(|arg| {
            arg.parse::<u32>()
                .map_err(|_| TypeParseError::InvalidArgument {
                    descriptor: descriptor.to_string(),
                    arg: arg.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let arity = |max: usize| -> Result<(), TypeParseError> {
        if numbers.len() > max {
            Err(TypeParseError::Malformed(descriptor.to_string()))
        } else {
            Ok(())
        }
    };

    match base {
        "bool" | "boolean" | "bit" => {
            arity(0)?;
            Ok(ValueType::Boolean)
        }

        // Integer types
        "tinyint" => fixed_int(&numbers, 8, descriptor),
        "smallint" => fixed_int(&numbers, 16, descriptor),
        "bigint" => fixed_int(&numbers, 64, descriptor),
        "int" | "integer" => {
            arity(1)?;
            let bits = numbers.first().copied().unwrap_or(32);
            if bits == 0 || bits > MAX_INT_BITS {
                return Err(TypeParseError::IntWidth(bits));
            }
            Ok(ValueType::Integer { bits })
        }

        // Floating point
        "real" => {
            arity(0)?;
            Ok(ValueType::Float { mantissa: 24 })
        }
        "double" | "double precision" => {
            arity(0)?;
            Ok(ValueType::Float { mantissa: 53 })
        }
        "float" => {
            arity(1)?;
            let mantissa = numbers.first().copied().unwrap_or(53);
            if mantissa == 0 || mantissa > MAX_FLOAT_MANTISSA {
                return Err(TypeParseError::FloatMantissa(mantissa));
            }
            Ok(ValueType::Float { mantissa })
        }

        // String types
        "char" | "nchar" => {
            arity(1)?;
            Ok(ValueType::String(Length::Fixed(length(
                numbers.first().copied().unwrap_or(1),
            )?)))
        }
        "varchar" | "nvarchar" => {
            arity(1)?;
            let max = numbers.first().copied().map(length).transpose()?;
            Ok(ValueType::String(Length::Variable(max)))
        }
        "text" | "string" => {
            arity(0)?;
            Ok(ValueType::String(Length::Variable(None)))
        }

        // Binary
        "binary" => {
            arity(1)?;
            Ok(ValueType::Bytes(Length::Fixed(length(
                numbers.first().copied().unwrap_or(1),
            )?)))
        }
        "varbinary" => {
            arity(1)?;
            let max = numbers.first().copied().map(length).transpose()?;
            Ok(ValueType::Bytes(Length::Variable(max)))
        }
        "bytes" | "blob" => {
            arity(0)?;
            Ok(ValueType::Bytes(Length::Variable(None)))
        }

        // Date/time
        "date" => {
            arity(0)?;
            Ok(ValueType::Time { precision: DAY })
        }
        "datetime" | "timestamp" | "time" => {
            arity(1)?;
            let digits = numbers.first().copied().unwrap_or(DEFAULT_TIME_DIGITS);
            if digits > MAX_TIME_DIGITS {
                return Err(TypeParseError::TimeDigits(digits));
            }
            Ok(ValueType::Time {
                precision: Duration::from_nanos(10u64.pow(MAX_TIME_DIGITS - digits)),
            })
        }

        "decimal" | "numeric" => {
            arity(2)?;
            let precision = numbers.first().copied().unwrap_or(DEFAULT_DECIMAL_PRECISION);
            let scale = numbers.get(1).copied().unwrap_or(0);
            if precision == 0 || precision > MAX_DECIMAL_PRECISION || scale > precision {
                return Err(TypeParseError::Decimal { precision, scale });
            }
            Ok(ValueType::Decimal { precision, scale })
        }

        _ => Err(TypeParseError::Unknown(descriptor.trim().to_string())),
    }
}

fn fixed_int(numbers: &[u32], bits: u32, descriptor: &str) -> Result<ValueType, TypeParseError> {
    // MySQL display widths like TINYINT(4) do not change the storage size.
    if numbers.len() > 1 {
        return Err(TypeParseError::Malformed(descriptor.to_string()));
    }
    Ok(ValueType::Integer { bits })
}

fn length(n: u32) -> Result<u32, TypeParseError> {
    if n == 0 {
        Err(TypeParseError::ZeroLength)
    } else {
        Ok(n)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "bool"),
            Self::Integer { bits } => write!(f, "int({bits})"),
            Self::Float { mantissa } => write!(f, "float({mantissa})"),
            Self::String(Length::Fixed(n)) => write!(f, "char({n})"),
            Self::String(Length::Variable(Some(n))) => write!(f, "varchar({n})"),
            Self::String(Length::Variable(None)) => write!(f, "varchar"),
            Self::Bytes(Length::Fixed(n)) => write!(f, "binary({n})"),
            Self::Bytes(Length::Variable(Some(n))) => write!(f, "varbinary({n})"),
            Self::Bytes(Length::Variable(None)) => write!(f, "varbinary"),
            Self::Time { .. } => match self.time_digits() {
                Some(digits) => write!(f, "datetime({digits})"),
                None => write!(f, "date"),
            },
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::Nullable(inner) => write!(f, "nullable({inner})"),
        }
    }
}

impl FromStr for ValueType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

impl TryFrom<String> for ValueType {
    type Error = TypeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        parse_type(&s)
    }
}

impl From<ValueType> for String {
    fn from(t: ValueType) -> Self {
        t.to_string()
    }
}
