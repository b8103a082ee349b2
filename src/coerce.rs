//! Parsing one submitted string into one scalar value.

use std::{
    error::Error,
    fmt::{self, Display},
    num::{IntErrorKind, ParseIntError},
};

/// Bit width of an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8 bits.
    W8,
    /// 16 bits.
    W16,
    /// 32 bits.
    W32,
    /// 64 bits.
    W64,
    /// 128 bits.
    W128,
    /// Pointer-sized (`isize` / `usize`).
    Size,
}

/// Bit width of a float field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    /// `f32`.
    W32,
    /// `f64`.
    W64,
}

/// The scalar kinds a field can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// Signed integers.
    Int(IntWidth),
    /// Unsigned integers.
    Uint(IntWidth),
    /// Floating point numbers.
    Float(FloatWidth),
    /// `String`
    String,
}

impl ScalarKind {
    /// Maps a Rust primitive type name to its scalar kind.
    pub(crate) fn from_type_identifier(ident: &str) -> Option<Self> {
        let kind = match ident {
            "bool" => ScalarKind::Bool,
            "i8" => ScalarKind::Int(IntWidth::W8),
            "i16" => ScalarKind::Int(IntWidth::W16),
            "i32" => ScalarKind::Int(IntWidth::W32),
            "i64" => ScalarKind::Int(IntWidth::W64),
            "i128" => ScalarKind::Int(IntWidth::W128),
            "isize" => ScalarKind::Int(IntWidth::Size),
            "u8" => ScalarKind::Uint(IntWidth::W8),
            "u16" => ScalarKind::Uint(IntWidth::W16),
            "u32" => ScalarKind::Uint(IntWidth::W32),
            "u64" => ScalarKind::Uint(IntWidth::W64),
            "u128" => ScalarKind::Uint(IntWidth::W128),
            "usize" => ScalarKind::Uint(IntWidth::Size),
            "f32" => ScalarKind::Float(FloatWidth::W32),
            "f64" => ScalarKind::Float(FloatWidth::W64),
            "String" => ScalarKind::String,
            _ => return None,
        };
        Some(kind)
    }

    /// The zero value of this kind.
    pub(crate) fn zero(self) -> Scalar {
        match self {
            ScalarKind::Bool => Scalar::Bool(false),
            ScalarKind::Int(_) => Scalar::Int(0),
            ScalarKind::Uint(_) => Scalar::Uint(0),
            ScalarKind::Float(_) => Scalar::Float(0.0),
            ScalarKind::String => Scalar::String(String::new()),
        }
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int(IntWidth::W8) => "i8",
            ScalarKind::Int(IntWidth::W16) => "i16",
            ScalarKind::Int(IntWidth::W32) => "i32",
            ScalarKind::Int(IntWidth::W64) => "i64",
            ScalarKind::Int(IntWidth::W128) => "i128",
            ScalarKind::Int(IntWidth::Size) => "isize",
            ScalarKind::Uint(IntWidth::W8) => "u8",
            ScalarKind::Uint(IntWidth::W16) => "u16",
            ScalarKind::Uint(IntWidth::W32) => "u32",
            ScalarKind::Uint(IntWidth::W64) => "u64",
            ScalarKind::Uint(IntWidth::W128) => "u128",
            ScalarKind::Uint(IntWidth::Size) => "usize",
            ScalarKind::Float(FloatWidth::W32) => "f32",
            ScalarKind::Float(FloatWidth::W64) => "f64",
            ScalarKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A parsed scalar.
///
/// Integers are widened to 128 bits and floats to `f64`; the value always fits
/// the [`ScalarKind`] it was coerced or read for.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i128),
    /// Unsigned integer.
    Uint(u128),
    /// Float.
    Float(f64),
    /// Text.
    String(String),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Uint(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::String(v) => f.write_str(v),
        }
    }
}

/// Why a coercion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionReason {
    /// The text is not a literal of the target kind.
    Invalid,
    /// The number is above the target type's maximum.
    Overflow,
    /// The number is below the target type's minimum.
    Underflow,
}

/// A submitted string that could not be parsed into its field's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    /// The offending text.
    pub text: String,
    /// The kind it was parsed for.
    pub kind: ScalarKind,
    /// Why parsing failed.
    pub reason: CoercionReason,
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let CoercionError { text, kind, reason } = self;
        match reason {
            CoercionReason::Invalid => write!(f, "{text:?} is not a valid {kind}"),
            CoercionReason::Overflow => write!(f, "{text:?} is too large for {kind}"),
            CoercionReason::Underflow => write!(f, "{text:?} is too small for {kind}"),
        }
    }
}

impl Error for CoercionError {}

/// Parses `text` as a value of `kind`.
pub fn coerce(kind: ScalarKind, text: &str) -> Result<Scalar, CoercionError> {
    let fail = |reason| CoercionError {
        text: text.to_owned(),
        kind,
        reason,
    };
    match kind {
        ScalarKind::Bool => parse_bool(text)
            .map(Scalar::Bool)
            .ok_or_else(|| fail(CoercionReason::Invalid)),
        ScalarKind::Int(width) => parse_int(width, text)
            .map(Scalar::Int)
            .map_err(|e| fail(int_reason(&e))),
        ScalarKind::Uint(width) => parse_uint(width, text)
            .map(Scalar::Uint)
            .map_err(|e| fail(uint_reason(text, &e))),
        ScalarKind::Float(FloatWidth::W32) => text
            .parse::<f32>()
            .map(|v| Scalar::Float(f64::from(v)))
            .map_err(|_| fail(CoercionReason::Invalid)),
        ScalarKind::Float(FloatWidth::W64) => text
            .parse::<f64>()
            .map(Scalar::Float)
            .map_err(|_| fail(CoercionReason::Invalid)),
        ScalarKind::String => Ok(Scalar::String(text.to_owned())),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

fn parse_int(width: IntWidth, text: &str) -> Result<i128, ParseIntError> {
    Ok(match width {
        IntWidth::W8 => text.parse::<i8>()?.into(),
        IntWidth::W16 => text.parse::<i16>()?.into(),
        IntWidth::W32 => text.parse::<i32>()?.into(),
        IntWidth::W64 => text.parse::<i64>()?.into(),
        IntWidth::W128 => text.parse::<i128>()?,
        IntWidth::Size => text.parse::<isize>()? as i128,
    })
}

fn parse_uint(width: IntWidth, text: &str) -> Result<u128, ParseIntError> {
    Ok(match width {
        IntWidth::W8 => text.parse::<u8>()?.into(),
        IntWidth::W16 => text.parse::<u16>()?.into(),
        IntWidth::W32 => text.parse::<u32>()?.into(),
        IntWidth::W64 => text.parse::<u64>()?.into(),
        IntWidth::W128 => text.parse::<u128>()?,
        IntWidth::Size => text.parse::<usize>()? as u128,
    })
}

fn int_reason(e: &ParseIntError) -> CoercionReason {
    match e.kind() {
        IntErrorKind::PosOverflow => CoercionReason::Overflow,
        IntErrorKind::NegOverflow => CoercionReason::Underflow,
        _ => CoercionReason::Invalid,
    }
}

// Unsigned parsing reports "-1" as an invalid digit; a well-formed negative
// number is still an underflow.
fn uint_reason(text: &str, e: &ParseIntError) -> CoercionReason {
    match e.kind() {
        IntErrorKind::PosOverflow => CoercionReason::Overflow,
        IntErrorKind::InvalidDigit if is_negative_literal(text) => CoercionReason::Underflow,
        _ => CoercionReason::Invalid,
    }
}

fn is_negative_literal(text: &str) -> bool {
    text.strip_prefix('-')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
