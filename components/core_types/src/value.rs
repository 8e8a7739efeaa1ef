//! Engine value representation.
//!
//! This module provides the `Value` enum carried by fulfilment values and
//! rejection reasons. Reasons are arbitrary data, so every variant can be
//! used on either path.

use crate::JsError;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Represents any engine value.
///
/// Primitive values are stored inline. Error objects and native objects are
/// reference counted and compare by identity, so a rejection reason can be
/// checked to be the exact object that was thrown.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let number = Value::Smi(42);
/// assert_eq!(number.as_smi(), Some(42));
/// assert_eq!(Value::Double(3.5).to_string(), "3.5");
/// ```
#[derive(Clone)]
pub enum Value {
    /// The undefined value
    Undefined,
    /// The null value
    Null,
    /// Boolean (true or false)
    Boolean(bool),
    /// Small integer
    Smi(i32),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// String value
    String(std::string::String),
    /// Error object, shared by reference
    Error(Rc<JsError>),
    /// Opaque host object
    NativeObject(Rc<RefCell<dyn Any>>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Smi(n) => f.debug_tuple("Smi").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(e.as_ref()).finish(),
            Value::NativeObject(_) => write!(f, "NativeObject(...)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Smi(a), Value::Smi(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::NativeObject(a), Value::NativeObject(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Wraps an arbitrary host payload as a native object.
    pub fn native<T: Any>(payload: T) -> Self {
        Value::NativeObject(Rc::new(RefCell::new(payload)))
    }

    /// Returns the error object if this value is one.
    pub fn as_error(&self) -> Option<&Rc<JsError>> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the integer payload of a `Smi`.
    pub fn as_smi(&self) -> Option<i32> {
        match self {
            Value::Smi(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Smi(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<JsError> for Value {
    fn from(e: JsError) -> Self {
        Value::Error(Rc::new(e))
    }
}

impl From<Rc<JsError>> for Value {
    fn from(e: Rc<JsError>) -> Self {
        Value::Error(e)
    }
}

/// String conversion.
///
/// ```
/// use core_types::Value;
///
/// assert_eq!(Value::Undefined.to_string(), "undefined");
/// assert_eq!(Value::Boolean(true).to_string(), "true");
/// assert_eq!(Value::Double(12.0).to_string(), "12");
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Smi(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    // Integer-valued doubles display without decimal point
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Error(e) => write!(f, "{}", e),
            Value::NativeObject(_) => write!(f, "[object Object]"),
        }
    }
}
