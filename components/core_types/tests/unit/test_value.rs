//! Unit tests for Value enum

use core_types::{JsError, Value};
use std::rc::Rc;

#[cfg(test)]
mod value_conversion_tests {
    use super::*;

    #[test]
    fn test_from_i32() {
        assert_eq!(Value::from(12), Value::Smi(12));
    }

    #[test]
    fn test_from_f64() {
        assert!(matches!(Value::from(3.25), Value::Double(n) if (n - 3.25).abs() < f64::EPSILON));
    }

    #[test]
    fn test_from_str_and_string() {
        assert_eq!(Value::from("default"), Value::String("default".to_string()));
        assert_eq!(Value::from("x".to_string()), Value::from("x"));
    }

    #[test]
    fn test_from_bool() {
        assert_eq!(Value::from(false), Value::Boolean(false));
    }

    #[test]
    fn test_as_smi() {
        assert_eq!(Value::Smi(7).as_smi(), Some(7));
        assert_eq!(Value::Null.as_smi(), None);
    }
}

#[cfg(test)]
mod value_equality_tests {
    use super::*;

    #[test]
    fn test_nan_not_equal_to_itself() {
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
    }

    #[test]
    fn test_different_variants_not_equal() {
        assert_ne!(Value::Smi(1), Value::Double(1.0));
        assert_ne!(Value::Undefined, Value::Null);
    }

    #[test]
    fn test_same_error_object_is_equal() {
        let error = Rc::new(JsError::error("x"));
        assert_eq!(Value::from(error.clone()), Value::from(error));
    }

    #[test]
    fn test_equal_looking_errors_are_distinct() {
        assert_ne!(
            Value::from(JsError::error("x")),
            Value::from(JsError::error("x"))
        );
    }
}

#[cfg(test)]
mod value_display_tests {
    use super::*;

    #[test]
    fn test_display_numbers() {
        assert_eq!(Value::Smi(-100).to_string(), "-100");
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Double(f64::INFINITY).to_string(), "Infinity");
    }

    #[test]
    fn test_display_objects() {
        assert_eq!(Value::native(1u32).to_string(), "[object Object]");
        assert_eq!(Value::from(JsError::type_error("bad")).to_string(), "TypeError: bad");
    }

    #[test]
    fn test_display_integer_valued_double() {
        assert_eq!(Value::Double(12.0).to_string(), "12");
        assert_eq!(Value::Double(1.5).to_string(), "1.5");
    }
}
