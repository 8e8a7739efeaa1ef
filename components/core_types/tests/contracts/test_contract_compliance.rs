//! Contract compliance tests for core_types
//!
//! These tests pin the public surface the runtime components rely on.

use core_types::{ErrorKind, JsError, Value};

#[cfg(test)]
mod value_contract_tests {
    use super::*;

    #[test]
    fn test_value_has_primitive_variants() {
        let _: Value = Value::Undefined;
        let _: Value = Value::Null;
        let _: Value = Value::Boolean(true);
        let _: Value = Value::Smi(i32::MAX);
        let _: Value = Value::Double(0.5);
        let _: Value = Value::String(String::new());
    }

    #[test]
    fn test_value_is_clone() {
        let value = Value::from(JsError::error("x"));
        assert_eq!(value.clone(), value);
    }

    #[test]
    fn test_as_error_borrows_shared_error() {
        let value = Value::from(JsError::error("x"));
        let _error: Option<&std::rc::Rc<JsError>> = value.as_error();
    }
}

#[cfg(test)]
mod error_contract_tests {
    use super::*;

    #[test]
    fn test_js_error_has_kind_and_message() {
        let error = JsError {
            kind: ErrorKind::TypeError,
            message: "test".to_string(),
        };
        let _kind: &ErrorKind = &error.kind;
        let _message: &String = &error.message;
    }

    #[test]
    fn test_js_error_is_clone() {
        let error = JsError::type_error("x");
        assert_eq!(error.clone(), error);
    }
}
