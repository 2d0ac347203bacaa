//! Condition evaluation.
//!
//! Evaluates one typed condition against one attribute value. Every failure
//! mode (missing value, missing type, unsupported operator/type pairing,
//! unparsable literal) denies instead of erroring, so the authorization path
//! never fails for business-logic reasons.

use tessera_types::{AttributeType, Condition, Operator, parse_boolean, parse_integer};
use tracing::{debug, warn};

/// Evaluates `condition` against the user's value of its attribute.
///
/// `attribute_type` is the declared type of the attribute and `value` is the
/// user's literal value; either being `None` denies.
pub fn evaluate(
    condition: &Condition,
    attribute_type: Option<AttributeType>,
    value: Option<&str>,
) -> bool {
    let (Some(attribute_type), Some(value)) = (attribute_type, value) else {
        debug!(
            attribute = %condition.attribute,
            has_type = attribute_type.is_some(),
            has_value = value.is_some(),
            "Attribute unresolved; condition denies"
        );
        return false;
    };

    match (attribute_type, condition.operator) {
        (AttributeType::Integer, op @ (Operator::GreaterThan | Operator::LessThan | Operator::Equals)) => {
            let (Some(actual), Some(expected)) =
                (parse_integer(value), parse_integer(&condition.value))
            else {
                warn!(
                    attribute = %condition.attribute,
                    value = %value,
                    literal = %condition.value,
                    "Unparsable integer operand; condition denies"
                );
                return false;
            };
            match op {
                Operator::GreaterThan => actual > expected,
                Operator::LessThan => actual < expected,
                _ => actual == expected,
            }
        }
        (AttributeType::String, Operator::Equals) => value == condition.value,
        (AttributeType::String, Operator::StartsWith) => value.starts_with(condition.value.as_str()),
        (AttributeType::Boolean, Operator::Equals) => {
            match (parse_boolean(value), parse_boolean(&condition.value)) {
                (Some(actual), Some(expected)) => actual == expected,
                _ => {
                    warn!(
                        attribute = %condition.attribute,
                        value = %value,
                        literal = %condition.value,
                        "Unparsable boolean operand; condition denies"
                    );
                    false
                }
            }
        }
        (attribute_type, operator) => {
            warn!(
                attribute = %condition.attribute,
                %attribute_type,
                %operator,
                literal = %condition.value,
                "Unsupported operator for attribute type; condition denies"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn check(ty: AttributeType, op: Operator, literal: &str, value: &str) -> bool {
        evaluate(&Condition::new("a", op, literal), Some(ty), Some(value))
    }

    #[test_case(Operator::GreaterThan, "3", "5", true)]
    #[test_case(Operator::GreaterThan, "5", "5", false)]
    #[test_case(Operator::LessThan, "7", "5", true)]
    #[test_case(Operator::LessThan, "7", "9", false)]
    #[test_case(Operator::Equals, "5", "5", true)]
    #[test_case(Operator::Equals, "5", " 5 ", true)]
    #[test_case(Operator::Equals, "-2", "-2", true)]
    #[test_case(Operator::Equals, "6", "5", false)]
    fn integer_comparisons(op: Operator, literal: &str, value: &str, expected: bool) {
        assert_eq!(check(AttributeType::Integer, op, literal, value), expected);
    }

    #[test_case("hello world", "hello world", true)]
    #[test_case("hello world", "Hello world", false)]
    #[test_case("hello", "hello world", false)]
    fn string_equality(literal: &str, value: &str, expected: bool) {
        assert_eq!(
            check(AttributeType::String, Operator::Equals, literal, value),
            expected
        );
    }

    #[test_case("hello", "hello world", true)]
    #[test_case("", "anything", true)]
    #[test_case("world", "hello world", false)]
    #[test_case("str", "hello", false ; "type name is not the operand")]
    fn starts_with_tests_the_value(literal: &str, value: &str, expected: bool) {
        assert_eq!(
            check(AttributeType::String, Operator::StartsWith, literal, value),
            expected
        );
    }

    #[test_case("false", "false", true)]
    #[test_case("false", "False", true)]
    #[test_case("true", "false", false)]
    fn boolean_equality(literal: &str, value: &str, expected: bool) {
        assert_eq!(
            check(AttributeType::Boolean, Operator::Equals, literal, value),
            expected
        );
    }

    #[test_case(AttributeType::Integer, Operator::StartsWith)]
    #[test_case(AttributeType::String, Operator::GreaterThan)]
    #[test_case(AttributeType::String, Operator::LessThan)]
    #[test_case(AttributeType::Boolean, Operator::GreaterThan)]
    #[test_case(AttributeType::Boolean, Operator::StartsWith)]
    fn unsupported_pairs_deny(ty: AttributeType, op: Operator) {
        assert!(!check(ty, op, "1", "1"));
    }

    #[test_case(AttributeType::Integer, "5", "five")]
    #[test_case(AttributeType::Integer, "five", "5")]
    #[test_case(AttributeType::Boolean, "true", "yes")]
    #[test_case(AttributeType::Boolean, "maybe", "true")]
    fn unparsable_operands_deny(ty: AttributeType, literal: &str, value: &str) {
        assert!(!check(ty, Operator::Equals, literal, value));
    }

    #[test]
    fn missing_type_or_value_denies() {
        let condition = Condition::new("x", Operator::Equals, "5");
        assert!(!evaluate(&condition, None, Some("5")));
        assert!(!evaluate(&condition, Some(AttributeType::Integer), None));
        assert!(!evaluate(&condition, None, None));
        assert!(evaluate(&condition, Some(AttributeType::Integer), Some("5")));
    }
}
