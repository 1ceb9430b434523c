//! Branch predicate evaluation.
//!
//! A predicate is the triple `[left, operator, right]`. The left side is
//! rendered through [`template::render`](crate::template::render); the right
//! side is always taken literally. A compound condition is a list of
//! predicates that must all hold. There is no OR form.
//!
//! Evaluation never fails: an unknown operator, or an operand that is not a
//! finite number for a numeric comparison, makes the predicate false.

use crate::store::Lookup;
use crate::template;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use strum::EnumString;

/// Comparison operator
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
pub enum Operator {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "not-in")]
    NotIn,
    #[strum(serialize = "is-empty")]
    IsEmpty,
    #[strum(serialize = "is-not-empty")]
    IsNotEmpty,
    #[strum(serialize = "is-true")]
    IsTrue,
    #[strum(serialize = "is-false")]
    IsFalse,
    /// Anything else; always evaluates to false
    #[strum(default)]
    Unknown(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::In => "in",
            Self::NotIn => "not-in",
            Self::IsEmpty => "is-empty",
            Self::IsNotEmpty => "is-not-empty",
            Self::IsTrue => "is-true",
            Self::IsFalse => "is-false",
            Self::Unknown(text) => text,
        }
    }

    /// Parse an operator; unrecognized spellings become [`Operator::Unknown`].
    pub fn parse(text: &str) -> Self {
        text.parse()
            .unwrap_or_else(|_| Self::Unknown(text.to_string()))
    }

    /// Apply the operator to an already rendered left side.
    pub fn apply(&self, left: &str, right: &str) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Gt => compare_numbers(left, right, |l, r| l > r),
            Self::Lt => compare_numbers(left, right, |l, r| l < r),
            Self::Ge => compare_numbers(left, right, |l, r| l >= r),
            Self::Le => compare_numbers(left, right, |l, r| l <= r),
            Self::In => right.split(',').any(|item| item == left),
            Self::NotIn => !right.split(',').any(|item| item == left),
            Self::IsEmpty => left.is_empty(),
            Self::IsNotEmpty => !left.is_empty(),
            Self::IsTrue => matches!(left, "true" | "1"),
            Self::IsFalse => matches!(left, "false" | "0"),
            Self::Unknown(_) => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coerce an operand to a finite number.
///
/// Surrounding whitespace is ignored and a blank operand counts as zero.
/// Infinities and NaN are rejected.
pub fn coerce_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn compare_numbers(left: &str, right: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (coerce_number(left), coerce_number(right)) {
        (Some(l), Some(r)) => cmp(l, r),
        _ => false,
    }
}

/// A single comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub left: String,
    pub operator: Operator,
    pub right: String,
}

impl Predicate {
    pub fn new(left: impl Into<String>, operator: Operator, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            operator,
            right: right.into(),
        }
    }

    pub fn evaluate<L: Lookup + ?Sized>(&self, values: &L) -> bool {
        let left = template::render(&self.left, values);
        self.operator.apply(&left, &self.right)
    }
}

/// Literal operand as written in JSON: string, number or boolean.
///
/// Numbers are kept as their plain decimal text, so `5.0` compares equal to `"5"`.
fn literal_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number_text(&number)),
        serde_json::Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(format!("expected a string, number or boolean operand, found {}", other)),
    }
}

fn number_text(number: &serde_json::Number) -> String {
    if number.is_f64() {
        if let Some(float) = number.as_f64() {
            return float.to_string();
        }
    }
    number.to_string()
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PredicateVisitor;

        impl<'de> Visitor<'de> for PredicateVisitor {
            type Value = Predicate;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [left, operator, right] predicate")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Predicate, A::Error> {
                let left: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let operator: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let right: serde_json::Value = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(4, &self));
                }

                Ok(Predicate {
                    left,
                    operator: Operator::parse(&operator),
                    right: literal_text(right).map_err(de::Error::custom)?,
                })
            }
        }

        deserializer.deserialize_seq(PredicateVisitor)
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(&self.left)?;
        tuple.serialize_element(self.operator.as_str())?;
        tuple.serialize_element(&self.right)?;
        tuple.end()
    }
}

/// The `if` of a branch step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Single(Predicate),
    /// Logical AND, short-circuiting on the first false predicate
    All(Vec<Predicate>),
}

impl Condition {
    pub fn evaluate<L: Lookup + ?Sized>(&self, values: &L) -> bool {
        match self {
            Self::Single(predicate) => predicate.evaluate(values),
            Self::All(predicates) => predicates.iter().all(|p| p.evaluate(values)),
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        match self {
            Self::Single(predicate) => std::slice::from_ref(predicate),
            Self::All(predicates) => predicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ValueStore;
    use std::cell::Cell;

    fn check(left: &str, op: &str, right: &str) -> bool {
        Predicate::new(left, Operator::parse(op), right).evaluate(&ValueStore::new())
    }

    #[test]
    fn test_equality_is_string_based() {
        assert!(check("abc", "==", "abc"));
        assert!(!check("1.0", "==", "1"));
        assert!(check("1.0", "!=", "1"));
    }

    #[test]
    fn test_numeric_comparisons() {
        assert!(check("10", ">", "5"));
        assert!(check("5", ">=", "5"));
        assert!(check("-2.5", "<", "0"));
        assert!(check(" 3 ", "<=", "3"));
        assert!(!check("2", ">", "5"));
    }

    #[test]
    fn test_numeric_fail_closed() {
        assert!(!check("abc", ">", "1"));
        assert!(!check("1", "<", "abc"));
        assert!(!check("inf", ">", "1"));
        assert!(!check("NaN", "<=", "1"));
    }

    #[test]
    fn test_blank_operand_is_zero() {
        assert!(check("", "<", "1"));
        assert!(check("", ">=", "0"));
    }

    #[test]
    fn test_in_and_not_in() {
        assert!(check("b", "in", "a,b,c"));
        assert!(!check("d", "in", "a,b,c"));
        assert!(!check("b", "in", "a, b"), "list items are not trimmed");
        assert!(check("d", "not-in", "a,b,c"));
    }

    #[test]
    fn test_emptiness_and_truthiness() {
        assert!(check("", "is-empty", ""));
        assert!(check("x", "is-not-empty", ""));
        assert!(check("true", "is-true", ""));
        assert!(check("1", "is-true", ""));
        assert!(!check("yes", "is-true", ""));
        assert!(check("0", "is-false", ""));
        assert!(check("false", "is-false", ""));
    }

    #[test]
    fn test_unknown_operator_is_false() {
        assert!(!check("a", "~=", "a"));
        assert_eq!(Operator::parse("~="), Operator::Unknown("~=".into()));
        assert_eq!(Operator::parse("~=").to_string(), "~=");
    }

    #[test]
    fn test_left_is_rendered_right_is_literal() {
        let store = ValueStore::seed([("count", "10"), ("limit", "5")]);
        let predicate = Predicate::new("{{count}}", Operator::Gt, "{{limit}}");
        assert!(!predicate.evaluate(&store), "right side must not be rendered");

        let predicate = Predicate::new("{{count}}", Operator::Gt, "5");
        assert!(predicate.evaluate(&store));
    }

    #[test]
    fn test_unresolved_placeholder_compares_verbatim() {
        let predicate = Predicate::new("{{missing}}", Operator::Eq, "{{missing}}");
        assert!(predicate.evaluate(&ValueStore::new()));
    }

    #[test]
    fn test_compound_and() {
        let store = ValueStore::seed([("a", "1"), ("b", "2")]);
        let both = Condition::All(vec![
            Predicate::new("{{a}}", Operator::Eq, "1"),
            Predicate::new("{{b}}", Operator::Eq, "2"),
        ]);
        let one = Condition::All(vec![
            Predicate::new("{{a}}", Operator::Eq, "1"),
            Predicate::new("{{b}}", Operator::Eq, "3"),
        ]);
        assert!(both.evaluate(&store));
        assert!(!one.evaluate(&store));
    }

    struct Counting<'a> {
        inner: &'a ValueStore,
        calls: Cell<usize>,
    }

    impl Lookup for Counting<'_> {
        fn lookup(&self, id: &str) -> Option<String> {
            self.calls.set(self.calls.get() + 1);
            self.inner.lookup(id)
        }
    }

    #[test]
    fn test_compound_short_circuits() {
        let store = ValueStore::seed([("a", "1"), ("b", "2")]);
        let counting = Counting {
            inner: &store,
            calls: Cell::new(0),
        };
        let condition = Condition::All(vec![
            Predicate::new("{{a}}", Operator::Eq, "nope"),
            Predicate::new("{{b}}", Operator::Eq, "2"),
        ]);

        assert!(!condition.evaluate(&counting));
        assert_eq!(counting.calls.get(), 1, "second predicate must not be rendered");
    }

    #[test]
    fn test_deserialize_predicate_forms() {
        let single: Condition = serde_json::from_str(r#"["{{x}}", ">", 5]"#).unwrap();
        assert_eq!(
            single,
            Condition::Single(Predicate::new("{{x}}", Operator::Gt, "5"))
        );

        let compound: Condition =
            serde_json::from_str(r#"[["a", "==", "a"], ["b", "is-true", true], ["c", "in", "c"]]"#)
                .unwrap();
        assert_eq!(compound.predicates().len(), 3);
        assert_eq!(compound.predicates()[1].right, "true");

        assert!(serde_json::from_str::<Condition>(r#"["a", "=="]"#).is_err());
    }

    #[test]
    fn test_numeric_literal_kept_as_plain_text() {
        let store = ValueStore::seed([("v", "5")]);

        let whole: Predicate = serde_json::from_str(r#"["{{v}}", "==", 5.0]"#).unwrap();
        assert_eq!(whole.right, "5");
        assert!(whole.evaluate(&store));

        let fraction: Predicate = serde_json::from_str(r#"["{{v}}", "<", 5.25]"#).unwrap();
        assert_eq!(fraction.right, "5.25");
        assert!(fraction.evaluate(&store));

        let negative: Predicate = serde_json::from_str(r#"["x", "==", -3]"#).unwrap();
        assert_eq!(negative.right, "-3");
    }
}
