//! Filter evaluator (spec §4.4): compiles a declarative predicate into a
//! [`CompiledFilter`] tagged enum (per spec §9's Design Note — "materialize
//! them as tagged variants ... rather than closures, so the compiled tree is
//! serializable and testable").

use crate::value::Value;

/// A compiled, evaluable filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledFilter {
    /// Always returns the given boolean; used for missing (`true`) and
    /// malformed (`false`) configs.
    Const(bool),
    /// A single `{source, op, value}` leaf.
    Leaf {
        source: String,
        op: Op,
        value: String,
    },
    /// `{logic: any, conditions: [...]}` — true if any child holds.
    Any(Vec<CompiledFilter>),
    /// `{logic: all, conditions: [...]}` — true if every child holds.
    All(Vec<CompiledFilter>),
}

/// Canonical filter operator (spec §4.4 table), after alias resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Contains,
    StartsWith,
    EndsWith,
}

impl Op {
    fn from_alias(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "==" | "===" | "=" | "eq" => Some(Self::Eq),
            "!=" | "!==" | "ne" | "neq" => Some(Self::Ne),
            "contains" | "includes" => Some(Self::Contains),
            "startswith" | "starts_with" => Some(Self::StartsWith),
            "endswith" | "ends_with" => Some(Self::EndsWith),
            _ => None,
        }
    }

    fn eval(self, field: &str, value: &str) -> bool {
        match self {
            Self::Eq => field == value,
            Self::Ne => field != value,
            Self::Contains => field.contains(value),
            Self::StartsWith => field.starts_with(value),
            Self::EndsWith => field.ends_with(value),
        }
    }
}

impl CompiledFilter {
    /// Compile a filter config (a deserialized manifest [`Value`], or
    /// absent). Missing config compiles to `Const(true)`; malformed config
    /// to `Const(false)` (spec §4.4).
    #[must_use]
    pub fn compile(config: Option<&Value>) -> Self {
        let Some(config) = config else {
            return Self::Const(true);
        };
        Self::compile_node(config)
    }

    fn compile_node(node: &Value) -> Self {
        let Some(map) = node.as_mapping() else {
            return Self::Const(false);
        };

        if let Some(logic) = map.get("logic").and_then(Value::as_str) {
            let Some(conditions) = map.get("conditions").and_then(Value::as_list) else {
                return Self::Const(false);
            };
            let compiled: Vec<Self> = conditions.iter().map(Self::compile_node).collect();
            return match logic.trim().to_ascii_lowercase().as_str() {
                "any" => Self::Any(compiled),
                "all" => Self::All(compiled),
                _ => Self::Const(false),
            };
        }

        let source = map.get("source").and_then(Value::as_str);
        let op = map.get("op").and_then(Value::as_str).and_then(Op::from_alias);
        let value = map.get("value");

        match (source, op, value) {
            (Some(source), Some(op), Some(value)) => Self::Leaf {
                source: source.to_string(),
                op,
                value: value.coerce_to_string(),
            },
            _ => Self::Const(false),
        }
    }

    /// Evaluate the filter against a record, resolving leaf sources through
    /// the nested-path accessor (spec §4.3).
    #[must_use]
    pub fn eval(&self, record: &Value) -> bool {
        match self {
            Self::Const(b) => *b,
            Self::Leaf { source, op, value } => {
                let field = crate::path::get_at_path(record, source, &Value::Null);
                op.eval(&field.coerce_to_string(), value)
            }
            Self::Any(children) => children.iter().any(|c| c.eval(record)),
            Self::All(children) => children.iter().all(|c| c.eval(record)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn leaf(source: &str, op: &str, value: &str) -> Value {
        let mut m = IndexMap::new();
        m.insert("source".into(), Value::String(source.into()));
        m.insert("op".into(), Value::String(op.into()));
        m.insert("value".into(), Value::String(value.into()));
        Value::Mapping(m)
    }

    fn record(pairs: &[(&str, &str)]) -> Value {
        let mut m = IndexMap::new();
        for (k, v) in pairs {
            m.insert((*k).into(), Value::String((*v).into()));
        }
        Value::Mapping(m)
    }

    #[test]
    fn missing_config_is_const_true() {
        let filter = CompiledFilter::compile(None);
        assert_eq!(filter, CompiledFilter::Const(true));
        assert!(filter.eval(&Value::Null));
    }

    #[test]
    fn malformed_leaf_is_const_false() {
        let mut m = IndexMap::new();
        m.insert("source".into(), Value::String("k".into()));
        // missing op/value
        let filter = CompiledFilter::compile(Some(&Value::Mapping(m)));
        assert_eq!(filter, CompiledFilter::Const(false));
        assert!(!filter.eval(&Value::Null));
    }

    #[test]
    fn all_combinator_requires_both_leaves() {
        let mut combinator = IndexMap::new();
        combinator.insert("logic".into(), Value::String("all".into()));
        combinator.insert(
            "conditions".into(),
            Value::List(vec![
                leaf("k", "eq", "v"),
                leaf("m", "contains", "z"),
            ]),
        );
        let filter = CompiledFilter::compile(Some(&Value::Mapping(combinator)));

        assert!(filter.eval(&record(&[("k", "v"), ("m", "xyz")])));
        assert!(!filter.eval(&record(&[("k", "v"), ("m", "xyq")])));
        assert!(!filter.eval(&record(&[("k", "nope"), ("m", "xyz")])));
    }

    #[test]
    fn any_combinator_requires_one_leaf() {
        let mut combinator = IndexMap::new();
        combinator.insert("logic".into(), Value::String("any".into()));
        combinator.insert(
            "conditions".into(),
            Value::List(vec![leaf("k", "eq", "v"), leaf("m", "eq", "z")]),
        );
        let filter = CompiledFilter::compile(Some(&Value::Mapping(combinator)));

        assert!(filter.eval(&record(&[("k", "v"), ("m", "nope")])));
        assert!(filter.eval(&record(&[("k", "nope"), ("m", "z")])));
        assert!(!filter.eval(&record(&[("k", "nope"), ("m", "nope")])));
    }

    #[test]
    fn op_aliases_resolve_to_canonical() {
        assert_eq!(Op::from_alias("==="), Some(Op::Eq));
        assert_eq!(Op::from_alias("NEQ"), Some(Op::Ne));
        assert_eq!(Op::from_alias("Starts_With"), Some(Op::StartsWith));
        assert_eq!(Op::from_alias("bogus"), None);
    }
}
