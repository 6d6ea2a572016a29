//! Metric predicates such as `Clicks = 0` or `QualityScore <= 7`.
//!
//! Only the `<Metric> <op> <number>` shape is understood; anything richer is
//! the selection backend's business.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("predicate `{0}` must look like `<Metric> <op> <number>`")]
    Shape(String),
    #[error("unknown comparison operator `{0}`")]
    Operator(String),
    #[error("metric name `{0}` must be alphanumeric")]
    Metric(String),
    #[error("`{0}` is not a number")]
    Value(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }

    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

impl FromStr for Comparison {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" | "==" => Comparison::Eq,
            "!=" => Comparison::Ne,
            "<" => Comparison::Lt,
            "<=" => Comparison::Le,
            ">" => Comparison::Gt,
            ">=" => Comparison::Ge,
            other => return Err(PredicateError::Operator(other.to_string())),
        })
    }
}

/// A single comparison of a named metric against a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPredicate {
    pub metric: String,
    pub op: Comparison,
    pub value: f64,
}

impl MetricPredicate {
    /// Evaluate against an item's metrics. A missing metric never matches.
    pub fn matches(&self, metrics: &BTreeMap<String, f64>) -> bool {
        metrics
            .get(&self.metric)
            .is_some_and(|&v| self.op.holds(v, self.value))
    }
}

impl FromStr for MetricPredicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [metric, op, value] = parts.as_slice() else {
            return Err(PredicateError::Shape(s.to_string()));
        };
        if !metric.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PredicateError::Metric(metric.to_string()));
        }
        let op: Comparison = op.parse()?;
        let value: f64 = value
            .parse()
            .map_err(|_| PredicateError::Value(value.to_string()))?;
        Ok(MetricPredicate {
            metric: metric.to_string(),
            op,
            value,
        })
    }
}

impl fmt::Display for MetricPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.metric, self.op.symbol(), self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn parses_and_displays() {
        let p: MetricPredicate = "QualityScore <= 7".parse().unwrap();
        assert_eq!(p.metric, "QualityScore");
        assert_eq!(p.op, Comparison::Le);
        assert_eq!(p.value, 7.0);
        assert_eq!(p.to_string(), "QualityScore <= 7");
    }

    #[test]
    fn evaluates_against_metrics() {
        let clicks: MetricPredicate = "Clicks = 0".parse().unwrap();
        assert!(clicks.matches(&metrics(&[("Clicks", 0.0)])));
        assert!(!clicks.matches(&metrics(&[("Clicks", 3.0)])));
        assert!(!clicks.matches(&metrics(&[("Impressions", 0.0)])));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            "Clicks=0".parse::<MetricPredicate>(),
            Err(PredicateError::Shape(_))
        ));
        assert!(matches!(
            "Clicks ~ 0".parse::<MetricPredicate>(),
            Err(PredicateError::Operator(_))
        ));
        assert!(matches!(
            "Clicks = zero".parse::<MetricPredicate>(),
            Err(PredicateError::Value(_))
        ));
        assert!(matches!(
            "Cost.Micros > 1".parse::<MetricPredicate>(),
            Err(PredicateError::Metric(_))
        ));
    }
}
