//! `terra check-condition`: evaluate a condition the way the bus would.

use terra_config::EventSettings;
use terra_events::{Evaluator, EventBusConfig, Value, Variables};

use crate::error::CliResult;
use crate::kwargs;

/// Evaluate `expr` with every kwargs pair bound as a string variable.
pub fn evaluate(settings: &EventSettings, expr: &str, pairs: &[String]) -> CliResult<Value> {
    let vars: Variables = kwargs::parse_all(pairs)?
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect();

    let evaluator = Evaluator::with_limits(EventBusConfig::from(settings).limits);
    Ok(evaluator.eval(expr, &vars)?)
}

pub fn execute(settings: &EventSettings, expr: &str, pairs: &[String]) -> CliResult<()> {
    let value = evaluate(settings, expr, pairs)?;
    println!("{}", value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    fn pairs(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kwargs_become_variables() {
        let settings = EventSettings::default();
        let value = evaluate(&settings, "status == 'approved'", &pairs(&["status:approved"]))
            .unwrap();
        assert_eq!(value, Value::Bool(true));

        let value = evaluate(&settings, "upper(layer)", &pairs(&["layer:roads"])).unwrap();
        assert_eq!(value.to_string(), "ROADS");
    }

    #[test]
    fn test_unknown_variable() {
        let err = evaluate(&EventSettings::default(), "missing == 1", &[]).unwrap_err();
        assert!(matches!(err, CliError::Expression(_)));
    }

    #[test]
    fn test_length_limit_from_settings() {
        let settings = EventSettings {
            max_expression_length: 8,
            ..EventSettings::default()
        };
        let err = evaluate(&settings, "'a' + 'b' + 'c'", &[]).unwrap_err();
        assert!(matches!(err, CliError::Expression(_)));
    }

    #[test]
    fn test_depth_limit_from_settings() {
        let settings = EventSettings {
            max_expression_depth: 2,
            ..EventSettings::default()
        };
        assert_eq!(evaluate(&settings, "((1))", &[]).unwrap(), Value::Int(1));
        let err = evaluate(&settings, "(((1)))", &[]).unwrap_err();
        assert!(matches!(err, CliError::Expression(msg) if msg.contains("deeper than 2")));
    }
}
