use anyhow::Result;
use regex::{Captures, Regex};
use std::env;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// `${VAR}`, `${VAR:-default}` or `$VAR`
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(\w+)(?::-([^}]*))?\}|\$(\w+)").expect("placeholder pattern is valid")
    })
}

/// Substitute environment variables in the format `${VAR}`, `${VAR:-default}` or `$VAR`.
///
/// Unset variables without a default keep their placeholder; the validator
/// reports them.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let mut missing_vars = Vec::new();

    let result = placeholder_pattern().replace_all(content, |caps: &Captures| {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());

        match (env::var(var_name), caps.get(2)) {
            (Ok(value), _) => {
                debug!("Substituting environment variable: {}", var_name);
                value
            }
            (Err(_), Some(default)) => {
                debug!("Environment variable '{}' not set, using inline default", var_name);
                default.as_str().to_string()
            }
            (Err(_), None) => {
                warn!("Environment variable '{}' not set", var_name);
                missing_vars.push(var_name.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (will fail validation if used): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    placeholder_pattern().is_match(content)
}

/// Names of the unresolved placeholders in `content`
pub fn unresolved_env_vars(content: &str) -> Vec<String> {
    placeholder_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitution() {
        env::set_var("LABGATE_TEST_BROKER_HOST", "rabbit");
        let out = substitute_env_vars("amqp://${LABGATE_TEST_BROKER_HOST}:5672 $LABGATE_TEST_BROKER_HOST").unwrap();
        assert_eq!(out, "amqp://rabbit:5672 rabbit");
    }

    #[test]
    fn test_inline_default_and_missing() {
        let out = substitute_env_vars(
            "${LABGATE_TEST_UNSET_A:-http://localhost:8081} ${LABGATE_TEST_UNSET_B}",
        )
        .unwrap();
        assert_eq!(out, "http://localhost:8081 ${LABGATE_TEST_UNSET_B}");
        assert!(has_unresolved_env_vars(&out));
        assert_eq!(unresolved_env_vars(&out), vec!["LABGATE_TEST_UNSET_B"]);
    }
}
