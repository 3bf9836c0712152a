use crate::manifest::Manifest;
use crate::validation::rules::{
    ApiVersionRule, PackageIndexRule, PythonVersionRule, RelativeDependencyPathsRule,
    RelativeProjectPathRule, ValidationRule,
};
use thiserror::Error;

/// A manifest rule violation, tagged with the rule that rejected it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{rule}] {message}")]
pub struct ValidationError {
    pub rule: &'static str,
    pub message: String,
}

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Runs every rule in order and stops at the first violation
    pub fn validate(&self, manifest: &Manifest) -> Result<(), ValidationError> {
        for rule in &self.rules {
            if let Err(e) = rule.validate(manifest) {
                return Err(ValidationError {
                    rule: rule.name(),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(ApiVersionRule),
                Box::new(PythonVersionRule),
                Box::new(RelativeDependencyPathsRule),
                Box::new(RelativeProjectPathRule),
                Box::new(PackageIndexRule),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_manifest() -> Manifest {
        Manifest {
            python_version: "3.10".to_string(),
            pip_dependencies: vec!["requests".to_string(), "./libs/core".to_string()],
            project: Some("./app".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validator_valid_manifest() {
        assert!(Validator::new().validate(&valid_manifest()).is_ok());
    }

    #[test]
    fn test_validator_reports_rule_name() {
        let mut manifest = valid_manifest();
        manifest.api_version = Some("v0".to_string());

        let err = Validator::new().validate(&manifest).unwrap_err();
        assert_eq!(err.rule, "ApiVersion");
        assert!(err.to_string().starts_with("[ApiVersion]"));
    }

    #[test]
    fn test_validator_stops_at_first_violation() {
        let mut manifest = valid_manifest();
        manifest.python_version = "one".to_string();
        manifest.project = Some("/abs".to_string());

        let err = Validator::new().validate(&manifest).unwrap_err();
        assert_eq!(err.rule, "PythonVersion");
    }

    #[test]
    fn test_validator_with_custom_rules() {
        let mut manifest = valid_manifest();
        manifest.python_version = "one".to_string();

        let validator = Validator::with_rules(vec![Box::new(RelativeProjectPathRule)]);
        assert!(validator.validate(&manifest).is_ok());
    }
}
