//! AWS CloudFormation provider using the `aws` CLI

use super::api::{OrchestrationApi, ProviderError, StackSummary};
use serde::Deserialize;
use stackwatch_core::{Credentials, ResourceEvent};
use std::process::Command;
use tracing::debug;

/// Credential entries forwarded to the CLI as environment variables
const ENV_MAPPING: &[(&str, &[&str])] = &[
    ("aws_access_key_id", &["AWS_ACCESS_KEY_ID"]),
    ("aws_secret_access_key", &["AWS_SECRET_ACCESS_KEY"]),
    ("aws_session_token", &["AWS_SESSION_TOKEN"]),
    ("region", &["AWS_REGION", "AWS_DEFAULT_REGION"]),
    ("profile", &["AWS_PROFILE"]),
];

/// CloudFormation provider that shells out to the `aws` CLI.
///
/// Recognized credential entries: `aws_access_key_id`,
/// `aws_secret_access_key`, `aws_session_token`, `region`, `profile`,
/// `endpoint_url`, and `aws_cli` (path to the binary, default `aws`).
#[derive(Debug, Clone)]
pub struct AwsCliProvider {
    program: String,
    env: Vec<(String, String)>,
    endpoint_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStacks {
    #[serde(default)]
    stacks: Vec<CfnStack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CfnStack {
    stack_id: String,
    stack_name: String,
    stack_status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeStackEvents {
    #[serde(default)]
    stack_events: Vec<ResourceEvent>,
}

impl AwsCliProvider {
    /// Build a provider from a credential set.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Connect` if only one half of a static key
    /// pair is present, or if an entry that must be a string is not one.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self, ProviderError> {
        let string_entry = |key: &str| -> Result<Option<String>, ProviderError> {
            match credentials.get(key) {
                None => Ok(None),
                Some(value) => value
                    .as_str()
                    .map(|s| Some(s.to_string()))
                    .ok_or_else(|| ProviderError::connect(format!("credential `{key}` must be a string"))),
            }
        };

        let mut env = Vec::new();
        for (key, vars) in ENV_MAPPING {
            if let Some(value) = string_entry(key)? {
                for var in *vars {
                    env.push((var.to_string(), value.clone()));
                }
            }
        }

        let has_key_id = credentials.contains_key("aws_access_key_id");
        let has_secret = credentials.contains_key("aws_secret_access_key");
        if has_key_id != has_secret {
            return Err(ProviderError::connect(
                "aws_access_key_id and aws_secret_access_key must be given together",
            ));
        }

        Ok(Self {
            program: string_entry("aws_cli")?.unwrap_or_else(|| "aws".to_string()),
            env,
            endpoint_url: string_entry("endpoint_url")?,
        })
    }

    /// Environment variables passed to every CLI invocation
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Execute an `aws` command and return stdout
    async fn run_aws(&self, args: Vec<String>) -> Result<String, ProviderError> {
        let mut full_args = args;
        full_args.extend(["--output".to_string(), "json".to_string()]);
        if let Some(endpoint) = &self.endpoint_url {
            full_args.extend(["--endpoint-url".to_string(), endpoint.clone()]);
        }

        let program = self.program.clone();
        let env = self.env.clone();
        debug!("Running {} {}", program, full_args.join(" "));

        // Run the CLI in a blocking task
        tokio::task::spawn_blocking(move || {
            let output = Command::new(&program)
                .args(&full_args)
                .envs(env)
                .output()
                .map_err(|e| {
                    let message = if e.kind() == std::io::ErrorKind::NotFound {
                        format!("{program} CLI not found. Install from https://aws.amazon.com/cli/")
                    } else {
                        format!("Failed to execute {program}: {e}")
                    };
                    ProviderError::Request {
                        message,
                        source: Some(Box::new(e)),
                    }
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(ProviderError::request(format!(
                    "{program} command failed: {}",
                    stderr.trim()
                )));
            }

            String::from_utf8(output.stdout).map_err(|e| ProviderError::Request {
                message: format!("Invalid UTF-8 in {program} output"),
                source: Some(Box::new(e)),
            })
        })
        .await
        .map_err(|e| ProviderError::Request {
            message: format!("Task join error: {e}"),
            source: Some(Box::new(e)),
        })?
    }

    /// Stacks from `describe-stacks` output, deleted ones dropped
    fn parse_stacks(output: &str) -> Result<Vec<StackSummary>, ProviderError> {
        let parsed: DescribeStacks = serde_json::from_str(output).map_err(|e| ProviderError::Request {
            message: "Failed to parse describe-stacks JSON".to_string(),
            source: Some(Box::new(e)),
        })?;
        Ok(parsed
            .stacks
            .into_iter()
            .filter(|s| s.stack_status != stackwatch_core::schema::DELETE_COMPLETE)
            .map(|s| StackSummary::new(s.stack_id, s.stack_name, s.stack_status))
            .collect())
    }

    /// Events from `describe-stack-events` output, reordered oldest first
    fn parse_events(output: &str) -> Result<Vec<ResourceEvent>, ProviderError> {
        let parsed: DescribeStackEvents =
            serde_json::from_str(output).map_err(|e| ProviderError::Request {
                message: "Failed to parse describe-stack-events JSON".to_string(),
                source: Some(Box::new(e)),
            })?;
        let mut events = parsed.stack_events;
        // the API lists newest first
        events.reverse();
        Ok(events)
    }
}

impl OrchestrationApi for AwsCliProvider {
    async fn list_stacks(&self) -> Result<Vec<StackSummary>, ProviderError> {
        let output = self
            .run_aws(vec!["cloudformation".to_string(), "describe-stacks".to_string()])
            .await?;
        Self::parse_stacks(&output)
    }

    async fn list_events(&self, stack_id: &str) -> Result<Vec<ResourceEvent>, ProviderError> {
        let output = self
            .run_aws(vec![
                "cloudformation".to_string(),
                "describe-stack-events".to_string(),
                "--stack-name".to_string(),
                stack_id.to_string(),
            ])
            .await?;
        Self::parse_events(&output)
    }

    fn provider_name(&self) -> &str {
        "aws"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> Credentials {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), toml::Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn test_credentials_map_to_env() {
        let provider = AwsCliProvider::from_credentials(&creds(&[
            ("provider", "aws"),
            ("aws_access_key_id", "AKIA123"),
            ("aws_secret_access_key", "secret"),
            ("region", "eu-central-1"),
        ]))
        .unwrap();

        let env = provider.env();
        assert!(env.contains(&("AWS_ACCESS_KEY_ID".to_string(), "AKIA123".to_string())));
        assert!(env.contains(&("AWS_SECRET_ACCESS_KEY".to_string(), "secret".to_string())));
        assert!(env.contains(&("AWS_REGION".to_string(), "eu-central-1".to_string())));
        assert!(env.contains(&("AWS_DEFAULT_REGION".to_string(), "eu-central-1".to_string())));
        assert!(!env.iter().any(|(k, _)| k == "AWS_PROFILE"));
    }

    #[test]
    fn test_half_key_pair_rejected() {
        let err = AwsCliProvider::from_credentials(&creds(&[("aws_access_key_id", "AKIA123")]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Connect { .. }));
    }

    #[test]
    fn test_non_string_credential_rejected() {
        let mut table = creds(&[("profile", "prod")]);
        table.insert("region".to_string(), toml::Value::Integer(1));
        assert!(AwsCliProvider::from_credentials(&table).is_err());
    }

    #[test]
    fn test_parse_stacks_skips_deleted() {
        let output = r#"{
            "Stacks": [
                {"StackId": "arn:1", "StackName": "web", "StackStatus": "CREATE_COMPLETE", "CreationTime": "2026-01-01T00:00:00Z"},
                {"StackId": "arn:2", "StackName": "old", "StackStatus": "DELETE_COMPLETE"}
            ]
        }"#;
        let stacks = AwsCliProvider::parse_stacks(output).unwrap();
        assert_eq!(stacks, vec![StackSummary::new("arn:1", "web", "CREATE_COMPLETE")]);
    }

    #[test]
    fn test_parse_events_oldest_first() {
        let output = r#"{
            "StackEvents": [
                {"EventId": "e2", "ResourceStatus": "CREATE_COMPLETE", "Timestamp": "2026-01-01T00:01:00Z"},
                {"EventId": "e1", "ResourceStatus": "CREATE_IN_PROGRESS", "Timestamp": "2026-01-01T00:00:00Z"}
            ]
        }"#;
        let events = AwsCliProvider::parse_events(output).unwrap();
        let ids: Vec<&str> = events
            .iter()
            .filter_map(|e| e.get("EventId").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(ids, vec!["e1", "e2"]);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(AwsCliProvider::parse_stacks("not json").is_err());
        assert!(AwsCliProvider::parse_events("{\"StackEvents\": 3}").is_err());
    }
}
