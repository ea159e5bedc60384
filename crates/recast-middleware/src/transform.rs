//! Transformation engine contract
//!
//! The engine is a black box: given a source path and options it returns
//! transformed code and an optional source map, or a [`TransformError`].
//! It is assumed deterministic for fixed file content, so failures are
//! never retried.
//!
//! [`CommandTransformer`] adapts any command-line compiler to the contract.

use crate::config::{OutputFormat, TransformConfig};
use crate::error::ConfigError;
use recast_artifact::Artifact;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Placeholder in command arguments replaced by the source path
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Environment variable carrying the options as JSON
pub const OPTIONS_ENV: &str = "RECAST_TRANSFORM_OPTIONS";

/// Pass-through engine options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformOptions(Map<String, Value>);

impl TransformOptions {
    /// Empty options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With an option set
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Option value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Options as a JSON object
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

/// Successful engine result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// Transformed code
    pub code: String,
    /// Serialized source map
    pub map: Option<String>,
}

impl TransformOutput {
    /// Output without a source map
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    /// With a serialized source map
    #[inline]
    #[must_use]
    pub fn with_map(mut self, map: impl Into<String>) -> Self {
        self.map = Some(map.into());
        self
    }
}

impl From<TransformOutput> for Artifact {
    fn from(output: TransformOutput) -> Self {
        let artifact = Artifact::new(output.code);
        match output.map {
            Some(map) => artifact.with_map(map),
            None => artifact,
        }
    }
}

/// Engine failure, serializable for console reporting
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct TransformError {
    /// Human-readable description
    pub message: String,
    /// Source excerpt around the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_frame: Option<String>,
    /// Source that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl TransformError {
    /// Create error with message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code_frame: None,
            path: None,
        }
    }

    /// Create error for a file that could not be read or sent
    pub fn io(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        let path = path.into();
        Self::new(format!("{}: {source}", path.display())).with_path(path)
    }

    /// With source excerpt
    #[must_use]
    pub fn with_code_frame(mut self, code_frame: impl Into<String>) -> Self {
        self.code_frame = Some(code_frame.into());
        self
    }

    /// With failing source
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Source-to-source transformation engine
///
/// Called on the blocking thread pool; implementations may block.
#[cfg_attr(test, mockall::automock)]
pub trait Transformer: Send + Sync {
    /// Transform the file at `source`
    ///
    /// # Errors
    /// Returns error if the engine rejects the source
    fn transform(
        &self,
        source: &Path,
        options: &TransformOptions,
    ) -> Result<TransformOutput, TransformError>;
}

/// Engine backed by an external program
///
/// Exit status 0 means success; anything else is a failure carrying
/// stderr. Options are passed in [`OPTIONS_ENV`].
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    program: String,
    args: Vec<String>,
    output: OutputFormat,
}

#[derive(Deserialize)]
struct JsonOutput {
    code: String,
    #[serde(default)]
    map: Option<Value>,
}

impl CommandTransformer {
    /// Create from `command` (program followed by arguments)
    ///
    /// Without an [`INPUT_PLACEHOLDER`] argument, the source path is
    /// appended as the last argument.
    ///
    /// # Errors
    /// Returns error if `command` is empty
    pub fn new(command: &[String], output: OutputFormat) -> Result<Self, ConfigError> {
        let (program, args) = command.split_first().ok_or(ConfigError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            output,
        })
    }

    /// Create from the `[transform]` section
    ///
    /// # Errors
    /// Returns error if no command is configured
    pub fn from_config(config: &TransformConfig) -> Result<Self, ConfigError> {
        Self::new(&config.command, config.output)
    }

    fn args_for(&self, source: &Path) -> Vec<String> {
        let input = source.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(INPUT_PLACEHOLDER)) {
            args.push(input.into_owned());
        }
        args
    }

    fn parse_stdout(&self, source: &Path, stdout: String) -> Result<TransformOutput, TransformError> {
        match self.output {
            OutputFormat::Text => Ok(TransformOutput::new(stdout)),
            OutputFormat::Json => {
                let parsed: JsonOutput = serde_json::from_str(&stdout).map_err(|e| {
                    TransformError::new(format!("{} produced invalid JSON: {e}", self.program))
                        .with_path(source)
                })?;
                let map = parsed.map.and_then(|map| match map {
                    Value::Null => None,
                    Value::String(text) => Some(text),
                    other => Some(other.to_string()),
                });
                Ok(TransformOutput {
                    code: parsed.code,
                    map,
                })
            }
        }
    }
}

impl Transformer for CommandTransformer {
    fn transform(
        &self,
        source: &Path,
        options: &TransformOptions,
    ) -> Result<TransformOutput, TransformError> {
        let output = Command::new(&self.program)
            .args(self.args_for(source))
            .env(OPTIONS_ENV, options.to_json())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                TransformError::new(format!("failed to run {}: {e}", self.program))
                    .with_path(source)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(TransformError::new(message).with_path(source));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| {
            TransformError::new(format!("{} produced non-UTF-8 output", self.program))
                .with_path(source)
        })?;
        self.parse_stdout(source, stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_command_is_rejected() {
        let result = CommandTransformer::new(&[], OutputFormat::Text);
        assert!(matches!(result, Err(ConfigError::EmptyCommand)));
    }

    #[test]
    fn placeholder_is_substituted() {
        let transformer =
            CommandTransformer::new(&command(&["babel", "--in={input}"]), OutputFormat::Text)
                .unwrap();
        assert_eq!(
            transformer.args_for(Path::new("/src/a.js")),
            vec!["--in=/src/a.js".to_string()]
        );
    }

    #[test]
    fn source_is_appended_without_placeholder() {
        let transformer =
            CommandTransformer::new(&command(&["babel", "--compact"]), OutputFormat::Text)
                .unwrap();
        assert_eq!(
            transformer.args_for(Path::new("/src/a.js")),
            vec!["--compact".to_string(), "/src/a.js".to_string()]
        );
    }

    #[test]
    fn json_output_with_object_map() {
        let transformer =
            CommandTransformer::new(&command(&["engine"]), OutputFormat::Json).unwrap();
        let output = transformer
            .parse_stdout(
                Path::new("/src/a.js"),
                r#"{"code":"x;","map":{"version":3}}"#.to_string(),
            )
            .unwrap();

        assert_eq!(output, TransformOutput::new("x;").with_map(r#"{"version":3}"#));
    }

    #[test]
    fn json_output_without_map() {
        let transformer =
            CommandTransformer::new(&command(&["engine"]), OutputFormat::Json).unwrap();
        let output = transformer
            .parse_stdout(Path::new("/src/a.js"), r#"{"code":"x;","map":null}"#.to_string())
            .unwrap();
        assert_eq!(output, TransformOutput::new("x;"));
    }

    #[test]
    fn invalid_json_output_is_an_error() {
        let transformer =
            CommandTransformer::new(&command(&["engine"]), OutputFormat::Json).unwrap();
        let err = transformer
            .parse_stdout(Path::new("/src/a.js"), "not json".to_string())
            .unwrap_err();
        assert!(err.message.contains("invalid JSON"));
        assert_eq!(err.path, Some(PathBuf::from("/src/a.js")));
    }

    #[test]
    fn output_converts_to_artifact() {
        let artifact: Artifact = TransformOutput::new("x;").with_map("{}").into();
        assert_eq!(&**artifact.code(), "x;");
        assert_eq!(artifact.map().map(|m| &**m), Some("{}"));
    }

    #[test]
    fn error_serializes_camel_case() {
        let err = TransformError::new("Unexpected token").with_code_frame("> 1 | let =");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"message":"Unexpected token","codeFrame":"> 1 | let ="}"#
        );
    }

    #[test]
    fn options_round_through_json() {
        let options = TransformOptions::new()
            .with("compact", true)
            .with("presets", vec!["env"]);
        assert_eq!(options.get("compact"), Some(&Value::Bool(true)));
        assert_eq!(options.to_json(), r#"{"compact":true,"presets":["env"]}"#);
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use pretty_assertions::assert_eq;
        use std::io::Write;

        fn source_file(content: &str) -> tempfile::NamedTempFile {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(content.as_bytes()).unwrap();
            file
        }

        #[test]
        fn runs_command_and_captures_stdout() {
            let file = source_file("let x = 1;");
            let transformer = CommandTransformer::new(
                &command(&["sh", "-c", "tr a-z A-Z < \"$0\"", "{input}"]),
                OutputFormat::Text,
            )
            .unwrap();

            let output = transformer
                .transform(file.path(), &TransformOptions::new())
                .unwrap();
            assert_eq!(output.code, "LET X = 1;");
            assert!(output.map.is_none());
        }

        #[test]
        fn passes_options_in_environment() {
            let file = source_file("");
            let transformer = CommandTransformer::new(
                &command(&["sh", "-c", "printf %s \"$RECAST_TRANSFORM_OPTIONS\"", "{input}"]),
                OutputFormat::Text,
            )
            .unwrap();
            let options = TransformOptions::new().with("compact", true);

            let output = transformer.transform(file.path(), &options).unwrap();
            assert_eq!(output.code, r#"{"compact":true}"#);
        }

        #[test]
        fn non_zero_exit_is_an_error_with_stderr() {
            let file = source_file("let = ;");
            let transformer = CommandTransformer::new(
                &command(&["sh", "-c", "echo 'Unexpected token' >&2; exit 1", "{input}"]),
                OutputFormat::Text,
            )
            .unwrap();

            let err = transformer
                .transform(file.path(), &TransformOptions::new())
                .unwrap_err();
            assert_eq!(err.message, "Unexpected token");
            assert_eq!(err.path.as_deref(), Some(file.path()));
        }

        #[test]
        fn missing_program_is_an_error() {
            let file = source_file("");
            let transformer = CommandTransformer::new(
                &command(&["recast-definitely-not-a-program"]),
                OutputFormat::Text,
            )
            .unwrap();

            let err = transformer
                .transform(file.path(), &TransformOptions::new())
                .unwrap_err();
            assert!(err.message.starts_with("failed to run"));
        }
    }
}
