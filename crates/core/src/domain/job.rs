// Job Descriptor Domain Model

use crate::domain::error::{DomainError, Result};
use std::path::{Path, PathBuf};

/// Everything needed to launch and observe one supervised run
///
/// Immutable once built: fields are private and only readable through
/// accessors. Construct via [`JobDescriptor::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    executable: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    working_dir: PathBuf,
    log_patterns: Vec<String>,
    label: String,
}

impl JobDescriptor {
    pub fn builder(executable: impl Into<PathBuf>) -> JobDescriptorBuilder {
        JobDescriptorBuilder {
            executable: executable.into(),
            args: Vec::new(),
            env: Vec::new(),
            working_dir: PathBuf::from("."),
            log_patterns: Vec::new(),
            label: None,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment overrides, applied on top of the inherited environment
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Glob patterns for auxiliary log files, relative to `working_dir`
    pub fn log_patterns(&self) -> &[String] {
        &self.log_patterns
    }

    /// Human-readable name used in the run summary
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Builder for [`JobDescriptor`]
#[derive(Debug)]
pub struct JobDescriptorBuilder {
    executable: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    working_dir: PathBuf,
    log_patterns: Vec<String>,
    label: Option<String>,
}

impl JobDescriptorBuilder {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn log_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.log_patterns.push(pattern.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validate and freeze the descriptor
    ///
    /// # Errors
    /// - `DomainError::ValidationError` if the executable path is empty or an
    ///   environment key is empty or contains `=`
    pub fn build(self) -> Result<JobDescriptor> {
        if self.executable.as_os_str().is_empty() {
            return Err(DomainError::ValidationError(
                "executable path must not be empty".to_string(),
            ));
        }

        if let Some((key, _)) = self
            .env
            .iter()
            .find(|(key, _)| key.is_empty() || key.contains('='))
        {
            return Err(DomainError::ValidationError(format!(
                "invalid environment variable name: {:?}",
                key
            )));
        }

        let label = self
            .label
            .unwrap_or_else(|| self.executable.display().to_string());

        Ok(JobDescriptor {
            executable: self.executable,
            args: self.args,
            env: self.env,
            working_dir: self.working_dir,
            log_patterns: self.log_patterns,
            label,
        })
    }
}
