//! Resolves the runner's input into a Job Descriptor for the HMS engine

use crate::args::Cli;
use hms_runner_core::application::constants::DEFAULT_LOG_PATTERNS;
use hms_runner_core::domain::JobDescriptor;
use hms_runner_core::{AppError, Result};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Simulation run of the bundled sample project
pub const EXAMPLE_SIM_NAME: &str = "Jan 96 storm";

/// Where the job definition comes from. Exactly one per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Example,
    JsonFile(String),
    Flags {
        project_file: String,
        sim_name: String,
    },
}

impl InputMode {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let flags_given = cli.project_file.is_some() || cli.sim_name.is_some();
        let given = [cli.example, cli.json_file.is_some(), flags_given]
            .iter()
            .filter(|given| **given)
            .count();

        if given != 1 {
            return Err(AppError::Config(
                "Specify exactly one of --example, --json-file, or --project-file/--sim-name"
                    .to_string(),
            ));
        }

        if cli.example {
            return Ok(InputMode::Example);
        }
        if let Some(json_file) = &cli.json_file {
            return Ok(InputMode::JsonFile(json_file.clone()));
        }
        Ok(InputMode::Flags {
            project_file: cli.project_file.clone().unwrap_or_default(),
            sim_name: cli.sim_name.clone().unwrap_or_default(),
        })
    }
}

/// JSON job file: `{"hms_schema": {"project_file": "...", "sim_name": "..."}}`
#[derive(Debug, Deserialize)]
struct JobFile {
    hms_schema: HmsSchema,
}

#[derive(Debug, Deserialize)]
struct HmsSchema {
    #[serde(default)]
    project_file: String,
    #[serde(default)]
    sim_name: String,
}

/// A validated HMS simulation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmsJob {
    project_file: PathBuf,
    sim_name: String,
}

impl HmsJob {
    /// Validate a project file / simulation pair
    ///
    /// # Errors
    /// - `AppError::Validation` if the project file is not a `.hms` file or
    ///   the simulation name is empty
    pub fn new(project_file: &str, sim_name: &str) -> Result<Self> {
        if project_file.is_empty() || !project_file.to_lowercase().ends_with(".hms") {
            return Err(AppError::Validation(
                "project_file must be a .hms file".to_string(),
            ));
        }
        if sim_name.is_empty() {
            return Err(AppError::Validation("sim_name is required".to_string()));
        }

        Ok(Self {
            project_file: PathBuf::from(shellexpand::tilde(project_file).into_owned()),
            sim_name: sim_name.to_string(),
        })
    }

    /// Resolve the input mode into a job
    pub fn resolve(mode: &InputMode, hms_home: &Path) -> Result<Self> {
        match mode {
            InputMode::Example => {
                let project = hms_home.join("samples").join("tenk").join("tenk.hms");
                Self::new(&project.to_string_lossy(), EXAMPLE_SIM_NAME)
            }
            InputMode::JsonFile(json_file) => {
                let path = shellexpand::tilde(json_file).into_owned();
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    AppError::Config(format!("cannot read JSON file {}: {}", path, e))
                })?;
                Self::from_json(&text)
            }
            InputMode::Flags {
                project_file,
                sim_name,
            } => Self::new(project_file, sim_name),
        }
    }

    /// Parse a JSON job file body
    pub fn from_json(text: &str) -> Result<Self> {
        let job: JobFile = serde_json::from_str(text)
            .map_err(|e| AppError::Config(format!("invalid JSON: {}", e)))?;
        Self::new(&job.hms_schema.project_file, &job.hms_schema.sim_name)
    }

    pub fn project_file(&self) -> &Path {
        &self.project_file
    }

    pub fn sim_name(&self) -> &str {
        &self.sim_name
    }

    /// Directory holding the project; also where the engine writes its logs
    pub fn project_dir(&self) -> PathBuf {
        match self.project_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Project name: the file name without its `.hms` extension
    pub fn project_name(&self) -> String {
        self.project_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn label(&self) -> String {
        format!(
            "Simulation '{}' for project '{}'",
            self.sim_name,
            self.project_name()
        )
    }

    /// Jython script that opens the project and computes the run
    pub fn script(&self) -> String {
        format!(
            "from hms.model.JythonHms import *\n\
             OpenProject(\"{}\", \"{}\")\n\
             ComputeRun(\"{}\")\n\
             SaveAllProjectComponents()\n",
            jython_string(&self.project_name()),
            jython_string(&self.project_dir().to_string_lossy()),
            jython_string(&self.sim_name),
        )
    }

    /// Write the script to a temporary `*.script` file
    ///
    /// The file is removed when the returned path is dropped.
    pub fn write_script(&self) -> Result<TempPath> {
        let mut file = tempfile::Builder::new()
            .prefix("hms-runner-")
            .suffix(".script")
            .tempfile()?;
        file.write_all(self.script().as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }

    /// Build the engine invocation
    ///
    /// # Arguments
    /// * `hms_home` - HEC-HMS installation directory
    /// * `script` - Path of the Jython script to run
    /// * `inherited_path` - Current `PATH`, appended after the engine's own tools
    pub fn descriptor(
        &self,
        hms_home: &Path,
        script: &Path,
        inherited_path: Option<&str>,
    ) -> Result<JobDescriptor> {
        let home = hms_home.display();
        let bin = hms_home.join("bin");
        let gdal = bin.join("gdal");

        let mut search_path = format!(
            "{}:{}",
            bin.join("taudem").display(),
            bin.join("mpi").display()
        );
        if let Some(inherited) = inherited_path.filter(|p| !p.is_empty()) {
            search_path.push(':');
            search_path.push_str(inherited);
        }

        let mut builder = JobDescriptor::builder(hms_home.join("jre").join("bin").join("java"))
            .args([
                "-DMapPanel.NoVolatileImage=true".to_string(),
                "-Xms32M".to_string(),
                "-Dpython.path=".to_string(),
                "-Dpython.home=.".to_string(),
                format!("-Djava.library.path={}:{}", bin.display(), gdal.display()),
                "-classpath".to_string(),
                format!("{}/*:{}/lib/*", home, home),
                "hms.Hms".to_string(),
                "-s".to_string(),
                script.display().to_string(),
            ])
            .env("PATH", search_path)
            .env("GDAL_DATA", gdal.join("gdal-data").display().to_string())
            .env("PROJ_LIB", gdal.join("proj").display().to_string())
            .working_dir(self.project_dir())
            .label(self.label());

        for pattern in DEFAULT_LOG_PATTERNS {
            builder = builder.log_pattern(*pattern);
        }

        Ok(builder.build()?)
    }
}

/// Escape a value for a double-quoted Jython string literal
fn jython_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
