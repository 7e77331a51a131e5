// src/launch/plan.rs

//! Launch planning: from a profile/command pair to a fully resolved
//! [`LaunchPlan`].
//!
//! Planning loads and merges configuration, reads the command metadata,
//! resolves templates (discovering attachments on the way), stages
//! attachments, waits for dependencies and renders the argument blob. It
//! never touches the command's runtime directories.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::try_join_all;
use tracing::{debug, info};

use super::escape::escape_arg;
use super::metadata::CommandMetadata;
use crate::cache::ResourceCache;
use crate::config::{ConfigurationSet, ensure_disjoint, load_command_configuration, load_command_reference};
use crate::errors::{LauncherError, Result};
use crate::layout::Layout;
use crate::repository::Repository;
use crate::template::{Ambient, PlainResolver, TemplateResolver, path_separator};

pub const TIME_FILE_NAME: &str = "time.fileName";
pub const SYSTEM_PROPERTIES: &str = "systemProperties";
pub const CLASSPATH: &str = "classpath";
pub const ARGUMENTS: &str = "arguments";
pub const JAVA_HOME: &str = "java.home";

/// What the operator asked to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub profile: String,
    pub command: String,
    pub extra_args: Vec<String>,
}

impl LaunchRequest {
    pub fn new(profile: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            command: command.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Everything a backend needs to start the process.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub profile: String,
    pub command: String,
    pub executable: PathBuf,
    /// Argument blob handed over through `@file` indirection.
    pub arguments: String,
    /// Added to the inherited environment, values verbatim.
    pub environment: BTreeMap<String, String>,
    pub system_properties: BTreeMap<String, String>,
    /// Cache path of each staged attachment, by declared name.
    pub attachments: BTreeMap<String, PathBuf>,
    /// Local dependency paths, ordered by resource identity.
    pub dependencies: Vec<PathBuf>,
    pub time_file_name: String,
    pub log_file: PathBuf,
    pub work_dir: PathBuf,
    pub pid_file: PathBuf,
    pub args_file: PathBuf,
}

pub struct Planner<'a> {
    layout: &'a Layout,
    repository: &'a dyn Repository,
    cache: &'a ResourceCache,
    ambient: &'a Ambient,
}

impl<'a> Planner<'a> {
    pub fn new(
        layout: &'a Layout,
        repository: &'a dyn Repository,
        cache: &'a ResourceCache,
        ambient: &'a Ambient,
    ) -> Self {
        Self {
            layout,
            repository,
            cache,
            ambient,
        }
    }

    pub async fn plan(&self, request: &LaunchRequest) -> Result<LaunchPlan> {
        self.plan_at(request, Utc::now()).await
    }

    /// Plan as if launched at `now`.
    pub async fn plan_at(&self, request: &LaunchRequest, now: DateTime<Utc>) -> Result<LaunchPlan> {
        let (profile, command) = (request.profile.as_str(), request.command.as_str());
        info!(profile, command, "planning launch");

        let config = load_command_configuration(self.layout, profile, command)?;
        let reference = load_command_reference(self.layout, profile, command)?;
        let metadata = CommandMetadata::read(&self.repository.resolve(&reference)?)?;
        ensure_disjoint(&config, &metadata.attachments)?;

        let resolved = TemplateResolver::new(
            &config,
            &metadata.attachments,
            self.repository,
            self.cache,
            self.ambient,
        )
        .resolve_all()?;
        let time_file_name = time_file_name(now);
        let values = resolved.values.with(TIME_FILE_NAME, time_file_name.clone());

        let dependencies = metadata
            .dependencies
            .iter()
            .map(|reference| self.repository.resolve(reference))
            .collect::<Result<Vec<_>>>()?;

        let mut attachments = BTreeMap::new();
        for (name, resource) in &resolved.attachments {
            let path = self.cache.stage(resource).await?;
            debug!(attachment = %name, path = %path.display(), "attachment staged");
            attachments.insert(name.clone(), path);
        }

        let local_paths =
            try_join_all(dependencies.iter().map(|resource| resource.local_path())).await?;
        let mut located: Vec<_> = dependencies
            .iter()
            .map(|resource| resource.id().to_path_buf())
            .zip(local_paths)
            .collect();
        located.sort_by(|a, b| a.0.cmp(&b.0));
        let dependencies: Vec<PathBuf> = located.into_iter().map(|(_, path)| path).collect();

        let plain = PlainResolver::new(&values, self.ambient);
        let system_properties = expand_each(&plain, &metadata.system_properties)?;
        let environment = expand_each(&plain, &metadata.environment)?;

        let extras = ConfigurationSet::new()
            .with(SYSTEM_PROPERTIES, render_system_properties(&system_properties)?)
            .with(CLASSPATH, render_classpath(&dependencies)?)
            .with(ARGUMENTS, render_arguments(&request.extra_args)?);
        let arguments = plain.with_extras(&extras).expand(&metadata.arguments)?;

        let java_home = values
            .get(JAVA_HOME)
            .ok_or_else(|| LauncherError::UndefinedParameter(JAVA_HOME.to_string()))?;
        let executable = PathBuf::from(java_home).join("bin").join("java");

        info!(
            profile,
            command,
            dependencies = dependencies.len(),
            attachments = attachments.len(),
            "launch planned"
        );

        Ok(LaunchPlan {
            profile: profile.to_string(),
            command: command.to_string(),
            executable,
            arguments,
            environment,
            system_properties,
            attachments,
            dependencies,
            log_file: self.layout.log_file(profile, command, &time_file_name),
            work_dir: self.layout.work_dir(profile, command),
            pid_file: self.layout.pid_file(profile, command),
            args_file: self.layout.args_file(profile, command),
            time_file_name,
        })
    }
}

/// `2026-10-16T10:00:00.123Z` rendered file-name safe:
/// `2026-10-16T10-00-00_123Z`.
pub fn time_file_name(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-")
        .replace('.', "_")
}

fn expand_each(
    plain: &PlainResolver<'_>,
    templates: &ConfigurationSet,
) -> Result<BTreeMap<String, String>> {
    templates
        .iter()
        .map(|(name, template)| -> Result<(String, String)> {
            Ok((name.to_string(), plain.expand(template)?))
        })
        .collect()
}

/// Sorted, space-joined `"-D<name>=<value>"` tokens.
pub fn render_system_properties(properties: &BTreeMap<String, String>) -> Result<String> {
    let tokens = properties
        .iter()
        .map(|(name, value)| -> Result<String> {
            Ok(format!("\"-D{}={}\"", escape_arg(name)?, escape_arg(value)?))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(tokens.join(" "))
}

/// Dependency paths joined with the platform path separator, quoted as
/// one token.
pub fn render_classpath(paths: &[PathBuf]) -> Result<String> {
    let entries = paths
        .iter()
        .map(|path| escape_arg(&path.display().to_string()))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("\"{}\"", entries.join(&path_separator().to_string())))
}

pub fn render_arguments(args: &[String]) -> Result<String> {
    let escaped = args
        .iter()
        .map(|arg| escape_arg(arg))
        .collect::<Result<Vec<_>>>()?;
    Ok(escaped.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn time_file_name_is_path_safe_with_millis() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(time_file_name(at), "2026-10-16T10-00-00_123Z");

        let whole = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(time_file_name(whole), "2026-01-02T03-04-05_000Z");
    }

    #[test]
    fn system_properties_are_sorted_and_quoted() {
        let props = BTreeMap::from([
            ("b.name".to_string(), "say \"hi\"".to_string()),
            ("a.name".to_string(), "x".to_string()),
        ]);
        assert_eq!(
            render_system_properties(&props).unwrap(),
            r#""-Da.name=x" "-Db.name=say \"hi\"""#
        );
        assert_eq!(render_system_properties(&BTreeMap::new()).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn classpath_is_one_quoted_token() {
        let paths = vec![PathBuf::from("/c/a.jar"), PathBuf::from("/c/b c.jar")];
        assert_eq!(render_classpath(&paths).unwrap(), "\"/c/a.jar:/c/b c.jar\"");
        assert_eq!(render_classpath(&[]).unwrap(), "\"\"");
    }

    #[test]
    fn extra_arguments_are_escaped_and_joined() {
        let args = vec!["--name".to_string(), "two words\t".to_string()];
        assert_eq!(render_arguments(&args).unwrap(), "--name two words\\t");
        assert!(matches!(
            render_arguments(&["\u{1b}[0m".to_string()]),
            Err(LauncherError::UnsupportedControlCharacter(0x1b))
        ));
    }
}
