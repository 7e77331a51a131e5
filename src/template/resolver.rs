// src/template/resolver.rs

//! Recursive resolution over configuration and attachment declarations.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use super::ambient::Ambient;
use super::syntax::expand;
use crate::cache::ResourceCache;
use crate::config::{ConfigurationSet, ENV_PREFIX};
use crate::errors::{LauncherError, Result};
use crate::repository::{Repository, Resource};

/// Output of [`TemplateResolver::resolve_all`].
#[derive(Debug, Clone)]
pub struct ResolvedConfiguration {
    /// Fully expanded value of every configuration and attachment name.
    pub values: ConfigurationSet,
    /// Attachments discovered while expanding, by declared name.
    pub attachments: BTreeMap<String, Resource>,
}

/// Expands names against, in order: `env.*`, configuration, attachment
/// declarations, ambient properties.
///
/// Each name is expanded at most once. Names currently being expanded are
/// kept in entry order; meeting one of them again is a reference cycle.
pub struct TemplateResolver<'a> {
    config: &'a ConfigurationSet,
    attachments: &'a ConfigurationSet,
    repository: &'a dyn Repository,
    cache: &'a ResourceCache,
    ambient: &'a Ambient,
    memo: HashMap<String, String>,
    active: Vec<String>,
    discovered: BTreeMap<String, Resource>,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(
        config: &'a ConfigurationSet,
        attachments: &'a ConfigurationSet,
        repository: &'a dyn Repository,
        cache: &'a ResourceCache,
        ambient: &'a Ambient,
    ) -> Self {
        Self {
            config,
            attachments,
            repository,
            cache,
            ambient,
            memo: HashMap::new(),
            active: Vec::new(),
            discovered: BTreeMap::new(),
        }
    }

    pub fn resolve(&mut self, name: &str) -> Result<String> {
        if let Some(value) = self.memo.get(name) {
            return Ok(value.clone());
        }
        let value = self.lookup(name)?;
        self.memo.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Resolve every configuration name, then every attachment name.
    pub fn resolve_all(mut self) -> Result<ResolvedConfiguration> {
        let config = self.config;
        let attachments = self.attachments;
        let mut values = Vec::with_capacity(config.len() + attachments.len());

        for name in config.names().chain(attachments.names()) {
            let value = self
                .resolve(name)
                .map_err(|e| LauncherError::PropertyResolution {
                    name: name.to_string(),
                    source: Box::new(e),
                })?;
            values.push((name.to_string(), value));
        }

        debug!(
            properties = values.len(),
            attachments = self.discovered.len(),
            "configuration resolved"
        );
        Ok(ResolvedConfiguration {
            values: values.into_iter().collect(),
            attachments: self.discovered,
        })
    }

    fn lookup(&mut self, name: &str) -> Result<String> {
        if let Some(var) = name.strip_prefix(ENV_PREFIX) {
            return Ok(self.ambient.env_or_empty(var).to_string());
        }

        let config = self.config;
        if let Some(raw) = config.get(name) {
            return self.expand_named(name, raw);
        }

        let attachments = self.attachments;
        if let Some(raw) = attachments.get(name) {
            let reference = self.expand_named(name, raw)?;
            let resource = self.repository.resolve(&reference)?;
            let path = self.cache.cache_path(&resource);
            trace!(attachment = name, reference = %reference, path = %path.display(), "attachment discovered");
            self.discovered.insert(name.to_string(), resource);
            return Ok(path.display().to_string());
        }

        if let Some(value) = self.ambient.property(name) {
            return Ok(value.to_string());
        }

        Err(LauncherError::UndefinedParameter(name.to_string()))
    }

    fn expand_named(&mut self, name: &str, raw: &str) -> Result<String> {
        if self.active.iter().any(|active| active == name) {
            return Err(LauncherError::ReferenceCycle(self.active.clone()));
        }
        self.active.push(name.to_string());
        let result = expand(raw, |reference| self.resolve(reference));
        self.active.pop();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::LocalRepository;

    struct Fixture {
        repository: LocalRepository,
        cache: ResourceCache,
        ambient: Ambient,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                repository: LocalRepository::new("/repo", "tar.gz"),
                cache: ResourceCache::new("/home/cache"),
                ambient: Ambient::default()
                    .with_env("APP_ENV", "staging")
                    .with_property("os.name", "linux"),
            }
        }

        fn resolve(
            &self,
            config: &ConfigurationSet,
            attachments: &ConfigurationSet,
        ) -> Result<ResolvedConfiguration> {
            TemplateResolver::new(config, attachments, &self.repository, &self.cache, &self.ambient)
                .resolve_all()
        }
    }

    fn root_cause(err: LauncherError) -> LauncherError {
        match err {
            LauncherError::PropertyResolution { source, .. } => root_cause(*source),
            other => other,
        }
    }

    #[test]
    fn nested_references_expand() {
        let fx = Fixture::new();
        let config = ConfigurationSet::new()
            .with("greeting", "hello")
            .with("message", "${greeting} world")
            .with("banner", "[${message}] on ${os.name} in ${env.APP_ENV}${env.UNSET}");

        let resolved = fx.resolve(&config, &ConfigurationSet::new()).unwrap();
        assert_eq!(resolved.values.get("message"), Some("hello world"));
        assert_eq!(
            resolved.values.get("banner"),
            Some("[hello world] on linux in staging")
        );
        assert!(resolved.attachments.is_empty());
    }

    #[test]
    fn two_name_cycle_lists_the_chain() {
        let fx = Fixture::new();
        let config = ConfigurationSet::new().with("A", "${B}").with("B", "${A}");

        let err = fx.resolve(&config, &ConfigurationSet::new()).unwrap_err();
        match root_cause(err) {
            LauncherError::ReferenceCycle(chain) => assert_eq!(chain, vec!["A", "B"]),
            other => panic!("expected ReferenceCycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let fx = Fixture::new();
        let config = ConfigurationSet::new().with("loop", "x${loop}");
        let err = fx.resolve(&config, &ConfigurationSet::new()).unwrap_err();
        assert!(matches!(root_cause(err), LauncherError::ReferenceCycle(chain) if chain == vec!["loop"]));
    }

    #[test]
    fn undefined_parameter_is_named_and_wrapped_with_the_property() {
        let fx = Fixture::new();
        let config = ConfigurationSet::new().with("a", "${missing}");
        let err = fx.resolve(&config, &ConfigurationSet::new()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse property name=a");
        assert!(matches!(root_cause(err), LauncherError::UndefinedParameter(n) if n == "missing"));
    }

    #[test]
    fn shared_references_are_expanded_once() {
        let fx = Fixture::new();
        let config = ConfigurationSet::new()
            .with("base", "/opt")
            .with("a", "${base}/a")
            .with("b", "${base}/b ${a}");
        let resolved = fx.resolve(&config, &ConfigurationSet::new()).unwrap();
        assert_eq!(resolved.values.get("b"), Some("/opt/b /opt/a"));
    }

    #[test]
    fn attachments_resolve_to_cache_paths_and_are_recorded() {
        let fx = Fixture::new();
        let config = ConfigurationSet::new()
            .with("foo.version", "1.0")
            .with("libdir", "${lib}/lib");
        let attachments =
            ConfigurationSet::new().with("lib", "repo:org.example:foo:${foo.version}");

        let resolved = fx.resolve(&config, &attachments).unwrap();
        assert_eq!(
            resolved.values.get("lib"),
            Some("/home/cache/org/example/foo/1.0/foo-1.0.tar.gz")
        );
        assert_eq!(
            resolved.values.get("libdir"),
            Some("/home/cache/org/example/foo/1.0/foo-1.0.tar.gz/lib")
        );
        let lib = resolved.attachments.get("lib").unwrap();
        assert_eq!(lib.id(), std::path::Path::new("org/example/foo/1.0/foo-1.0.tar.gz"));
    }

    #[test]
    fn unreferenced_attachments_are_still_discovered() {
        let fx = Fixture::new();
        let attachments = ConfigurationSet::new().with("tools", "tools/bundle.zip");
        let resolved = fx.resolve(&ConfigurationSet::new(), &attachments).unwrap();
        assert!(resolved.attachments.contains_key("tools"));
    }
}
