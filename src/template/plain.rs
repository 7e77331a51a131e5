// src/template/plain.rs

//! Single-level expansion against already resolved values.

use super::ambient::Ambient;
use super::syntax::expand;
use crate::config::{ConfigurationSet, ENV_PREFIX};
use crate::errors::{LauncherError, Result};

/// Looks names up in `env.*`, resolved values, launch extras, then ambient
/// properties. Substituted values are inserted verbatim.
#[derive(Debug, Clone, Copy)]
pub struct PlainResolver<'a> {
    values: &'a ConfigurationSet,
    extras: Option<&'a ConfigurationSet>,
    ambient: &'a Ambient,
}

impl<'a> PlainResolver<'a> {
    pub fn new(values: &'a ConfigurationSet, ambient: &'a Ambient) -> Self {
        Self {
            values,
            extras: None,
            ambient,
        }
    }

    pub fn with_extras(mut self, extras: &'a ConfigurationSet) -> Self {
        self.extras = Some(extras);
        self
    }

    pub fn lookup(&self, name: &str) -> Result<String> {
        if let Some(var) = name.strip_prefix(ENV_PREFIX) {
            return Ok(self.ambient.env_or_empty(var).to_string());
        }
        self.values
            .get(name)
            .or_else(|| self.extras.and_then(|extras| extras.get(name)))
            .or_else(|| self.ambient.property(name))
            .map(str::to_string)
            .ok_or_else(|| LauncherError::UndefinedParameter(name.to_string()))
    }

    pub fn expand(&self, template: &str) -> Result<String> {
        expand(template, |name| self.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_not_re_expanded() {
        let values = ConfigurationSet::new()
            .with("literal", "${not.a.ref}")
            .with("heap", "512m");
        let ambient = Ambient::default();
        let plain = PlainResolver::new(&values, &ambient);

        assert_eq!(plain.expand("-Xmx${heap} ${literal}").unwrap(), "-Xmx512m ${not.a.ref}");
    }

    #[test]
    fn extras_are_visible_only_when_attached() {
        let values = ConfigurationSet::new();
        let extras = ConfigurationSet::new().with("classpath", "\"/a.jar\"");
        let ambient = Ambient::default().with_env("TZ", "UTC");

        let bare = PlainResolver::new(&values, &ambient);
        assert!(matches!(
            bare.expand("-cp ${classpath}"),
            Err(LauncherError::UndefinedParameter(name)) if name == "classpath"
        ));

        let full = bare.with_extras(&extras);
        assert_eq!(
            full.expand("-cp ${classpath} ${env.TZ}").unwrap(),
            "-cp \"/a.jar\" UTC"
        );
    }
}
