//! Plain-text mail templates.
//!
//! [`TemplateRenderer`] loads `<dir>/<name>.txt` into a [`Tera`] instance the
//! first time `name` is rendered and reuses the compiled template for the
//! rest of the process lifetime. Every render sees two ambient variables,
//! `deployment_name` and `company_name`, alongside the caller's context.
//!
//! A missing or malformed template is a deployment error: it is returned to
//! the caller rather than papered over. [`TemplateRenderer::verify`] lets a
//! binary surface such errors at startup.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tera::{Context, Tera};

/// Every template the notifier renders.
pub const TEMPLATE_NAMES: &[&str] = &[
    "pw-changed",
    "oper-pw-changed",
    "email-changed",
    "oper-email-changed",
    "key-added",
    "oper-key-added",
    "key-deleted",
    "oper-key-deleted",
    "oper-key-mismatch",
    "oper-login-changed",
    "oper-user-deleted",
    "oper-privilege-granted",
    "oper-privilege-revoked",
    "oper-unrecognized-member",
];

/// Error type for template loading and rendering.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template {name:?} not found at {}", path.display())]
    Missing { name: String, path: PathBuf },

    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
}

/// Lazily compiling, process-lifetime template cache.
pub struct TemplateRenderer {
    dir: PathBuf,
    ambient: Context,
    tera: RwLock<Tera>,
}

impl TemplateRenderer {
    pub fn new(dir: impl Into<PathBuf>, deployment_name: &str, company_name: &str) -> Self {
        let mut ambient = Context::new();
        ambient.insert("deployment_name", deployment_name);
        ambient.insert("company_name", company_name);
        Self {
            dir: dir.into(),
            ambient,
            tera: RwLock::new(Tera::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render `name` with the ambient variables plus `vars`.
    pub fn render(&self, name: &str, vars: &Context) -> Result<String, TemplateError> {
        self.ensure_loaded(name)?;

        let mut context = self.ambient.clone();
        context.extend(vars.clone());

        let tera = self.tera.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tera.render(name, &context)?)
    }

    /// Load and compile every named template now.
    pub fn verify(&self, names: &[&str]) -> Result<(), TemplateError> {
        names.iter().try_for_each(|name| self.ensure_loaded(name))
    }

    /// True if `name` is already compiled.
    pub fn is_cached(&self, name: &str) -> bool {
        let tera = self.tera.read().unwrap_or_else(PoisonError::into_inner);
        let cached = tera.get_template_names().any(|n| n == name);
        cached
    }

    fn ensure_loaded(&self, name: &str) -> Result<(), TemplateError> {
        if self.is_cached(name) {
            return Ok(());
        }

        let path = self.dir.join(format!("{name}.txt"));
        if !path.is_file() {
            return Err(TemplateError::Missing {
                name: name.to_string(),
                path,
            });
        }

        let mut tera = self.tera.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have compiled it while we waited for the lock.
        if tera.get_template_names().any(|n| n == name) {
            return Ok(());
        }
        tera.add_template_file(&path, Some(name))?;
        tracing::debug!(template = name, path = %path.display(), "Template compiled");
        Ok(())
    }
}
