//! Notifier configuration loaded from environment variables.

use std::path::PathBuf;

use crate::error::CoreError;
use crate::types::DirUuid;

const DEFAULT_DEPLOYMENT_NAME: &str = "Directory";
const DEFAULT_COMPANY_NAME: &str = "Example Corp";
const DEFAULT_FROM_ADDRESS: &str = "noreply@localhost";
const DEFAULT_OPERATOR_PREFIX: &str = "[directory-oper] ";
const DEFAULT_USER_PREFIX: &str = "[directory] ";
const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// Read-only settings shared by every notification handler.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Display name of this directory deployment, injected into every template.
    pub deployment_name: String,
    /// Operating company name, injected into every template.
    pub company_name: String,
    /// RFC 5322 "From" address for all outgoing mail.
    pub from_address: String,
    /// Static operator mailing list.
    pub operator_addresses: Vec<String>,
    pub operator_subject_prefix: String,
    pub user_subject_prefix: String,
    /// Users eligible for direct mail. Empty means everyone is eligible.
    pub whitelist: Vec<DirUuid>,
    /// Set while the directory is being bulk-imported; all mail is suppressed.
    pub initial_sync: bool,
    /// Directory holding `<name>.txt` templates.
    pub templates_dir: PathBuf,
}

impl NotifierConfig {
    /// Load configuration from the process environment.
    ///
    /// | Variable                  | Required | Default              |
    /// |---------------------------|----------|----------------------|
    /// | `DEPLOYMENT_NAME`         | no       | `Directory`          |
    /// | `COMPANY_NAME`            | no       | `Example Corp`       |
    /// | `MAIL_FROM`               | no       | `noreply@localhost`  |
    /// | `OPERATOR_EMAIL`          | yes      | comma-separated list |
    /// | `OPERATOR_SUBJECT_PREFIX` | no       | `[directory-oper] `  |
    /// | `USER_SUBJECT_PREFIX`     | no       | `[directory] `       |
    /// | `NOTIFY_WHITELIST`        | no       | empty (everyone)     |
    /// | `INITIAL_SYNC`            | no       | `false`              |
    /// | `TEMPLATES_DIR`           | no       | `templates`          |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same parsing as [`from_env`](Self::from_env) against an arbitrary
    /// variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let operator_addresses = split_list(&lookup("OPERATOR_EMAIL").unwrap_or_default());
        if operator_addresses.is_empty() {
            return Err(CoreError::Validation(
                "OPERATOR_EMAIL must name at least one address".into(),
            ));
        }

        let whitelist = split_list(&lookup("NOTIFY_WHITELIST").unwrap_or_default())
            .into_iter()
            .map(|raw| {
                raw.parse::<DirUuid>().map_err(|e| {
                    CoreError::Validation(format!("NOTIFY_WHITELIST entry {raw:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let initial_sync = match lookup("INITIAL_SYNC") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                CoreError::Validation(format!("INITIAL_SYNC must be a boolean, got {raw:?}"))
            })?,
            None => false,
        };

        Ok(Self {
            deployment_name: get("DEPLOYMENT_NAME", DEFAULT_DEPLOYMENT_NAME),
            company_name: get("COMPANY_NAME", DEFAULT_COMPANY_NAME),
            from_address: get("MAIL_FROM", DEFAULT_FROM_ADDRESS),
            operator_addresses,
            operator_subject_prefix: get("OPERATOR_SUBJECT_PREFIX", DEFAULT_OPERATOR_PREFIX),
            user_subject_prefix: get("USER_SUBJECT_PREFIX", DEFAULT_USER_PREFIX),
            whitelist,
            initial_sync,
            templates_dir: PathBuf::from(get("TEMPLATES_DIR", DEFAULT_TEMPLATES_DIR)),
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
