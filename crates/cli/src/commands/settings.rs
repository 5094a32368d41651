//! Resolution of flags, config file and environment into one run's settings

use std::path::PathBuf;

use osb_core::config::DEFAULT_PROFILE;
use osb_core::pool::available_parallelism;
use osb_core::{Action, ConfigManager, Error, Profile, ProfileManager, Result};

use super::Cli;

/// Everything an action needs, after defaults are applied
#[derive(Debug, Clone)]
pub struct Settings {
    pub action: Action,
    pub profile: Profile,
    pub bucket: String,
    /// Local source for upload, object prefix otherwise
    pub src: Option<String>,
    pub dst: Option<PathBuf>,
    pub parallelism: usize,
    pub json: bool,
}

impl Settings {
    /// Merge command-line flags over the selected profile and config defaults
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let config_manager = match &cli.config_file {
            Some(path) => ConfigManager::with_path(path.clone()),
            None => ConfigManager::new()?,
        };
        if cli.config_file.is_some() && !config_manager.config_path().exists() {
            return Err(Error::NotFound(format!(
                "Config file {}",
                config_manager.config_path().display()
            )));
        }

        let config = config_manager.load()?;
        let profile_name = cli
            .config_profile
            .clone()
            .unwrap_or_else(|| config.defaults.profile.clone());
        let profile_name = if profile_name.is_empty() {
            DEFAULT_PROFILE.to_string()
        } else {
            profile_name
        };

        let mut profile = ProfileManager::with_config_manager(config_manager).get(&profile_name)?;
        if let Some(access_key) = &cli.access_key {
            profile.access_key = access_key.clone();
        }
        if let Some(secret_key) = &cli.secret_key {
            profile.secret_key = secret_key.clone();
        }
        if let Some(proxy) = &cli.proxy {
            profile.proxy = Some(proxy.clone());
        }

        let bucket = cli
            .bucket
            .clone()
            .or_else(|| profile.bucket.clone())
            .filter(|b| !b.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "No bucket given; pass -b or set `bucket` in profile '{profile_name}'"
                ))
            })?;

        let action = Action::from(cli.action);
        if action == Action::Upload && cli.src.as_deref().is_none_or(str::is_empty) {
            return Err(Error::InvalidPath(
                "upload requires a source path (-s)".to_string(),
            ));
        }

        let parallelism = cli
            .parallelism
            .or(config.defaults.parallelism)
            .filter(|n| *n > 0)
            .unwrap_or_else(available_parallelism);

        Ok(Self {
            action,
            bucket,
            src: cli.src.clone(),
            dst: cli.dst.clone(),
            parallelism,
            json: cli.json || config.defaults.output == "json",
            profile,
        })
    }

    /// Object prefix for list, download and delete; empty means the whole bucket
    pub fn prefix(&self) -> &str {
        self.src.as_deref().unwrap_or_default()
    }
}
