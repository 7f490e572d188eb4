//! User configuration options.

use crate::{BASE_DIR, CLIOptions};
use dirs::config_dir;
use log::{info, warn};
use nanoserde::{DeRon, DeRonErr, SerRon};
use std::{
    error::Error,
    fmt,
    fs::{File, create_dir_all},
    io::{self, Write},
    path::PathBuf,
};

const LOG_TAG: &str = "UserConfig";

#[derive(Debug)]
pub enum ConfigError {
    NoConfigDir,
    Io(io::Error),
    Parse(DeRonErr),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "{LOG_TAG}: couldn't find the user config dir"),
            ConfigError::Io(e) => write!(f, "{LOG_TAG}: {e}"),
            ConfigError::Parse(e) => write!(f, "{LOG_TAG}: {e}"),
        }
    }
}

impl Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<DeRonErr> for ConfigError {
    fn from(e: DeRonErr) -> Self {
        ConfigError::Parse(e)
    }
}

fn get_cfg_file() -> Result<PathBuf, ConfigError> {
    let mut dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    dir.push(BASE_DIR);
    if !dir.exists() {
        create_dir_all(&dir)?;
    }
    dir.push("user.ron");
    Ok(dir)
}

#[derive(Debug, Clone, PartialEq, SerRon, DeRon)]
pub struct UserConfig {
    pub width: u32,
    pub height: u32,
    /// Degrees
    pub fov: f32,
    pub frames: u32,
    pub encore: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 400,
            fov: 90.0,
            frames: 1,
            encore: false,
        }
    }
}

impl UserConfig {
    /// Read the config, or write a default one if there is none or it can't
    /// be parsed
    pub fn load() -> Result<Self, ConfigError> {
        let path = get_cfg_file()?;
        match std::fs::read_to_string(&path) {
            Ok(buf) if !buf.is_empty() => match Self::from_ron(&buf) {
                Ok(config) => {
                    info!(target: LOG_TAG, "Loaded user config file");
                    return Ok(config);
                }
                Err(e) => warn!(
                    target: LOG_TAG,
                    "Could not deserialise {path:?} ({e}), recreating config"
                ),
            },
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Self::create_default()
    }

    fn create_default() -> Result<Self, ConfigError> {
        let config = UserConfig::default();
        info!(target: LOG_TAG, "Created default user config file");
        config.write()?;
        Ok(config)
    }

    pub fn write(&self) -> Result<(), ConfigError> {
        let path = get_cfg_file()?;
        let mut file = File::create(&path)?;
        file.write_all(self.serialize_ron().as_bytes())?;
        info!(target: LOG_TAG, "Saved user config to {path:?}");
        Ok(())
    }

    pub fn from_ron(data: &str) -> Result<Self, ConfigError> {
        Ok(Self::deserialize_ron(data)?)
    }

    /// Sync the CLI options and UserOptions with each other
    pub fn sync_cli(&mut self, cli: &mut CLIOptions) {
        info!(target: LOG_TAG, "Checking CLI options");

        if cli.width != 0 && cli.width != self.width {
            self.width = cli.width;
        } else {
            cli.width = self.width;
        }

        if cli.height != 0 && cli.height != self.height {
            self.height = cli.height;
        } else {
            cli.height = self.height;
        }

        match cli.fov {
            Some(fov) if (1.0..179.0).contains(&fov) => self.fov = fov,
            Some(fov) => {
                warn!(target: LOG_TAG, "Field of view {fov} out of range, using {}", self.fov);
                cli.fov = Some(self.fov);
            }
            None => cli.fov = Some(self.fov),
        }

        if let Some(frames) = cli.frames {
            self.frames = frames;
        } else {
            cli.frames = Some(self.frames);
        }

        if let Some(e) = cli.encore {
            self.encore = e;
        } else {
            cli.encore = Some(self.encore);
        }
    }
}
