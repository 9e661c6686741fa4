use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, LayoutConfig};

fn xdg_home() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .map(|dir| -> PathBuf { dir.into() })
        .or_else(|_| {
            std::env::var("HOME")
                .map(|home| -> PathBuf { PathBuf::from(home).join(".config") })
        })
        .ok()
}

/// A boolean environment flag.  Unset, empty, "false" and zero are all
/// treated as false.
pub fn env_var_flag(name: &'static str) -> bool {
    std::env::var(name)
        .map(|var| {
            if var.is_empty() {
                false
            } else if var.eq_ignore_ascii_case("true") {
                true
            } else if let Ok(value) = var.parse::<usize>() {
                value > 0
            } else {
                false
            }
        })
        .unwrap_or(false)
}

fn env_var_usize(name: &'static str) -> Result<Option<usize>, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidEnvironmentValue { name, value }),
        Err(_) => Ok(None),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// When false, values are printed without consulting any printer.
    pub enabled: bool,

    /// Upper bound on pointer hops while walking a single container.
    /// Reaching it ends the traversal, so corrupted links can never
    /// hang the debugger.
    pub max_traversal_steps: usize,

    /// Strings longer than this are reported as errors rather than
    /// read.
    pub max_string_length: usize,

    /// Number of children printed before eliding the rest.  Zero
    /// prints every child.
    pub print_elements: usize,

    /// Nesting depth beyond which values print as `{...}`.
    pub max_depth: usize,

    pub layout: LayoutConfig,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_traversal_steps: 1_000_000,
            max_string_length: 1 << 20,
            print_elements: 200,
            max_depth: 8,
            layout: LayoutConfig::default(),
        }
    }
}

impl PrinterConfig {
    pub const ENV_DISABLE: &'static str = "FRPC_PRINTERS_DISABLE";
    pub const ENV_MAX_STEPS: &'static str = "FRPC_PRINTERS_MAX_STEPS";
    pub const ENV_PRINT_ELEMENTS: &'static str = "FRPC_PRINTERS_PRINT_ELEMENTS";

    pub fn default_save_location() -> Option<PathBuf> {
        xdg_home().map(|dir| dir.join("frpc_printers/config.json"))
    }

    /// Load the user config from its default location, falling back
    /// to the defaults if there is none, then apply environment
    /// overrides.
    pub fn load_default() -> Result<Self, Error> {
        let config = match Self::default_save_location() {
            Some(location) if location.exists() => Self::load(location)?,
            _ => Self::default(),
        };
        config.with_env_overrides()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        log::debug!("Loading printer config from {}", path.display());
        let config_str = std::fs::read_to_string(path)?;
        Self::from_json(&config_str)
    }

    pub fn from_json(config_str: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(config_str)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_env_overrides(mut self) -> Result<Self, Error> {
        if env_var_flag(Self::ENV_DISABLE) {
            self.enabled = false;
        }
        if let Some(steps) = env_var_usize(Self::ENV_MAX_STEPS)? {
            self.max_traversal_steps = steps;
        }
        if let Some(elements) = env_var_usize(Self::ENV_PRINT_ELEMENTS)? {
            self.print_elements = elements;
        }
        Ok(self)
    }

    pub fn max_traversal_steps(mut self, steps: usize) -> Self {
        self.max_traversal_steps = steps;
        self
    }

    pub fn print_elements(mut self, elements: usize) -> Self {
        self.print_elements = elements;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}
