use std::{collections::HashMap, fs, path::Path};

use log::{debug, trace, LevelFilter};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::LoaderResult,
    module::{validate_module_name, ModuleEntry},
};

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
#[validate(schema(function = "Config::validate_module_options"))]
pub struct Config {
    #[serde(default)]
    #[validate(custom(function = "Config::validate_module_names"))]
    pub modules: Vec<String>,

    /// Options handed to each module's factory, keyed by module name
    #[serde(default)]
    pub module_options: HashMap<String, YamlValue>,

    #[validate(nested)]
    pub log: Option<Log>,
}

// Config file load and validation
impl Config {
    /// Load a config file, JSON when the extension is `.json` and YAML otherwise
    pub fn load<P>(path: P) -> LoaderResult<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let conf_str = fs::read_to_string(path)
            .map_err(|e| config_error!("Unable to read conf file from {}: {}", path.display(), e))?;
        debug!("Conf file read from {}", path.display());

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&conf_str),
            _ => Self::from_yaml(&conf_str),
        }
    }

    pub fn from_yaml(conf_str: &str) -> LoaderResult<Self> {
        trace!("Read conf file: {conf_str}");
        let conf: Config = serde_yaml::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse yaml conf: {}", e))?;

        trace!("Loaded conf: {conf:?}");

        conf.validate()?;
        Ok(conf)
    }

    /// Parse a JSON config by transcoding it to YAML, so both formats go
    /// through the same deserializer and module options stay YAML values
    pub fn from_json(conf_str: &str) -> LoaderResult<Self> {
        let json_value: serde_json::Value = serde_json::from_str(conf_str)
            .map_err(|e| config_error!("Unable to parse json conf: {}", e))?;

        let mut yaml_output = Vec::new();
        {
            let mut serializer = serde_yaml::Serializer::new(&mut yaml_output);
            serde_transcode::transcode(json_value, &mut serializer)?;
        }

        let yaml = String::from_utf8(yaml_output)
            .map_err(|e| config_error!("Transcoded conf is not utf-8: {}", e))?;
        Self::from_yaml(&yaml)
    }

    pub fn to_yaml(&self) -> LoaderResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Module list as manager entries
    pub fn module_entries(&self) -> Vec<ModuleEntry> {
        self.modules.iter().map(ModuleEntry::from).collect()
    }

    fn validate_module_names(modules: &[String]) -> Result<(), ValidationError> {
        for name in modules {
            if validate_module_name(name).is_err() {
                let mut err = ValidationError::new("invalid_module_name");
                err.add_param("name".into(), name);
                return Err(err);
            }
        }
        Ok(())
    }

    fn validate_module_options(&self) -> Result<(), ValidationError> {
        for name in self.module_options.keys() {
            if !self.modules.contains(name) {
                let mut err = ValidationError::new("options_for_unknown_module");
                err.add_param("name".into(), name);
                return Err(err);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct Log {
    /// Log file; logs go to stderr when unset
    #[validate(length(min = 1))]
    pub path: Option<String>,
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
