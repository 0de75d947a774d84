use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    core::{LoaderResult, ModuleInstance},
    invalid_argument,
};

/// Module names are identifier segments joined by `\`, `::` or `.`
static MODULE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:(?:\\|::|\.)[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("module name pattern is valid")
});

/// Check that `name` can be used as a module name
pub fn validate_module_name(name: &str) -> LoaderResult<()> {
    if MODULE_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(invalid_argument!("invalid module name '{}'", name))
    }
}

/// One item of the module list handed to the manager
#[derive(Debug, Clone)]
pub enum ModuleEntry {
    /// Resolved through the `loadModule.resolve` event
    Name(String),
    /// Already constructed by the caller, only announced and cached
    Instance { name: String, module: ModuleInstance },
}

impl ModuleEntry {
    pub fn instance(name: impl Into<String>, module: ModuleInstance) -> Self {
        ModuleEntry::Instance {
            name: name.into(),
            module,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ModuleEntry::Name(name) => name,
            ModuleEntry::Instance { name, .. } => name,
        }
    }

    pub(crate) fn validate(&self) -> LoaderResult<()> {
        validate_module_name(self.name())
    }
}

impl From<&str> for ModuleEntry {
    fn from(name: &str) -> Self {
        ModuleEntry::Name(name.to_string())
    }
}

impl From<String> for ModuleEntry {
    fn from(name: String) -> Self {
        ModuleEntry::Name(name)
    }
}

impl From<&String> for ModuleEntry {
    fn from(name: &String) -> Self {
        ModuleEntry::Name(name.clone())
    }
}

impl From<(&str, ModuleInstance)> for ModuleEntry {
    fn from((name, module): (&str, ModuleInstance)) -> Self {
        ModuleEntry::instance(name, module)
    }
}
