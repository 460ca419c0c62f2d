//! Model capability descriptors and file set location
//!
//! Per-model quirks live on a [`ModelDescriptor`] that is built once per
//! request. Where the files for a (model, experiment, variable) triple live is
//! answered by a [`FileSetLocator`]; `None` means the output does not exist.

use crate::errors::Result;
use crate::variables::Variable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A climate model and the quirks of its published output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Vertical coordinate is terrain-following sigma rather than depth
    #[serde(default)]
    pub uses_sigma_coordinates: bool,
    /// Variables whose stated units cannot be trusted for this model
    #[serde(default)]
    pub excluded_variables: BTreeSet<Variable>,
    /// Land is stored as literal zero even when a fill value is declared
    #[serde(default)]
    pub masked_as_zero_fill: bool,
}

impl ModelDescriptor {
    /// A model with no known quirks
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uses_sigma_coordinates: false,
            excluded_variables: BTreeSet::new(),
            masked_as_zero_fill: false,
        }
    }

    /// Build the descriptor for a model name from the built-in quirk table
    pub fn lookup(name: &str) -> Self {
        let mut model = Self::new(name);
        match name {
            "inmcm4" => model.uses_sigma_coordinates = true,
            // Evaporation claims kg/m^2/s but the magnitudes do not match
            "NorESM1-M" | "NorESM1-ME" => {
                model.excluded_variables.insert(Variable::Evspsbl);
            }
            _ => {}
        }
        model
    }

    #[must_use]
    pub fn with_sigma_coordinates(mut self, sigma: bool) -> Self {
        self.uses_sigma_coordinates = sigma;
        self
    }

    #[must_use]
    pub fn with_zero_fill(mut self, zero_fill: bool) -> Self {
        self.masked_as_zero_fill = zero_fill;
        self
    }

    #[must_use]
    pub fn excluding(mut self, variable: Variable) -> Self {
        self.excluded_variables.insert(variable);
        self
    }

    #[must_use]
    pub fn excludes(&self, variable: Variable) -> bool {
        self.excluded_variables.contains(&variable)
    }
}

/// Load model descriptors from a JSON array
///
/// Flags missing from an entry default to `false` / empty.
pub fn load_model_table(path: &Path) -> Result<Vec<ModelDescriptor>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Answers where the files for one model, experiment and variable live
pub trait FileSetLocator {
    /// Directory holding the files, or `None` when there is no such output
    fn locate(
        &self,
        model: &ModelDescriptor,
        experiment: &str,
        variable: Variable,
    ) -> Option<PathBuf>;
}

impl<F> FileSetLocator for F
where
    F: Fn(&ModelDescriptor, &str, Variable) -> Option<PathBuf>,
{
    fn locate(
        &self,
        model: &ModelDescriptor,
        experiment: &str,
        variable: Variable,
    ) -> Option<PathBuf> {
        self(model, experiment, variable)
    }
}

/// Locates directories by filling a `{model}/{experiment}/{variable}` style template
#[derive(Debug, Clone)]
pub struct PathTemplateLocator {
    root: PathBuf,
    template: String,
}

impl PathTemplateLocator {
    pub const DEFAULT_TEMPLATE: &'static str = "{model}/{experiment}/{variable}";

    pub fn new(root: impl Into<PathBuf>, template: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            template: template.into(),
        }
    }

    fn render(&self, model: &ModelDescriptor, experiment: &str, variable: Variable) -> PathBuf {
        let relative = self
            .template
            .replace("{model}", &model.name)
            .replace("{experiment}", experiment)
            .replace("{variable}", variable.name());
        self.root.join(relative)
    }
}

impl FileSetLocator for PathTemplateLocator {
    fn locate(
        &self,
        model: &ModelDescriptor,
        experiment: &str,
        variable: Variable,
    ) -> Option<PathBuf> {
        let dir = self.render(model, experiment, variable);
        dir.is_dir().then_some(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builtin_quirks() {
        assert!(ModelDescriptor::lookup("inmcm4").uses_sigma_coordinates);
        assert!(ModelDescriptor::lookup("NorESM1-ME").excludes(Variable::Evspsbl));
        assert!(!ModelDescriptor::lookup("NorESM1-ME").excludes(Variable::Pr));

        let plain = ModelDescriptor::lookup("ACCESS1-0");
        assert_eq!(plain, ModelDescriptor::new("ACCESS1-0"));
    }

    #[test]
    fn template_locator_requires_existing_directory() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let existing = temp_dir.path().join("CCSM4").join("historical").join("tas");
        fs::create_dir_all(&existing).unwrap();

        let locator = PathTemplateLocator::new(temp_dir.path(), PathTemplateLocator::DEFAULT_TEMPLATE);
        let model = ModelDescriptor::new("CCSM4");
        assert_eq!(locator.locate(&model, "historical", Variable::Tas), Some(existing));
        assert_eq!(locator.locate(&model, "historical", Variable::Pr), None);
    }

    #[test]
    fn model_table_defaults_missing_flags() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("models.json");
        fs::write(
            &path,
            r#"[{"name": "inmcm4", "uses_sigma_coordinates": true},
                {"name": "NorESM1-M", "excluded_variables": ["evspsbl"]}]"#,
        )
        .unwrap();

        let models = load_model_table(&path).unwrap();
        assert_eq!(models.len(), 2);
        assert!(models[0].uses_sigma_coordinates);
        assert!(!models[0].masked_as_zero_fill);
        assert!(models[1].excludes(Variable::Evspsbl));
    }
}
