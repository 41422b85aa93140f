//! Site-specific software catalog: the list of reportable packages, the SQL
//! match rule for each, and the systems offered in the report form.
//!
//! Match rules are server-defined boolean expressions spliced into the usage
//! query's WHERE clause. They are looked up by package id and never taken
//! from request input.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDef {
    pub id: String,
    /// SQL boolean expression selecting jobs that used this package.
    /// When absent, the default script/software LIKE fallback applies.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteCatalog {
    /// Systems offered by the report form's chooser. Empty means the form
    /// falls back to a free-text input.
    #[serde(default)]
    pub systems: Vec<String>,
    pub packages: Vec<PackageDef>,
}

static DEFAULT_CATALOG: Lazy<SiteCatalog> = Lazy::new(|| SiteCatalog {
    systems: Vec::new(),
    packages: [
        "abaqus", "amber", "ansys", "charmm", "fluent", "gaussian", "gromacs",
        "lammps", "matlab", "namd", "nwchem", "vasp",
    ]
    .iter()
    .map(|id| PackageDef {
        id: (*id).to_string(),
        filter: None,
    })
    .collect(),
});

impl Default for SiteCatalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}

impl SiteCatalog {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let catalog: SiteCatalog = serde_yaml::from_str(text)?;
        if catalog.packages.is_empty() {
            anyhow::bail!("site catalog defines no packages");
        }
        Ok(catalog)
    }

    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("failed to read site file {}: {}", p, e))?;
                Self::from_yaml(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.packages.iter().any(|p| p.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.id.as_str())
    }

    /// Resolve the WHERE-clause fragment for a known package id.
    /// Falls back to matching the job script or recorded software field.
    pub fn filter_for(&self, id: &str) -> Option<String> {
        let pkg = self.packages.iter().find(|p| p.id == id)?;
        Some(match &pkg.filter {
            Some(f) => f.clone(),
            None => format!("script LIKE '%{id}%' OR software LIKE '%{id}%'"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_packages() {
        let catalog = SiteCatalog::default();
        assert!(catalog.contains("gaussian"));
        assert!(!catalog.contains("not-a-package"));
    }

    #[test]
    fn fallback_filter_matches_script_and_software() {
        let catalog = SiteCatalog::default();
        let filter = catalog.filter_for("matlab").unwrap();
        assert_eq!(
            filter,
            "script LIKE '%matlab%' OR software LIKE '%matlab%'"
        );
    }

    #[test]
    fn configured_filter_wins_over_fallback() {
        let yaml = r#"
systems: ["glenn", "opt"]
packages:
  - id: gaussian
    filter: "software LIKE 'g03%' OR software LIKE 'g09%'"
  - id: amber
"#;
        let catalog = SiteCatalog::from_yaml(yaml).unwrap();
        assert_eq!(
            catalog.filter_for("gaussian").unwrap(),
            "software LIKE 'g03%' OR software LIKE 'g09%'"
        );
        assert_eq!(
            catalog.filter_for("amber").unwrap(),
            "script LIKE '%amber%' OR software LIKE '%amber%'"
        );
        assert_eq!(catalog.systems, vec!["glenn", "opt"]);
    }

    #[test]
    fn unknown_id_resolves_to_none() {
        let catalog = SiteCatalog::default();
        assert!(catalog.filter_for("'; DROP TABLE jobs; --").is_none());
    }

    #[test]
    fn empty_package_list_is_rejected() {
        assert!(SiteCatalog::from_yaml("systems: []\npackages: []\n").is_err());
    }
}
