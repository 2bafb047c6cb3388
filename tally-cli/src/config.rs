use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tally_core::{DEFAULT_TOP_N, NumberFormat, NumberLocale, ReportError};

/// Decimal places beyond this are rejected
const MAX_PRECISION: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub title: String,
    /// Line under the title. `None` means "Source: <input file name>".
    pub subtitle: Option<String>,
    pub top_n: usize,
    pub locale: NumberLocale,
    pub precision: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Sales Report".to_string(),
            subtitle: None,
            top_n: DEFAULT_TOP_N,
            locale: NumberLocale::En,
            precision: 2,
        }
    }
}

/// Command-line values that win over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub title: Option<String>,
    pub top_n: Option<usize>,
    pub locale: Option<NumberLocale>,
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
    }

    /// Defaults, then the optional file, then flags
    pub fn resolve(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut cfg = match file {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        cfg.apply(overrides);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(title) = overrides.title {
            self.title = title;
        }
        if let Some(top_n) = overrides.top_n {
            self.top_n = top_n;
        }
        if let Some(locale) = overrides.locale {
            self.locale = locale;
        }
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.top_n == 0 {
            return Err(ReportError::InvalidConfig("top_n must be at least 1".into()));
        }
        if self.precision > MAX_PRECISION {
            return Err(ReportError::InvalidConfig(format!(
                "precision must be at most {MAX_PRECISION}, got {}",
                self.precision
            )));
        }
        if self.title.trim().is_empty() {
            return Err(ReportError::InvalidConfig("title must not be blank".into()));
        }
        Ok(())
    }

    pub fn number_format(&self) -> NumberFormat {
        NumberFormat::new(self.locale, self.precision)
    }

    /// Subtitle to print, falling back to the input's file name
    pub fn subtitle_for(&self, input: &Path) -> String {
        match &self.subtitle {
            Some(s) => s.clone(),
            None => {
                let name = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| input.display().to_string());
                format!("Source: {name}")
            }
        }
    }
}
