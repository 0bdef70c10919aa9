use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing identity role, duplicate attribute, etc.).
    ConfigValidation(String),
    /// A dataset handed to the engine has no records.
    EmptyDataset { dataset: String },
    /// Missing required column in input data.
    MissingColumn { dataset: String, column: String },
    /// Duplicate identity keys under `duplicates = "reject"`.
    DuplicateKeys { dataset: String, keys: Vec<String> },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EmptyDataset { dataset } => {
                write!(f, "dataset '{dataset}' contains no records")
            }
            Self::MissingColumn { dataset, column } => {
                write!(f, "dataset '{dataset}': missing required column '{column}'")
            }
            Self::DuplicateKeys { dataset, keys } => {
                const SHOWN: usize = 5;
                let preview: Vec<&str> = keys.iter().take(SHOWN).map(String::as_str).collect();
                write!(
                    f,
                    "dataset '{dataset}': {} duplicate identity key(s): {}",
                    keys.len(),
                    preview.join(", ")
                )?;
                if keys.len() > SHOWN {
                    write!(f, ", ...")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ReconError {}
