use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Query file format - simple list of search queries for a suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFile {
    /// Queries to evaluate, in order
    pub queries: Vec<String>,
}

impl QueryFile {
    pub fn new(queries: Vec<String>) -> Self {
        Self { queries }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(yaml: &str) -> Result<Self> {
        let query_file: QueryFile = serde_yaml::from_str(yaml)?;
        Ok(query_file)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Queries with surrounding whitespace removed and blanks dropped
    pub fn into_queries(self) -> Vec<String> {
        self.queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect()
    }
}
