use std::fmt;

use serde::Serialize;

/// Schema-qualified warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    /// Identifiers are folded to lowercase. Redshift folds even quoted names
    /// unless `enable_case_sensitive_identifier` is on, and the catalog lookup
    /// in `table_exists` compares against the folded form.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into().to_lowercase(),
            name: name.into().to_lowercase(),
        }
    }

    /// Both parts double-quoted, so schema names starting with a digit stay valid.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.schema.trim().is_empty() {
            return Err("schema name is empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("table name is empty".to_string());
        }
        // Redshift identifiers are capped at 127 bytes
        if self.schema.len() > 127 || self.name.len() > 127 {
            return Err(format!("identifier too long: {}", self.qualified()));
        }
        if self.schema.contains('\0') || self.name.contains('\0') {
            return Err("identifier contains a NUL byte".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
