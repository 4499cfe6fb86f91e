//! Schema resource loading.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use xmlconf_xsd::SchemaError;

/// Turns a schema resource identifier into schema text.
pub trait SchemaResolver: Send + Sync {
    fn load(&self, resource: &str) -> Result<String, SchemaError>;
}

/// Reads schemas from files under a base directory.
#[derive(Debug, Clone)]
pub struct DirectorySchemaResolver {
    base: PathBuf,
}

impl DirectorySchemaResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl SchemaResolver for DirectorySchemaResolver {
    fn load(&self, resource: &str) -> Result<String, SchemaError> {
        let path = self.base.join(resource);
        debug!("loading schema {:?}", path);
        std::fs::read_to_string(&path).map_err(|source| SchemaError::ResourceNotFound {
            resource: path.display().to_string(),
            source,
        })
    }
}

/// Serves schemas registered in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaResolver {
    schemas: BTreeMap<String, String>,
}

impl StaticSchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, resource: impl Into<String>, xsd: impl Into<String>) -> Self {
        self.insert(resource, xsd);
        self
    }

    pub fn insert(&mut self, resource: impl Into<String>, xsd: impl Into<String>) {
        self.schemas.insert(resource.into(), xsd.into());
    }
}

impl SchemaResolver for StaticSchemaResolver {
    fn load(&self, resource: &str) -> Result<String, SchemaError> {
        self.schemas
            .get(resource)
            .cloned()
            .ok_or_else(|| SchemaError::ResourceNotFound {
                resource: resource.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "schema is not registered"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_resolver() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.xsd"), "<schema/>").unwrap();

        let resolver = DirectorySchemaResolver::new(dir.path());
        assert_eq!(resolver.load("a.xsd").unwrap(), "<schema/>");

        match resolver.load("missing.xsd") {
            Err(SchemaError::ResourceNotFound { resource, source }) => {
                assert!(resource.ends_with("missing.xsd"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected ResourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticSchemaResolver::new().with_schema("a.xsd", "<schema/>");
        assert_eq!(resolver.load("a.xsd").unwrap(), "<schema/>");
        assert!(matches!(
            resolver.load("b.xsd"),
            Err(SchemaError::ResourceNotFound { .. })
        ));
    }
}
