//! Process-wide converter cache.
//!
//! Converters are keyed by kind name. Each entry is a once-initialised cell,
//! so racing first uses of the same kind build the converter exactly once
//! and every caller receives the same shared instance. A failed build
//! leaves the cell empty and the next call tries again.

use crate::converter::XmlConverter;
use crate::definition::ConfigDefinition;
use crate::resolver::SchemaResolver;
use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use std::sync::Arc;
use tracing::{debug, info};
use xmlconf_xsd::SchemaError;

type ConverterCell = Arc<OnceCell<Arc<XmlConverter>>>;

/// Global cache shared by all callers in the process
static GLOBAL_CONVERTERS: Lazy<ConverterCache> = Lazy::new(ConverterCache::new);

#[derive(Debug, Default)]
pub struct ConverterCache {
    converters: DashMap<String, ConverterCell>,
}

impl ConverterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static ConverterCache {
        &GLOBAL_CONVERTERS
    }

    /// Get the converter for `definition.name`, building it on first use.
    pub fn get_or_init(
        &self,
        definition: &ConfigDefinition,
        resolver: &dyn SchemaResolver,
    ) -> Result<Arc<XmlConverter>, SchemaError> {
        // clone the cell out so the map shard is not locked while building
        let cell = self
            .converters
            .entry(definition.name.clone())
            .or_default()
            .value()
            .clone();

        cell.get_or_try_init(|| {
            debug!("building converter for kind '{}'", definition.name);
            XmlConverter::new(definition, resolver).map(Arc::new)
        })
        .cloned()
    }

    /// Already-built converter for `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<XmlConverter>> {
        self.converters
            .get(name)
            .and_then(|cell| cell.value().get().cloned())
    }

    /// Forget the converter for `name` so the next use rebuilds it.
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = self.converters.remove(name).is_some();
        if removed {
            info!("invalidated converter for kind '{name}'");
        }
        removed
    }

    /// Number of kinds with a built converter.
    pub fn len(&self) -> usize {
        self.converters
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticSchemaResolver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        targetNamespace="http://xmlns.opennms.org/xsd/config/tiny">
      <xs:element name="tiny">
        <xs:complexType><xs:attribute name="on" type="xs:boolean"/></xs:complexType>
      </xs:element>
    </xs:schema>"#;

    /// Counts how often the schema is loaded
    struct CountingResolver {
        inner: StaticSchemaResolver,
        loads: AtomicUsize,
    }

    impl SchemaResolver for CountingResolver {
        fn load(&self, resource: &str) -> Result<String, SchemaError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(resource)
        }
    }

    fn counting(xsd: Option<&str>) -> CountingResolver {
        let mut inner = StaticSchemaResolver::new();
        if let Some(xsd) = xsd {
            inner.insert("tiny.xsd", xsd);
        }
        CountingResolver {
            inner,
            loads: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_builds_once_and_shares() {
        let cache = ConverterCache::new();
        let resolver = counting(Some(XSD));
        let definition = ConfigDefinition::new("tiny", "tiny.xsd", "tiny");

        let first = cache.get_or_init(&definition, &resolver).unwrap();
        let second = cache.get_or_init(&definition, &resolver).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("tiny").is_some());
    }

    #[test]
    fn test_racing_first_use_builds_once() {
        let cache = ConverterCache::new();
        let resolver = counting(Some(XSD));
        let definition = ConfigDefinition::new("tiny", "tiny.xsd", "tiny");

        let converters: Vec<Arc<XmlConverter>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get_or_init(&definition, &resolver).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(resolver.loads.load(Ordering::SeqCst), 1);
        assert!(converters.iter().all(|c| Arc::ptr_eq(c, &converters[0])));
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = ConverterCache::new();
        let definition = ConfigDefinition::new("tiny", "tiny.xsd", "tiny");

        let missing = counting(None);
        assert!(matches!(
            cache.get_or_init(&definition, &missing),
            Err(SchemaError::ResourceNotFound { .. })
        ));
        assert!(cache.get("tiny").is_none());
        assert!(cache.is_empty());

        let present = counting(Some(XSD));
        assert!(cache.get_or_init(&definition, &present).is_ok());
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let cache = ConverterCache::new();
        let resolver = counting(Some(XSD));
        let definition = ConfigDefinition::new("tiny", "tiny.xsd", "tiny");

        let first = cache.get_or_init(&definition, &resolver).unwrap();
        assert!(cache.invalidate("tiny"));
        assert!(!cache.invalidate("tiny"));

        let second = cache.get_or_init(&definition, &resolver).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.loads.load(Ordering::SeqCst), 2);
    }
}
