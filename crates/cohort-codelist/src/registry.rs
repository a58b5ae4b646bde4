//! Codelist registry
//!
//! The registry is the explicit namespace variable definitions resolve
//! codelist names against. It is assembled once through
//! [`CodelistRegistryBuilder`] and is read-only afterwards, so one instance
//! can be shared by reference across evaluation threads.

use crate::codelist::{Codelist, ConflictPolicy};
use crate::error::{CodelistError, CodelistResult};
use crate::source::{CodelistSource, load};
use indexmap::IndexMap;
use std::sync::Arc;

/// Read-only collection of named codelists
#[derive(Debug, Clone, Default)]
pub struct CodelistRegistry {
    lists: IndexMap<String, Arc<Codelist>>,
}

impl CodelistRegistry {
    /// Start building a registry
    pub fn builder() -> CodelistRegistryBuilder {
        CodelistRegistryBuilder::default()
    }

    /// Look up a codelist by name
    pub fn get(&self, name: &str) -> CodelistResult<&Codelist> {
        self.lists
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| CodelistError::unknown_codelist(name))
    }

    /// Look up a shared handle to a codelist by name
    pub fn get_shared(&self, name: &str) -> CodelistResult<Arc<Codelist>> {
        self.lists
            .get(name)
            .cloned()
            .ok_or_else(|| CodelistError::unknown_codelist(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Codelist)> {
        self.lists.iter().map(|(name, list)| (name.as_str(), list.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// Builder for [`CodelistRegistry`]
///
/// Every method registers exactly one new name and fails if the name is
/// taken or an input name is unknown.
#[derive(Debug, Default)]
pub struct CodelistRegistryBuilder {
    lists: IndexMap<String, Arc<Codelist>>,
}

impl CodelistRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a codelist from a delimited file
    pub fn load(&mut self, name: &str, source: &CodelistSource) -> CodelistResult<&mut Self> {
        self.ensure_vacant(name)?;
        let codelist = load(name, source)?;
        self.insert(codelist)
    }

    /// Register an already built codelist under its own name
    pub fn insert(&mut self, codelist: Codelist) -> CodelistResult<&mut Self> {
        self.ensure_vacant(codelist.name())?;
        self.lists
            .insert(codelist.name().to_string(), Arc::new(codelist));
        Ok(self)
    }

    /// Register the union of existing codelists
    pub fn combine(&mut self, name: &str, inputs: &[&str]) -> CodelistResult<&mut Self> {
        self.combine_with(name, inputs, ConflictPolicy::Reject)
    }

    /// Register the union of existing codelists with a conflict policy
    pub fn combine_with(
        &mut self,
        name: &str,
        inputs: &[&str],
        policy: ConflictPolicy,
    ) -> CodelistResult<&mut Self> {
        self.ensure_vacant(name)?;
        let lists = inputs
            .iter()
            .map(|input| self.lookup(input))
            .collect::<CodelistResult<Vec<_>>>()?;
        let refs: Vec<&Codelist> = lists.iter().map(Arc::as_ref).collect();
        let combined = Codelist::combine_with(name, &refs, policy)?;
        self.insert(combined)
    }

    /// Register the category-filtered subset of an existing codelist
    pub fn filter(
        &mut self,
        name: &str,
        input: &str,
        categories: &[&str],
    ) -> CodelistResult<&mut Self> {
        self.ensure_vacant(name)?;
        let filtered = self.lookup(input)?.filter_by_category(categories)?;
        self.insert(filtered.renamed(name))
    }

    /// Register a second name for an existing codelist
    pub fn alias(&mut self, name: &str, input: &str) -> CodelistResult<&mut Self> {
        self.ensure_vacant(name)?;
        let list = self.lookup(input)?;
        self.lists.insert(name.to_string(), list);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Freeze into a read-only registry
    pub fn build(self) -> CodelistRegistry {
        CodelistRegistry { lists: self.lists }
    }

    fn lookup(&self, name: &str) -> CodelistResult<Arc<Codelist>> {
        self.lists
            .get(name)
            .cloned()
            .ok_or_else(|| CodelistError::unknown_codelist(name))
    }

    fn ensure_vacant(&self, name: &str) -> CodelistResult<()> {
        if self.lists.contains_key(name) {
            return Err(CodelistError::duplicate_codelist(name));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Code, CodingSystem};

    fn builder_with_shielding() -> CodelistRegistryBuilder {
        let mut builder = CodelistRegistry::builder();
        builder
            .insert(Codelist::from_codes("shielding_codes", CodingSystem::Snomed, ["1300561000000107"]).unwrap())
            .unwrap()
            .insert(Codelist::from_codes("nonshield_codes", CodingSystem::Snomed, ["1300591000000101"]).unwrap())
            .unwrap();
        builder
    }

    #[test]
    fn test_combine_and_alias() {
        let mut builder = builder_with_shielding();
        builder
            .alias("high_risk_codes", "shielding_codes")
            .unwrap()
            .combine("any_risk_codes", &["shielding_codes", "nonshield_codes"])
            .unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("any_risk_codes").unwrap().len(), 2);
        assert!(
            registry
                .get("high_risk_codes")
                .unwrap()
                .contains(&Code::snomed("1300561000000107"))
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = builder_with_shielding();
        let err = builder.alias("shielding_codes", "nonshield_codes").unwrap_err();
        assert_eq!(err, CodelistError::duplicate_codelist("shielding_codes"));
    }

    #[test]
    fn test_unknown_input_rejected() {
        let mut builder = builder_with_shielding();
        let err = builder.combine("x", &["shielding_codes", "missing"]).unwrap_err();
        assert_eq!(err, CodelistError::unknown_codelist("missing"));
        assert!(!builder.contains("x"));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodelistRegistry>();
    }
}
