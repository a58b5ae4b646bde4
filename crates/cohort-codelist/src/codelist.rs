//! Codelists and their composition

use crate::code::{Code, CodingSystem};
use crate::error::{CodelistError, CodelistResult};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// How [`Codelist::combine_with`] resolves a code that carries different
/// categories in different inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Fail with [`CodelistError::ConflictingCategory`]
    #[default]
    Reject,
    /// Keep the category from the earliest input that categorises the code
    FirstWins,
    /// Keep the category from the latest input that categorises the code
    LastWins,
}

/// An immutable set of codes, each with an optional category
///
/// Entries are unique per (code, system) and keep the order in which they
/// were first seen, so iteration and output are deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    name: String,
    entries: IndexMap<Code, Option<String>>,
}

impl Codelist {
    /// Build a codelist from (code, category) entries
    ///
    /// Exact duplicates collapse into one entry. A code listed twice with
    /// different categories is a malformed entry.
    pub fn from_entries(
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (Code, Option<String>)>,
    ) -> CodelistResult<Self> {
        let name = name.into();
        let mut map: IndexMap<Code, Option<String>> = IndexMap::new();

        for (index, (code, category)) in entries.into_iter().enumerate() {
            insert_entry(&mut map, &name, index as u64 + 1, code, category)?;
        }

        Ok(Self { name, entries: map })
    }

    /// Assemble a codelist from entries already checked by [`insert_entry`]
    pub(crate) fn from_checked(name: impl Into<String>, entries: IndexMap<Code, Option<String>>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Build an uncategorised codelist from bare code values in one system
    pub fn from_codes<S: Into<String>>(
        name: impl Into<String>,
        system: CodingSystem,
        codes: impl IntoIterator<Item = S>,
    ) -> CodelistResult<Self> {
        Self::from_entries(
            name,
            codes
                .into_iter()
                .map(|code| (Code::new(system.clone(), code), None)),
        )
    }

    /// Name of this codelist
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the same entries under a new name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check membership by (code, system)
    pub fn contains(&self, code: &Code) -> bool {
        self.entries.contains_key(code)
    }

    /// Category of a member code, `None` if the code is absent or uncategorised
    pub fn category(&self, code: &Code) -> Option<&str> {
        self.entries.get(code).and_then(|c| c.as_deref())
    }

    /// True if any entry carries a category
    pub fn is_categorised(&self) -> bool {
        self.entries.values().any(Option::is_some)
    }

    /// Distinct category labels in first-seen order
    pub fn categories(&self) -> IndexSet<&str> {
        self.entries
            .values()
            .filter_map(|c| c.as_deref())
            .collect()
    }

    /// Distinct coding systems in first-seen order
    pub fn systems(&self) -> IndexSet<&CodingSystem> {
        self.entries.keys().map(|c| &c.system).collect()
    }

    /// Iterate over entries in order
    pub fn iter(&self) -> impl Iterator<Item = (&Code, Option<&str>)> {
        self.entries.iter().map(|(code, cat)| (code, cat.as_deref()))
    }

    /// De-duplicated union over (code, system)
    ///
    /// Fails if the same code carries two different categories; use
    /// [`Codelist::combine_with`] to pick a winner explicitly.
    pub fn combine(name: impl Into<String>, lists: &[&Codelist]) -> CodelistResult<Codelist> {
        Self::combine_with(name, lists, ConflictPolicy::Reject)
    }

    /// De-duplicated union with an explicit category conflict policy
    ///
    /// A code that is categorised in one input and uncategorised in another
    /// keeps its category; that is not a conflict.
    pub fn combine_with(
        name: impl Into<String>,
        lists: &[&Codelist],
        policy: ConflictPolicy,
    ) -> CodelistResult<Codelist> {
        let mut entries: IndexMap<Code, Option<String>> = IndexMap::new();

        for list in lists {
            for (code, category) in &list.entries {
                let existing = match entries.entry(code.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(category.clone());
                        continue;
                    }
                    Entry::Occupied(slot) => slot.into_mut(),
                };
                let replace = match (existing.as_deref(), category.as_deref()) {
                    (None, Some(_)) => true,
                    (Some(first), Some(second)) if first != second => match policy {
                        ConflictPolicy::Reject => {
                            return Err(CodelistError::ConflictingCategory {
                                code: code.to_string(),
                                first: first.to_string(),
                                second: second.to_string(),
                            });
                        }
                        ConflictPolicy::FirstWins => false,
                        ConflictPolicy::LastWins => true,
                    },
                    _ => false,
                };
                if replace {
                    *existing = category.clone();
                }
            }
        }

        Ok(Codelist {
            name: name.into(),
            entries,
        })
    }

    /// Subset of entries whose category is one of `categories`
    ///
    /// Every requested label must occur in this list.
    pub fn filter_by_category(&self, categories: &[&str]) -> CodelistResult<Codelist> {
        let known = self.categories();
        if let Some(missing) = categories.iter().find(|c| !known.contains(*c)) {
            return Err(CodelistError::unknown_category(&self.name, *missing));
        }

        let entries = self
            .entries
            .iter()
            .filter(|(_, cat)| cat.as_deref().is_some_and(|c| categories.contains(&c)))
            .map(|(code, cat)| (code.clone(), cat.clone()))
            .collect();

        Ok(Codelist {
            name: format!("{}[{}]", self.name, categories.join(",")),
            entries,
        })
    }
}

/// Insert one entry, collapsing exact duplicates
///
/// `line` is reported in the error when the code is empty or already present
/// with a different category.
pub(crate) fn insert_entry(
    map: &mut IndexMap<Code, Option<String>>,
    origin: &str,
    line: u64,
    code: Code,
    category: Option<String>,
) -> CodelistResult<()> {
    if code.code.trim().is_empty() {
        return Err(CodelistError::malformed(origin, line, "row has no code"));
    }
    match map.entry(code) {
        Entry::Occupied(existing) if *existing.get() != category => Err(CodelistError::malformed(
            origin,
            line,
            format!(
                "code {} listed with categories {:?} and {:?}",
                existing.key(),
                existing.get(),
                category
            ),
        )),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(slot) => {
            slot.insert(category);
            Ok(())
        }
    }
}
