//! Knowledge nuggets and the knowledge base that holds them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::checklist::clamp_unit;

/// Unique token identifying a nugget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NuggetId(String);

impl NuggetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier (`k` + 12 hex chars).
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("k{}", &raw[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NuggetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NuggetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A discrete, sourced fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNugget {
    pub nugget_id: NuggetId,
    pub content: String,
    pub source_url: String,
    /// Always within [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub conflicts_with: BTreeSet<NuggetId>,
}

impl KnowledgeNugget {
    pub fn new(
        nugget_id: impl Into<NuggetId>,
        content: impl Into<String>,
        source_url: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            nugget_id: nugget_id.into(),
            content: content.into(),
            source_url: source_url.into(),
            confidence: clamp_unit(confidence),
            conflicts_with: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_conflicts<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<NuggetId>,
    {
        self.conflicts_with = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Overwrite the fields the update supplies; omitted fields are kept.
    pub(crate) fn apply(&mut self, update: &NuggetUpdate) {
        if let Some(content) = &update.content {
            self.content.clone_from(content);
        }
        if let Some(confidence) = update.confidence {
            self.confidence = clamp_unit(confidence);
        }
        if let Some(conflicts) = &update.conflicts_with {
            self.conflicts_with.clone_from(conflicts);
        }
    }
}

impl From<String> for NuggetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Partial update of an existing nugget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NuggetUpdate {
    pub nugget_id: NuggetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts_with: Option<BTreeSet<NuggetId>>,
}

impl NuggetUpdate {
    pub fn new(nugget_id: impl Into<NuggetId>) -> Self {
        Self {
            nugget_id: nugget_id.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn conflicts_with<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<NuggetId>,
    {
        self.conflicts_with = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

/// An empty conflict set means the unit said nothing about conflicts, so
/// existing links are kept.
impl From<&KnowledgeNugget> for NuggetUpdate {
    fn from(nugget: &KnowledgeNugget) -> Self {
        Self {
            nugget_id: nugget.nugget_id.clone(),
            content: Some(nugget.content.clone()),
            confidence: Some(nugget.confidence),
            conflicts_with: (!nugget.conflicts_with.is_empty())
                .then(|| nugget.conflicts_with.clone()),
        }
    }
}

/// One unit produced by knowledge extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExtractedNugget {
    /// A new fact
    New(KnowledgeNugget),
    /// A change to a fact already in the knowledge base
    Update(NuggetUpdate),
}

impl ExtractedNugget {
    pub fn nugget_id(&self) -> &NuggetId {
        match self {
            Self::New(nugget) => &nugget.nugget_id,
            Self::Update(update) => &update.nugget_id,
        }
    }
}

/// Ordered collection of nuggets keyed by id.
///
/// Nuggets keep their insertion order. There is no removal API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<KnowledgeNugget>", into = "Vec<KnowledgeNugget>")]
pub struct KnowledgeBase {
    nuggets: Vec<KnowledgeNugget>,
    index: HashMap<NuggetId, usize>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nuggets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nuggets.is_empty()
    }

    pub fn contains(&self, id: &NuggetId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &NuggetId) -> Option<&KnowledgeNugget> {
        self.index.get(id).map(|&i| &self.nuggets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeNugget> {
        self.nuggets.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NuggetId> {
        self.nuggets.iter().map(|n| &n.nugget_id)
    }

    /// Insert a nugget whose id is not present yet. Returns false if it is.
    pub(crate) fn insert(&mut self, nugget: KnowledgeNugget) -> bool {
        if self.index.contains_key(&nugget.nugget_id) {
            return false;
        }
        self.index.insert(nugget.nugget_id.clone(), self.nuggets.len());
        self.nuggets.push(nugget);
        true
    }

    /// Apply a partial update to an existing nugget. Returns false for unknown ids.
    pub(crate) fn update(&mut self, update: &NuggetUpdate) -> bool {
        match self.index.get(&update.nugget_id) {
            Some(&i) => {
                self.nuggets[i].apply(update);
                true
            }
            None => false,
        }
    }

    /// Nuggets that declare at least one conflict.
    pub fn conflicted(&self) -> impl Iterator<Item = &KnowledgeNugget> {
        self.nuggets.iter().filter(|n| !n.conflicts_with.is_empty())
    }

    /// JSON rendering used when the knowledge base is handed to a model.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.nuggets).unwrap_or_else(|_| "[]".to_string())
    }
}

impl PartialEq for KnowledgeBase {
    fn eq(&self, other: &Self) -> bool {
        self.nuggets == other.nuggets
    }
}

impl From<Vec<KnowledgeNugget>> for KnowledgeBase {
    fn from(nuggets: Vec<KnowledgeNugget>) -> Self {
        let mut kb = Self::new();
        for nugget in nuggets {
            if !kb.insert(nugget.clone()) {
                kb.update(&NuggetUpdate::from(&nugget));
            }
        }
        kb
    }
}

impl From<KnowledgeBase> for Vec<KnowledgeNugget> {
    fn from(kb: KnowledgeBase) -> Self {
        kb.nuggets
    }
}
