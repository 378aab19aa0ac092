//! The rule index.
//!
//! # Design Decisions
//! - A [`RuleIndex`] is immutable; every change builds a new one
//! - [`RuleRepository`] publishes snapshots with a single atomic swap, so a
//!   reader holds either the old or the new index, never a mix
//! - Lookups never take a lock
//! - Rules are kept in precedence order; the first match wins

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Method;

use crate::error::PipelineError;
use crate::rules::rule::Rule;

/// All rules contributed by one provider at one point in time.
#[derive(Debug, Clone)]
pub struct RuleSet {
    provider: String,
    version: String,
    rules: Vec<Arc<Rule>>,
}

impl RuleSet {
    pub fn new(provider: impl Into<String>, version: impl Into<String>, rules: Vec<Arc<Rule>>) -> Self {
        Self {
            provider: provider.into(),
            version: version.into(),
            rules,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Immutable snapshot of every provider's rules.
#[derive(Debug, Default)]
pub struct RuleIndex {
    sets: BTreeMap<String, Arc<RuleSet>>,
    ordered: Vec<Arc<Rule>>,
}

impl RuleIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_sets(sets: BTreeMap<String, Arc<RuleSet>>) -> Self {
        let mut ordered: Vec<Arc<Rule>> = sets
            .values()
            .flat_map(|set| set.rules.iter().cloned())
            .collect();

        // Most specific first, then explicit methods, provider name, position.
        ordered.sort_by_cached_key(|rule| {
            (
                Reverse(rule.specificity()),
                rule.methods().is_empty(),
                rule.provider().to_string(),
                rule.position(),
            )
        });

        Self { sets, ordered }
    }

    /// A new index with `set` replacing its provider's previous contribution.
    pub fn with_rule_set(&self, set: RuleSet) -> Self {
        let mut sets = self.sets.clone();
        sets.insert(set.provider.clone(), Arc::new(set));
        Self::from_sets(sets)
    }

    /// A new index without any rule of `provider`.
    pub fn without_provider(&self, provider: &str) -> Self {
        let mut sets = self.sets.clone();
        sets.remove(provider);
        Self::from_sets(sets)
    }

    /// The highest-precedence rule matching the request.
    pub fn find(&self, method: &Method, path: &str) -> Option<&Arc<Rule>> {
        self.ordered.iter().find(|rule| rule.matches(method, path))
    }

    pub fn rule_set(&self, provider: &str) -> Option<&Arc<RuleSet>> {
        self.sets.get(provider)
    }

    pub fn rule_sets(&self) -> impl Iterator<Item = &Arc<RuleSet>> {
        self.sets.values()
    }

    /// All rules in precedence order.
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.ordered
    }

    pub fn rule_count(&self) -> usize {
        self.ordered.len()
    }
}

/// Holder of the current [`RuleIndex`].
///
/// The reconciler is the only writer; request handlers read.
#[derive(Debug)]
pub struct RuleRepository {
    current: ArcSwap<RuleIndex>,
}

impl RuleRepository {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RuleIndex::empty()),
        }
    }

    /// The current snapshot; stays valid however many swaps follow.
    pub fn snapshot(&self) -> Arc<RuleIndex> {
        self.current.load_full()
    }

    pub(crate) fn publish(&self, index: RuleIndex) {
        self.current.store(Arc::new(index));
    }

    pub fn find_rule(&self, method: &Method, path: &str) -> Result<Arc<Rule>, PipelineError> {
        self.current
            .load()
            .find(method, path)
            .cloned()
            .ok_or_else(|| PipelineError::NoRuleMatched {
                method: method.to_string(),
                path: path.to_string(),
            })
    }
}

impl Default for RuleRepository {
    fn default() -> Self {
        Self::new()
    }
}
