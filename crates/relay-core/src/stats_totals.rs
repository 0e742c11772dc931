//! Folds Mailgun's time-bucketed stat records into flat per-category totals.

use serde_json::{Map, Value};


const TIME_FIELD: &str = "time";
const FAILED_FIELD: &str = "failed";
const TEMPORARY_CATEGORY: &str = "temporary";
const PERMANENT_CATEGORY: &str = "permanent";

/// One provider time bucket: a `time` field plus category objects mapping
/// sub-keys (delivery types, reason codes) to integer counts. Relies on
/// serde_json's `preserve_order` feature so the map iterates in wire order.
pub type StatRecord = Map<String, Value>;

/// Cumulative counts for one category, sub-keys in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotals {
    name: String,
    counts: Vec<(String, i64)>,
}

impl CategoryTotals {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn counts(&self) -> impl Iterator<Item = (&str, i64)> {
        self.counts.iter().map(|(sub_key, count)| (sub_key.as_str(), *count))
    }
}

/// Aggregated per-category totals, categories in first-seen order across the
/// input records. Vectors rather than maps so iteration order is exactly the
/// order categories and sub-keys were first encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatTotals {
    categories: Vec<CategoryTotals>,
}

impl StatTotals {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryTotals> {
        self.categories.iter()
    }

    pub fn count(&self, category: &str, sub_key: &str) -> Option<i64> {
        self.categories
            .iter()
            .find(|totals| totals.name == category)?
            .counts
            .iter()
            .find(|(key, _)| key == sub_key)
            .map(|(_, count)| *count)
    }

    fn category_index(&mut self, name: &str) -> usize {
        match self.categories.iter().position(|totals| totals.name == name) {
            Some(index) => index,
            None => {
                self.categories.push(CategoryTotals {
                    name: name.to_string(),
                    counts: Vec::new(),
                });
                self.categories.len() - 1
            }
        }
    }

    /// Adds every integer sub-key count in `fields` to the named category,
    /// creating category and sub-key entries on first sight. Non-integer
    /// values are skipped rather than rejected; well-formed provider payloads
    /// never contain them.
    fn merge_category(&mut self, name: &str, fields: &Map<String, Value>) {
        let index = self.category_index(name);
        let category = &mut self.categories[index];
        for (sub_key, value) in fields {
            let Some(count) = value.as_i64() else {
                continue;
            };
            match category.counts.iter_mut().find(|(key, _)| key == sub_key) {
                Some((_, existing)) => *existing += count,
                None => category.counts.push((sub_key.clone(), count)),
            }
        }
    }
}

/// Reduces a sequence of stat records into one [`StatTotals`].
///
/// The `time` field of each record is skipped. The `failed` category is
/// special: its `temporary` and `permanent` sub-objects are promoted to
/// top-level categories alongside the ordinary ones, and a `failed` category
/// never appears in the output. Counts combine by integer addition, so input
/// order affects only category ordering, never the totals themselves.
pub fn aggregate_stat_totals(records: &[StatRecord]) -> StatTotals {
    let mut totals = StatTotals::default();
    for record in records {
        for (field, value) in record {
            if field == TIME_FIELD {
                continue;
            }
            if field == FAILED_FIELD {
                for promoted in [TEMPORARY_CATEGORY, PERMANENT_CATEGORY] {
                    match value.get(promoted).and_then(Value::as_object) {
                        Some(fields) => totals.merge_category(promoted, fields),
                        // Promoted categories exist whenever `failed` does,
                        // even when the sub-object is missing or malformed.
                        None => {
                            totals.category_index(promoted);
                        }
                    }
                }
            } else {
                match value.as_object() {
                    Some(fields) => totals.merge_category(field, fields),
                    None => {
                        totals.category_index(field);
                    }
                }
            }
        }
    }
    totals
}
