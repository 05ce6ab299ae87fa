//! Data models for recipes, stock and expansion output

use std::collections::BTreeMap;

/// Item name to quantity on hand
pub type Inventory = BTreeMap<String, f64>;

/// One recipe row as it comes out of a loader, before validation.
///
/// Names may carry surrounding whitespace and the numeric fields are kept as
/// text so that malformed sheets are reported when the book is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecipeRow {
    pub product: String,
    pub ingredient: String,
    pub consume_per_batch: String,
    pub produce_per_batch: String,
}

impl RawRecipeRow {
    pub fn new(
        product: impl Into<String>,
        ingredient: impl Into<String>,
        consume_per_batch: impl Into<String>,
        produce_per_batch: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            ingredient: ingredient.into(),
            consume_per_batch: consume_per_batch.into(),
            produce_per_batch: produce_per_batch.into(),
        }
    }
}

/// One batch of the owning product consumes `consume_per_batch` units of
/// `ingredient` and yields `produce_per_batch` units of the product.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub ingredient: String,
    pub consume_per_batch: f64,
    pub produce_per_batch: f64, // always > 0
}

impl Recipe {
    /// Ingredient demand induced by `amount` units of the product
    pub fn ingredient_demand(&self, amount: f64) -> f64 {
        (amount / self.produce_per_batch) * self.consume_per_batch
    }
}

/// A single line of a crafting tree expansion
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub depth: usize,
    pub item: String,
    pub quantity: f64,
}

/// Optional guards against runaway recursion through the recipe graph.
///
/// The default is unguarded: cyclic data recurses forever, as the spreadsheet
/// tool always did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Deepest level allowed, the target being level 0
    pub max_depth: Option<usize>,
    /// Fail when an item reappears among its own ancestors
    pub detect_cycles: bool,
}

impl TraversalLimits {
    pub fn unguarded() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_cycle_detection(mut self) -> Self {
        self.detect_cycles = true;
        self
    }

    pub fn is_guarded(&self) -> bool {
        self.max_depth.is_some() || self.detect_cycles
    }
}
