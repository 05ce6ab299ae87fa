//! Inventory-agnostic expansion of the crafting tree

use crate::book::RecipeBook;
use crate::error::Result;
use crate::guard::PathGuard;
use crate::models::{TraversalLimits, TreeEntry};

/// Lazy pre-order walk over the recipe graph below one target.
///
/// Yields the target at depth 0, then each ingredient subtree in book order.
/// Once a guard trips, the error is yielded and the walk ends.
#[derive(Debug, Clone)]
pub struct Expansion<'a> {
    book: &'a RecipeBook,
    stack: Vec<(usize, &'a str, f64)>,
    guard: PathGuard<'a>,
    failed: bool,
}

impl<'a> Expansion<'a> {
    /// `target` is trimmed, matching how the book stores names
    pub fn new(book: &'a RecipeBook, target: &'a str, amount: f64, limits: TraversalLimits) -> Self {
        Self {
            book,
            stack: vec![(0, target.trim(), amount)],
            guard: PathGuard::new(limits),
            failed: false,
        }
    }
}

impl Iterator for Expansion<'_> {
    type Item = Result<TreeEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let (depth, item, quantity) = self.stack.pop()?;

        if let Err(e) = self.guard.enter(item, depth) {
            self.failed = true;
            self.stack.clear();
            return Some(Err(e));
        }

        let book = self.book;
        for recipe in book.recipes_for(item).iter().rev() {
            self.stack.push((
                depth + 1,
                recipe.ingredient.as_str(),
                recipe.ingredient_demand(quantity),
            ));
        }

        Some(Ok(TreeEntry {
            depth,
            item: item.to_string(),
            quantity,
        }))
    }
}

/// Expands crafting trees without looking at stock
#[derive(Debug, Clone, Copy)]
pub struct TreeExpander<'a> {
    book: &'a RecipeBook,
    limits: TraversalLimits,
}

impl<'a> TreeExpander<'a> {
    pub fn new(book: &'a RecipeBook) -> Self {
        Self {
            book,
            limits: TraversalLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn expand(&self, target: &'a str, amount: f64) -> Expansion<'a> {
        Expansion::new(self.book, target, amount, self.limits)
    }

    /// Collect a full expansion, stopping at the first guard violation
    pub fn collect(&self, target: &'a str, amount: f64) -> Result<Vec<TreeEntry>> {
        self.expand(target, amount).collect()
    }
}

/// Unguarded expansion. Non-positive amounts are expanded like any other.
pub fn expand<'a>(book: &'a RecipeBook, target: &'a str, amount: f64) -> impl Iterator<Item = TreeEntry> + 'a {
    Expansion::new(book, target, amount, TraversalLimits::unguarded()).map_while(|entry| entry.ok())
}
