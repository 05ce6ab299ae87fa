//! Inventory-aware material requirement calculation

use std::collections::BTreeMap;

use tracing::debug;

use crate::book::RecipeBook;
use crate::error::{CraftError, Result};
use crate::guard::PathGuard;
use crate::models::{Inventory, TraversalLimits};

/// Intermediate items that still have to be crafted, grouped by tree level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductionPlan {
    levels: BTreeMap<usize, BTreeMap<String, f64>>,
}

impl ProductionPlan {
    fn add(&mut self, depth: usize, item: &str, amount: f64) {
        *self
            .levels
            .entry(depth)
            .or_default()
            .entry(item.to_string())
            .or_insert(0.0) += amount;
    }

    pub fn level(&self, depth: usize) -> Option<&BTreeMap<String, f64>> {
        self.levels.get(&depth)
    }

    pub fn levels(&self) -> impl Iterator<Item = (usize, &BTreeMap<String, f64>)> {
        self.levels.iter().map(|(depth, items)| (*depth, items))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Result of one resolution run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Base material to quantity still to acquire
    pub deficits: BTreeMap<String, f64>,
    /// Stock left after everything usable was consumed
    pub remaining_inventory: Inventory,
    pub production: ProductionPlan,
}

struct Frame<'a> {
    item: &'a str,
    amount: f64,
    depth: usize,
}

/// Works out what must still be acquired to craft a target from current stock
#[derive(Debug, Clone, Copy)]
pub struct DeficitResolver<'a> {
    book: &'a RecipeBook,
    limits: TraversalLimits,
}

impl<'a> DeficitResolver<'a> {
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

    /// Resolve `amount` units of `target` against `inventory`.
    ///
    /// Stock is consumed before crafting at every level, depth-first in book
    /// order. The caller's inventory is left untouched; the consumed copy is
    /// returned in the resolution. `target` is trimmed, matching how the book
    /// stores names.
    ///
    /// Fails with [`CraftError::InvalidInput`] if `amount` is negative or not
    /// finite, and also if any inventory quantity is negative or not finite.
    /// Such stock is rejected up front rather than skipped.
    pub fn resolve(&self, target: &str, amount: f64, inventory: &Inventory) -> Result<Resolution> {
        let target = target.trim();
        validate_amount(amount)?;
        for (item, have) in inventory {
            if !have.is_finite() || *have < 0.0 {
                return Err(CraftError::InvalidInput(format!(
                    "inventory quantity for '{}' must be a non-negative number, got {}",
                    item, have
                )));
            }
        }

        debug!(item = target, amount, stocked = inventory.len(), "resolving deficits");

        let mut resolution = Resolution {
            remaining_inventory: inventory.clone(),
            ..Resolution::default()
        };
        let mut guard = PathGuard::new(self.limits);
        let mut stack = vec![Frame {
            item: target,
            amount,
            depth: 0,
        }];

        while let Some(Frame {
            item,
            mut amount,
            depth,
        }) = stack.pop()
        {
            guard.enter(item, depth)?;

            if let Some(have) = resolution.remaining_inventory.get_mut(item) {
                if *have > 0.0 {
                    let used = have.min(amount);
                    *have -= used;
                    amount -= used;
                }
            }

            if amount <= 0.0 {
                continue;
            }

            let recipes = self.book.recipes_for(item);
            if recipes.is_empty() {
                *resolution.deficits.entry(item.to_string()).or_insert(0.0) += amount;
                continue;
            }

            resolution.production.add(depth, item, amount);
            // reversed so the first line is popped first
            for recipe in recipes.iter().rev() {
                stack.push(Frame {
                    item: &recipe.ingredient,
                    amount: recipe.ingredient_demand(amount),
                    depth: depth + 1,
                });
            }
        }

        debug!(
            item = target,
            base_materials = resolution.deficits.len(),
            "deficits resolved"
        );
        Ok(resolution)
    }
}

/// Unguarded resolution, see [`DeficitResolver::resolve`]
pub fn resolve(
    book: &RecipeBook,
    target: &str,
    amount: f64,
    inventory: &Inventory,
) -> Result<Resolution> {
    DeficitResolver::new(book).resolve(target, amount, inventory)
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(CraftError::InvalidInput(format!(
            "requested amount must be a non-negative number, got {}",
            amount
        )));
    }
    Ok(())
}
