//! Immutable recipe index keyed by product name

use std::collections::HashMap;

use tracing::debug;

use crate::error::{CraftError, Result};
use crate::models::{RawRecipeRow, Recipe};

/// Product name to the ingredient lines required to craft it.
///
/// Every line registered under a product is needed at the same time; they are
/// not alternatives. Anything without lines is a base material.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: HashMap<String, Vec<Recipe>>,
    products: Vec<String>, // first-seen order
}

impl RecipeBook {
    /// Build a book from loader rows.
    ///
    /// Names are trimmed. Rows missing a product or ingredient are placeholder
    /// data and are dropped. Lines for one product keep their input order.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawRecipeRow>,
    {
        let mut book = RecipeBook::default();
        let mut discarded = 0usize;

        for (row_idx, row) in rows.into_iter().enumerate() {
            let product = row.product.trim();
            let ingredient = row.ingredient.trim();
            if product.is_empty() || ingredient.is_empty() {
                discarded += 1;
                continue;
            }

            let consume_per_batch = parse_quantity(row_idx, "consume-per-batch", &row.consume_per_batch)?;
            let produce_per_batch = parse_quantity(row_idx, "produce-per-batch", &row.produce_per_batch)?;

            if consume_per_batch < 0.0 {
                return Err(CraftError::Data {
                    row: row_idx,
                    message: format!("consume-per-batch must not be negative, got {}", consume_per_batch),
                });
            }
            if produce_per_batch <= 0.0 {
                return Err(CraftError::Data {
                    row: row_idx,
                    message: format!("produce-per-batch must be positive, got {}", produce_per_batch),
                });
            }

            let recipe = Recipe {
                ingredient: ingredient.to_string(),
                consume_per_batch,
                produce_per_batch,
            };
            match book.recipes.get_mut(product) {
                Some(lines) => lines.push(recipe),
                None => {
                    book.products.push(product.to_string());
                    book.recipes.insert(product.to_string(), vec![recipe]);
                }
            }
        }

        debug!(
            products = book.products.len(),
            discarded, "recipe book built"
        );
        Ok(book)
    }

    /// Lines registered under `product`; empty for base materials
    pub fn recipes_for(&self, product: &str) -> &[Recipe] {
        self.recipes
            .get(product.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_base_material(&self, name: &str) -> bool {
        self.recipes_for(name).is_empty()
    }

    /// Craftable products in the order they first appeared
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

fn parse_quantity(row: usize, field: &str, raw: &str) -> Result<f64> {
    let value = raw.trim().parse::<f64>().map_err(|_| CraftError::Data {
        row,
        message: format!("{} '{}' is not a number", field, raw.trim()),
    })?;
    if !value.is_finite() {
        return Err(CraftError::Data {
            row,
            message: format!("{} '{}' is not a finite number", field, raw.trim()),
        });
    }
    Ok(value)
}
