//! WildTerra 2 material calculator
//!
//! Resolves how much of each base material is still needed to craft a target
//! from current stock, and expands the full crafting tree for inspection.

pub mod book;
pub mod calculator;
pub mod db;
pub mod error;
mod guard;
pub mod import;
pub mod models;
pub mod report;
pub mod tree;

pub use book::RecipeBook;
pub use calculator::{DeficitResolver, ProductionPlan, Resolution, resolve};
pub use error::{CraftError, Result};
pub use models::{Inventory, RawRecipeRow, Recipe, TraversalLimits, TreeEntry};
pub use tree::{Expansion, TreeExpander, expand};
