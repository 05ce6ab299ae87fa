//! Text and JSON presentation of calculation results

use std::collections::BTreeMap;

use serde::Serialize;

use crate::calculator::Resolution;
use crate::models::{Inventory, TreeEntry};

const TREE_INDENT: &str = "      ";
pub const FULLY_COVERED: &str = "✅ Inventory fully covers the request.";

/// Format a tree expansion, one indented line per entry
pub fn format_tree<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = &'a TreeEntry>,
{
    let mut output = String::new();
    for entry in entries {
        output.push_str(&format!(
            "{}[L{}] {} × {:.2}\n",
            TREE_INDENT.repeat(entry.depth),
            entry.depth,
            entry.item,
            entry.quantity
        ));
    }
    output
}

/// Bullet list of base materials still to acquire
pub fn format_materials(deficits: &BTreeMap<String, f64>) -> String {
    if deficits.is_empty() {
        return FULLY_COVERED.to_string();
    }

    let mut output = String::new();
    for (name, qty) in deficits {
        output.push_str(&format!("• {}: {:.2}\n", name, qty));
    }
    output
}

/// Summary of a calculation
#[derive(Debug)]
pub struct CalculationSummary {
    pub target: String,
    pub amount: f64,
    pub base_materials: Vec<(String, f64)>,
    pub production: Vec<(usize, Vec<(String, f64)>)>,
    /// (item, before, after) for every stock entry that was drawn on
    pub consumed: Vec<(String, f64, f64)>,
}

pub fn summarize(target: &str, amount: f64, inventory: &Inventory, resolution: &Resolution) -> CalculationSummary {
    let consumed = resolution
        .remaining_inventory
        .iter()
        .filter_map(|(item, after)| {
            let before = inventory.get(item).copied().unwrap_or(0.0);
            (before != *after).then(|| (item.clone(), before, *after))
        })
        .collect();

    CalculationSummary {
        target: target.to_string(),
        amount,
        base_materials: resolution
            .deficits
            .iter()
            .map(|(name, qty)| (name.clone(), *qty))
            .collect(),
        production: resolution
            .production
            .levels()
            .map(|(depth, items)| {
                (
                    depth,
                    items.iter().map(|(name, qty)| (name.clone(), *qty)).collect(),
                )
            })
            .collect(),
        consumed,
    }
}

impl std::fmt::Display for CalculationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Material Summary ===")?;
        writeln!(f, "Target: {} x {}", self.target, self.amount)?;
        writeln!(f)?;

        writeln!(f, "Base materials to acquire:")?;
        if self.base_materials.is_empty() {
            writeln!(f, "  {}", FULLY_COVERED)?;
        }
        for (name, qty) in &self.base_materials {
            writeln!(f, "  {}: {:.2}", name, qty)?;
        }

        if !self.production.is_empty() {
            writeln!(f)?;
            writeln!(f, "Crafting tasks:")?;
            for (depth, items) in &self.production {
                writeln!(f, "  --- Level {} (L{}) ---", depth, depth)?;
                for (name, qty) in items {
                    writeln!(f, "    {}: {:.2}", name, qty)?;
                }
            }
        }

        if !self.consumed.is_empty() {
            writeln!(f)?;
            writeln!(f, "Inventory used:")?;
            for (name, before, after) in &self.consumed {
                writeln!(f, "  {}: {:.2} -> {:.2}", name, before, after)?;
            }
        }

        Ok(())
    }
}

/// Payload printed by the `bridge` command for a GUI front end
#[derive(Debug, Serialize)]
pub struct BridgeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tree_view: String,
    pub base_materials: String,
    pub level_stats: BTreeMap<usize, BTreeMap<String, f64>>,
    pub deficits: BTreeMap<String, f64>,
    pub remaining_inventory: Inventory,
}

impl BridgeResponse {
    pub fn success(tree: &[TreeEntry], resolution: Resolution) -> Self {
        Self {
            success: true,
            error: None,
            tree_view: format_tree(tree),
            base_materials: format_materials(&resolution.deficits),
            level_stats: resolution
                .production
                .levels()
                .map(|(depth, items)| (depth, items.clone()))
                .collect(),
            deficits: resolution.deficits,
            remaining_inventory: resolution.remaining_inventory,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            tree_view: String::new(),
            base_materials: String::new(),
            level_stats: BTreeMap::new(),
            deficits: BTreeMap::new(),
            remaining_inventory: Inventory::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::RecipeBook;
    use crate::calculator::resolve;
    use crate::models::RawRecipeRow;
    use crate::tree::expand;

    fn wall_book() -> RecipeBook {
        RecipeBook::from_rows(vec![
            RawRecipeRow::new("Wall", "Plank", "4", "1"),
            RawRecipeRow::new("Plank", "Log", "2", "4"),
        ])
        .unwrap()
    }

    #[test]
    fn tree_lines_are_indented_by_level() {
        let book = wall_book();
        let entries: Vec<_> = expand(&book, "Wall", 1.0).collect();

        assert_eq!(
            format_tree(&entries),
            "[L0] Wall × 1.00\n      [L1] Plank × 4.00\n            [L2] Log × 2.00\n"
        );
    }

    #[test]
    fn material_list() {
        let mut deficits = BTreeMap::new();
        assert_eq!(format_materials(&deficits), FULLY_COVERED);

        deficits.insert("Log".to_string(), 2.5);
        deficits.insert("Iron Ore".to_string(), 1.0 / 3.0);
        assert_eq!(format_materials(&deficits), "• Iron Ore: 0.33\n• Log: 2.50\n");
    }

    #[test]
    fn summary_lists_only_changed_stock() {
        let book = wall_book();
        let inventory: Inventory = [("Plank".to_string(), 2.0), ("Stone".to_string(), 9.0)]
            .into_iter()
            .collect();
        let resolution = resolve(&book, "Wall", 1.0, &inventory).unwrap();
        let summary = summarize("Wall", 1.0, &inventory, &resolution);

        assert_eq!(summary.base_materials, vec![("Log".to_string(), 1.0)]);
        assert_eq!(summary.consumed, vec![("Plank".to_string(), 2.0, 0.0)]);
        assert_eq!(summary.production.len(), 2);

        let text = summary.to_string();
        assert!(text.contains("Log: 1.00"));
        assert!(text.contains("Level 1 (L1)"));
        assert!(!text.contains("Stone"));
    }

    #[test]
    fn bridge_payload_shape() {
        let book = wall_book();
        let tree: Vec<_> = expand(&book, "Wall", 1.0).collect();
        let resolution = resolve(&book, "Wall", 2.0, &Inventory::new()).unwrap();

        let json = serde_json::to_value(BridgeResponse::success(&tree, resolution)).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["deficits"]["Log"], 4.0);
        assert_eq!(json["level_stats"]["1"]["Plank"], 8.0);
        assert!(json["tree_view"].as_str().unwrap().starts_with("[L0] Wall"));

        let failed = serde_json::to_value(BridgeResponse::failure("bad amount")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "bad amount");
    }
}
