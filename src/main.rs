//! WildTerra 2 Material Calculator
//!
//! Works out the base materials still needed to craft an item from current stock.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bom_calculator::models::RawRecipeRow;
use bom_calculator::report::{self, BridgeResponse};
use bom_calculator::{DeficitResolver, Inventory, TraversalLimits, TreeExpander, db, import};

/// The tree view shows the chain for a single unit, like the workbook did
const TREE_PREVIEW_AMOUNT: f64 = 1.0;

#[derive(Parser)]
#[command(name = "bom-calculator")]
#[command(about = "Material requirements calculator for WildTerra 2 crafting recipes")]
struct Cli {
    /// Path to the SQLite recipe database
    #[arg(short, long, env = "BOM_DATABASE", default_value = "bom_data.db")]
    database: PathBuf,

    /// Fail once a recipe chain is deeper than this
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Fail when an item is needed, directly or indirectly, to craft itself
    #[arg(long, global = true)]
    detect_cycles: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import recipe sheets (CSV/TSV exported from the workbook)
    Import {
        /// Sheet file, or directory searched recursively
        path: PathBuf,

        /// Clear existing recipes before import
        #[arg(long)]
        clear: bool,
    },

    /// Calculate base materials still needed for a target item
    Calc {
        /// Item to craft
        item: String,

        /// Number of items wanted
        #[arg(short = 'n', long, default_value = "1.0")]
        amount: f64,

        /// Item on hand, as NAME=QTY (repeatable)
        #[arg(long = "have", value_parser = parse_stock)]
        stock: Vec<(String, f64)>,

        /// JSON file with an object of item name to quantity on hand
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// Also show the crafting tree
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the full crafting tree for an item, ignoring stock
    Tree {
        item: String,

        #[arg(short = 'n', long, default_value = "1.0")]
        amount: f64,
    },

    /// Machine-readable calculation for a GUI front end (JSON on stdout)
    Bridge {
        item: String,

        /// Number of items wanted
        amount: String,

        /// JSON object of item name to quantity on hand
        #[arg(default_value = "{}")]
        inventory: String,
    },

    /// List all craftable products
    ListProducts,

    /// Show the recipe lines for a product
    Recipe {
        name: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample recipes for testing (without a workbook export)
    LoadSample,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let limits = TraversalLimits {
        max_depth: cli.max_depth,
        detect_cycles: cli.detect_cycles,
    };
    if limits.is_guarded() {
        info!(max_depth = ?limits.max_depth, detect_cycles = limits.detect_cycles, "traversal guard enabled");
    }

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { path, clear } => {
            if clear {
                info!("Clearing existing recipes");
                db::clear_recipes(&conn)?;
            }

            let stats = import::import_to_database(&conn, &path)?;
            println!("{}", stats);
        }

        Commands::Calc {
            item,
            amount,
            stock,
            inventory,
            verbose,
        } => {
            let book = db::load_book(&conn)?;
            let item = item.trim();

            let mut on_hand = match inventory {
                Some(path) => read_inventory_file(&path)?,
                None => Inventory::new(),
            };
            on_hand.extend(stock);

            if verbose {
                let tree = TreeExpander::new(&book)
                    .with_limits(limits)
                    .collect(item, TREE_PREVIEW_AMOUNT)?;
                println!("Crafting tree (per unit):\n");
                println!("{}", report::format_tree(&tree));
            }

            let resolution = DeficitResolver::new(&book)
                .with_limits(limits)
                .resolve(item, amount, &on_hand)?;
            println!("{}", report::summarize(item, amount, &on_hand, &resolution));
        }

        Commands::Tree { item, amount } => {
            let book = db::load_book(&conn)?;
            let item = item.trim();

            for entry in TreeExpander::new(&book).with_limits(limits).expand(item, amount) {
                let entry = entry?;
                print!("{}", report::format_tree([&entry]));
            }
        }

        Commands::Bridge {
            item,
            amount,
            inventory,
        } => {
            let response = match bridge(&conn, item.trim(), &amount, &inventory, limits) {
                Ok(response) => response,
                Err(e) => BridgeResponse::failure(format!("{:#}", e)),
            };
            println!("{}", serde_json::to_string(&response)?);
        }

        Commands::ListProducts => {
            let products = db::list_products(&conn)?;
            if products.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("Craftable products:");
                for p in products {
                    println!("  {}", p);
                }
            }
        }

        Commands::Recipe { name } => {
            let book = db::load_book(&conn)?;
            let name = name.trim();

            if book.is_base_material(name) {
                println!("{} is a base material (no recipe)", name);
            } else {
                println!("{}:", name);
                println!("{:<30} {:>10} {:>10}", "Ingredient", "Consumes", "Produces");
                println!("{}", "-".repeat(52));
                for r in book.recipes_for(name) {
                    println!(
                        "{:<30} {:>10} {:>10}",
                        r.ingredient, r.consume_per_batch, r.produce_per_batch
                    );
                }
            }

            let used_by: Vec<&str> = book
                .products()
                .filter(|p| book.recipes_for(p).iter().any(|r| r.ingredient == name))
                .collect();
            if !used_by.is_empty() {
                println!("Used by:");
                for p in used_by {
                    println!("  {}", p);
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

fn bridge(
    conn: &Connection,
    item: &str,
    amount: &str,
    inventory: &str,
    limits: TraversalLimits,
) -> Result<BridgeResponse> {
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| anyhow!("amount '{}' is not a number", amount.trim()))?;
    let on_hand = parse_inventory_json(inventory)?;
    let book = db::load_book(conn)?;

    let tree = TreeExpander::new(&book)
        .with_limits(limits)
        .collect(item, TREE_PREVIEW_AMOUNT)?;
    let resolution = DeficitResolver::new(&book)
        .with_limits(limits)
        .resolve(item, amount, &on_hand)?;

    Ok(BridgeResponse::success(&tree, resolution))
}

fn parse_stock(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, qty) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=QTY, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing item name in '{}'", s));
    }
    let qty: f64 = qty
        .trim()
        .parse()
        .map_err(|_| format!("quantity '{}' is not a number", qty.trim()))?;
    Ok((name.to_string(), qty))
}

fn parse_inventory_json(json: &str) -> Result<Inventory> {
    let raw: Inventory = serde_json::from_str(json).context("Inventory must be a JSON object of name to quantity")?;
    Ok(raw
        .into_iter()
        .map(|(name, qty)| (name.trim().to_string(), qty))
        .filter(|(name, _)| !name.is_empty())
        .collect())
}

fn read_inventory_file(path: &Path) -> Result<Inventory> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_inventory_json(&json)
}

/// Load sample WildTerra 2 recipes for testing without a workbook export
fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_recipes(conn)?;

    let rows = [
        // product, ingredient, consumed per batch, produced per batch
        ("Half-Timbered Warehouse", "Plank", "40", "1"),
        ("Half-Timbered Warehouse", "Beam", "8", "1"),
        ("Half-Timbered Warehouse", "Nails", "60", "1"),
        ("Half-Timbered Warehouse", "Stone Block", "20", "1"),
        ("Plank", "Log", "2", "4"),
        ("Beam", "Log", "3", "1"),
        ("Beam", "Nails", "4", "1"),
        ("Nails", "Iron Ingot", "1", "10"),
        ("Iron Ingot", "Iron Ore", "2", "1"),
        ("Iron Ingot", "Charcoal", "1", "1"),
        ("Charcoal", "Log", "4", "2"),
        ("Bronze Ingot", "Copper Ore", "3", "1"),
        ("Bronze Ingot", "Tin Ore", "1", "1"),
        ("Stone Block", "Stone", "3", "1"),
    ];

    for (product, ingredient, consume, produce) in rows {
        db::insert_recipe_row(
            conn,
            &RawRecipeRow::new(product, ingredient, consume, produce),
            Some("sample"),
        )?;
    }

    println!("Loaded {} sample recipe rows", rows.len());
    Ok(())
}
