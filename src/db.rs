//! Database schema and operations

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::book::RecipeBook;
use crate::models::RawRecipeRow;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Recipe rows exactly as imported; quantities stay text until a book is built
        CREATE TABLE IF NOT EXISTS recipe_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product TEXT NOT NULL,
            ingredient TEXT NOT NULL,
            consume_per_batch TEXT NOT NULL,
            produce_per_batch TEXT NOT NULL,
            source TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_rows_product ON recipe_rows(product);
        "#,
    )?;
    Ok(())
}

/// Append a recipe row; `source` names the sheet it came from
pub fn insert_recipe_row(conn: &Connection, row: &RawRecipeRow, source: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO recipe_rows (product, ingredient, consume_per_batch, produce_per_batch, source)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &row.product,
            &row.ingredient,
            &row.consume_per_batch,
            &row.produce_per_batch,
            source,
        ),
    )?;
    Ok(())
}

/// Remove all recipe rows (for re-import)
pub fn clear_recipes(conn: &Connection) -> Result<()> {
    conn.execute_batch("DELETE FROM recipe_rows;")?;
    Ok(())
}

/// All rows in insertion order
pub fn load_rows(conn: &Connection) -> Result<Vec<RawRecipeRow>> {
    let mut stmt = conn.prepare(
        "SELECT product, ingredient, consume_per_batch, produce_per_batch
         FROM recipe_rows
         ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(RawRecipeRow {
            product: row.get(0)?,
            ingredient: row.get(1)?,
            consume_per_batch: row.get(2)?,
            produce_per_batch: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Build a recipe book from everything stored
pub fn load_book(conn: &Connection) -> Result<RecipeBook> {
    let rows = load_rows(conn)?;
    debug!(rows = rows.len(), "loaded recipe rows");
    RecipeBook::from_rows(rows).context("Stored recipe data is invalid")
}

/// List all distinct craftable products, named as the recipe book names them
pub fn list_products(conn: &Connection) -> Result<Vec<String>> {
    let book = load_book(conn)?;
    let mut products: Vec<String> = book.products().map(str::to_string).collect();
    products.sort();
    Ok(products)
}

pub fn count_rows(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipe_rows", [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn rows_come_back_in_insertion_order() {
        let conn = memory_db();
        let rows = vec![
            RawRecipeRow::new("Wall", "Plank", "4", "1"),
            RawRecipeRow::new(" Plank ", "Log", "2", "4"),
            RawRecipeRow::new("Wall", "Nails", "8", "1"),
        ];
        for row in &rows {
            insert_recipe_row(&conn, row, Some("test.csv")).unwrap();
        }

        assert_eq!(load_rows(&conn).unwrap(), rows);
        assert_eq!(count_rows(&conn).unwrap(), 3);
        assert_eq!(list_products(&conn).unwrap(), vec!["Plank", "Wall"]);

        let book = load_book(&conn).unwrap();
        assert_eq!(book.recipes_for("Wall")[1].ingredient, "Nails");
    }

    #[test]
    fn product_list_uses_book_trimming() {
        let conn = memory_db();
        for row in [
            RawRecipeRow::new("Plank\t", "Log", "2", "4"),
            RawRecipeRow::new("\u{3000}Beam\u{3000}", "Log", "3", "1"),
            RawRecipeRow::new("Roof", "\u{3000}", "1", "1"),
            RawRecipeRow::new("Wall\r", "Plank", "4", "1"),
        ] {
            insert_recipe_row(&conn, &row, None).unwrap();
        }

        let products = list_products(&conn).unwrap();
        assert_eq!(products, vec!["Beam", "Plank", "Wall"]);

        let book = load_book(&conn).unwrap();
        for name in &products {
            assert!(!book.is_base_material(name));
        }
    }

    #[test]
    fn malformed_rows_fail_at_book_construction() {
        let conn = memory_db();
        insert_recipe_row(&conn, &RawRecipeRow::new("Plank", "Log", "many", "4"), None).unwrap();

        assert!(load_book(&conn).is_err());
    }

    #[test]
    fn clear_removes_everything() {
        let conn = memory_db();
        insert_recipe_row(&conn, &RawRecipeRow::new("Plank", "Log", "2", "4"), None).unwrap();
        clear_recipes(&conn).unwrap();

        assert_eq!(count_rows(&conn).unwrap(), 0);
    }
}
