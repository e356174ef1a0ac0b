//! Deterministic offline answers.
//!
//! When the completion API cannot be reached, [`answer`] walks a fixed rule
//! table against the lower-cased user text and answers from a [`FactSource`]
//! (the live store or the last snapshot). The first matching rule wins; if none
//! match the user gets [`OFFLINE_MESSAGE`].

use rusqlite::Connection;

use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::store::types::{Customer, InventoryItem};

pub const OFFLINE_MESSAGE: &str = "I can't answer that offline. Try asking about customers, \
     inventory, stock levels, or a specific SKU (e.g. \"how many of SKU001\").";

/// Fixed reply for non-database questions when `db_only` is on.
pub const REFUSAL: &str =
    "I can only answer questions about the database; please ask about data or request a SQL query.";

/// Items at or below this quantity are reported as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

const STOCK_KEYWORDS: &[&str] = &[
    "stock", "inventory", "how much", "how many", "quantity", "on hand", "available",
];

const DB_KEYWORDS: &[&str] = &[
    "stock", "inventory", "how much", "how many", "quantity", "on hand", "available", "sku",
    "select", "table", "customer", "product", "item", "order", "database",
];

/// Where the fallback reads rows from.
pub trait FactSource {
    fn customers(&self) -> Result<Vec<Customer>>;
    fn inventory(&self) -> Result<Vec<InventoryItem>>;
}

impl FactSource for Connection {
    fn customers(&self) -> Result<Vec<Customer>> {
        crate::store::load_customers(self, None)
    }

    fn inventory(&self) -> Result<Vec<InventoryItem>> {
        crate::store::load_inventory(self, None)
    }
}

impl FactSource for Snapshot {
    fn customers(&self) -> Result<Vec<Customer>> {
        Ok(self.customers.clone())
    }

    fn inventory(&self) -> Result<Vec<InventoryItem>> {
        Ok(self.inventory.clone())
    }
}

struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    answer: fn(&str, &dyn FactSource) -> Result<String>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "sku_lookup",
        matches: |t| find_sku(t).is_some(),
        answer: sku_lookup,
    },
    Rule {
        name: "customer_count",
        matches: |t| t.contains("how many") && t.contains("customer"),
        answer: customer_count,
    },
    Rule {
        name: "list_customers",
        matches: |t| is_listing(t) && t.contains("customer"),
        answer: list_customers,
    },
    Rule {
        name: "list_inventory",
        matches: |t| {
            is_listing(t) && ["inventory", "product", "item"].iter().any(|k| t.contains(k))
        },
        answer: list_inventory,
    },
    Rule {
        name: "stock_summary",
        matches: |t| STOCK_KEYWORDS.iter().any(|k| t.contains(k)),
        answer: stock_summary,
    },
];

fn matching_rule(user_text: &str) -> Option<&'static Rule> {
    let lowered = user_text.to_ascii_lowercase();
    RULES.iter().find(|r| (r.matches)(&lowered))
}

/// Answer `user_text` from `source` using the first matching rule.
pub fn answer(user_text: &str, source: &dyn FactSource) -> Result<String> {
    match matching_rule(user_text) {
        Some(rule) => {
            tracing::debug!(rule = rule.name, "fallback rule matched");
            (rule.answer)(user_text, source)
        }
        None => Ok(OFFLINE_MESSAGE.to_string()),
    }
}

/// Whether `text` is about the store: a known keyword or a table name.
pub fn is_db_related(text: &str, tables: &[String]) -> bool {
    let lowered = text.to_ascii_lowercase();
    DB_KEYWORDS.iter().any(|k| lowered.contains(k))
        || tables.iter().any(|t| lowered.contains(&t.to_ascii_lowercase()))
}

fn is_listing(t: &str) -> bool {
    t.contains("list") || t.contains("show")
}

/// Locate `sku <code>` (also `sku: code`, `sku=code`) and return the code as typed.
fn find_sku(text: &str) -> Option<&str> {
    let lowered = text.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lowered[from..].find("sku") {
        let start = from + pos;
        let after = start + 3;
        from = after;

        // "sku" must be a word of its own; "skus" or "risky" don't count.
        let boundary_before = lowered[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        let rest = &text[after..];
        let boundary_after = rest.chars().next().map_or(true, |c| !c.is_ascii_alphanumeric());
        if !boundary_before || !boundary_after {
            continue;
        }

        let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '=');
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        if len > 0 {
            return Some(&rest[..len]);
        }
    }

    // Bare codes such as "SKU001" written without a separator.
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .find(|w| {
            w.len() > 3
                && w[..3].eq_ignore_ascii_case("sku")
                && w[3..].chars().all(|c| c.is_ascii_digit())
        })
}

fn sku_lookup(text: &str, source: &dyn FactSource) -> Result<String> {
    let Some(sku) = find_sku(text) else {
        return Ok(OFFLINE_MESSAGE.to_string());
    };
    let inventory = source.inventory()?;
    Ok(match inventory.iter().find(|i| i.sku.eq_ignore_ascii_case(sku)) {
        Some(item) => format!(
            "{} ({}): {} units on hand at {:.2} each.",
            item.name, item.sku, item.quantity, item.unit_price
        ),
        None => format!("No inventory item with SKU {sku}."),
    })
}

fn customer_count(_text: &str, source: &dyn FactSource) -> Result<String> {
    let n = source.customers()?.len();
    Ok(match n {
        1 => "There is 1 customer on record.".to_string(),
        n => format!("There are {n} customers on record."),
    })
}

fn list_customers(_text: &str, source: &dyn FactSource) -> Result<String> {
    let customers = source.customers()?;
    if customers.is_empty() {
        return Ok("No customers found.".to_string());
    }
    let mut lines = vec![format!("Customers ({}):", customers.len())];
    for c in &customers {
        match &c.city {
            Some(city) => lines.push(format!("- {} <{}>, {city}", c.name, c.email)),
            None => lines.push(format!("- {} <{}>", c.name, c.email)),
        }
    }
    Ok(lines.join("\n"))
}

fn list_inventory(_text: &str, source: &dyn FactSource) -> Result<String> {
    let items = source.inventory()?;
    if items.is_empty() {
        return Ok("No inventory found.".to_string());
    }
    let mut lines = vec![format!("Inventory ({} items):", items.len())];
    for item in &items {
        lines.push(format!("- {} {}: {} units", item.sku, item.name, item.quantity));
    }
    Ok(lines.join("\n"))
}

fn stock_summary(_text: &str, source: &dyn FactSource) -> Result<String> {
    let mut items = source.inventory()?;
    if items.is_empty() {
        return Ok("No inventory found.".to_string());
    }

    let total: i64 = items.iter().map(|i| i.quantity).sum();
    let mut out = format!(
        "We currently have a total of {total} units in stock across {} products.",
        items.len()
    );

    items.sort_by(|a, b| b.quantity.cmp(&a.quantity).then(a.id.cmp(&b.id)));
    let top: Vec<String> = items
        .iter()
        .take(3)
        .map(|i| format!("{} with {} units", i.name, i.quantity))
        .collect();
    if !top.is_empty() {
        out.push_str(&format!(" Best-stocked: {}.", top.join(", ")));
    }

    let low: Vec<String> = items
        .iter()
        .rev()
        .filter(|i| i.quantity <= LOW_STOCK_THRESHOLD)
        .take(3)
        .map(|i| format!("{} with only {} left", i.name, i.quantity))
        .collect();
    if !low.is_empty() {
        out.push_str(&format!(" Running low: {}.", low.join(", ")));
    }

    Ok(out)
}
