//! Startup tasks: run embedded migrations and seed the category taxonomy.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;
use uuid::Uuid;

use crate::core::shared::schema::issue_categories;
use crate::core::shared::utils::DbPool;
use crate::issues::Category;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Seed rows for the category taxonomy. Name, department, description.
const CATEGORY_SEED: &[(&str, &str, &str)] = &[
    ("Public Safety", "Public Safety", "Hazards, open manholes, unsafe structures"),
    ("Water Leak", "Water Supply", "Burst pipes and supply leakage"),
    ("Drainage Problems", "Water Supply", "Blocked or overflowing drains"),
    ("Road Repair", "Roads", "Potholes and damaged road surfaces"),
    ("Garbage Collection", "Sanitation", "Missed pickups and overflowing bins"),
    ("Street Light Issue", "Electrical", "Broken or dark street lighting"),
    ("Traffic Signal", "Traffic", "Malfunctioning signals"),
    ("Parking Violation", "Traffic", "Illegal or obstructive parking"),
    ("Noise Complaint", "Public Safety", "Persistent noise nuisance"),
    ("Others", "General Administration", "Anything that fits no other category"),
];

pub fn run(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().context("Failed to get connection for bootstrap")?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Migration failed: {e}"))?;
    if !applied.is_empty() {
        info!("Applied {} pending migrations", applied.len());
    }

    seed_categories(&mut conn)?;
    Ok(())
}

fn seed_categories(conn: &mut PgConnection) -> Result<()> {
    let now = Utc::now();
    let rows: Vec<Category> = CATEGORY_SEED
        .iter()
        .map(|(name, department, description)| Category {
            id: Uuid::new_v4(),
            name: (*name).to_string(),
            description: Some((*description).to_string()),
            department: (*department).to_string(),
            active: true,
            created_at: now,
        })
        .collect();

    let inserted = diesel::insert_into(issue_categories::table)
        .values(&rows)
        .on_conflict(issue_categories::name)
        .do_nothing()
        .execute(conn)
        .context("Failed to seed categories")?;

    if inserted > 0 {
        info!("Seeded {inserted} issue categories");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_covers_all_timeline_categories() {
        // Every category with a dedicated timeline entry must exist in the
        // seed, so the advisory lookup resolves against real rows.
        for name in [
            "Public Safety",
            "Water Leak",
            "Drainage Problems",
            "Road Repair",
            "Garbage Collection",
            "Street Light Issue",
            "Traffic Signal",
            "Parking Violation",
            "Noise Complaint",
        ] {
            assert!(
                CATEGORY_SEED.iter().any(|(n, _, _)| *n == name),
                "missing seed for {name}"
            );
        }
    }

    #[test]
    fn test_seed_names_are_unique() {
        let mut names: Vec<_> = CATEGORY_SEED.iter().map(|(n, _, _)| n).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), CATEGORY_SEED.len());
    }
}
