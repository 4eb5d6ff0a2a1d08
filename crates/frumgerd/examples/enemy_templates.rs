//! Enemy Templates — build a small template chain on disk and load it back.
//!
//! - saves a base `goblin` with a sword as templates
//! - branches a `warlord` variant with more health
//! - branches a `shaman` variant of the warlord that drops the sword
//! - reloads everything into a fresh graph and prints the resolved stats
//!
//! Run with: `RUST_LOG=debug cargo run -p frumgerd --example enemy_templates [dir]`

use frumgerd::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stats {
    id: String,
    health: i32,
    mana: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Weapon {
    id: String,
    damage: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
enum Part {
    Stats(Stats),
    Weapon(Weapon),
}

impl ComponentData for Part {
    fn id(&self) -> &str {
        match self {
            Part::Stats(s) => &s.id,
            Part::Weapon(w) => &w.id,
        }
    }
}

capability!(Part::Stats => Stats, Part::Weapon => Weapon);

type Record = Entity<Part>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let dir = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("frumgerd_templates"));
    let store = TemplateStore::new(DirBlobStore::new(&dir)?).with_pretty_json(true);
    let mut graph: EntityGraph<Record, DirBlobStore> = EntityGraph::with_template_store(store);

    // ── Base template ────────────────────────────────────────────────────

    let goblin = graph.add(Record::named("goblin").with_component(Part::Stats(Stats {
        id: "stats".into(),
        health: 100,
        mana: 10,
    })))?;
    graph.add_child(
        &goblin,
        Record::named("sword")
            .with_transform(Transform::from_xyz(0.4, 1.0, 0.0))
            .with_component(Part::Weapon(Weapon {
                id: "blade".into(),
                damage: 5,
            })),
        Entity::attach_child,
    )?;
    graph.save_changes(&goblin)?;

    // ── Variants ─────────────────────────────────────────────────────────

    let warlord = graph.create_variant(&goblin, Entity::attach_child, Entity::detach_child)?;
    graph.entity_mut(&warlord)?.modify(|r| {
        r.name = Some("warlord".into());
        if let Ok(stats) = r.component_mut::<Stats>() {
            stats.health = 300;
        }
    })?;
    graph.save_changes(&warlord)?;

    let shaman = graph.create_variant(&warlord, Entity::attach_child, Entity::detach_child)?;
    graph.entity_mut(&shaman)?.modify(|r| {
        r.name = Some("shaman".into());
        if let Ok(stats) = r.component_mut::<Stats>() {
            stats.mana = 80;
        }
    })?;
    let shaman_sword = graph.entity(&shaman)?.child("sword")?.id().clone();
    graph.destroy(&shaman_sword, Entity::detach_child);
    graph.save_changes(&shaman)?;

    // ── Reload ───────────────────────────────────────────────────────────

    let mut store = graph
        .into_template_store()
        .ok_or("graph lost its template store")?;
    let count = store.load_all_template_files_into_memory()?;
    println!("{count} templates in {}", dir.display());

    let mut fresh = EntityGraph::with_template_store(store);
    for id in [&goblin, &warlord, &shaman] {
        fresh.load_template(id)?;
        let view = fresh.entity(id)?;
        let stats = view.component::<Stats>()?;
        let weapon = view
            .child("sword")
            .ok()
            .and_then(|sword| sword.component::<Weapon>().ok())
            .map_or(0, |w| w.damage);
        println!(
            "{:<8} health {:>3}  mana {:>3}  sword damage {}",
            view.name().unwrap_or("?"),
            stats.health,
            stats.mana,
            weapon
        );
    }

    Ok(())
}
