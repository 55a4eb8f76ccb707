//! Streaming example demonstrating background loading.
//!
//! This example shows:
//! - Discovering a directory of asset containers
//! - Queueing async loads and polling them from a frame loop
//! - Coalesced requests for the same asset
//! - Reclaiming unused payloads with a reference sweep
//!
//! Run with `RUST_LOG=debug` for more detail.

use std::fs;
use std::path::Path;
use std::time::Duration;

use cairn_assets::*;
use cairn_core::profiling::{ProfilingBackend, init_profiling, new_frame};

/// A line-based dialogue script.
#[derive(Debug)]
struct Script {
    lines: Vec<String>,
}

impl Asset for Script {
    fn type_name() -> &'static str {
        "Script"
    }
}

struct ScriptLoader;

impl AssetLoader for ScriptLoader {
    type Asset = Script;
    type Staged = Vec<String>;

    fn deserialize(&self, ctx: &mut LoadContext<'_>) -> AssetResult<Vec<String>> {
        // Pretend decoding is slow so the frame loop has something to wait on.
        std::thread::sleep(Duration::from_millis(30));
        let text = std::str::from_utf8(ctx.bytes()).map_err(|e| ctx.error(format!("Invalid UTF-8: {}", e)))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn finalize(&self, lines: Vec<String>, _ctx: &FinalizeContext<'_>) -> AssetResult<Script> {
        Ok(Script { lines })
    }

    fn serialize(&self, script: &Script) -> AssetResult<Vec<u8>> {
        Ok(script.lines.join("\n").into_bytes())
    }
}

fn write_script(root: &Path, name: &str, text: &str) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let bytes = encode(AssetType::of::<Script>(), false, text.as_bytes());
    fs::write(root.join(format!("{}.asset", name)), bytes)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    cairn_core::logging::init();
    init_profiling(ProfilingBackend::InProcess);

    let dir = tempfile::tempdir()?;
    let scripts = dir.path().join("scripts");
    write_script(&scripts, "Intro", "Welcome, traveller.\nThe road is long.")?;
    write_script(&scripts, "Shop", "What will it be?")?;
    write_script(&scripts.join("quests"), "Lantern", "Find the lantern.\nReturn it to the keeper.")?;

    let mut registry = Registry::new(RegistryConfig::default().with_base_path(dir.path()))?;
    registry.register_loader(ScriptLoader);
    registry.discover("Game", "scripts", Origin::Project)?;
    println!("Discovered {} assets", registry.len());

    let intro = AssetRef::new();
    let intro_again = AssetRef::new();
    let lantern = AssetRef::named("Lantern");
    registry.async_load("Intro", &intro);
    registry.async_load("Intro", &intro_again);
    registry.async_resolve(&lantern);
    registry.prefetch("Shop");
    println!("{} loads in flight", registry.in_flight());

    let mut frame = 0;
    while registry.in_flight() > 0 && frame < 600 {
        new_frame();
        let finalized = registry.update(1.0 / 60.0);
        if finalized > 0 {
            println!("frame {}: finalized {}", frame, finalized);
        }
        std::thread::sleep(Duration::from_millis(16));
        frame += 1;
    }

    for handle in [&intro, &intro_again, &lantern] {
        if let Some(script) = handle.get::<Script>() {
            println!("{:?}: {:?}", handle.name(), script.lines);
        }
    }
    println!("Intro handles share a payload: {}", intro == intro_again);

    for event in registry.drain_events() {
        println!("event: {:?}", event);
    }

    drop(intro);
    drop(intro_again);
    drop(lantern);
    println!("Sweep reclaimed {} assets", registry.ref_sweep());

    Ok(())
}
