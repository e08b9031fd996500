//! Command dispatch: load map, apply one operation, save.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::MindMap;
use crate::cli::args::{Cli, Commands, ConfigCommands, OutputFormat};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::NodeId;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::expand_path;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let config_dir = match &cli.config_dir {
        Some(dir) => expand_path(dir),
        None => std::env::current_dir().map_err(InfraError::WorkingDir)?,
    };
    let settings = Settings::load(Some(&config_dir))?;
    let container = ServiceContainer::new(settings);

    match command {
        Commands::New { file, text, force } => cmd_new(&container, file, text, *force),
        Commands::Add {
            file,
            parent,
            text,
            side,
        } => edit_map(&container, file, |map| {
            let parent = resolve(map, parent)?;
            let id = map.add_node(&parent, text, *side)?;
            output::action("Added", &id);
            Ok(())
        }),
        Commands::Remove { file, id } => edit_map(&container, file, |map| {
            let id = resolve(map, id)?;
            let removed = map.remove_node(&id)?;
            output::action("Removed", &format!("{} node(s)", removed));
            Ok(())
        }),
        Commands::Move {
            file,
            id,
            new_parent,
            side,
        } => edit_map(&container, file, |map| {
            let id = resolve(map, id)?;
            let new_parent = resolve(map, new_parent)?;
            map.reparent(&id, &new_parent, *side)?;
            output::action("Moved", &format!("{} -> {}", id, new_parent));
            Ok(())
        }),
        Commands::Reorder { file, id, index } => edit_map(&container, file, |map| {
            let id = resolve(map, id)?;
            if !map.reorder(&id, *index) {
                return Err(CliError::Usage(format!("{} has no siblings to reorder", id)));
            }
            output::action("Reordered", &id);
            Ok(())
        }),
        Commands::Side { file, id, side } => edit_map(&container, file, |map| {
            let id = resolve(map, id)?;
            map.move_to_side(&id, *side)?;
            output::action("Side", &format!("{} -> {}", id, side));
            Ok(())
        }),
        Commands::Resize {
            file,
            id,
            width,
            height,
        } => edit_map(&container, file, |map| {
            let id = resolve(map, id)?;
            map.resize_node(&id, *width, *height)?;
            output::action("Resized", &format!("{} to {}x{}", id, width, height));
            Ok(())
        }),
        Commands::Layout { file, format } => cmd_layout(&container, file, *format),
        Commands::Tree { file } => {
            let map = container.store.load(&expand_path(file))?;
            output::info(&map.to_tree_view());
            Ok(())
        }
        Commands::Validate { file } => {
            let count = container.store.validate_file(&expand_path(file))?;
            output::success(&format!("{}: {} nodes", file.display(), count));
            Ok(())
        }
        Commands::Config { command } => cmd_config(&container, command, &config_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

/// Load `file`, apply `f`, and write the result back.
fn edit_map<F>(container: &ServiceContainer, file: &Path, f: F) -> CliResult<()>
where
    F: FnOnce(&mut MindMap) -> CliResult<()>,
{
    let path = expand_path(file);
    let mut map = container.store.load(&path)?;
    f(&mut map)?;
    container.store.save(&map, &path)?;
    debug!("edit_map: saved {}", path.display());
    Ok(())
}

/// Accepts a full id, a unique id prefix, or `root`.
fn resolve(map: &MindMap, arg: &str) -> CliResult<NodeId> {
    if arg == "root" {
        return map
            .root()
            .cloned()
            .ok_or_else(|| CliError::Usage("map has no root".to_string()));
    }
    let exact = NodeId::from(arg);
    if map.contains(&exact) {
        return Ok(exact);
    }
    let root = map.root().cloned().into_iter();
    let ids = root.clone().chain(root.flat_map(|r| map.descendants(&r)));
    let matches: Vec<NodeId> = ids.filter(|id| id.as_str().starts_with(arg)).collect();
    match matches.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(CliError::InvalidArgs(format!("no node matches {:?}", arg))),
        _ => Err(CliError::InvalidArgs(format!(
            "{:?} is ambiguous: {}",
            arg,
            matches.iter().join(", ")
        ))),
    }
}

#[instrument(skip(container))]
fn cmd_new(container: &ServiceContainer, file: &Path, text: &str, force: bool) -> CliResult<()> {
    let path = expand_path(file);
    let map = container.store.create(&path, text, force)?;
    if let Some(root) = map.root() {
        output::action("Created", &format!("{} (root {})", path.display(), root));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_layout(container: &ServiceContainer, file: &Path, format: OutputFormat) -> CliResult<()> {
    let map = container.store.load(&expand_path(file))?;
    let positions = map.positions();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&positions).map_err(|e| {
                crate::application::ApplicationError::Json {
                    context: "layout".to_string(),
                    source: e,
                }
            })?;
            output::info(&json);
        }
        OutputFormat::Table => {
            output::header(&format!(
                "{:<36}  {:<5}  {:>3}  {:>9}  {:>9}  {}",
                "id", "side", "lvl", "x", "y", "text"
            ));
            for p in &positions {
                let text = map.node(&p.id).map(|n| n.to_string()).unwrap_or_default();
                output::info(&format!(
                    "{:<36}  {:<5}  {:>3}  {:>9.1}  {:>9.1}  {}",
                    p.id, p.side, p.level, p.x, p.y, text
                ));
            }
        }
    }

    for (a, b) in map.find_overlaps() {
        output::warning(&format!("nodes overlap: {} and {}", a, b));
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands, config_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let global = global_config_path();
            let local = local_config_path(config_dir);
            let describe = |p: &PathBuf| {
                let state = if container.fs.exists(p) { "exists" } else { "missing" };
                format!("{} ({})", p.display(), state)
            };
            output::header("Config files");
            match &global {
                Some(p) => output::detail(&format!("global: {}", describe(p))),
                None => output::detail(&"global: (no config directory)"),
            }
            output::detail(&format!("local:  {}", describe(&local)));
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("no global config directory".to_string()))?
            } else {
                local_config_path(config_dir)
            };
            if container.fs.exists(&path) {
                return Err(InfraError::ConfigExists { path }.into());
            }
            container
                .fs
                .ensure_parent(&path)
                .and_then(|_| container.fs.write(&path, &Settings::template()))
                .map_err(|source| InfraError::ConfigWrite {
                    path: path.clone(),
                    source,
                })?;
            output::action("Created", &path.display());
        }
    }
    Ok(())
}
