use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::{Path, PathBuf};

use netsketch::config_loader;
use netsketch::orchestrator;
use netsketch::registry;
use netsketch::snapshot::with_default_extension;
use netsketch::topology::{DeviceKind, DEFAULT_CANVAS};

/// Network topology editor: devices, links and versioned snapshots
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log debug output (overrides RUST_LOG and the declaration's log_level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Endpoint,
    Switch,
}

impl From<Kind> for DeviceKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Endpoint => DeviceKind::Endpoint,
            Kind::Switch => DeviceKind::Switch,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty project
    Init {
        file: PathBuf,
    },
    /// Build a project from a YAML topology declaration
    Build {
        /// Path to the topology declaration YAML file
        #[arg(short, long)]
        config: PathBuf,
        /// Project file to write
        #[arg(short, long, default_value = "network_project.net")]
        output: PathBuf,
    },
    /// List devices and connections
    Show {
        file: PathBuf,
        /// Print the JSON registry instead of text
        #[arg(long)]
        json: bool,
    },
    /// Add a device
    Add {
        file: PathBuf,
        #[arg(short, long, value_enum)]
        kind: Kind,
        /// Defaults to "<Kind> <n>"
        #[arg(short, long)]
        name: Option<String>,
        /// Defaults to the next free address in 10.0.0.0/24
        #[arg(short, long)]
        address: Option<String>,
    },
    /// Remove a device and all of its connections
    Remove {
        file: PathBuf,
        name: String,
    },
    /// Connect two devices
    Connect {
        file: PathBuf,
        first: String,
        second: String,
    },
    /// Disconnect two devices
    Disconnect {
        file: PathBuf,
        first: String,
        second: String,
    },
    /// Rename or readdress a device
    Edit {
        file: PathBuf,
        name: String,
        #[arg(long = "name")]
        new_name: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// List devices a device can still be connected to
    Candidates {
        file: PathBuf,
        name: String,
    },
    /// Write the JSON registry with canvas positions
    Export {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CANVAS.0)]
        width: i32,
        #[arg(long, default_value_t = DEFAULT_CANVAS.1)]
        height: i32,
    },
}

fn project_path(file: &Path) -> PathBuf {
    with_default_extension(file)
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    let default_level = if let Command::Build { config, .. } = &args.command {
        config_loader::peek_log_level(config).unwrap_or_else(|| "info".to_string())
    } else {
        "info".to_string()
    };
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match args.command {
        Command::Init { file } => {
            let path = project_path(&file);
            orchestrator::init_snapshot(&path)?;
            info!("Created empty project {:?}", path);
        }
        Command::Build { config, output } => {
            let path = project_path(&output);
            orchestrator::build_from_config(&config, &path)?;
            info!("Project saved successfully: {:?}", path);
        }
        Command::Show { file, json } => {
            let path = project_path(&file);
            if json {
                let store = orchestrator::open(&path)?;
                let registry = registry::TopologyRegistry::from_store(&store, DEFAULT_CANVAS.0, DEFAULT_CANVAS.1);
                println!("{}", registry.to_json()?);
            } else {
                print!("{}", orchestrator::describe_file(&path)?);
            }
        }
        Command::Add { file, kind, name, address } => {
            let path = project_path(&file);
            let device = orchestrator::edit_snapshot(&path, |store| {
                orchestrator::add_device(store, kind.into(), name.as_deref(), address.as_deref())
            })?;
            println!("Added {} '{}' ({})", device.kind(), device.name, device.address);
        }
        Command::Remove { file, name } => {
            let path = project_path(&file);
            let device = orchestrator::edit_snapshot(&path, |store| orchestrator::remove_device(store, &name))?;
            println!("Removed {} '{}'", device.kind(), device.name);
        }
        Command::Connect { file, first, second } => {
            let path = project_path(&file);
            orchestrator::edit_snapshot(&path, |store| orchestrator::connect(store, &first, &second))
                .wrap_err("Connection Error")?;
            println!("Connected {} to {}", first, second);
        }
        Command::Disconnect { file, first, second } => {
            let path = project_path(&file);
            let removed =
                orchestrator::edit_snapshot(&path, |store| orchestrator::disconnect(store, &first, &second))?;
            if removed {
                println!("Disconnected {} from {}", first, second);
            } else {
                println!("{} and {} were not connected", first, second);
            }
        }
        Command::Edit { file, name, new_name, address } => {
            let path = project_path(&file);
            let device = orchestrator::edit_snapshot(&path, |store| {
                orchestrator::edit_device(store, &name, new_name.as_deref(), address.as_deref())
            })?;
            println!("Updated device: {} ({})", device.name, device.address);
        }
        Command::Candidates { file, name } => {
            let path = project_path(&file);
            let store = orchestrator::open(&path)?;
            let candidates = orchestrator::candidates(&store, &name)?;
            if candidates.is_empty() {
                println!("No valid devices to connect to");
            }
            for device in candidates {
                println!("{}\t{}\t{}", device.kind(), device.name, device.address);
            }
        }
        Command::Export { file, output, width, height } => {
            let path = project_path(&file);
            let store = orchestrator::open(&path)?;
            registry::write_registry(&store, &output, width, height)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(&["netsketch", "build", "--config", "lab.yaml"]);

        match args.command {
            Command::Build { config, output } => {
                assert_eq!(config, PathBuf::from("lab.yaml"));
                assert_eq!(output, PathBuf::from("network_project.net"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!args.verbose);
    }

    #[test]
    fn test_add_args() {
        let args = Args::parse_from(&[
            "netsketch", "add", "lab", "--kind", "switch", "--name", "S1", "-v",
        ]);

        assert!(args.verbose);
        match args.command {
            Command::Add { file, kind, name, address } => {
                assert_eq!(file, PathBuf::from("lab"));
                assert_eq!(kind, Kind::Switch);
                assert_eq!(name.as_deref(), Some("S1"));
                assert_eq!(address, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_edit_args() {
        let args = Args::parse_from(&[
            "netsketch", "edit", "lab.net", "H1", "--name", "Host1", "--address", "10.0.0.9",
        ]);

        match args.command {
            Command::Edit { name, new_name, address, .. } => {
                assert_eq!(name, "H1");
                assert_eq!(new_name.as_deref(), Some("Host1"));
                assert_eq!(address.as_deref(), Some("10.0.0.9"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_project_path() {
        assert_eq!(project_path(Path::new("lab")), PathBuf::from("lab.net"));
    }
}
