use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use cubot_core::cube::CubeState;
use cubot_core::discovery::discover;
use cubot_core::program::{MoveTranslator, OrientationTranslator, SolvePlan, strip_solution};
use cubot_core::protocol::Endpoint;
use cubot_core::session::{RobotSession, SessionConfig};
use cubot_core::settings::RobotSettings;
use cubot_core::state::HandleResult;
use tracing::{error, info, warn};

const REPORT_WAIT: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(author, version, about = "Cube solving robot controller", long_about = None)]
struct Args {
    /// Session configuration file (TOML)
    #[arg(short, long, default_value = "cubot.toml")]
    config: PathBuf,

    /// Controller address, overrides the configuration file
    #[arg(short, long)]
    address: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the subnet for controllers
    Discover {
        /// First three octets, e.g. 192.168.1
        #[arg(long)]
        subnet: Option<String>,
    },
    /// Translate a solver solution into robot instructions
    Translate {
        /// Solution such as "U1 R2 F3 (3f)"
        solution: String,
    },
    /// Send a robot program and follow it until the robot finishes
    Run {
        /// Robot instructions such as F1R1S3
        #[arg(required_unless_present = "random")]
        instructions: Option<String>,
        /// Scramble a solved cube with a random program of this many instructions
        #[arg(long, value_name = "LENGTH", conflicts_with_all = ["instructions", "definition", "scramble"])]
        random: Option<usize>,
        /// Seed for --random
        #[arg(long, requires = "random")]
        seed: Option<u64>,
        /// Cube definition before the run (defaults to solved)
        #[arg(long)]
        definition: Option<String>,
        /// The program scrambles rather than solves
        #[arg(long)]
        scramble: bool,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// Read or write the servo settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Run one servo test
    Servo {
        #[arg(value_enum)]
        action: ServoAction,
    },
    /// Write the effective configuration to the configuration file
    InitConfig,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Fetch the settings over the control plane
    Get,
    /// Ask the controller for a settings report on the data plane
    Report,
    /// Send the settings file to the controller
    Push {
        /// Robot settings JSON
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ServoAction {
    Flip,
    Close,
    Open,
    Ccw,
    Home,
    Cw,
}

impl From<ServoAction> for Endpoint {
    fn from(action: ServoAction) -> Self {
        match action {
            ServoAction::Flip => Endpoint::FlipTopCover,
            ServoAction::Close => Endpoint::CloseTopCover,
            ServoAction::Open => Endpoint::OpenTopCover,
            ServoAction::Ccw => Endpoint::RotateCounterClockwise,
            ServoAction::Home => Endpoint::HomeCubeHolder,
            ServoAction::Cw => Endpoint::RotateClockwise,
        }
    }
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Could not install the log subscriber");
    }

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = if args.config.exists() {
        SessionConfig::load_from_file(&args.config)
            .with_context(|| format!("Reading {}", args.config.display()))?
    } else {
        SessionConfig::default()
    };
    if let Some(address) = &args.address {
        config.address = Some(address.clone());
    }
    Ok(config)
}

fn connected_session(
    config: SessionConfig,
) -> Result<RobotSession<cubot_core::NetworkTransport, cubot_core::TracingObserver>> {
    let transport = config.network_transport()?;
    let mut session = RobotSession::new(config, transport);
    if !session.connect() {
        bail!("Controller not reachable");
    }
    Ok(session)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    match args.command {
        Command::Discover { subnet } => {
            let subnet = subnet.unwrap_or_else(|| config.subnet.clone());
            let found = discover(&subnet, config.discovery_workers, config.probe_timeout());
            if found.is_empty() {
                warn!(subnet = %subnet, "No controller found");
            }
            for address in found {
                println!("{address}");
            }
        }
        Command::Translate { solution } => {
            let translated = OrientationTranslator::new().translate(&strip_solution(&solution))?;
            println!(
                "{} ({} moves)",
                translated.instructions, translated.total_moves
            );
        }
        Command::Run {
            instructions,
            random,
            seed,
            definition,
            scramble,
            timeout,
        } => {
            let plan = match (random, instructions) {
                (Some(length), _) => {
                    let mut rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
                    let plan = SolvePlan::random_scramble(&mut rng, length);
                    info!(
                        instructions = plan.instructions.as_str(),
                        total_moves = plan.total_moves,
                        "Random scramble"
                    );
                    plan
                }
                (None, Some(instructions)) => {
                    let initial = match definition {
                        Some(definition) => CubeState::from_definition(&definition)?,
                        None => CubeState::solved(),
                    };
                    SolvePlan::from_instructions(initial, &instructions, scramble)?
                }
                (None, None) => bail!("Give robot instructions or --random"),
            };

            let mut session = connected_session(config)?;
            session.load_plan(plan)?;
            session.send_program()?;
            let outcome = session.listen_until_finished(Duration::from_secs(timeout));
            let record = match outcome {
                Ok(record) => record,
                Err(e) => {
                    session.disconnect();
                    return Err(e);
                }
            };
            match record {
                Some(record) => {
                    info!(reason = %record.end_reason, elapsed = ?record.elapsed_secs, "Run finished");
                    println!("{}", session.cube());
                }
                None => warn!("Timed out, stopping the robot"),
            }
            session.disconnect();
        }
        Command::Settings { action } => match action {
            SettingsAction::Get => {
                let mut session = connected_session(config)?;
                let settings = session.fetch_settings()?;
                println!("{}", settings.to_json()?);
            }
            SettingsAction::Report => {
                let mut session = connected_session(config)?;
                session.request_settings_report()?;
                let deadline = Instant::now() + REPORT_WAIT;
                let settings = loop {
                    if let Some(HandleResult::Settings(settings)) = session.poll()? {
                        break settings;
                    }
                    if Instant::now() >= deadline {
                        bail!("No settings report received");
                    }
                };
                println!("{}", settings.to_wire());
            }
            SettingsAction::Push { file } => {
                let path = file.unwrap_or_else(|| config.settings_path.clone());
                let settings = RobotSettings::load_from_file(&path)
                    .with_context(|| format!("Reading {}", path.display()))?;
                let mut session = connected_session(config)?;
                session.push_settings(settings)?;
            }
        },
        Command::Servo { action } => {
            let mut session = connected_session(config)?;
            session.servo(action.into())?;
        }
        Command::InitConfig => {
            config.save_to_file(&args.config)?;
            info!(path = %args.config.display(), "Configuration written");
        }
    }

    Ok(())
}
