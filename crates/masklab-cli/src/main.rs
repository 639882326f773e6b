//! masklab CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "masklab", version, about = "Voxel segmentation trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import one (reference, gold) volume pair as a case
    Import {
        /// Reference volume (e.g. T1 image)
        #[arg(long)]
        t1: PathBuf,

        /// Ground-truth mask
        #[arg(long)]
        gold: PathBuf,
    },

    /// Import every pair found in a folder by filename matching
    BatchImport {
        /// Folder holding *_t1 / *_gold style volume pairs
        folder: PathBuf,
    },

    /// List available cases
    Cases,

    /// Score the current student mask of a case once
    Score {
        /// Case id as shown by `masklab cases`
        case_id: String,
    },

    /// Open a case in the editor and score every saved change
    Practice {
        /// Case id as shown by `masklab cases`
        case_id: String,
    },

    /// Classroom administration and membership
    Classroom {
        #[command(subcommand)]
        command: ClassroomCommands,
    },

    /// Cohort rollup across a classroom's attempts
    Dashboard {
        /// Class code (defaults to the joined classroom)
        #[arg(long)]
        code: Option<String>,

        /// Write the full report JSON here as well
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check for and stage application updates
    Update {
        #[command(subcommand)]
        command: UpdateCommands,
    },
}

#[derive(Subcommand)]
enum ClassroomCommands {
    /// Provision a classroom on a shared directory (teacher)
    Create {
        /// Shared directory holding (or to hold) the classroom tree
        #[arg(long)]
        share: PathBuf,

        /// Class code, e.g. HUMMEL2026
        #[arg(long)]
        code: String,

        /// Teacher PIN, required once one is set
        #[arg(long)]
        pin: Option<String>,
    },

    /// Set or replace the teacher PIN for a share
    SetPin {
        #[arg(long)]
        share: PathBuf,

        #[arg(long)]
        pin: String,
    },

    /// Check a teacher PIN against a share
    Login {
        #[arg(long)]
        share: PathBuf,

        #[arg(long)]
        pin: String,
    },

    /// Show or change a class's pass policy (teacher)
    Policy {
        #[arg(long)]
        share: PathBuf,

        #[arg(long)]
        code: String,

        #[arg(long)]
        pin: Option<String>,

        /// New minimum student-mask voxel count
        #[arg(long)]
        min_voxels: Option<u64>,

        /// New maximum tolerated mismatch voxel count
        #[arg(long)]
        tolerance: Option<u64>,

        /// New session label stamped on attempts
        #[arg(long)]
        session: Option<String>,
    },

    /// Upload a case into a class's shared cases (teacher)
    Upload {
        #[arg(long)]
        share: PathBuf,

        #[arg(long)]
        code: String,

        #[arg(long)]
        pin: Option<String>,

        #[arg(long)]
        t1: PathBuf,

        #[arg(long)]
        gold: PathBuf,
    },

    /// Join a classroom as a student and remember it
    Join {
        #[arg(long)]
        share: PathBuf,

        #[arg(long)]
        code: String,
    },

    /// Pull new class cases into the local workspace
    Sync,
}

#[derive(Subcommand)]
enum UpdateCommands {
    /// Query the update feed
    Check {
        /// URL of the hosted latest.json
        #[arg(long)]
        feed: String,
    },

    /// Download and stage the update after verifying its digest
    Download {
        /// URL of the hosted latest.json
        #[arg(long)]
        feed: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("masklab=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { t1, gold } => commands::import::execute(t1, gold),
        Commands::BatchImport { folder } => commands::batch_import::execute(folder),
        Commands::Cases => commands::cases::execute(),
        Commands::Score { case_id } => commands::score::execute(case_id),
        Commands::Practice { case_id } => commands::practice::execute(case_id).await,
        Commands::Classroom { command } => match command {
            ClassroomCommands::Create { share, code, pin } => {
                commands::classroom::create(share, code, pin)
            }
            ClassroomCommands::SetPin { share, pin } => commands::classroom::set_pin(share, pin),
            ClassroomCommands::Login { share, pin } => commands::classroom::login(share, pin),
            ClassroomCommands::Policy {
                share,
                code,
                pin,
                min_voxels,
                tolerance,
                session,
            } => commands::classroom::policy(share, code, pin, min_voxels, tolerance, session),
            ClassroomCommands::Upload {
                share,
                code,
                pin,
                t1,
                gold,
            } => commands::classroom::upload(share, code, pin, t1, gold),
            ClassroomCommands::Join { share, code } => commands::classroom::join(share, code),
            ClassroomCommands::Sync => commands::classroom::sync(),
        },
        Commands::Dashboard { code, output } => commands::dashboard::execute(code, output),
        Commands::Update { command } => match command {
            UpdateCommands::Check { feed } => commands::update::check(feed).await,
            UpdateCommands::Download { feed } => commands::update::download(feed).await,
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
