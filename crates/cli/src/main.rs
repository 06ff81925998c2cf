use clap::{Parser, Subcommand};
use emr_core::constants::{LOCALE_ENV, NAME_FORMAT_ENV, OTHER_NON_CODED_ALLERGEN_ENV};
use emr_core::CoreConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod ops;

#[derive(Parser)]
#[command(name = "emr")]
#[command(about = "Programme enrollment and cohort tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the states an enrollment may move to next in one workflow
    NextStates {
        /// Programme catalogue (YAML)
        program: PathBuf,
        /// Enrollment record (YAML)
        enrollment: PathBuf,
        /// Workflow UUID or name
        workflow: String,
    },
    /// Move an enrollment into a new workflow state
    Transition {
        /// Programme catalogue (YAML)
        program: PathBuf,
        /// Enrollment record (YAML)
        enrollment: PathBuf,
        /// Target state UUID or name
        state: String,
        /// Date of the change (YYYY-MM-DD or RFC 3339), defaults to now
        #[arg(long)]
        on: Option<String>,
        /// Overwrite the enrollment file instead of printing the result
        #[arg(long)]
        write: bool,
    },
    /// Combine two cohorts and print the result
    Cohort {
        #[arg(value_enum)]
        op: ops::CohortOperation,
        /// Left cohort (YAML)
        a: PathBuf,
        /// Right cohort (YAML)
        b: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("emr=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = run(cli, |key| std::env::var(key).ok())?;
    print!("{output}");
    Ok(())
}

/// Resolves the configuration through `env`. Only commands that display names need it.
fn load_config(env: &impl Fn(&str) -> Option<String>) -> anyhow::Result<CoreConfig> {
    Ok(CoreConfig::from_values(
        env(LOCALE_ENV),
        env(NAME_FORMAT_ENV),
        env(OTHER_NON_CODED_ALLERGEN_ENV),
    )?)
}

fn run(cli: Cli, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    let output = match cli.command {
        Commands::NextStates {
            program,
            enrollment,
            workflow,
        } => ops::next_states(&program, &enrollment, &workflow, &load_config(&env)?)?,
        Commands::Transition {
            program,
            enrollment,
            state,
            on,
            write,
        } => {
            let on = on.as_deref().map(ops::parse_date).transpose()?;
            ops::transition(&program, &enrollment, &state, on, write, &load_config(&env)?)?
        }
        Commands::Cohort { op, a, b } => ops::combine_cohorts(op, &a, &b)?,
    };
    Ok(output)
}
