use crate::demo::{run_demo, DemoArgs};
use crate::server;
use campus_enroll::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Campus Enrollment Service",
    about = "Run and exercise the course enrollment admission service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with course catalog CSV files
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Run an end-to-end in-process demo of admission, approval, and promotion
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Parse a catalog file and report what it contains
    Validate(CatalogValidateArgs),
}

#[derive(Args, Debug)]
pub(crate) struct CatalogValidateArgs {
    /// Path to the catalog CSV file
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Course catalog CSV used to seed the directory (demo courses otherwise)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog {
            command: CatalogCommand::Validate(args),
        } => run_catalog_validate(args),
        Command::Demo(args) => run_demo(args),
    }
}

fn run_catalog_validate(args: CatalogValidateArgs) -> Result<(), AppError> {
    let courses = crate::infra::load_catalog(&args.path)?;
    println!("{} course(s) parsed from {}", courses.len(), args.path.display());
    for course in courses {
        println!(
            "  {} '{}' capacity {} status {} access code {}",
            course.id,
            course.name,
            course.capacity,
            course.status.label(),
            course.access_code.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
