use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use condax_core::{CondaCommand, PackageRequest};

#[derive(Parser, Debug)]
#[command(
    name = "condax",
    author,
    version,
    about = "Bootstrap a conda installation and drive its environments",
    disable_help_subcommand = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct CondaxCli {
    #[arg(
        long,
        env = "CONDAX_ROOT",
        value_name = "DIR",
        help = "Installation root (installed on first use)",
        global = true
    )]
    pub root: Option<PathBuf>,
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still set the exit code)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(about = "Print the conda version of the installation.")]
    Version,
    #[command(about = "List environments, base first.")]
    Envs,
    #[command(
        about = "Create an environment from packages or an environment file.",
        override_usage = "condax create <NAME> [--force] [--file FILE] [-- EXTRA...]"
    )]
    Create(CreateArgs),
    #[command(about = "Install conda packages into an environment.")]
    Install(PackageArgs),
    #[command(about = "Remove conda packages from an environment.")]
    Uninstall(PackageArgs),
    #[command(about = "Update conda packages in an environment.")]
    Update(PackageArgs),
    #[command(subcommand, about = "Manage pip packages with an environment's python.")]
    Pip(PipCommand),
    #[command(
        about = "Run the environment's python with its declared variables.",
        override_usage = "condax run [-n ENV] -- <ARGS>..."
    )]
    Run(RunArgs),
    #[command(about = "Show variables declared for an environment.")]
    Vars(EnvArgs),
    #[command(
        about = "Pass arguments straight to conda.",
        override_usage = "condax conda -- <ARGS>..."
    )]
    Conda(CondaArgs),
}

#[derive(Subcommand, Debug)]
pub enum PipCommand {
    #[command(about = "pip install into an environment.")]
    Install(PackageArgs),
    #[command(about = "pip uninstall from an environment.")]
    Uninstall(PackageArgs),
}

#[derive(Args, Debug)]
pub struct EnvArgs {
    #[arg(short = 'n', long = "name", value_name = "ENV", help = "Target environment (default: base)")]
    pub env: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub name: String,
    #[arg(long, help = "Create even if the environment already exists")]
    pub force: bool,
    #[arg(short = 'f', long, value_name = "FILE", help = "Environment file such as environment.yml")]
    pub file: Option<PathBuf>,
    #[arg(last = true, value_name = "EXTRA", help = "Extra arguments for conda")]
    pub extra: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PackageArgs {
    #[command(flatten)]
    pub env: EnvArgs,
    #[arg(required = true, value_name = "PKG")]
    pub packages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub env: EnvArgs,
    #[arg(last = true, value_name = "ARGS", help = "Arguments for python")]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CondaArgs {
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "ARGS"
    )]
    pub args: Vec<String>,
}

impl PackageArgs {
    fn request(&self) -> PackageRequest {
        PackageRequest {
            env: self.env.env.clone(),
            packages: self.packages.clone(),
        }
    }
}

pub fn build_command(group: &CommandGroupCli) -> CondaCommand {
    match group {
        CommandGroupCli::Version => CondaCommand::Version,
        CommandGroupCli::Envs => CondaCommand::Envs,
        CommandGroupCli::Create(args) => CondaCommand::Create {
            name: args.name.clone(),
            force: args.force,
            file: args.file.clone(),
            extra: args.extra.clone(),
        },
        CommandGroupCli::Install(args) => CondaCommand::Install(args.request()),
        CommandGroupCli::Uninstall(args) => CondaCommand::Uninstall(args.request()),
        CommandGroupCli::Update(args) => CondaCommand::Update(args.request()),
        CommandGroupCli::Pip(PipCommand::Install(args)) => CondaCommand::PipInstall(args.request()),
        CommandGroupCli::Pip(PipCommand::Uninstall(args)) => {
            CondaCommand::PipUninstall(args.request())
        }
        CommandGroupCli::Run(args) => CondaCommand::Run {
            env: args.env.env.clone(),
            args: args.args.clone(),
        },
        CommandGroupCli::Vars(args) => CondaCommand::Vars {
            env: args.env.clone(),
        },
        CommandGroupCli::Conda(args) => CondaCommand::Conda {
            args: args.args.clone(),
        },
    }
}
