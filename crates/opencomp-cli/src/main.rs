//! OpenComp CLI: the `opencomp` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, DEFAULT_LOG_FILTER};
use opencomp_kernel::Actor;
use support::Ctx;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env("OPENCOMP_LOG")
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });
    init_tracing(&config);

    let actor = cli
        .actor
        .or_else(|| config.actor.clone())
        .map(Actor::user)
        .unwrap_or(Actor::Anonymous);
    let ctx = Ctx {
        store_path: config.store_path(cli.store.as_deref()),
        actor,
        json: cli.json,
        expect_snapshot: cli.expect_snapshot,
    };
    tracing::debug!(store = %ctx.store_display(), actor = %ctx.actor, "opencomp invoked");

    match cli.command {
        Commands::School { command } => commands::school::run(&ctx, command),
        Commands::Node { command } => commands::node::run(&ctx, command),
        Commands::Visibility { command } => commands::visibility::run(&ctx, command),
        Commands::Order { command } => commands::order::run(&ctx, command),
        Commands::Grant { command } => commands::grant::run(&ctx, command),
        Commands::CanEdit {
            school,
            subject_area,
        } => commands::can_edit::run(&ctx, school, subject_area),
        Commands::Pathway { command } => commands::pathway::run(&ctx, command),
        Commands::Summary { subject_area } => commands::summary::run(&ctx, subject_area),
        Commands::Check { repair } => commands::check::run(&ctx, repair),
    }
}
