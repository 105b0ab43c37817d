mod app;
mod cli;
mod completions;
mod config;
mod db;
mod dispatch;
mod domain;
mod entity_id;
mod listing;
mod logging;
mod progress;
mod status;
#[cfg(test)]
mod test_support;
mod ui;
mod workflow;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use app::{EntityPatch, NewEntity};
    use clap::Parser;
    use cli::Commands;
    use listing::EntityListFilter;

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let settings = config::Settings::load(&cli.config)?;
    logging::init(&settings.log);
    tracing::debug!(db = %cli.db, config = %cli.config.display(), "starting");

    let mut app = app::App::open(&cli.db, &settings)?;

    match cli.command {
        Commands::New(args) => {
            let change = app.create_entity(NewEntity {
                class: args.class,
                title: args.title,
                parent_id: args.parent,
                estimate: args.estimate,
                status: args.status,
            })?;
            if args.json {
                print_json(&change);
            } else {
                ui::print_entity_change(&change);
            }
        }
        Commands::Status(args) => {
            let change = app.set_status(&args.id, &args.state, args.force)?;
            if args.json {
                print_json(&change);
            } else {
                ui::print_entity_change(&change);
            }
        }
        Commands::Update(args) => {
            let view = app.update_entity(
                &args.id,
                EntityPatch {
                    title: args.title,
                    estimate: args.estimate,
                    actual: args.actual,
                },
            )?;
            if args.json {
                print_json(&view);
            } else {
                ui::print_entity_show(&view);
            }
        }
        Commands::Show(args) => {
            let view = app
                .show_entity(&args.id)?
                .ok_or_else(|| app::AppError::NotFound(args.id.trim().to_string()))?;
            if args.json {
                print_json(&view);
            } else {
                ui::print_entity_show(&view);
            }
        }
        Commands::Ls(args) => {
            let filter = EntityListFilter {
                include_all: args.all,
                class: args.class,
                parent_id: args.parent,
                status: args.status,
                query: args.query,
            };
            let views = app.list_entities(&filter)?;
            if args.json {
                print_json(&views);
            } else {
                ui::print_entity_list(&views, &filter);
            }
        }
        Commands::Progress(args) => {
            let report = app.progress(&args.id)?;
            if args.json {
                print_json(&report);
            } else {
                ui::print_progress(&report);
            }
        }
        Commands::States(args) => dispatch::run_states_command(&mut app, args)?,
        Commands::Completions(_) => unreachable!("completions are handled before opening the app"),
    }

    Ok(())
}
