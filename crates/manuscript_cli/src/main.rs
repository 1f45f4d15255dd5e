//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `manuscript_core` linkage and storage bootstrap from the shell.
//! - Print every stored project as an ordered outline.

use log::info;
use manuscript_core::db::open_db;
use manuscript_core::logging::init_logging_from_config;
use manuscript_core::{CoreConfig, OutlineContext, OutlineService, SqliteOutlineRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("manuscript_core ping={}", manuscript_core::ping());
    println!("manuscript_core version={}", manuscript_core::core_version());

    let config = CoreConfig::from_env();
    if let Err(err) = init_logging_from_config(&config) {
        // Logging is optional for a probe run.
        eprintln!("logging disabled: {err}");
    }

    match print_outlines(&config) {
        Ok(projects) => {
            info!("event=cli_outline module=cli status=ok projects={projects}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_outlines(config: &CoreConfig) -> Result<usize, Box<dyn std::error::Error>> {
    println!("db_path={}", config.db_path.display());
    let conn = open_db(&config.db_path)?;
    let repo = SqliteOutlineRepository::try_new(&conn)?;
    let service = OutlineService::new(repo, OutlineContext::new());

    let projects = service.list_projects()?;
    for project in &projects {
        let outline = service.project_outline(project.id)?;
        println!("{} by {} [{}]", project.title, project.author, project.id);
        for entry in &outline.chapters {
            println!("  {}. {}", entry.chapter.order, entry.chapter.title);
            for scene in &entry.scenes {
                println!(
                    "    {}. {} ({})",
                    scene.order,
                    scene.title,
                    scene.kind.as_str()
                );
            }
        }
    }
    Ok(projects.len())
}
