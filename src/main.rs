use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::{Build, Rocket};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use std::env;
use std::error::Error;
use std::sync::Arc;

mod config;
mod data;
mod internal_error;
mod todo;

use config::AppConfig;
use todo::endpoints;
use todo::planner::Planner;
use todo::save_queue::{self, SaveQueue};
use todo::store::{SqliteStore, TaskStore};

#[macro_use]
extern crate rocket;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PLANNER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("dayplanner=info,rocket=warn"));

    let format = env::var("PLANNER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => registry.with(fmt::layer().json().with_ansi(false)).init(),
        _ => registry.with(fmt::layer().compact()).init(),
    }
}

fn build_rocket(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(AdHoc::try_on_ignite("Task store", |rocket| async move {
            let config = match AppConfig::from_figment(rocket.figment()) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(error = %e, "could not read planner configuration");
                    return Err(rocket);
                }
            };

            let store: Arc<dyn TaskStore> = match SqliteStore::open(&config.database_path) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(path = %config.database_path.display(), error = %e, "could not open task store");
                    return Err(rocket);
                }
            };
            tracing::info!(path = %config.database_path.display(), "task store opened");

            let (saves, worker) = SaveQueue::spawn(store.clone(), config.save_debounce());
            tokio::spawn(save_queue::supervise(worker));

            Ok(rocket.manage(Planner::new(store, saves)))
        }))
        .attach(AdHoc::on_shutdown("Flush pending saves", |rocket| {
            Box::pin(async move {
                if let Some(planner) = rocket.state::<Planner>() {
                    planner.flush().await;
                    tracing::info!("pending saves flushed");
                }
            })
        }))
        .mount(
            "/api",
            routes![
                endpoints::new_token,
                endpoints::get_document,
                endpoints::set_document,
                endpoints::get_day,
                endpoints::get_list,
                endpoints::add_task,
                endpoints::toggle_task,
                endpoints::rename_task,
                endpoints::delete_task,
                endpoints::reorder_tasks,
                endpoints::get_recurring,
                endpoints::add_recurring,
                endpoints::delete_recurring,
                endpoints::get_analytics,
            ],
        )
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    build_rocket(rocket::Config::figment()).launch().await?;

    Ok(())
}
