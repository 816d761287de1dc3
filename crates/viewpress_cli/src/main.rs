//! CLI smoke entry point.
//!
//! Opens the store described by `VIEWPRESS_*` environment variables and
//! prints a short, deterministic summary of its contents.

use log::error;
use std::process::ExitCode;
use viewpress_core::{
    CategoryAggregator, CmarkEngine, CoreConfig, PostRepository, RenderScope,
};

fn main() -> ExitCode {
    println!("viewpress_core ping={}", viewpress_core::ping());
    println!("viewpress_core version={}", viewpress_core::core_version());

    let config = CoreConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("logging disabled: {err}");
    }

    match summarize(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_summary module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn summarize(config: &CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = config.open_store()?;
    let engine = CmarkEngine::default();
    let mut scope = RenderScope::new(&engine);

    let posts = PostRepository::new(&store);
    let landing = posts.initial(&mut scope)?;
    let landing_title = if landing.is_empty() {
        "<none>".to_string()
    } else {
        landing.into_post().title
    };

    let categories = CategoryAggregator::new(&store).list_categories()?;
    let summaries = posts.summaries(config.excerpt_chars)?;

    println!("landing_post={landing_title}");
    println!("categories={}", categories.len());
    println!("posts={}", summaries.len());
    Ok(())
}
