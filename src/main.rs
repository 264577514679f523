use dotenv::dotenv;
use duelbot::AppConfig;
use duelbot::sim::Arena;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("duelbot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging()?;

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Training for {} episodes | match {:.0}s @ {:.0} Hz | node spacing {} | seed {:?}",
        config.episodes,
        config.match_duration,
        config.tick_rate,
        config.node_spacing,
        config.seed
    );

    let mut arena = Arena::new(config.arena());
    for _ in 0..config.episodes {
        arena.run_match();
    }

    arena.metrics.print_summary();
    arena.metrics.export("duelbot");

    let controller = arena.controller().borrow();
    tracing::info!("{}", controller.debug_info());
    tracing::info!("{}", controller.agent().debug_info());
    controller.perceptron().log_weights();
    controller.save("duelbot");

    Ok(())
}
