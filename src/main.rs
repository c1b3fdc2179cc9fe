mod demo;

use tinyframe::{AppConfig, Color};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::new()
        .title("It's Snae, But Every 10 Seconds The Food Becomes Walls")
        .size(1280, 720)
        .resolution(1280, 720)
        .pixels_per_unit(32)
        .clear_color(Color::BLACK);

    if let Err(e) = tinyframe::run(config, demo::setup) {
        log::error!("snae stopped: {e}");
        std::process::exit(1);
    }
}
