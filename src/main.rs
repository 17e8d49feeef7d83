use env_logger::Env;
use log::error;

fn main() {
    // per-step record counts are logged at info
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = deep_sea::get_arg().and_then(deep_sea::run) {
        error!("{e:#}");
        std::process::exit(1);
    }
}
