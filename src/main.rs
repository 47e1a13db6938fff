#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .with_local_timestamps()
        .init()
        .expect("failed to build logger instance");

    if let Err(err) = stockbell::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
