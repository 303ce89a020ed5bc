use std::env;
use std::error::Error;

use clap::Parser;

use crate::input::manager::Manager;

mod drivers;
mod input;

#[derive(Parser)]
#[command(name = "joybridge", author, version, about = "Joy-Con HID bridge")]
struct Args {
    /// List discovered Joy-Cons and exit
    #[arg(long)]
    list: bool,

    /// Only drive the first left/right pair instead of every Joy-Con
    #[arg(long)]
    pair: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args = Args::parse();
    let mut manager = Manager::new();

    if args.list {
        manager.discover()?;
        for session in manager.sessions() {
            println!(
                "{}  {:?}  {}",
                session.serial(),
                session.side(),
                session.name()
            );
        }
        return Ok(());
    }

    log::info!("Starting joybridge v{}", VERSION);
    manager.run(args.pair).await?;
    log::info!("joybridge stopped");

    Ok(())
}
