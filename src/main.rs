mod aggregate;
mod config;
mod data;
mod decode;
mod demand;
mod engine;
mod error;
mod model;
mod penalty;
mod report;
mod server;
mod slots;
mod solver;
#[cfg(test)]
mod testing;

use log::error;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match config::ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run_server(config).await {
        error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}
