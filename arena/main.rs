/// ferrite-gesture Arena
///
/// JSON front-end for a gesture session, served by a synchronous tiny_http
/// server. A browser client captures webcam frames, runs hand tracking
/// itself, and posts frames plus the hand count it saw.
///
/// Run with:
///   cargo run --bin arena --release -- [config.json] [addr]
/// Then `GET http://127.0.0.1:7878/` lists the endpoints.

mod handlers;
mod routes;
mod state;
mod util;

use std::sync::{Arc, Mutex};

use tiny_http::Server;

use ferrite_gesture::{GestureConfig, GestureSession, PooledPixelExtractor, ReportedHands};

use state::ArenaState;

const DEFAULT_ADDR: &str = "127.0.0.1:7878";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => match GestureConfig::load_json(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("could not read config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => GestureConfig::default(),
    };
    let addr = args.get(2).map(String::as_str).unwrap_or(DEFAULT_ADDR);

    let hands = ReportedHands::new(config.vision.max_hands);
    let counter = hands.counter();
    let extractor = PooledPixelExtractor::new(config.vision.input_size, config.vision.grid);
    let mut session = match GestureSession::open(config, Box::new(extractor), Box::new(hands)) {
        Ok(session) => session,
        Err(e) => {
            log::error!("could not open session storage: {}", e);
            std::process::exit(1);
        }
    };
    match session.initialize() {
        Some(source) => log::info!("preloaded model from {}", source),
        None => log::info!("no model preloaded; collect samples and train"),
    }

    let server = match Server::http(addr) {
        Ok(server) => server,
        Err(e) => {
            log::error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    log::info!("arena listening on http://{}", addr);

    let shared_state = Arc::new(Mutex::new(ArenaState::new(session, counter)));

    // One thread per request so the SSE stream, which blocks for a whole
    // training run, does not stall frame posts.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
}
