use std::io::Cursor;

use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use ferrite_gesture::{ErrorKind, GestureError};

use crate::handlers;
use crate::state::SharedState;

pub type JsonResponse = Response<Cursor<Vec<u8>>>;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Builds a header from static or validated bytes; invalid values are dropped.
pub fn header(name: &str, value: &str) -> Option<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

fn bytes_response(status: u16, headers: Vec<Option<Header>>, bytes: Vec<u8>) -> JsonResponse {
    let len = bytes.len();
    Response::new(StatusCode(status), headers.into_iter().flatten().collect(), Cursor::new(bytes), Some(len), None)
}

pub fn json_response<T: Serialize>(status: u16, value: &T) -> JsonResponse {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes_response(status, vec![header("Content-Type", "application/json")], bytes),
        Err(e) => text_response(500, &format!("could not serialize response: {}", e)),
    }
}

pub fn json_download_response(body: String, filename: &str) -> JsonResponse {
    let disposition = format!("attachment; filename=\"{}\"", filename);
    bytes_response(
        200,
        vec![header("Content-Type", "application/json"), header("Content-Disposition", &disposition)],
        body.into_bytes(),
    )
}

pub fn text_response(status: u16, body: &str) -> JsonResponse {
    bytes_response(status, vec![header("Content-Type", "text/plain; charset=utf-8")], body.as_bytes().to_vec())
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    kind: &'a str,
}

/// `{"error": ..., "kind": ...}` with a status code chosen by error kind.
pub fn error_response(err: &GestureError) -> JsonResponse {
    let (status, kind) = match err.kind() {
        ErrorKind::Precondition => (409, "precondition"),
        ErrorKind::ExternalResource => (502, "external_resource"),
        ErrorKind::Computation => (500, "computation"),
    };
    json_response(status, &ErrorBody { error: err.to_string(), kind })
}

/// 400 for requests the arena itself cannot make sense of.
pub fn bad_request(message: &str) -> JsonResponse {
    json_response(400, &ErrorBody { error: message.to_owned(), kind: "bad_request" })
}

pub fn not_found() -> JsonResponse {
    text_response(404, "404 Not Found")
}

const INDEX: &str = "ferrite-gesture arena\n\
GET  /status\n\
POST /samples/{label}        body: image\n\
POST /train?epochs=N\n\
POST /train/more\n\
POST /train/stop\n\
GET  /train/events           text/event-stream\n\
POST /predict/start\n\
POST /predict/stop\n\
POST /frame?hands=N          body: image\n\
POST /model/save\n\
POST /model/load?json=PATH&weights=PATH\n\
GET  /dataset/export\n\
POST /toggle/boost\n\
POST /toggle/multiplayer\n\
POST /speed/start\n";

// ---------------------------------------------------------------------------
// Request dispatcher
// ---------------------------------------------------------------------------

/// Dispatches incoming requests to the appropriate handler.
///
/// Handlers receive a `&mut Request` so the dispatcher keeps ownership and
/// responds at the end. The SSE handler takes ownership to stream.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url = request.url().to_owned();

    let (path, query) = match url.find('?') {
        Some(pos) => (url[..pos].to_owned(), url[pos + 1..].to_owned()),
        None => (url.clone(), String::new()),
    };
    log::debug!("{} {}", method, path);

    if method == Method::Get && path == "/train/events" {
        handlers::train_sse::handle(request, state);
        return;
    }

    if method == Method::Post {
        if let Some(label) = path.strip_prefix("/samples/") {
            let label = label.to_owned();
            let response = handlers::samples::handle_add(&mut request, &label, state);
            let _ = request.respond(response);
            return;
        }
    }

    let response = match (method, path.as_str()) {
        (Method::Get, "/") => text_response(200, INDEX),
        (Method::Get, "/status") => handlers::session::handle_status(state),

        // Training
        (Method::Post, "/train") => handlers::train::handle_start(&query, state),
        (Method::Post, "/train/more") => handlers::train::handle_more(state),
        (Method::Post, "/train/stop") => handlers::train::handle_stop(state),

        // Prediction
        (Method::Post, "/predict/start") => handlers::predict::handle_start(state),
        (Method::Post, "/predict/stop") => handlers::predict::handle_stop(state),
        (Method::Post, "/frame") => handlers::predict::handle_frame(&mut request, &query, state),

        // Persistence
        (Method::Post, "/model/save") => handlers::model::handle_save(state),
        (Method::Post, "/model/load") => handlers::model::handle_load(&query, state),
        (Method::Get, "/dataset/export") => handlers::model::handle_export(state),

        // Modes
        (Method::Post, "/toggle/boost") => handlers::session::handle_toggle_boost(state),
        (Method::Post, "/toggle/multiplayer") => handlers::session::handle_toggle_multiplayer(state),
        (Method::Post, "/speed/start") => handlers::session::handle_speed_start(state),

        _ => not_found(),
    };

    let _ = request.respond(response);
}
