use std::sync::atomic::Ordering;
use std::time::Instant;

use serde_json::json;
use tiny_http::Request;

use crate::routes::{bad_request, error_response, json_response, JsonResponse};
use crate::state::{lock, SharedState};
use crate::util::form::query_number;
use crate::util::frame::{decode_frame, read_body};

/// `POST /predict/start`
pub fn handle_start(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    match st.session.start_predicting() {
        Ok(()) => json_response(200, &json!({ "predicting": true })),
        Err(e) => error_response(&e),
    }
}

/// `POST /predict/stop`
pub fn handle_stop(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    st.session.stop_predicting();
    json_response(200, &json!({ "predicting": false }))
}

/// `POST /frame?hands=N`: one inference tick on the posted frame.
///
/// Hand tracking runs in the client; `hands` is the count it saw in this
/// frame and defaults to one.
pub fn handle_frame(request: &mut Request, query: &str, state: SharedState) -> JsonResponse {
    let hands = match query_number::<usize>(query, "hands") {
        Ok(h) => h.unwrap_or(1),
        Err(msg) => return bad_request(&msg),
    };
    let frame = match read_body(request).and_then(|body| decode_frame(&body)) {
        Ok(f) => f,
        Err(e) => return bad_request(&e.to_string()),
    };

    let mut st = lock(&state);
    st.hands.store(hands, Ordering::SeqCst);
    match st.session.tick(&frame, Instant::now()) {
        Ok(outcome) => json_response(200, &outcome),
        Err(e) => error_response(&e),
    }
}
