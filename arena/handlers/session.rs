use std::time::Instant;

use serde_json::json;

use crate::routes::{error_response, json_response, JsonResponse};
use crate::state::{lock, SharedState};

/// `GET /status`
pub fn handle_status(state: SharedState) -> JsonResponse {
    let st = lock(&state);
    json_response(200, &st.status())
}

/// `POST /toggle/boost`
pub fn handle_toggle_boost(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    let boost = st.session.toggle_boost();
    json_response(200, &json!({ "boost": boost }))
}

/// `POST /toggle/multiplayer`
pub fn handle_toggle_multiplayer(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    let multiplayer = st.session.toggle_multiplayer();
    json_response(200, &json!({ "multiplayer": multiplayer, "num_classes": st.session.num_classes() }))
}

/// `POST /speed/start`
pub fn handle_speed_start(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    match st.session.start_speed_challenge(Instant::now()) {
        Ok(()) => json_response(200, &json!({ "remaining": st.session.table().speed_remaining() })),
        Err(e) => error_response(&e),
    }
}
