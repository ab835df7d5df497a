use tiny_http::Request;

use ferrite_gesture::Gesture;

use crate::routes::{bad_request, error_response, json_response, JsonResponse};
use crate::state::{lock, SharedState};
use crate::util::frame::{decode_frame, read_body};

/// `POST /samples/{label}`: the body is one camera frame of `label`, given
/// as a gesture name or class index.
pub fn handle_add(request: &mut Request, label: &str, state: SharedState) -> JsonResponse {
    let gesture: Gesture = match label.parse() {
        Ok(g) => g,
        Err(e) => return bad_request(&format!("{}", e)),
    };

    // Decode before locking so a slow upload does not block the session.
    let frame = match read_body(request).and_then(|body| decode_frame(&body)) {
        Ok(f) => f,
        Err(e) => return bad_request(&e.to_string()),
    };

    let mut st = lock(&state);
    match st.session.add_sample(&frame, gesture) {
        Ok(report) => json_response(200, &report),
        Err(e) => error_response(&e),
    }
}
