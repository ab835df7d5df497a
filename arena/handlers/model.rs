use std::path::PathBuf;

use serde_json::json;

use ferrite_gesture::{ModelFiles, DATASET_FILE};

use crate::routes::{error_response, json_download_response, json_response, JsonResponse};
use crate::state::{lock, SharedState};
use crate::util::form::{form_get, parse_form};

/// `POST /model/save`
pub fn handle_save(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    match st.session.save_model() {
        Ok(files) => json_response(200, &files),
        Err(e) => error_response(&e),
    }
}

/// `POST /model/load[?json=PATH[&weights=PATH]]`
///
/// Without `json` only the local and bundled sources are tried. A missing
/// `weights` path defaults to the file next to `json`.
pub fn handle_load(query: &str, state: SharedState) -> JsonResponse {
    let pairs = parse_form(query);
    let manual = form_get(&pairs, "json").filter(|p| !p.is_empty()).map(|json| {
        match form_get(&pairs, "weights").filter(|p| !p.is_empty()) {
            Some(weights) => ModelFiles { json: PathBuf::from(json), weights: PathBuf::from(weights) },
            None => ModelFiles::beside(json),
        }
    });

    let mut st = lock(&state);
    match st.session.load_model(manual.as_ref()) {
        Ok(source) => json_response(200, &json!({ "source": source, "num_classes": st.session.head().map(|h| h.num_classes()) })),
        Err(e) => error_response(&e),
    }
}

/// `GET /dataset/export`
pub fn handle_export(state: SharedState) -> JsonResponse {
    let mut st = lock(&state);
    match st.session.export_dataset().and_then(|export| export.to_json()) {
        Ok(body) => json_download_response(body, DATASET_FILE),
        Err(e) => error_response(&e),
    }
}
