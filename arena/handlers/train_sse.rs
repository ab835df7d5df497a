use std::sync::mpsc::RecvTimeoutError;
use std::sync::PoisonError;
use std::thread;
use std::time::Duration;

use serde_json::json;
use tiny_http::Request;

use ferrite_gesture::TrainEvent;

use crate::state::{lock, SharedState, TrainingStatus};
use crate::util::sse::{format_sse_event, format_sse_keepalive, write_sse, SSE_HEADER};

/// `GET /train/events`: Server-Sent Events stream of the running job.
///
/// Replays the epochs seen so far, then forwards every `TrainEvent` as it
/// arrives (`batch`, `epoch`, `early_stopped`), pinging every 500 ms while
/// idle. Once the job drops its sender a final `done`, `stopped` or
/// `failed` event closes the stream.
pub fn handle(request: Request, state: SharedState) {
    let mut writer = request.into_writer();
    if !write_sse(&mut writer, SSE_HEADER) {
        return;
    }

    let (event_rx, replay) = {
        let st = lock(&state);
        let rx = match &st.training {
            TrainingStatus::Running { event_rx, .. } => Some(event_rx.clone()),
            _ => None,
        };
        (rx, st.epoch_history.clone())
    };

    for stats in replay {
        if let Ok(data) = serde_json::to_string(&TrainEvent::Epoch(stats)) {
            if !write_sse(&mut writer, &format_sse_event("epoch", &data)) {
                return;
            }
        }
    }

    let rx_arc = match event_rx {
        Some(rx) => rx,
        None => {
            let _ = write_sse(&mut writer, &final_event(&state));
            return;
        }
    };

    loop {
        let result = {
            let rx = rx_arc.lock().unwrap_or_else(PoisonError::into_inner);
            rx.recv_timeout(Duration::from_millis(500))
        };

        match result {
            Ok(event) => {
                lock(&state).remember(&event);
                let data = match serde_json::to_string(&event) {
                    Ok(d) => d,
                    Err(_) => continue,
                };
                if !write_sse(&mut writer, &format_sse_event(event_name(&event), &data)) {
                    return;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !write_sse(&mut writer, format_sse_keepalive()) {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                // The sender is gone once the job returns; the head is handed
                // back a moment later.
                while lock(&state).training.is_running() {
                    thread::sleep(Duration::from_millis(50));
                }
                let _ = write_sse(&mut writer, &final_event(&state));
                return;
            }
        }
    }
}

fn event_name(event: &TrainEvent) -> &'static str {
    match event {
        TrainEvent::Batch { .. } => "batch",
        TrainEvent::Epoch(_) => "epoch",
        TrainEvent::EarlyStopped { .. } => "early_stopped",
    }
}

fn final_event(state: &SharedState) -> String {
    let st = lock(state);
    let (name, data) = match &st.training {
        TrainingStatus::Done { epochs_run, early_stopped, was_stopped, elapsed_total_ms } => (
            if *was_stopped { "stopped" } else { "done" },
            json!({
                "epochs_run": epochs_run,
                "early_stopped": early_stopped,
                "elapsed_total_ms": elapsed_total_ms,
                "stats": st.session.snapshot().stats,
            }),
        ),
        TrainingStatus::Failed { reason } => ("failed", json!({ "reason": reason })),
        TrainingStatus::Idle | TrainingStatus::Running { .. } => ("done", json!({})),
    };
    format_sse_event(name, &data.to_string())
}
