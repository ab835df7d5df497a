use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use serde_json::json;

use ferrite_gesture::{GestureSession, Result, TrainEvent, TrainingJob};

use crate::routes::{bad_request, error_response, json_response, JsonResponse};
use crate::state::{lock, SharedState, TrainingStatus};
use crate::util::form::query_number;

/// `POST /train?epochs=N`: full training run; `epochs` defaults to the
/// configured budget and is doubled in boost mode.
pub fn handle_start(query: &str, state: SharedState) -> JsonResponse {
    let epochs = match query_number::<usize>(query, "epochs") {
        Ok(e) => e,
        Err(msg) => return bad_request(&msg),
    };
    launch(&state, |session| {
        let epochs = epochs.unwrap_or(session.config().training.epochs);
        session.begin_training(epochs)
    })
}

/// `POST /train/more`: short fine-tuning run on the current head.
pub fn handle_more(state: SharedState) -> JsonResponse {
    launch(&state, GestureSession::begin_fine_tune)
}

/// `POST /train/stop`: asks the running job to stop before its next epoch.
pub fn handle_stop(state: SharedState) -> JsonResponse {
    let st = lock(&state);
    let stopping = match &st.training {
        TrainingStatus::Running { stop_flag, .. } => {
            stop_flag.store(true, Ordering::SeqCst);
            true
        }
        _ => false,
    };
    json_response(200, &json!({ "stopping": stopping }))
}

/// Prepares a job under the lock, then runs it on a background thread.
///
/// The session stays unlocked while the job runs; the thread locks again
/// only to hand the trained head back.
fn launch<F>(state: &SharedState, begin: F) -> JsonResponse
where
    F: FnOnce(&mut GestureSession) -> Result<TrainingJob>,
{
    let mut st = lock(state);
    let job = match begin(&mut st.session) {
        Ok(job) => job,
        Err(e) => return error_response(&e),
    };

    let (tx, rx) = mpsc::channel::<TrainEvent>();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let total_epochs = job.epochs();
    st.training = TrainingStatus::Running {
        stop_flag: stop_flag.clone(),
        event_rx: Arc::new(Mutex::new(rx)),
        total_epochs,
    };
    st.epoch_history.clear();
    drop(st);

    let job = job.with_progress(tx).with_stop_flag(stop_flag);
    let state_clone = state.clone();
    thread::spawn(move || {
        let t_start = Instant::now();
        let report = job.run();
        let elapsed_total_ms = t_start.elapsed().as_millis() as u64;

        let mut st = lock(&state_clone);
        // Events nobody streamed are still kept for `/status` and late clients.
        let pending: Vec<TrainEvent> = match &st.training {
            TrainingStatus::Running { event_rx, .. } => {
                event_rx.lock().unwrap_or_else(PoisonError::into_inner).try_iter().collect()
            }
            _ => Vec::new(),
        };
        for event in &pending {
            st.remember(event);
        }

        st.training = match st.session.finish_training(report) {
            Ok(outcome) => {
                log::info!(
                    "training finished after {} epochs in {} ms{}",
                    outcome.epochs_run,
                    elapsed_total_ms,
                    if outcome.cancelled { " (stopped)" } else if outcome.early_stopped { " (early stop)" } else { "" }
                );
                TrainingStatus::finished(&outcome, elapsed_total_ms)
            }
            Err(e) => TrainingStatus::Failed { reason: e.to_string() },
        };
    });

    json_response(202, &json!({ "started": true, "total_epochs": total_epochs }))
}
