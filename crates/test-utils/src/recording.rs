use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use launcher::errors::Result;
use launcher::launch::{LaunchBackend, LaunchOutcome, LaunchPlan};

/// PID reported for every recorded launch.
pub const FAKE_PID: u32 = 4_000_000;

/// A fake backend that:
/// - records every plan it is handed
/// - reports `Started` with [`FAKE_PID`] without spawning anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    plans: Arc<Mutex<Vec<LaunchPlan>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plans(&self) -> Vec<LaunchPlan> {
        self.plans.lock().unwrap().clone()
    }

    /// The single recorded plan; panics if there isn't exactly one.
    pub fn only_plan(&self) -> LaunchPlan {
        let plans = self.plans();
        assert_eq!(plans.len(), 1, "expected exactly one launch");
        plans.into_iter().next().unwrap()
    }
}

impl LaunchBackend for RecordingBackend {
    fn launch<'a>(
        &'a self,
        plan: &'a LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchOutcome>> + Send + 'a>> {
        let plans = Arc::clone(&self.plans);
        Box::pin(async move {
            plans.lock().unwrap().push(plan.clone());
            Ok(LaunchOutcome::Started { pid: FAKE_PID })
        })
    }
}
