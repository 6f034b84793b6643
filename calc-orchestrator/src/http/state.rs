use std::sync::Arc;

use calc_shared::config::AppConfig;

use crate::scheduler::Scheduler;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}
