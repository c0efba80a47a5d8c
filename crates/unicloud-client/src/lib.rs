pub mod api;
pub mod connectivity;
pub mod error;
pub mod mock;
pub mod session;

pub use api::{DesignBackend, HttpBackend, TerraformArchive, ZIP_CONTENT_TYPE};
pub use connectivity::{
    Clock, ConnectivityMonitor, ConnectivityStatus, HealthProbe, ProbeResponse, SystemClock,
    CACHE_WINDOW, PROBE_TIMEOUT,
};
pub use error::ClientError;
pub use mock::{
    estimate_monthly_cost, mock_scenarios, provider_stats, select_scenario, MockBackend,
    MockTiming, ScenarioInfo,
};
pub use session::{DesignOutcome, DesignSession, INITIAL_DESIGN_MESSAGE};

use tracing::info;
use unicloud_core::AppConfig;

/// Pick the backend the configuration asks for.
pub fn backend_for(config: &AppConfig) -> Box<dyn DesignBackend> {
    if config.enable_mock_mode {
        info!("mock mode enabled, design service will not be contacted");
        Box::new(MockBackend::simulated())
    } else {
        info!(base_url = %config.api_base_url, "using design service");
        Box::new(HttpBackend::new(&config.api_base_url))
    }
}
