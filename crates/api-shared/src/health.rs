use crate::dto::HealthRes;

/// Simple health service shared by API surfaces.
///
/// Provides a standardised way to report liveness of the opaladmin service.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check used by load balancers and monitoring.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "opaladmin is alive".into(),
        }
    }
}
