use crate::wire::HealthRes;

/// Health status reported by the REST API's `/health` endpoint.
pub struct HealthService;

impl HealthService {
    /// Health status naming the active storage backend.
    pub fn check_health_for(backend: &str) -> HealthRes {
        HealthRes {
            ok: true,
            message: format!("Klinik is alive ({backend} backend)"),
        }
    }
}
