use klinik_core::config::AdminCredentials;

/// Request header carrying the admin username on protected routes.
pub const USERNAME_HEADER: &str = "x-username";
/// Request header carrying the admin password on protected routes.
pub const PASSWORD_HEADER: &str = "x-password";

/// Validates header credentials against the configured admin pair.
///
/// Returns `Ok(())` if both headers are present and match literally, or a short reason
/// suitable for a 401 response otherwise. Header checks are not written to the login audit log.
pub fn validate_admin_headers(
    expected: &AdminCredentials,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<(), &'static str> {
    let (Some(username), Some(password)) = (username, password) else {
        return Err("Missing admin credentials");
    };

    if expected.matches(username, password) {
        Ok(())
    } else {
        Err("Invalid admin credentials")
    }
}
