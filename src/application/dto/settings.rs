/// Camp-wide registration settings loaded from configuration.
#[derive(Debug, Clone)]
pub struct CampSettings {
    pub camp_name: String,
    pub registration_year: i32,
    pub registration_open: bool,
    pub early_registration_open: bool,
}

impl CampSettings {
    /// Whether a user with the given permission flags may register right now.
    pub fn registration_open_for(&self, allow_registration: bool, allow_early: bool) -> bool {
        (self.registration_open && allow_registration)
            || (self.early_registration_open && allow_early)
    }
}
