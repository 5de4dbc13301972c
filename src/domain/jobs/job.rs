use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JobCategory {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub staff_only: bool,
    pub always_required: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub category_id: Uuid,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub max_registrations: i32,
    /// Copied from the category whenever the job or its category is written.
    pub staff_only: bool,
    pub always_required: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A job together with the number of live (PENDING or CONFIRMED) registrations holding it.
#[derive(Debug, Clone)]
pub struct JobWithCount {
    pub job: Job,
    pub registration_count: i64,
}

impl JobWithCount {
    pub fn is_full(&self) -> bool {
        self.registration_count >= i64::from(self.job.max_registrations)
    }
}
