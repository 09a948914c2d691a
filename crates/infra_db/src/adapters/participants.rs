//! PostgreSQL Participant Directory
//!
//! Implements [`ParticipantDirectory`] over the read-side copy of programme
//! data in `participant_profiles`, `schedules` and `schedule_milestones`.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, ParticipantIdentityId,
    ParticipantProfileId, PortError, ProviderId, ScheduleId,
};
use domain_declarations::{
    Cohort, CourseIdentifier, Milestone, ParticipantDirectory, ParticipantProfile, ProfileStatus,
    Schedule,
};

use crate::error::DatabaseError;
use crate::repositories::participants::{MilestoneRow, ParticipantRepository, ProfileRow, ScheduleRow};

#[derive(Debug, Clone)]
pub struct PostgresParticipantDirectory {
    repository: ParticipantRepository,
    pool: PgPool,
}

impl PostgresParticipantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ParticipantRepository::new(pool.clone()),
            pool,
        }
    }

    /// Stores a profile, replacing any with the same id
    pub async fn save_profile(&self, profile: &ParticipantProfile) -> Result<(), PortError> {
        self.repository.upsert_profile(&profile_to_row(profile)).await?;
        Ok(())
    }

    /// Stores a schedule with its milestones, replacing any with the same id
    pub async fn save_schedule(&self, schedule: &Schedule) -> Result<(), PortError> {
        let row = ScheduleRow {
            id: *schedule.id.as_uuid(),
            identifier: schedule.identifier.clone(),
            cohort: schedule.cohort.0,
        };
        let milestones: Vec<MilestoneRow> = schedule
            .milestones()
            .iter()
            .map(|m| MilestoneRow {
                declaration_type: m.declaration_type.as_str().to_string(),
                start_date: m.start_date,
                milestone_date: m.milestone_date,
            })
            .collect();
        self.repository.upsert_schedule(&row, &milestones).await?;
        Ok(())
    }
}

impl DomainPort for PostgresParticipantDirectory {}

#[async_trait]
impl HealthCheckable for PostgresParticipantDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };
        HealthCheckResult {
            adapter_id: "postgres-participant-directory".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ParticipantDirectory for PostgresParticipantDirectory {
    #[instrument(skip(self), fields(participant_id = %participant_id, course = %course))]
    async fn resolve_participant(
        &self,
        participant_id: ParticipantIdentityId,
        provider_id: ProviderId,
        course: CourseIdentifier,
    ) -> Result<Option<ParticipantProfile>, PortError> {
        let row = self
            .repository
            .find_active_profile(*participant_id.as_uuid(), *provider_id.as_uuid(), course.as_str())
            .await?;
        Ok(row.map(row_to_profile).transpose()?)
    }

    #[instrument(skip(self), fields(schedule_id = %id, cohort = %cohort))]
    async fn schedule(&self, id: ScheduleId, cohort: Cohort) -> Result<Option<Schedule>, PortError> {
        let Some((schedule, milestones)) = self.repository.get_schedule(*id.as_uuid(), cohort.0).await? else {
            return Ok(None);
        };

        let milestones = milestones
            .into_iter()
            .map(row_to_milestone)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Schedule::new(
            ScheduleId::from_uuid(schedule.id),
            schedule.identifier,
            Cohort(schedule.cohort),
            milestones,
        )))
    }
}

fn profile_status_str(status: ProfileStatus) -> &'static str {
    match status {
        ProfileStatus::Active => "active",
        ProfileStatus::Withdrawn => "withdrawn",
    }
}

fn profile_to_row(profile: &ParticipantProfile) -> ProfileRow {
    ProfileRow {
        id: *profile.id.as_uuid(),
        participant_identity_id: *profile.identity_id.as_uuid(),
        provider_id: *profile.provider_id.as_uuid(),
        course_identifier: profile.course.as_str().to_string(),
        cohort: profile.cohort.0,
        schedule_id: *profile.schedule_id.as_uuid(),
        status: profile_status_str(profile.status).to_string(),
        funding_eligible: profile.funding_eligible,
    }
}

fn row_to_profile(row: ProfileRow) -> Result<ParticipantProfile, DatabaseError> {
    let status = match row.status.as_str() {
        "active" => ProfileStatus::Active,
        "withdrawn" => ProfileStatus::Withdrawn,
        other => return Err(DatabaseError::corrupt("status", other)),
    };

    Ok(ParticipantProfile {
        id: ParticipantProfileId::from_uuid(row.id),
        identity_id: ParticipantIdentityId::from_uuid(row.participant_identity_id),
        provider_id: ProviderId::from_uuid(row.provider_id),
        course: row
            .course_identifier
            .parse()
            .map_err(|_| DatabaseError::corrupt("course_identifier", &row.course_identifier))?,
        cohort: Cohort(row.cohort),
        schedule_id: ScheduleId::from_uuid(row.schedule_id),
        status,
        funding_eligible: row.funding_eligible,
    })
}

fn row_to_milestone(row: MilestoneRow) -> Result<Milestone, DatabaseError> {
    let declaration_type = row
        .declaration_type
        .parse()
        .map_err(|_| DatabaseError::corrupt("declaration_type", &row.declaration_type))?;
    Milestone::new(declaration_type, row.start_date, row.milestone_date)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))
}
