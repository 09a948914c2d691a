//! Participant directory repository
//!
//! Read access to the programme's participant profiles and schedules, plus
//! the upserts used to seed them.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The active profile a provider declares against for a course
    pub async fn find_active_profile(
        &self,
        participant_identity_id: Uuid,
        provider_id: Uuid,
        course_identifier: &str,
    ) -> Result<Option<ProfileRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, participant_identity_id, provider_id, course_identifier, cohort,
                    schedule_id, status, funding_eligible
             FROM participant_profiles
             WHERE participant_identity_id = $1
               AND provider_id = $2
               AND course_identifier = $3
               AND status = 'active'
             ORDER BY id
             LIMIT 1",
        )
        .bind(participant_identity_id)
        .bind(provider_id)
        .bind(course_identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_schedule(
        &self,
        id: Uuid,
        cohort: i32,
    ) -> Result<Option<(ScheduleRow, Vec<MilestoneRow>)>, DatabaseError> {
        let schedule = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, identifier, cohort FROM schedules WHERE id = $1 AND cohort = $2",
        )
        .bind(id)
        .bind(cohort)
        .fetch_optional(&self.pool)
        .await?;

        let Some(schedule) = schedule else {
            return Ok(None);
        };

        let milestones = sqlx::query_as::<_, MilestoneRow>(
            "SELECT declaration_type, start_date, milestone_date
             FROM schedule_milestones
             WHERE schedule_id = $1
             ORDER BY start_date",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some((schedule, milestones)))
    }

    /// Inserts or replaces a schedule and its milestones in one transaction
    pub async fn upsert_schedule(
        &self,
        schedule: &ScheduleRow,
        milestones: &[MilestoneRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO schedules (id, identifier, cohort) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET identifier = EXCLUDED.identifier, cohort = EXCLUDED.cohort",
        )
        .bind(schedule.id)
        .bind(&schedule.identifier)
        .bind(schedule.cohort)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM schedule_milestones WHERE schedule_id = $1")
            .bind(schedule.id)
            .execute(&mut *tx)
            .await?;

        for milestone in milestones {
            sqlx::query(
                "INSERT INTO schedule_milestones (schedule_id, declaration_type, start_date, milestone_date)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(schedule.id)
            .bind(&milestone.declaration_type)
            .bind(milestone.start_date)
            .bind(milestone.milestone_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn upsert_profile(&self, profile: &ProfileRow) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO participant_profiles (
                id, participant_identity_id, provider_id, course_identifier, cohort,
                schedule_id, status, funding_eligible
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (id) DO UPDATE SET
                participant_identity_id = EXCLUDED.participant_identity_id,
                provider_id = EXCLUDED.provider_id,
                course_identifier = EXCLUDED.course_identifier,
                cohort = EXCLUDED.cohort,
                schedule_id = EXCLUDED.schedule_id,
                status = EXCLUDED.status,
                funding_eligible = EXCLUDED.funding_eligible",
        )
        .bind(profile.id)
        .bind(profile.participant_identity_id)
        .bind(profile.provider_id)
        .bind(&profile.course_identifier)
        .bind(profile.cohort)
        .bind(profile.schedule_id)
        .bind(&profile.status)
        .bind(profile.funding_eligible)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub participant_identity_id: Uuid,
    pub provider_id: Uuid,
    pub course_identifier: String,
    pub cohort: i32,
    pub schedule_id: Uuid,
    pub status: String,
    pub funding_eligible: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: Uuid,
    pub identifier: String,
    pub cohort: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MilestoneRow {
    pub declaration_type: String,
    pub start_date: DateTime<Utc>,
    pub milestone_date: Option<DateTime<Utc>>,
}
