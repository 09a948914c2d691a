//! Test Data Builders
//!
//! Builders with sensible defaults so a test only states the fields it is
//! about. Unspecified provider names come from `fake`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;

use core_kernel::{
    DeliveryPartnerId, InductionRecordId, ParticipantIdentityId, ParticipantProfileId,
    PartnershipId, ProviderId, ScheduleId, SchoolId,
};
use domain_declarations::{
    Cohort, CourseIdentifier, DeclarationRequest, DeclarationType, ParticipantProfile,
    ProfileStatus, Statement,
};
use domain_training::{
    EligibilityRecord, InductionRecord, InductionStatus, ParticipantRole, ProfileDuplicity,
    ProgrammeType, TeacherRecord, TrainingProfile, Uplift, ValidationData,
};

use crate::fixtures::{IdFixtures, StringFixtures, TemporalFixtures, COHORT};

// =============================================================================
// Declarations
// =============================================================================

/// Builder for participant profiles in the declaration domain
pub struct ParticipantProfileBuilder {
    profile: ParticipantProfile,
}

impl Default for ParticipantProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantProfileBuilder {
    /// An active, fundable ECF induction profile on the September schedule
    pub fn new() -> Self {
        Self {
            profile: ParticipantProfile {
                id: ParticipantProfileId::new(),
                identity_id: ParticipantIdentityId::new(),
                provider_id: IdFixtures::provider_id(),
                course: CourseIdentifier::EcfInduction,
                cohort: COHORT,
                schedule_id: IdFixtures::schedule_id(),
                status: ProfileStatus::Active,
                funding_eligible: true,
            },
        }
    }

    pub fn with_identity(mut self, identity: ParticipantIdentityId) -> Self {
        self.profile.identity_id = identity;
        self
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.profile.provider_id = provider;
        self
    }

    pub fn with_course(mut self, course: CourseIdentifier) -> Self {
        self.profile.course = course;
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleId) -> Self {
        self.profile.schedule_id = schedule;
        self
    }

    pub fn not_fundable(mut self) -> Self {
        self.profile.funding_eligible = false;
        self
    }

    pub fn withdrawn(mut self) -> Self {
        self.profile.status = ProfileStatus::Withdrawn;
        self
    }

    pub fn build(self) -> ParticipantProfile {
        self.profile
    }
}

/// Builder for statements
pub struct StatementBuilder {
    name: String,
    provider_id: ProviderId,
    provider_name: Option<String>,
    cohort: Cohort,
    deadline: DateTime<Utc>,
    output_fee: bool,
    paid_at: Option<DateTime<Utc>>,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementBuilder {
    /// The November 2021 output-fee statement for the fixture provider
    pub fn new() -> Self {
        Self {
            name: StringFixtures::november_statement().to_string(),
            provider_id: IdFixtures::provider_id(),
            provider_name: Some(StringFixtures::provider_name().to_string()),
            cohort: COHORT,
            deadline: TemporalFixtures::november_deadline(),
            output_fee: true,
            paid_at: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uses a new provider with a generated name
    pub fn for_random_provider(mut self) -> Self {
        self.provider_id = ProviderId::new();
        self.provider_name = None;
        self
    }

    pub fn for_provider(mut self, id: ProviderId, name: impl Into<String>) -> Self {
        self.provider_id = id;
        self.provider_name = Some(name.into());
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_output_fee(mut self, output_fee: bool) -> Self {
        self.output_fee = output_fee;
        self
    }

    pub fn paid_at(mut self, at: DateTime<Utc>) -> Self {
        self.paid_at = Some(at);
        self
    }

    pub fn build(self) -> Statement {
        let provider_name = self.provider_name.unwrap_or_else(|| CompanyName().fake());
        let mut statement = Statement::new(
            self.name,
            self.provider_id,
            provider_name,
            self.cohort,
            self.deadline,
            self.output_fee,
        );
        statement.paid_at = self.paid_at;
        statement
    }
}

/// Builder for raw declaration requests as a provider would send them
pub struct DeclarationRequestBuilder {
    request: DeclarationRequest,
}

impl DeclarationRequestBuilder {
    /// A `started` declaration for `profile` on the fixture declaration date
    pub fn for_profile(profile: &ParticipantProfile) -> Self {
        Self {
            request: DeclarationRequest {
                participant_id: profile.identity_id.as_uuid().to_string(),
                course_identifier: profile.course.as_str().to_string(),
                declaration_type: DeclarationType::Started.as_str().to_string(),
                declaration_date: TemporalFixtures::started_declaration_date().to_rfc3339(),
                evidence_held: None,
            },
        }
    }

    /// Sets the type, adding evidence where ECF courses require it
    pub fn of_type(mut self, declaration_type: DeclarationType) -> Self {
        self.request.declaration_type = declaration_type.as_str().to_string();
        if declaration_type != DeclarationType::Started && self.request.evidence_held.is_none() {
            self.request.evidence_held = Some("training-event-attended".to_string());
        }
        self
    }

    pub fn on(mut self, declaration_date: DateTime<Utc>) -> Self {
        self.request.declaration_date = declaration_date.to_rfc3339();
        self
    }

    pub fn with_evidence(mut self, evidence: Option<&str>) -> Self {
        self.request.evidence_held = evidence.map(str::to_string);
        self
    }

    pub fn build(self) -> DeclarationRequest {
        self.request
    }
}

// =============================================================================
// Training records
// =============================================================================

/// Builder for training-record inputs
///
/// Defaults to an ECT every cascade layer passes for, with one active FIP
/// induction record that started six months before the fixture clock.
pub struct TrainingProfileBuilder {
    profile: TrainingProfile,
}

impl TrainingProfileBuilder {
    pub fn new(role: ParticipantRole) -> Self {
        let id = ParticipantProfileId::new();
        Self {
            profile: TrainingProfile {
                id,
                role,
                status: domain_training::ProfileStatus::Active,
                validation_data: Some(ValidationData {
                    trn: StringFixtures::trn().to_string(),
                    full_name: Name().fake(),
                    date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
                }),
                teacher_record: Some(TeacherRecord {
                    trn: StringFixtures::trn().to_string(),
                }),
                request_for_details: None,
                eligibility: Some(EligibilityRecord::eligible()),
                uplift: Uplift::default(),
                duplicity: ProfileDuplicity::Single,
                mentee_count: 0,
                induction_completion_date: None,
                mentor_completion_date: None,
                induction_records: vec![InductionRecordBuilder::new(id).build()],
            },
        }
    }

    pub fn ect() -> Self {
        Self::new(ParticipantRole::Ect)
    }

    pub fn mentor() -> Self {
        Self::new(ParticipantRole::Mentor)
    }

    pub fn id(&self) -> ParticipantProfileId {
        self.profile.id
    }

    pub fn withdrawn(mut self) -> Self {
        self.profile.status = domain_training::ProfileStatus::Withdrawn;
        self
    }

    pub fn without_validation_data(mut self) -> Self {
        self.profile.validation_data = None;
        self
    }

    pub fn with_eligibility(mut self, eligibility: Option<EligibilityRecord>) -> Self {
        self.profile.eligibility = eligibility;
        self
    }

    pub fn with_duplicity(mut self, duplicity: ProfileDuplicity) -> Self {
        self.profile.duplicity = duplicity;
        self
    }

    pub fn with_mentees(mut self, count: u32) -> Self {
        self.profile.mentee_count = count;
        self
    }

    pub fn with_induction_records(mut self, records: Vec<InductionRecord>) -> Self {
        self.profile.induction_records = records;
        self
    }

    pub fn build(self) -> TrainingProfile {
        self.profile
    }
}

/// Builder for induction records
pub struct InductionRecordBuilder {
    record: InductionRecord,
}

impl InductionRecordBuilder {
    pub fn new(profile: ParticipantProfileId) -> Self {
        let now = TemporalFixtures::now();
        Self {
            record: InductionRecord {
                id: InductionRecordId::new(),
                participant_profile_id: profile,
                programme: ProgrammeType::Fip,
                partnership_id: Some(PartnershipId::new()),
                school_id: SchoolId::new(),
                delivery_partner_id: Some(DeliveryPartnerId::new()),
                training_status: InductionStatus::Active,
                start_date: now - Duration::days(180),
                end_date: None,
                created_at: now - Duration::days(200),
            },
        }
    }

    pub fn with_status(mut self, status: InductionStatus) -> Self {
        self.record.training_status = status;
        self
    }

    pub fn with_programme(mut self, programme: ProgrammeType) -> Self {
        self.record.programme = programme;
        self
    }

    pub fn at_school(mut self, school: SchoolId) -> Self {
        self.record.school_id = school;
        self
    }

    pub fn with_delivery_partner(mut self, partner: Option<DeliveryPartnerId>) -> Self {
        self.record.delivery_partner_id = partner;
        self
    }

    pub fn starting(mut self, start: DateTime<Utc>) -> Self {
        self.record.start_date = start;
        self
    }

    pub fn build(self) -> InductionRecord {
        self.record
    }
}
