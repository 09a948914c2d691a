//! Shared fixtures for the declaration service tests
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use core_kernel::{FixedClock, ParticipantIdentityId, ParticipantProfileId, ProviderId, ScheduleId, Timezone};
use domain_declarations::adapters::{InMemoryDeclarationStore, InMemoryParticipantDirectory};
use domain_declarations::{
    Cohort, CourseIdentifier, Declaration, DeclarationRequest, DeclarationStore, DeclarationType,
    FundingServices, Milestone, ParticipantProfile, ProfileStatus, Schedule, Statement,
};

pub const COHORT: Cohort = Cohort(2021);

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The standard September schedule for the 2021 cohort
pub fn september_schedule() -> Schedule {
    let tz = Timezone::default();
    let milestones = vec![
        Milestone::from_dates(DeclarationType::Started, date(2021, 9, 1), Some(date(2021, 11, 30)), tz).unwrap(),
        Milestone::from_dates(DeclarationType::Retained1, date(2021, 11, 1), Some(date(2022, 1, 31)), tz).unwrap(),
        Milestone::from_dates(DeclarationType::Completed, date(2021, 9, 1), None, tz).unwrap(),
    ];
    Schedule::new(ScheduleId::new(), "ecf-standard-september", COHORT, milestones)
}

pub struct Harness {
    pub store: Arc<InMemoryDeclarationStore>,
    pub directory: Arc<InMemoryParticipantDirectory>,
    pub clock: FixedClock,
    pub services: FundingServices,
    pub provider: ProviderId,
    pub schedule: Schedule,
    pub november: Statement,
    pub december: Statement,
}

impl Harness {
    /// Clock at 15 October 2021; November and December output-fee statements
    pub async fn new() -> Self {
        let provider = ProviderId::new();
        let november = Statement::new("November 2021", provider, "Ambition Institute", COHORT, utc(2021, 11, 30, 23), true);
        let december = Statement::new("December 2021", provider, "Ambition Institute", COHORT, utc(2021, 12, 31, 23), true);
        let store = Arc::new(InMemoryDeclarationStore::with_statements(vec![november.clone(), december.clone()]).await);

        let schedule = september_schedule();
        let directory = Arc::new(InMemoryParticipantDirectory::new());
        directory.add_schedule(schedule.clone()).await;

        let clock = FixedClock::at(utc(2021, 10, 15, 12));
        let services = FundingServices::new(store.clone(), directory.clone(), Arc::new(clock.clone()));

        Self { store, directory, clock, services, provider, schedule, november, december }
    }

    /// Enrols a new person on ECF induction with the harness provider
    pub async fn enrol(&self, funding_eligible: bool) -> ParticipantProfile {
        self.enrol_as(ParticipantIdentityId::new(), CourseIdentifier::EcfInduction, funding_eligible)
            .await
    }

    pub async fn enrol_as(
        &self,
        identity: ParticipantIdentityId,
        course: CourseIdentifier,
        funding_eligible: bool,
    ) -> ParticipantProfile {
        let profile = ParticipantProfile {
            id: ParticipantProfileId::new(),
            identity_id: identity,
            provider_id: self.provider,
            course,
            cohort: COHORT,
            schedule_id: self.schedule.id,
            status: ProfileStatus::Active,
            funding_eligible,
        };
        self.directory.add_profile(profile.clone()).await;
        profile
    }

    pub async fn withdraw(&self, profile: &ParticipantProfile) {
        let mut withdrawn = profile.clone();
        withdrawn.status = ProfileStatus::Withdrawn;
        self.directory.update_profile(withdrawn).await;
    }

    pub fn request(
        &self,
        profile: &ParticipantProfile,
        declaration_type: DeclarationType,
        declaration_date: DateTime<Utc>,
    ) -> DeclarationRequest {
        DeclarationRequest {
            participant_id: profile.identity_id.as_uuid().to_string(),
            course_identifier: profile.course.as_str().to_string(),
            declaration_type: declaration_type.as_str().to_string(),
            declaration_date: declaration_date.to_rfc3339(),
            evidence_held: (declaration_type != DeclarationType::Started)
                .then(|| "training-event-attended".to_string()),
        }
    }

    /// Creates an eligible `started` declaration on the November statement
    pub async fn eligible_declaration(&self) -> Declaration {
        let profile = self.enrol(true).await;
        self.services
            .declarations
            .create_declaration(self.provider, &self.request(&profile, DeclarationType::Started, utc(2021, 10, 1, 9)))
            .await
            .unwrap()
            .declaration
    }

    /// Takes a new declaration through to paid and moves the clock past
    /// the November deadline
    pub async fn paid_declaration(&self) -> Declaration {
        let declaration = self.eligible_declaration().await;
        self.services.ledger.mark_payable(self.november.id).await.unwrap();
        self.clock.set(utc(2021, 12, 5, 12));
        self.services.ledger.mark_paid(self.november.id).await.unwrap();
        self.reload(&declaration).await
    }

    pub async fn reload(&self, declaration: &Declaration) -> Declaration {
        self.store.get_declaration(declaration.id).await.unwrap().unwrap()
    }
}
