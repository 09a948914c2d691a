//! Course vocabulary
//!
//! Courses, declaration types and evidence values arrive from provider APIs
//! as strings; they are parsed once into closed enums here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a vocabulary string is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownValue { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

vocabulary!(
    /// Programme course a declaration is made against
    CourseIdentifier, "course identifier" {
        EcfInduction => "ecf-induction",
        EcfMentor => "ecf-mentor",
        NpqLeadingTeaching => "npq-leading-teaching",
        NpqLeadingBehaviourCulture => "npq-leading-behaviour-culture",
        NpqLeadingTeachingDevelopment => "npq-leading-teaching-development",
        NpqSeniorLeadership => "npq-senior-leadership",
        NpqHeadship => "npq-headship",
        NpqExecutiveLeadership => "npq-executive-leadership",
    }
);

vocabulary!(
    /// The training milestone being claimed
    DeclarationType, "declaration type" {
        Started => "started",
        Retained1 => "retained-1",
        Retained2 => "retained-2",
        Retained3 => "retained-3",
        Retained4 => "retained-4",
        Extended1 => "extended-1",
        Extended2 => "extended-2",
        Extended3 => "extended-3",
        Completed => "completed",
    }
);

vocabulary!(
    /// What the provider holds as evidence of the milestone
    EvidenceHeld, "evidence held" {
        TrainingEventAttended => "training-event-attended",
        SelfStudyMaterialCompleted => "self-study-material-completed",
        MaterialsEngagedWithOffline => "materials-engaged-with-offline",
        Other => "other",
    }
);

impl CourseIdentifier {
    pub fn is_ecf(&self) -> bool {
        matches!(self, CourseIdentifier::EcfInduction | CourseIdentifier::EcfMentor)
    }

    /// Declaration types a provider may submit for this course
    pub fn valid_declaration_types(&self) -> &'static [DeclarationType] {
        use DeclarationType::*;
        if self.is_ecf() {
            &[
                Started, Retained1, Retained2, Retained3, Retained4,
                Extended1, Extended2, Extended3, Completed,
            ]
        } else {
            &[Started, Retained1, Retained2, Completed]
        }
    }

    pub fn accepts(&self, declaration_type: DeclarationType) -> bool {
        self.valid_declaration_types().contains(&declaration_type)
    }

    /// ECF milestones after `started` must state the evidence held
    pub fn requires_evidence(&self, declaration_type: DeclarationType) -> bool {
        self.is_ecf() && declaration_type != DeclarationType::Started
    }
}
