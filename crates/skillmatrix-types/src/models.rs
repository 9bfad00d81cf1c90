use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a snake_case string enum that round-trips through SQLite text
/// columns and JSON with the same spelling.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

string_enum!(
    /// What a profile is on the platform.
    Role, "role" {
        Candidate => "candidate",
        Employer => "employer",
        Admin => "admin",
    }
);

string_enum!(
    /// Review state of an application. Every status is reachable from every
    /// other; the company decides.
    ApplicationStatus, "application status" {
        Pending => "pending",
        Reviewed => "reviewed",
        Interviewed => "interviewed",
        Accepted => "accepted",
        Rejected => "rejected",
    }
);

string_enum!(
    MessageType, "message type" {
        Text => "text",
        VideoCallInvite => "video_call_invite",
        VideoCallEnded => "video_call_ended",
    }
);

string_enum!(
    /// Video call lifecycle: scheduled -> active -> ended, or
    /// scheduled -> cancelled.
    CallStatus, "call status" {
        Scheduled => "scheduled",
        Active => "active",
        Ended => "ended",
        Cancelled => "cancelled",
    }
);

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Cancelled)
    }
}

string_enum!(
    EmploymentType, "employment type" {
        FullTime => "full_time",
        PartTime => "part_time",
        Contract => "contract",
        Internship => "internship",
        Remote => "remote",
    }
);

string_enum!(
    JobStatus, "job status" {
        Open => "open",
        Closed => "closed",
        Draft => "draft",
    }
);

string_enum!(
    AvailabilityStatus, "availability status" {
        Open => "open",
        Passive => "passive",
        Unavailable => "unavailable",
    }
);

string_enum!(
    NotificationKind, "notification type" {
        Application => "application",
        ApplicationStatus => "application_status",
        Message => "message",
        VideoCall => "video_call",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.as_str().parse::<ApplicationStatus>().unwrap(), *status);
        }
        for status in CallStatus::ALL {
            assert_eq!(status.as_str().parse::<CallStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "hired".parse::<ApplicationStatus>().unwrap_err();
        assert_eq!(err.kind, "application status");
        assert_eq!(err.to_string(), "unknown application status: 'hired'");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MessageType::VideoCallInvite).unwrap();
        assert_eq!(json, "\"video_call_invite\"");
        let parsed: EmploymentType = serde_json::from_str("\"full_time\"").unwrap();
        assert_eq!(parsed, EmploymentType::FullTime);
    }

    #[test]
    fn only_ended_and_cancelled_are_terminal() {
        assert!(!CallStatus::Scheduled.is_terminal());
        assert!(!CallStatus::Active.is_terminal());
        assert!(CallStatus::Ended.is_terminal());
        assert!(CallStatus::Cancelled.is_terminal());
    }
}
