use crate::error::RejectReason;
use serde::Serialize;
use serde_json::Value;

/// Which landing-page form produced the submission.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Waitlist,
    Demo,
}

impl SubmissionKind {
    fn from_tag(tag: &Value) -> Option<Self> {
        match tag.as_str() {
            Some("waitlist") => Some(SubmissionKind::Waitlist),
            Some("demo") => Some(SubmissionKind::Demo),
            _ => None,
        }
    }
}

/// A submission that passed validation.
///
/// The two kinds carry different optional-field semantics: only demo
/// requests have a referrer, so it lives on the `Demo` variant instead of
/// being a nullable field shared by both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Waitlist {
        name: String,
        email: String,
    },
    Demo {
        name: String,
        email: String,
        referrer: String,
    },
}

impl Submission {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Submission::Waitlist { .. } => SubmissionKind::Waitlist,
            Submission::Demo { .. } => SubmissionKind::Demo,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Submission::Waitlist { name, .. } | Submission::Demo { name, .. } => name,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Submission::Waitlist { email, .. } | Submission::Demo { email, .. } => email,
        }
    }
}

/// Validate an untrusted request body into a [`Submission`].
///
/// Checks run in a fixed order and stop at the first failure, so the caller
/// always gets the most specific reason. Re-validating the same bytes yields
/// the same classification.
pub fn validate(body: &[u8]) -> Result<Submission, RejectReason> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RejectReason::InvalidBody)?;
    let Value::Object(fields) = value else {
        return Err(RejectReason::InvalidBody);
    };

    let kind = fields
        .get("kind")
        .and_then(SubmissionKind::from_tag)
        .ok_or(RejectReason::InvalidKind)?;

    let name = trimmed_string(fields.get("name")).ok_or(RejectReason::InvalidName)?;
    if name.chars().count() < 2 {
        return Err(RejectReason::InvalidName);
    }

    let email = trimmed_string(fields.get("email")).ok_or(RejectReason::InvalidEmail)?;
    if !is_valid_email(email) {
        return Err(RejectReason::InvalidEmail);
    }
    let email = email.to_lowercase();

    Ok(match kind {
        SubmissionKind::Waitlist => Submission::Waitlist {
            name: name.to_owned(),
            email,
        },
        SubmissionKind::Demo => Submission::Demo {
            name: name.to_owned(),
            email,
            // Absent or non-string referrers collapse to empty rather than
            // rejecting; the field is best-effort attribution.
            referrer: trimmed_string(fields.get("referrer")).unwrap_or("").to_owned(),
        },
    })
}

/// String coercion: `Some` only for string values that are nonempty after
/// trimming.
fn trimmed_string(value: Option<&Value>) -> Option<&str> {
    let s = value?.as_str()?.trim();
    (!s.is_empty()).then_some(s)
}

/// `local@domain.tld` where each of the three runs is nonempty and free of
/// whitespace and `@`. A liberal syntactic check, no deliverability claim.
fn is_valid_email(email: &str) -> bool {
    fn run_ok(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| !c.is_whitespace() && c != '@')
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    run_ok(local) && run_ok(host) && run_ok(tld)
}
