/// Challenge registration and scorecard updates
///
/// Registration turns an `unregistered` account into a `registered` one:
/// it validates the form, creates the organization if it is new, assigns or
/// generates a family code and prepares the participants' scorecards.
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use nhc_shared::models::globals::Globals;
/// use nhc_shared::models::user::User;
/// use nhc_shared::profanity::DisabledProfanityFilter;
/// use nhc_shared::registration::{register, update_scorecard, RegistrationRequest};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, user: User) -> Result<(), Box<dyn std::error::Error>> {
/// let globals = Globals::load(&pool).await?;
///
/// let request: RegistrationRequest = serde_json::from_str(
///     r#"{"donation": "none", "sharing": "everyone", "participants": [{"firstName": "Ada"}]}"#,
/// )?;
/// let user = register(&pool, user, request, &globals, &DisabledProfanityFilter).await?;
///
/// let today = Utc::now().date_naive();
/// let participant = update_scorecard(&pool, user, 0, &[vec![1, 1, 0]], &globals, today).await?;
/// println!("{} points", participant.points);
/// # Ok(())
/// # }
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::messages::{
    BAD_CHOICE_ERROR, DONATIONS, FAMILY_ERROR, PARTICIPANTS_ERROR, PROFANITY_ERROR,
    REQUIRED_ERROR, SHARING,
};
use crate::models::family::{Family, FamilyError};
use crate::models::globals::Globals;
use crate::models::organization::Organization;
use crate::models::participant::{
    current_challenge_day, normalize_scorecard, prepare_participants, Participant,
};
use crate::models::role::UserStatus;
use crate::models::user::User;
use crate::profanity::ProfanityFilter;

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationRequest {
    pub organization: String,
    pub comment: String,
    pub referral: String,
    pub donation: String,
    pub sharing: String,
    pub participants: Vec<Participant>,

    /// Generate a new family code when `family_code` is empty
    pub family: bool,

    /// Existing family code to join
    pub family_code: String,
}

/// Validation message for one form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Error type for the registration workflow
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("You must confirm your e-mail address before registering.")]
    EmailNotConfirmed,

    #[error("You are already registered.")]
    AlreadyRegistered,

    #[error("You are not allowed to register. Please contact an Administrator.")]
    NotAllowed,

    #[error("Registration is closed.")]
    RegistrationClosed,

    /// Form failed validation; every problem is listed
    #[error("Registration form is invalid")]
    Invalid(Vec<FieldError>),

    #[error("Scorecard updates are currently disabled.")]
    ScorecardDisabled,

    #[error("Participant {0} not found.")]
    UnknownParticipant(usize),

    #[error(transparent)]
    Family(#[from] FamilyError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Checks whether an account in `status` may register now
pub fn check_eligibility(status: UserStatus, registration_open: bool) -> Result<(), RegistrationError> {
    match status {
        UserStatus::Unconfirmed => return Err(RegistrationError::EmailNotConfirmed),
        UserStatus::Registered => return Err(RegistrationError::AlreadyRegistered),
        UserStatus::Unregistered => {}
        UserStatus::Pending => return Err(RegistrationError::NotAllowed),
    }

    if !registration_open {
        return Err(RegistrationError::RegistrationClosed);
    }

    Ok(())
}

fn check_choice(errors: &mut Vec<FieldError>, field: &str, value: &str, choices: &[&str]) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, REQUIRED_ERROR));
    } else if !choices.contains(&value) {
        errors.push(FieldError::new(field, BAD_CHOICE_ERROR));
    }
}

/// Checks the fields that need neither the database nor the profanity filter
pub fn validate_choices(request: &RegistrationRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    check_choice(&mut errors, "donation", &request.donation, &DONATIONS);
    check_choice(&mut errors, "sharing", &request.sharing, &SHARING);

    if request.participants.is_empty() {
        errors.push(FieldError::new("participants", PARTICIPANTS_ERROR));
    }

    errors
}

/// Runs every form check and collects all problems
pub async fn validate(
    pool: &PgPool,
    request: &RegistrationRequest,
    filter: &dyn ProfanityFilter,
) -> Result<Vec<FieldError>, sqlx::Error> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("organization", &request.organization),
        ("comment", &request.comment),
        ("referral", &request.referral),
    ] {
        if !value.trim().is_empty() && filter.is_profane(value).await {
            errors.push(FieldError::new(field, PROFANITY_ERROR));
        }
    }

    errors.extend(validate_choices(request));

    let family_code = request.family_code.trim();
    if !family_code.is_empty() && !Family::exists(pool, family_code).await? {
        errors.push(FieldError::new("familyCode", FAMILY_ERROR));
    }

    Ok(errors)
}

/// Registers `user` for the challenge
///
/// # Returns
///
/// The saved, now `registered` user
///
/// # Errors
///
/// - Eligibility errors, see [`check_eligibility`]
/// - `RegistrationError::Invalid` with every failing field
pub async fn register(
    pool: &PgPool,
    mut user: User,
    request: RegistrationRequest,
    globals: &Globals,
    filter: &dyn ProfanityFilter,
) -> Result<User, RegistrationError> {
    check_eligibility(user.status, globals.registration_open)?;

    let errors = validate(pool, &request, filter).await?;
    if !errors.is_empty() {
        return Err(RegistrationError::Invalid(errors));
    }

    let organization = request.organization.trim();
    if !organization.is_empty() {
        Organization::create_if_absent(pool, organization, true).await?;
    }

    let family_code = request.family_code.trim().to_uppercase();
    user.family = if !family_code.is_empty() {
        Some(family_code)
    } else if request.family {
        Some(Family::create_unique(pool, &user.last_name).await?.code)
    } else {
        None
    };

    user.organization = Some(organization.to_string()).filter(|org| !org.is_empty());
    user.comment = request.comment;
    user.referral = request.referral;
    user.donation = request.donation;
    user.sharing = request.sharing;
    user.participants.0 = prepare_participants(request.participants, globals.length_days());
    user.status = UserStatus::Registered;

    let user = user.save(pool).await?;

    tracing::info!(
        user_id = %user.id,
        participants = user.participants.len(),
        organization = ?user.organization,
        family = ?user.family,
        "User registered"
    );

    Ok(user)
}

/// Replaces a participant's scorecard and recomputes their points
///
/// # Errors
///
/// - `RegistrationError::ScorecardDisabled` outside the scoring period
/// - `RegistrationError::UnknownParticipant` if `participant_id` is not one
///   of the user's participants
pub async fn update_scorecard(
    pool: &PgPool,
    mut user: User,
    participant_id: usize,
    submitted: &[Vec<i64>],
    globals: &Globals,
    today: NaiveDate,
) -> Result<Participant, RegistrationError> {
    if !globals.scorecard_enabled {
        return Err(RegistrationError::ScorecardDisabled);
    }

    let current_day = current_challenge_day(globals.challenge_start, today);
    let (scorecard, points) = normalize_scorecard(submitted, current_day, globals.length_days());

    let participant = user
        .participants
        .iter_mut()
        .find(|participant| participant.id == participant_id)
        .ok_or(RegistrationError::UnknownParticipant(participant_id))?;

    participant.scorecard = scorecard;
    participant.points = points;
    let updated = participant.clone();

    user.save(pool).await?;

    tracing::debug!(user_id = %user.id, participant_id, points, "Scorecard updated");

    Ok(updated)
}
