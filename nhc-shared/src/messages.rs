//! User-facing messages shared by validation and handlers.

pub const REQUIRED_ERROR: &str = "This is a required input.";
pub const PROFANITY_ERROR: &str = "Please don't use profanity. You're gooder than that.";
pub const BAD_CHOICE_ERROR: &str =
    "That is not a valid choice, please select from the available options.";
pub const FAMILY_ERROR: &str = "The Family Code you entered does not exist. If you did not receive an existing code, leave this field blank.";
pub const FORBIDDEN_ERROR: &str = "You are not authorized to access this function.";
pub const MISSING_TOKEN: &str = "Missing Token. Please log in to continue.";
pub const PARSE_ERROR: &str = "Failed to parse request.";
pub const BAD_MESSAGE_ERROR: &str = "Message is missing required fields.";
pub const MISSING_FIELDS_ERROR: &str = "Your submissions was missing required fields.";
pub const PARTICIPANTS_ERROR: &str = "At least one participant is required.";

/// Accepted values for the registration `donation` field.
pub const DONATIONS: [&str; 3] = ["ysb", "cvim", "none"];

/// Accepted values for the registration `sharing` field.
pub const SHARING: [&str; 3] = ["everyone", "none", "organization"];
