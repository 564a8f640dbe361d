use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use serde_json::{Value, json};

use crate::{
    audit,
    dto::users::{PreferencesPatch, UpdateProfileRequest},
    entity::{Users, users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
    validation::Validator,
};

const GENDERS: &[&str] = &["MALE", "FEMALE", "OTHER"];
const LANGUAGES: &[&str] = &["en", "es", "fr", "de", "it", "pt", "ru", "zh", "ja", "ko"];
const CURRENCIES: &[&str] = &["USD", "EUR", "GBP", "JPY", "CAD", "AUD"];
const THEMES: &[&str] = &["light", "dark", "system"];
const BOOLEAN_PREFERENCES: &[&str] = &["newsletter", "email_notifications", "sms_notifications"];

async fn load_user(state: &AppState, user: &AuthUser) -> AppResult<users::Model> {
    Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = load_user(state, user).await?;
    Ok(ApiResponse::success(
        "Profile retrieved successfully",
        User::from(found),
        Some(Meta::empty()),
    ))
}

fn validate_profile(payload: &UpdateProfileRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.optional_length(
        "first_name",
        payload.first_name.as_deref(),
        2,
        50,
        "First name must be between 2 and 50 characters",
    );
    v.optional_length(
        "last_name",
        payload.last_name.as_deref(),
        2,
        50,
        "Last name must be between 2 and 50 characters",
    );
    v.phone("phone", payload.phone.as_deref());
    if let Some(gender) = payload.gender.as_deref() {
        v.one_of(
            "gender",
            gender,
            GENDERS,
            "Gender must be MALE, FEMALE, or OTHER",
        );
    }
    v.finish()
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    validate_profile(&payload)?;
    let found = load_user(state, user).await?;

    let mut active: users::ActiveModel = found.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(avatar) = payload.avatar {
        active.avatar = Set(Some(avatar));
    }
    if let Some(date_of_birth) = payload.date_of_birth {
        active.date_of_birth = Set(Some(date_of_birth));
    }
    if let Some(gender) = payload.gender {
        active.gender = Set(Some(gender));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "profile_update",
        "users",
        json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Profile updated successfully",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

fn validate_preferences(patch: &PreferencesPatch) -> AppResult<()> {
    let mut v = Validator::new();
    for key in BOOLEAN_PREFERENCES {
        if let Some(value) = patch.get(*key) {
            v.check(value.is_boolean(), key, "Preference must be a boolean");
        }
    }

    let choices: [(&str, &[&str], &str); 3] = [
        ("language", LANGUAGES, "Language must be a valid language code"),
        ("currency", CURRENCIES, "Currency must be a valid currency code"),
        ("theme", THEMES, "Theme must be light, dark, or system"),
    ];
    for (key, allowed, message) in choices {
        if let Some(value) = patch.get(key) {
            let ok = value.as_str().is_some_and(|s| allowed.contains(&s));
            v.check(ok, key, message);
        }
    }
    v.finish()
}

/// Shallow merge: keys in `patch` replace the stored ones, others are kept.
pub fn merge_preferences(current: &Value, patch: PreferencesPatch) -> Value {
    let mut merged = current.as_object().cloned().unwrap_or_default();
    merged.extend(patch);
    Value::Object(merged)
}

pub async fn update_preferences(
    state: &AppState,
    user: &AuthUser,
    patch: PreferencesPatch,
) -> AppResult<ApiResponse<Value>> {
    validate_preferences(&patch)?;
    let found = load_user(state, user).await?;

    let merged = merge_preferences(&found.preferences, patch);

    let mut active: users::ActiveModel = found.into();
    active.preferences = Set(merged);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Preferences updated successfully",
        updated.preferences,
        Some(Meta::empty()),
    ))
}

pub async fn delete_account(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Value>> {
    let found = load_user(state, user).await?;
    found.delete(&state.orm).await?;

    audit::record(
        &state.pool,
        None,
        "account_delete",
        "users",
        json!({ "user_id": user.user_id, "email": user.email }),
    )
    .await;
    tracing::info!(user_id = %user.user_id, "account deleted");

    Ok(ApiResponse::message("Account deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(value: Value) -> PreferencesPatch {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_keeps_unrelated_keys() {
        let current = json!({ "newsletter": true, "theme": "light" });
        let merged = merge_preferences(&current, patch(json!({ "theme": "dark" })));
        assert_eq!(merged, json!({ "newsletter": true, "theme": "dark" }));
    }

    #[test]
    fn merge_over_non_object_starts_fresh() {
        let merged = merge_preferences(&Value::Null, patch(json!({ "currency": "EUR" })));
        assert_eq!(merged, json!({ "currency": "EUR" }));
    }

    #[test]
    fn preference_values_are_checked() {
        assert!(validate_preferences(&patch(json!({ "newsletter": false, "language": "fr" }))).is_ok());
        assert!(validate_preferences(&patch(json!({ "newsletter": "yes" }))).is_err());
        assert!(validate_preferences(&patch(json!({ "theme": "neon" }))).is_err());
        assert!(validate_preferences(&patch(json!({ "custom_flag": 3 }))).is_ok());
    }

    #[test]
    fn profile_gender_must_be_known() {
        let payload = UpdateProfileRequest {
            gender: Some("UNKNOWN".into()),
            ..Default::default()
        };
        assert!(matches!(validate_profile(&payload), Err(AppError::Validation(_))));

        let payload = UpdateProfileRequest {
            first_name: Some("Jo".into()),
            gender: Some("OTHER".into()),
            ..Default::default()
        };
        assert!(validate_profile(&payload).is_ok());
    }
}
