//! Out-of-band setup: congregations are not created through the chat, and
//! the first admin of a congregation has to be appointed by the operator.

use log::info;

use crate::core::{AppError, AppResult};
use crate::domain::{Congregation, Role, User};
use crate::storage::{CongregationFilter, Storage, UserFilter};

/// Creates a congregation with a unique name.
pub fn add_congregation(storage: &dyn Storage, name: &str) -> AppResult<Congregation> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Config("congregation name must not be empty".to_string()));
    }
    let congregation = storage.create_congregation(name)?;
    info!("Created congregation {} ({})", congregation.name, congregation.id);
    Ok(congregation)
}

/// Makes a user who already talked to the bot an admin of a congregation.
pub fn promote_admin(storage: &dyn Storage, messenger_user_id: i64, congregation_name: &str) -> AppResult<User> {
    let congregation = storage
        .get_congregation(CongregationFilter::Name(congregation_name.trim()))?
        .ok_or_else(|| AppError::NotFound(format!("congregation {:?}", congregation_name)))?;
    let mut user = storage
        .get_user(UserFilter::MessengerUserId(messenger_user_id))?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "user with messenger id {} (they must send /start first)",
                messenger_user_id
            ))
        })?;

    if user.full_name.is_empty() {
        user.full_name = messenger_user_id.to_string();
    }
    user.join(congregation.id.clone(), Role::Admin);
    storage.update_user(&user)?;
    info!("User {} is now an admin of {}", user.id, congregation.name);
    Ok(user)
}
