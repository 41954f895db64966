use rand::Rng;

use crate::models::users::{NewUser, User};

/// Names the fields of `requested` that `existing` already holds.
pub fn conflicting_fields(existing: &User, requested: &NewUser) -> String {
    let mut fields = Vec::new();

    if existing.user_name == requested.user_name {
        fields.push("user_name");
    }
    if existing.email == requested.email {
        fields.push("email");
    }
    if !existing.phone.is_empty() && existing.phone == requested.phone {
        fields.push("phone");
    }

    format!("{} already taken", fields.join(", "))
}

pub fn generate_random_user_name(first_name: &str) -> String {
    let base: String = first_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let base = if base.is_empty() { "user".to_string() } else { base };
    let suffix: u32 = rand::thread_rng().gen_range(1000..10000);

    format!("{base}{suffix}")
}
