use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to register a new user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(range(min = 1, max = 150))]
    pub age: i32,
    #[validate(length(min = 1))]
    pub bio: String,
}

/// Request to log in by name and password
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request to edit a profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfileEditRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(range(min = 1, max = 150))]
    pub age: i32,
    #[validate(length(min = 1))]
    pub bio: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_ignores_client_image_url() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"name":"Ada","password":"pw","age":30,"bio":"hi","imageUrl":"/a.png"}"#,
        )
        .unwrap();
        assert_eq!(req.name, "Ada");
        assert!(req.validate().is_ok());
        assert!(serde_json::to_value(&req).unwrap().get("imageUrl").is_none());
    }

    #[test]
    fn test_profile_edit_rejects_empty_fields() {
        let req = ProfileEditRequest {
            name: String::new(),
            age: 0,
            bio: String::new(),
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("age"));
        assert!(fields.contains_key("bio"));
    }
}
