use serde::{Deserialize, Serialize};

/// The logged-in user as remembered between page mounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: u64,
    pub nickname: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    pub email: String,
}

impl SessionRecord {
    /// Avatar fallback when there is no profile image.
    pub fn initial(&self) -> String {
        self.nickname
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "U".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(nickname: &str) -> SessionRecord {
        SessionRecord {
            user_id: 7,
            nickname: nickname.to_string(),
            profile_image: None,
            email: "a@b.co".to_string(),
        }
    }

    #[test]
    fn test_initial() {
        assert_eq!(record("alice").initial(), "A");
        assert_eq!(record("").initial(), "U");
    }

    #[test]
    fn test_missing_profile_image_defaults() {
        let rec: SessionRecord =
            serde_json::from_str(r#"{"user_id":1,"nickname":"n","email":"e@x.io"}"#).unwrap();
        assert_eq!(rec.profile_image, None);
    }
}
