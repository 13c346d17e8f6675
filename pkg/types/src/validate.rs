use anyhow::{Result, bail};

/// Validate a Kubernetes-style object or namespace name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' is longer than 63 characters", name);
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not begin or end with '-'", name);
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        bail!("name '{}' contains invalid character '{}' (allowed: [a-z0-9-])", name, bad);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("g1").is_ok());
        assert!(validate_name("team-viewer").is_ok());
        assert!(validate_name("grant-123").is_ok());
        assert!(validate_name("a").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("Team-Viewer").is_err());
        assert!(validate_name("team_viewer").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("trailing-").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
    }
}
