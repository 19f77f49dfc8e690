// Command grammar for the coordination channel.
// Raw message bodies parse into a closed set of typed commands; anything
// else is dropped without a reply.

/// One protocol command. Keywords are case-sensitive and arguments are
/// whitespace-separated; the AUDIT verdict alone is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CLAIM <name>` - sender requests ownership of a component.
    Claim { component: String },
    /// `READY <name> [branch]` - sender declares the implementation
    /// complete, optionally reporting the branch it used.
    Ready {
        component: String,
        branch: Option<String>,
    },
    /// `BLOCKED <name> [dep]` - sender reports a stall on a dependency.
    Blocked {
        component: String,
        dependency: Option<String>,
    },
    /// `FAIL <name> <reason...>` - sender reports a build failure.
    Fail { component: String, reason: String },
    /// `AUDIT <name> PASS|FAIL [details...]` - a verification result.
    Audit {
        component: String,
        passed: bool,
        detail: String,
    },
}

impl Command {
    /// Parse one trimmed message body. Returns `None` for anything that
    /// is not a well-formed command; unrecognized traffic is ignored
    /// upstream by design.
    pub fn parse(content: &str) -> Option<Command> {
        let content = content.trim();
        let (keyword, rest) = content.split_once(char::is_whitespace)?;
        let rest = rest.trim();
        if rest.is_empty() {
            return None;
        }

        match keyword {
            "CLAIM" => Some(Command::Claim {
                component: rest.to_string(),
            }),
            "READY" => {
                let mut parts = rest.split_whitespace();
                let component = parts.next()?.to_string();
                let branch = parts.next().map(str::to_string);
                Some(Command::Ready { component, branch })
            }
            "BLOCKED" => {
                let mut parts = rest.split_whitespace();
                let component = parts.next()?.to_string();
                let dependency = parts.next().map(str::to_string);
                Some(Command::Blocked {
                    component,
                    dependency,
                })
            }
            "FAIL" => {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let component = parts.next()?.to_string();
                let reason = parts
                    .next()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "unknown".to_string());
                Some(Command::Fail { component, reason })
            }
            "AUDIT" => {
                let mut parts = rest.split_whitespace();
                let component = parts.next()?.to_string();
                let passed = match parts.next()?.to_uppercase().as_str() {
                    "PASS" => true,
                    "FAIL" => false,
                    _ => return None,
                };
                let detail = {
                    // Remainder after the verdict token, original spacing
                    // collapsed to single spaces.
                    parts.collect::<Vec<_>>().join(" ")
                };
                Some(Command::Audit {
                    component,
                    passed,
                    detail,
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_takes_the_remainder_as_component() {
        assert_eq!(
            Command::parse("CLAIM api"),
            Some(Command::Claim {
                component: "api".to_string()
            })
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            Command::parse("  CLAIM api  "),
            Some(Command::Claim {
                component: "api".to_string()
            })
        );
    }

    #[test]
    fn ready_branch_is_optional() {
        assert_eq!(
            Command::parse("READY api"),
            Some(Command::Ready {
                component: "api".to_string(),
                branch: None,
            })
        );
        assert_eq!(
            Command::parse("READY api build/api-v2"),
            Some(Command::Ready {
                component: "api".to_string(),
                branch: Some("build/api-v2".to_string()),
            })
        );
    }

    #[test]
    fn blocked_dependency_is_optional() {
        assert_eq!(
            Command::parse("BLOCKED web api"),
            Some(Command::Blocked {
                component: "web".to_string(),
                dependency: Some("api".to_string()),
            })
        );
    }

    #[test]
    fn fail_keeps_the_reason_text() {
        assert_eq!(
            Command::parse("FAIL api tests segfault on startup"),
            Some(Command::Fail {
                component: "api".to_string(),
                reason: "tests segfault on startup".to_string(),
            })
        );
        assert_eq!(
            Command::parse("FAIL api"),
            Some(Command::Fail {
                component: "api".to_string(),
                reason: "unknown".to_string(),
            })
        );
    }

    #[test]
    fn audit_verdict_is_case_insensitive() {
        assert_eq!(
            Command::parse("AUDIT api pass"),
            Some(Command::Audit {
                component: "api".to_string(),
                passed: true,
                detail: String::new(),
            })
        );
        assert_eq!(
            Command::parse("AUDIT api FAIL missing endpoint"),
            Some(Command::Audit {
                component: "api".to_string(),
                passed: false,
                detail: "missing endpoint".to_string(),
            })
        );
    }

    #[test]
    fn malformed_audit_verdict_is_rejected() {
        assert_eq!(Command::parse("AUDIT api MAYBE"), None);
        assert_eq!(Command::parse("AUDIT api"), None);
    }

    #[test]
    fn unrecognized_keywords_are_ignored() {
        assert_eq!(Command::parse("HELLO everyone"), None);
        assert_eq!(Command::parse("claim api"), None); // keywords are case-sensitive
        assert_eq!(Command::parse("CLAIM"), None); // missing argument
        assert_eq!(Command::parse(""), None);
    }
}
