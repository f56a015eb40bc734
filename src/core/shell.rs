//! Shell snippets for launching tools against the proxy

/// Target shell for generated scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Posix,
    Cmd,
}

impl ShellKind {
    pub fn current() -> Self {
        if cfg!(windows) {
            ShellKind::Cmd
        } else {
            ShellKind::Posix
        }
    }
}

/// Script that sets `vars` and then runs `command`
pub fn generate_env_script(shell: ShellKind, vars: &[(&str, &str)], command: &str) -> String {
    let mut lines: Vec<String> = vars
        .iter()
        .map(|(key, value)| match shell {
            ShellKind::Cmd => format!("set {}={}", key, value),
            ShellKind::Posix => format!("export {}='{}'", key, value.replace('\'', r"'\''")),
        })
        .collect();
    lines.push(command.to_string());
    lines.join("\n")
}

/// Parse a 1-based menu choice into an index below `len`
pub fn parse_choice(input: &str, len: usize) -> Option<usize> {
    let choice: usize = input.trim().parse().ok()?;
    (1..=len).contains(&choice).then(|| choice - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_script() {
        let script = generate_env_script(
            ShellKind::Posix,
            &[
                ("ANTHROPIC_BASE_URL", "http://localhost:4141"),
                ("ANTHROPIC_MODEL", "claude-sonnet-4"),
            ],
            "claude",
        );
        assert_eq!(
            script,
            "export ANTHROPIC_BASE_URL='http://localhost:4141'\n\
             export ANTHROPIC_MODEL='claude-sonnet-4'\n\
             claude"
        );
    }

    #[test]
    fn test_cmd_script() {
        let script = generate_env_script(ShellKind::Cmd, &[("A", "1")], "claude");
        assert_eq!(script, "set A=1\nclaude");
    }

    #[test]
    fn test_posix_quotes_are_escaped() {
        let script = generate_env_script(ShellKind::Posix, &[("A", "it's")], "true");
        assert_eq!(script, "export A='it'\\''s'\ntrue");
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1", 3), Some(0));
        assert_eq!(parse_choice(" 3\n", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("x", 3), None);
    }
}
