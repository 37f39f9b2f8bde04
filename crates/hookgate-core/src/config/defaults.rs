//! Built-in baseline rule set.
//!
//! Enabled with `include_default_rules: true` (the default) and evaluated
//! before any rules from the configuration file.

use super::rules::{Rule, TargetField};

/// Recursive + force `rm` in any flag spelling.
pub const RM_RECURSIVE_FORCE: &str = r"\brm\s+(?:.*\s)?(?:-[a-z]*r[a-z]*f|-[a-z]*f[a-z]*r|--recursive\s+(?:.*\s)?--force|--force\s+(?:.*\s)?--recursive|-r\s+(?:.*\s)?-f\b|-f\s+(?:.*\s)?-r\b)";

/// `.env` and `.env.<anything>` as the final path component.
pub const ENV_FILE_PATH: &str = r"(?:^|[/\\])\.env(?:\.[^/\\]*)?$";

/// `.env` files mentioned as a word inside a shell command.
pub const ENV_FILE_SHELL: &str = r#"(?:^|[\s/'"=<>|;&(])\.env(?:\.[\w.-]+)?(?:$|[\s'"|;&)<>])"#;

/// Template files that document variables without holding secrets.
pub const ENV_TEMPLATE_PATH: &str = r"\.env\.(?:sample|example|template)$";
pub const ENV_TEMPLATE_SHELL: &str = r"\.env\.(?:sample|example|template)\b";

pub const GIT_FORCE_PUSH: &str = r"\bgit\s+push\b.*\s(?:--force|-f)(?:\s|$)";

/// A destructive command chained after a separator inside a prompt.
pub const PROMPT_COMMAND_INJECTION: &str = r"(?:;|\||&&)\s*(?:rm|del|format|shutdown|halt)\s";
pub const PROMPT_SYSTEM_FILES: &str = r"/etc/(?:passwd|shadow)";
pub const PROMPT_REMOTE_SCRIPT: &str = r"(?:curl|wget)\s+.*\|\s*(?:ba)?sh\b";
pub const PROMPT_NETCAT_LISTENER: &str = r"\bn(?:c|cat)\s+-l";

/// A credential assigned inline, e.g. `api_key=abc123`.
pub const PROMPT_INLINE_SECRET: &str = r#"(?:password|api[_-]?key|secret|token)\s*[=:]\s*["']?\w+"#;

pub const PROMPT_SENSITIVE_FILE: &str = r"(?:write|create|delete|remove).*(?:\.env|/etc/|/root/|\.ssh/|\.aws/)";

/// The baseline rules, in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::block(
            "rm-recursive-force",
            TargetField::CommandText,
            RM_RECURSIVE_FORCE,
            "Dangerous recursive force delete (rm -rf) is blocked",
        )
        .ignore_case(),
        Rule::block(
            "env-file-path",
            TargetField::FilePath,
            ENV_FILE_PATH,
            "Access to .env files containing secrets is blocked (use .env.sample for templates)",
        )
        .excluding(ENV_TEMPLATE_PATH),
        Rule::block(
            "env-file-shell",
            TargetField::CommandText,
            ENV_FILE_SHELL,
            "Shell access to .env files containing secrets is blocked",
        )
        .excluding(ENV_TEMPLATE_SHELL),
        Rule::warn(
            "git-force-push",
            TargetField::CommandText,
            GIT_FORCE_PUSH,
            "Force push rewrites remote history",
        ),
        Rule::block(
            "prompt-command-injection",
            TargetField::Prompt,
            PROMPT_COMMAND_INJECTION,
            "Prompt chains a destructive shell command",
        )
        .ignore_case(),
        Rule::block(
            "prompt-system-files",
            TargetField::Prompt,
            PROMPT_SYSTEM_FILES,
            "Prompt references system credential files",
        )
        .ignore_case(),
        Rule::block(
            "prompt-remote-script",
            TargetField::Prompt,
            PROMPT_REMOTE_SCRIPT,
            "Prompt pipes a downloaded script into a shell",
        )
        .ignore_case(),
        Rule::block(
            "prompt-netcat-listener",
            TargetField::Prompt,
            PROMPT_NETCAT_LISTENER,
            "Prompt opens a netcat listener",
        )
        .ignore_case(),
        Rule::block(
            "prompt-inline-secret",
            TargetField::Prompt,
            PROMPT_INLINE_SECRET,
            "Prompt contains what looks like a credential",
        )
        .ignore_case(),
        Rule::warn(
            "prompt-sensitive-file",
            TargetField::Prompt,
            PROMPT_SENSITIVE_FILE,
            "Prompt modifies a sensitive location",
        )
        .ignore_case(),
    ]
}
