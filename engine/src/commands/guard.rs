//! Local pattern guard for shell commands.
//!
//! Generated safety levels are untrusted. Every candidate is re-checked
//! against a fixed rule table and its level can only go up.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::models::command::{CommandAnalysis, CommandCandidate, SafetyLevel};

struct Rule {
    level: SafetyLevel,
    pattern: &'static str,
    reason: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\brm\s+(?:-\S*\s+)*(?:-[a-zA-Z]*[rR]|--recursive\b)",
        reason: "recursive delete",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r#"\brm\s+(?:-\S*\s+)*["']?[/.~*]+["']?(?:\s|;|&|\||$)"#,
        reason: "delete of root, home, working directory or glob",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\bdd\b.*\bof=",
        reason: "raw device write",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\bmkfs(?:\.\w+)?\b",
        reason: "filesystem format",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        reason: "fork bomb",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\bchmod\s+(?:-\S+\s+)*0?777\s+/(?:\s|$)",
        reason: "world-writable root",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\b(?:curl|wget)\b[^|]*\|\s*(?:sudo\s+)?(?:ba|z|da)?sh\b",
        reason: "remote script piped to shell",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r">\s*/dev/(?:sd|nvme|hd)\w*",
        reason: "raw device write",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\b(?:shutdown|reboot|poweroff|halt)\b",
        reason: "host power state change",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\bfind\b.*\s-(?:delete\b|exec(?:dir)?\s+rm\b)",
        reason: "bulk delete through find",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r"\btruncate\b.*(?:\s-s\s*0+\b|\s--size(?:=|\s+)0+\b)",
        reason: "file emptied in place",
    },
    Rule {
        level: SafetyLevel::Dangerous,
        pattern: r">>?\s*/(?:etc|boot|bin|sbin|usr|lib(?:32|64)?|var|root|sys|proc)(?:/|\s|$)",
        reason: "redirect onto a system path",
    },
    Rule {
        level: SafetyLevel::Caution,
        pattern: r"\bsudo\b",
        reason: "elevated privileges",
    },
    Rule {
        level: SafetyLevel::Caution,
        pattern: r"\bgit\s+push\b.*(?:--force\b|--force-with-lease\b|\s-f\b)",
        reason: "history rewrite on remote",
    },
    Rule {
        level: SafetyLevel::Caution,
        pattern: r"\bgit\s+push\b.*(?:\s\+?:[^\s:]+|\s--delete\b|\s-d\b)",
        reason: "deletes a remote branch",
    },
    Rule {
        level: SafetyLevel::Caution,
        pattern: r"\bgit\s+(?:reset\s+--hard|clean)\b",
        reason: "discards local changes",
    },
    Rule {
        level: SafetyLevel::Caution,
        pattern: r"\bnpm\s+publish\b",
        reason: "publishes a package",
    },
];

fn compiled_rules() -> &'static Vec<(Regex, &'static Rule)> {
    static COMPILED: OnceLock<Vec<(Regex, &'static Rule)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .map(|rule| (Regex::new(rule.pattern).expect("static guard pattern"), rule))
            .collect()
    })
}

/// Highest level any rule assigns to `command`, with the matching reason
pub fn classify(command: &str) -> Option<(SafetyLevel, &'static str)> {
    compiled_rules()
        .iter()
        .filter(|(regex, _)| regex.is_match(command))
        .map(|(_, rule)| (rule.level, rule.reason))
        .max_by_key(|(level, _)| *level)
}

/// Raise a candidate's level if a rule demands it. Returns true if raised.
pub fn harden_candidate(candidate: &mut CommandCandidate) -> bool {
    match classify(&candidate.command) {
        Some((level, reason)) if level > candidate.safety_level => {
            warn!(
                "Raising '{}' from {} to {}: {}",
                candidate.command, candidate.safety_level, level, reason
            );
            candidate.safety_level = level;
            true
        }
        _ => false,
    }
}

/// Re-check every candidate and recompute the aggregate verdict
pub fn harden_analysis(mut analysis: CommandAnalysis) -> CommandAnalysis {
    for candidate in analysis.commands.iter_mut() {
        harden_candidate(candidate);
    }

    let worst = analysis
        .commands
        .iter()
        .map(|c| c.safety_level)
        .max()
        .unwrap_or(SafetyLevel::Safe);
    analysis.overall_safety = analysis.overall_safety.max(worst);

    if analysis.has_dangerous() {
        analysis.execution_recommended = false;
    }
    analysis
}
