//! Heuristic help-text parsing.
//!
//! Turns the raw `--help` output of an arbitrary CLI into a
//! [`CapabilityModel`]. Pure text processing, no I/O. The parser must fail
//! soft: help text it cannot make sense of yields a minimal positional model
//! with empty option sets, and callers degrade to a built-in template.

use crate::capability::{CapabilityModel, ExecutionPattern};
use regex::Regex;
use std::sync::OnceLock;

/// Flag descriptions matching any of these mark the flag as the tool's
/// non-interactive ("print and exit") switch. First match wins.
const NON_INTERACTIVE_KEYWORDS: [&str; 5] =
    ["print", "non-interactive", "noninteractive", "exit after", "pipe"];

/// Flag descriptions matching any of these mark the flag as the one carrying
/// the prompt text.
const PROMPT_KEYWORDS: [&str; 3] = ["prompt", "query", "instruction"];

static SHORT_FLAG_RE: OnceLock<Regex> = OnceLock::new();
static LONG_FLAG_RE: OnceLock<Regex> = OnceLock::new();
static SUBCOMMAND_RE: OnceLock<Regex> = OnceLock::new();

fn short_flag_re() -> &'static Regex {
    SHORT_FLAG_RE.get_or_init(|| Regex::new(r"^-[A-Za-z0-9]$").unwrap())
}

fn long_flag_re() -> &'static Regex {
    LONG_FLAG_RE.get_or_init(|| Regex::new(r"^--[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap())
}

fn subcommand_re() -> &'static Regex {
    SUBCOMMAND_RE.get_or_init(|| Regex::new(r"^\s{2,8}([a-z][a-z0-9_-]+)\s{2,}\S").unwrap())
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

/// Parse raw help output into a capability model.
///
/// The heuristic, in order:
/// 1. lines opening with `-x` / `--long` clusters become `options`;
/// 2. the first option whose description matches the non-interactive keyword
///    set becomes `non_interactive_flag`; same scheme for `prompt_flag`;
/// 3. `execution_pattern` is flag-based iff a non-interactive flag exists
///    and the usage line shows no bare positional slot before other flags;
/// 4. indented bare words followed by a description become `subcommands`.
pub fn parse(tool_name: &str, raw: &str) -> CapabilityModel {
    let mut model = CapabilityModel::minimal(tool_name);

    for line in raw.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('-') {
            scan_flag_line(trimmed, &mut model);
        } else if let Some(caps) = subcommand_re().captures(line) {
            let word = &caps[1];
            if !is_reserved_word(word) {
                model.subcommands.insert(word.to_string());
            }
        }
    }

    if model.non_interactive_flag.is_some() && !usage_has_leading_positional(raw) {
        model.execution_pattern = ExecutionPattern::FlagBased;
    }

    model
}

// ---------------------------------------------------------------------------
// Flag lines
// ---------------------------------------------------------------------------

/// Collect the flag cluster at the start of a definition line and match its
/// description against the keyword sets.
///
/// Handles the common shapes:
/// ```text
/// -p, --print              Print response and exit
/// --model <model>          Model to use
/// -h                       Show help
/// ```
fn scan_flag_line(trimmed: &str, model: &mut CapabilityModel) {
    let (cluster, description) = split_definition(trimmed);

    let mut short: Option<String> = None;
    let mut long: Option<String> = None;

    for token in cluster.split([',', ' ']) {
        let token = strip_value_suffix(token.trim());
        if token.is_empty() {
            continue;
        }
        if long_flag_re().is_match(token) {
            long.get_or_insert_with(|| token.to_string());
            model.options.insert(token.to_string());
        } else if short_flag_re().is_match(token) {
            short.get_or_insert_with(|| token.to_string());
            model.options.insert(token.to_string());
        }
    }

    let canonical = long.or(short);
    let Some(flag) = canonical else { return };
    let description = description.to_lowercase();

    if model.non_interactive_flag.is_none()
        && NON_INTERACTIVE_KEYWORDS.iter().any(|k| description.contains(k))
    {
        model.non_interactive_flag = Some(flag.clone());
    }
    if model.prompt_flag.is_none()
        && model.non_interactive_flag.as_deref() != Some(flag.as_str())
        && PROMPT_KEYWORDS.iter().any(|k| description.contains(k))
    {
        model.prompt_flag = Some(flag);
    }
}

/// Split a definition line into its flag cluster and description at the
/// first run of two or more spaces.
fn split_definition(line: &str) -> (&str, &str) {
    match line.find("  ") {
        Some(idx) => (&line[..idx], line[idx..].trim_start()),
        None => (line, ""),
    }
}

/// Drop `=VALUE` / `<value>` suffixes so `--model=<name>` yields `--model`.
fn strip_value_suffix(token: &str) -> &str {
    let end = token
        .find(['=', '<', '['])
        .unwrap_or(token.len());
    token[..end].trim_end_matches(['.', ':'])
}

// ---------------------------------------------------------------------------
// Usage line
// ---------------------------------------------------------------------------

/// Whether the usage line shows a bare positional slot before any flags.
///
/// `usage: tool <prompt> [options]` does; `Usage: tool [options] [command]`
/// does not (placeholders for flags and subcommands are not task slots).
fn usage_has_leading_positional(raw: &str) -> bool {
    for line in raw.lines() {
        let lower = line.trim().to_lowercase();
        let Some(rest) = lower.strip_prefix("usage:") else {
            continue;
        };
        let mut tokens = rest.split_whitespace();
        let _program = tokens.next();
        for token in tokens {
            let bare = token.trim_matches(['[', ']', '<', '>', '.']);
            if bare.starts_with('-') || is_reserved_word(bare) {
                return false;
            }
            return true;
        }
        return false;
    }
    false
}

fn is_reserved_word(word: &str) -> bool {
    matches!(
        word,
        "options" | "flags" | "command" | "commands" | "subcommand" | "usage" | "arguments"
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
