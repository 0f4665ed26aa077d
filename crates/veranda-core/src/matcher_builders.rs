//! Matcher constructors for common match rules.
//!
//! These mirror the registration surface bot authors actually use:
//!
//! ```rust,ignore
//! use veranda_core::{on_keyword, on_message, on_startswith};
//!
//! let matchers = vec![
//!     on_message().handler(log_handler),
//!     on_startswith(["/echo"]).block(true).handler(echo_handler),
//!     on_keyword(["hello"]).handler(greet_handler),
//! ];
//! ```
//!
//! All text rules apply to the plain-text part of message events and never
//! match non-message events.

use regex::Regex;

use crate::event::{EventType, FromEvent};
use crate::matcher::Matcher;

/// Matches every event of type `T`.
pub fn on_event<T>() -> Matcher
where
    T: FromEvent + 'static,
{
    Matcher::new().on::<T>()
}

/// Matches message events.
pub fn on_message() -> Matcher {
    Matcher::new()
        .name("message")
        .check(|ctx| ctx.event().event_type() == EventType::SendMessage)
}

/// Matches villa-join events.
pub fn on_join_villa() -> Matcher {
    Matcher::new()
        .name("join_villa")
        .check(|ctx| ctx.event().event_type() == EventType::JoinVilla)
}

/// Matches quick-emoticon reactions.
pub fn on_quick_emoticon() -> Matcher {
    Matcher::new()
        .name("quick_emoticon")
        .check(|ctx| ctx.event().event_type() == EventType::AddQuickEmoticon)
}

/// Matches message events whose plain text starts with any given prefix.
pub fn on_startswith<I, S>(prefixes: I) -> Matcher
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
    Matcher::new()
        .name(format!("startswith:{}", prefixes.join("|")))
        .check(move |ctx| {
            ctx.event()
                .message()
                .is_some_and(|m| prefixes.iter().any(|p| m.starts_with(p)))
        })
}

/// Matches message events whose plain text ends with any given suffix.
pub fn on_endswith<I, S>(suffixes: I) -> Matcher
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let suffixes: Vec<String> = suffixes.into_iter().map(Into::into).collect();
    Matcher::new()
        .name(format!("endswith:{}", suffixes.join("|")))
        .check(move |ctx| {
            ctx.event()
                .message()
                .is_some_and(|m| suffixes.iter().any(|s| m.ends_with(s)))
        })
}

/// Matches message events whose plain text contains any given keyword.
pub fn on_keyword<I, S>(keywords: I) -> Matcher
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
    Matcher::new()
        .name(format!("keyword:{}", keywords.join("|")))
        .check(move |ctx| {
            ctx.event()
                .message()
                .is_some_and(|m| keywords.iter().any(|k| m.contains(k)))
        })
}

/// Matches message events whose plain text matches the pattern.
pub fn on_regex(pattern: Regex) -> Matcher {
    Matcher::new()
        .name(format!("regex:{pattern}"))
        .check(move |ctx| ctx.event().message().is_some_and(|m| m.is_match(&pattern)))
}
