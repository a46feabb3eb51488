//! Stateless classification of raw tool output chunks into tagged events.
//!
//! The builder's streams are tagged at chunk granularity. The programmer
//! writes all of its progress reporting to stderr, where tags are
//! positional: a single chunk may carry plain text around a progress marker,
//! so only the matched substring is bracketed and the surrounding text is
//! forwarded as plain segments in order.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::{Channel, EventKind, OutputEvent, Tool};

/// avr-gcc diagnostics on the builder's stderr.
static BUILD_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\berror:").unwrap());

/// Compilation summary the builder prints on success (memory and variable
/// usage reports).
static BUILD_SUMMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Sketch uses|Global variables use").unwrap());

/// Opening of an avrdude read/write progress bar.
static PROGRESS_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"Reading \||Writing \|").unwrap());

/// Percentage report closing a progress bar.
static PROGRESS_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,3}%").unwrap());

/// avrdude's sign-off banner.
static PROGRAMMER_DONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"avrdude(\.exe)? done").unwrap());

/// Fatal programmer conditions worth surfacing as errors.
static PROGRAMMER_ERROR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"can't open device|programmer is not responding").unwrap());

/// Classify one raw chunk from the given tool stream.
pub fn classify(tool: Tool, channel: Channel, chunk: &str) -> Vec<OutputEvent> {
    if chunk.is_empty() {
        return Vec::new();
    }

    match (tool, channel) {
        (Tool::Builder, Channel::Stderr) => {
            let kind = if BUILD_ERROR.is_match(chunk) {
                EventKind::Error
            } else {
                EventKind::Plain
            };
            vec![OutputEvent::new(kind, chunk)]
        }
        (Tool::Builder, Channel::Stdout) => {
            let kind = if BUILD_SUMMARY.is_match(chunk) {
                EventKind::Banner
            } else {
                EventKind::Plain
            };
            vec![OutputEvent::new(kind, chunk)]
        }
        (Tool::Programmer, Channel::Stderr) => classify_programmer_stderr(chunk),
        (Tool::Programmer, Channel::Stdout) => vec![OutputEvent::plain(chunk)],
    }
}

fn classify_programmer_stderr(chunk: &str) -> Vec<OutputEvent> {
    let mut events = Vec::new();
    let mut rest = chunk;

    while !rest.is_empty() {
        let candidates = [
            (EventKind::Error, PROGRAMMER_ERROR.find(rest)),
            (EventKind::ProgressStart, PROGRESS_START.find(rest)),
            (EventKind::ProgressEnd, PROGRESS_END.find(rest)),
            (EventKind::Banner, PROGRAMMER_DONE.find(rest)),
        ];

        let earliest = candidates
            .into_iter()
            .filter_map(|(kind, m)| m.map(|m| (kind, m)))
            .min_by_key(|(_, m)| m.start());

        match earliest {
            Some((kind, m)) => {
                if m.start() > 0 {
                    events.push(OutputEvent::plain(&rest[..m.start()]));
                }
                events.push(OutputEvent::new(kind, m.as_str()));
                rest = &rest[m.end()..];
            }
            None => {
                events.push(OutputEvent::plain(rest));
                break;
            }
        }
    }

    events
}
