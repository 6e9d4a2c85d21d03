//! Decide whether a channel post gets an image attached.
//!
//! A post matches a state when it contains the state's marker glyph followed,
//! anywhere later in the text, by the state's trigger phrase (compared
//! case-insensitively). OFF is checked before ON. Trigger phrases are user
//! input and always matched literally.

use {
    rand::{Rng, seq::IndexedRandom},
    regex::{Regex, RegexBuilder},
    tracing::warn,
};

use crate::{ChannelConfig, Signal};

/// Instruction for the transport: edit the post to carry `image` with the
/// original text as caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteDirective {
    pub signal: Signal,
    pub image: String,
    pub caption: String,
}

fn trigger_pattern(signal: Signal, phrase: &str) -> Option<Regex> {
    let pattern = format!(
        "{}.*{}",
        regex::escape(signal.marker()),
        regex::escape(phrase)
    );
    match RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(%signal, error = %e, "failed to compile trigger pattern");
            None
        },
    }
}

fn matches(signal: Signal, text: &str, config: &ChannelConfig) -> bool {
    let phrase = config.trigger_text(signal);
    // An empty literal would match every post carrying the marker.
    if phrase.trim().is_empty() {
        return false;
    }
    trigger_pattern(signal, phrase).is_some_and(|re| re.is_match(text))
}

/// Which state, if any, the post announces.
pub fn classify(text: &str, config: &ChannelConfig) -> Option<Signal> {
    [Signal::Off, Signal::On]
        .into_iter()
        .find(|&signal| matches(signal, text, config))
}

/// Evaluate a post against the channel config using the thread RNG.
pub fn evaluate(text: &str, config: &ChannelConfig) -> Option<RewriteDirective> {
    evaluate_with(text, config, &mut rand::rng())
}

/// Evaluate a post, drawing the image from `rng`.
///
/// Returns `None` when nothing matches or the matching collection is empty.
pub fn evaluate_with<R: Rng + ?Sized>(
    text: &str,
    config: &ChannelConfig,
    rng: &mut R,
) -> Option<RewriteDirective> {
    let signal = classify(text, config)?;
    let image = config.images(signal).choose(rng)?;
    Some(RewriteDirective {
        signal,
        image: image.clone(),
        caption: text.to_string(),
    })
}
