//! Deterministic local replies, used whenever the model is disabled, fails,
//! or is rate limited. Same inputs always give the same text.

use wanderlust_core::{
    top_matches, trait_label, Catalog, DestinationMatch, Dimension, ScoreMap, Session,
};

pub const RATE_LIMITED_MESSAGE: &str = "You're chatting faster than I can pack! \
Take a breather, or try the quick quiz to see your matches right away.";

pub const INVALID_REQUEST_MESSAGE: &str =
    "Sorry, I didn't catch that. Could you tell me a little about the trip you have in mind?";

fn next_question(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Vibe => {
            "What kind of vibe are you after: beaches, culture, adventure, nightlife or food?"
        }
        Dimension::Budget => {
            "What's your budget like: backpacker, comfortable mid-range, or full luxury?"
        }
        Dimension::Duration => "How long is the trip: a quick weekend or a longer escape?",
        Dimension::Climate => "Are you chasing sunshine and heat, or cooler weather?",
        Dimension::Companions => "Who's coming along: just you, a partner, friends or family?",
    }
}

fn acknowledge(delta: &ScoreMap) -> String {
    let labels: Vec<&str> = delta.top(2).iter().map(|&(t, _)| trait_label(t)).collect();
    match labels.as_slice() {
        [] => "Got it! ".to_string(),
        [one] => format!("Love it, {one} it is! "),
        [one, two, ..] => format!("Love it, {one} and {two}! "),
    }
}

/// Reply for one chat turn.
///
/// `delta` is what the latest message added; `force_results` hands off to
/// the results view instead of asking another question.
pub fn chat_reply(session: &Session, delta: &ScoreMap, force_results: bool, catalog: &Catalog) -> String {
    let ack = acknowledge(delta);
    if force_results {
        return match top_matches(&session.scores, catalog, 1).first() {
            Some(best) if !session.scores.is_empty() => format!(
                "{ack}I've got a good feel for your travel style. Your top match right now is {} \
                 at {}%. Let's look at all your results!",
                best.destination.name, best.match_percent
            ),
            _ => format!("{ack}Let's look at some destinations you might love!"),
        };
    }
    match session.missing_dimensions().first() {
        Some(d) => format!("{ack}{}", next_question(*d)),
        None => format!("{ack}Anything else I should know before I show your matches?"),
    }
}

/// Short explanation of the top matches without a model.
pub fn explain_reply(matches: &[DestinationMatch<'_>]) -> String {
    if matches.is_empty() {
        return "Tell me a bit about your ideal trip and I'll find destinations that fit.".to_string();
    }
    matches
        .iter()
        .map(|m| {
            let traits: Vec<&str> = m.matched_traits.iter().map(|t| trait_label(t)).collect();
            if traits.is_empty() {
                format!(
                    "{} ({}%) is a well-rounded pick for you.",
                    m.destination.name, m.match_percent
                )
            } else {
                format!(
                    "{} ({}%) is great for {}.",
                    m.destination.name,
                    m.match_percent,
                    traits.join(", ")
                )
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
