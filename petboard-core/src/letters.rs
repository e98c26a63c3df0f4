//! Message-board (love letter) helpers.
//!
//! One record is drawn at random from the letter collection each run and
//! written into the board callout as a styled inline equation, the only
//! rich formatting the embed target renders consistently.

use crate::settings::BlockSink;
use notion::{Block, NewBlock, PropertyValue, Record};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

/// Title fragment identifying both the letter collection and the board
/// heading on the page.
pub const BOARD_MARKER: &str = "Love Letter";

/// Line used when a letter has neither body paragraphs nor a title.
pub const FALLBACK_LINE: &str = "Thinking of you today.";

/// Where the message board stands on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardState {
    /// Neither heading nor callout exist.
    Missing,
    /// The heading exists but no callout follows it.
    HeadingOnly,
    /// Heading plus callout are in place.
    Ready { callout_id: String },
}

/// Pick one letter uniformly at random.
pub fn pick<'a, R: Rng>(rng: &mut R, records: &'a [Record]) -> Option<&'a Record> {
    records.choose(rng)
}

/// A letter's display lines: non-empty body paragraphs, else its title,
/// else the fixed fallback line.
pub fn body_lines(record: &Record, children: &[Block]) -> Vec<String> {
    let mut lines: Vec<String> = children
        .iter()
        .filter(|block| block.kind == "paragraph")
        .map(|block| block.plain_text.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        for value in record.properties.values() {
            if let PropertyValue::Title { text } = value {
                if !text.is_empty() {
                    lines.push(text.clone());
                    break;
                }
            }
        }
    }

    if lines.is_empty() {
        lines.push(FALLBACK_LINE.to_string());
    }
    lines
}

/// Format letter lines as one LaTeX expression: each line typewriter-small
/// in green, stacked with tightened vertical spacing.
pub fn format_letter(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("\\texttt{{\\scriptsize \\color{{green}}{{{line}}}}}"))
        .collect::<Vec<_>>()
        .join(" \\\\[-0.1em] ")
}

/// Locate the board among the page's direct children: a heading whose text
/// contains the marker, with a callout immediately after it.
pub fn locate_board(children: &[Block]) -> BoardState {
    for (i, block) in children.iter().enumerate() {
        if block.kind.starts_with("heading") && block.plain_text.contains(BOARD_MARKER) {
            if let Some(next) = children.get(i + 1) {
                if next.kind == "callout" {
                    return BoardState::Ready {
                        callout_id: next.id.clone(),
                    };
                }
            }
            return BoardState::HeadingOnly;
        }
    }
    BoardState::Missing
}

/// Create whatever part of the board is missing and return the callout id.
pub async fn reconcile_board<K: BlockSink>(
    sink: &K,
    page_id: &str,
    state: &BoardState,
) -> Result<Option<String>, notion::Error> {
    match state {
        BoardState::Ready { callout_id } => Ok(Some(callout_id.clone())),
        BoardState::Missing => {
            info!("message board missing, creating heading and callout");
            let created = sink
                .append(
                    page_id,
                    &[
                        NewBlock::heading(format!("💌 {BOARD_MARKER}")),
                        NewBlock::callout("Loading...", "💝"),
                    ],
                )
                .await?;
            Ok(created.get(1).map(|block| block.id.clone()))
        }
        BoardState::HeadingOnly => {
            info!("board heading found without callout, creating callout");
            let created = sink
                .append(page_id, &[NewBlock::callout("Loading...", "💝")])
                .await?;
            Ok(created.first().map(|block| block.id.clone()))
        }
    }
}
