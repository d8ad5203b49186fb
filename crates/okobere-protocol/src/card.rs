//! Card identifiers and hand scoring.
//!
//! A card travels on the wire as `SUIT-RANK`, e.g. `SRDCE-ESO` (ace of
//! hearts). The deck is the 32-card German-suited pack.
//!
//! Scoring follows "Oko bere": cards have fixed point values and a hand
//! of exactly two aces is an automatic 21.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::command;

/// Card suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Suit {
    Srdce,
    Kule,
    Zaludy,
    Listy,
}

impl Suit {
    /// All suits, in wire order.
    pub const ALL: [Suit; 4] = [Suit::Srdce, Suit::Kule, Suit::Zaludy, Suit::Listy];

    /// The wire token for this suit.
    pub fn as_str(self) -> &'static str {
        match self {
            Suit::Srdce => "SRDCE",
            Suit::Kule => "KULE",
            Suit::Zaludy => "ZALUDY",
            Suit::Listy => "LISTY",
        }
    }
}

/// Card rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rank {
    Sedm,
    Osm,
    Devet,
    Deset,
    Spodek,
    Svrsek,
    Kral,
    Eso,
}

impl Rank {
    /// All ranks, in wire order.
    pub const ALL: [Rank; 8] = [
        Rank::Sedm,
        Rank::Osm,
        Rank::Devet,
        Rank::Deset,
        Rank::Spodek,
        Rank::Svrsek,
        Rank::Kral,
        Rank::Eso,
    ];

    /// The wire token for this rank.
    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Sedm => "SEDM",
            Rank::Osm => "OSM",
            Rank::Devet => "DEVET",
            Rank::Deset => "DESET",
            Rank::Spodek => "SPODEK",
            Rank::Svrsek => "SVRSEK",
            Rank::Kral => "KRAL",
            Rank::Eso => "ESO",
        }
    }

    /// Point value of the rank.
    pub fn value(self) -> u32 {
        match self {
            Rank::Sedm => 7,
            Rank::Osm => 8,
            Rank::Devet => 9,
            Rank::Deset => 10,
            Rank::Spodek | Rank::Svrsek => 1,
            Rank::Kral => 2,
            Rank::Eso => 11,
        }
    }
}

/// A playing card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    pub fn value(self) -> u32 {
        self.rank.value()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.suit.as_str(), self.rank.as_str())
    }
}

impl FromStr for Card {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::invalid(command::CARD, format!("invalid card: {s:?}"));

        let (suit, rank) = s.split_once('-').ok_or_else(invalid)?;
        let suit = Suit::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == suit)
            .ok_or_else(invalid)?;
        let rank = Rank::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == rank)
            .ok_or_else(invalid)?;
        Ok(Self { suit, rank })
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.to_string()
    }
}

impl TryFrom<String> for Card {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Total value of a hand.
///
/// Exactly two cards that are both aces score 21 ("oko"); otherwise the
/// card values are summed.
pub fn hand_value(cards: &[Card]) -> u32 {
    if let [a, b] = cards {
        if a.rank == Rank::Eso && b.rank == Rank::Eso {
            return 21;
        }
    }
    cards.iter().map(|card| card.value()).sum()
}

/// [`hand_value`] over wire identifiers.
///
/// Identifiers that don't parse contribute nothing (and don't count as
/// aces for the two-ace rule).
pub fn calculate_hand_value<S: AsRef<str>>(cards: &[S]) -> u32 {
    let parsed: Vec<Option<Card>> = cards.iter().map(|s| s.as_ref().parse().ok()).collect();
    if parsed.iter().all(Option::is_some) {
        let cards: Vec<Card> = parsed.into_iter().flatten().collect();
        return hand_value(&cards);
    }
    parsed.into_iter().flatten().map(Card::value).sum()
}

/// Parses a comma-separated card list, e.g. the revealed opponent hand in
/// `ROUND_END`. Surrounding whitespace and empty items are ignored.
pub fn parse_card_list(csv: &str) -> Result<Vec<Card>, ProtocolError> {
    csv.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}
